// src/core/mod.rs

pub mod codec;
pub mod engine;
pub mod measures;
pub mod registry;
pub mod types;
