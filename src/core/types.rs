// src/core/types.rs
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A surrogate identifier for a lemma. Zero never denotes a real lemma.
pub type TokenId = u32;

/// Sentinel meaning "no mapping found".
pub const NO_TOKEN: TokenId = 0;

/// Separator between a lemma and its grammatical-role tag, e.g. `run_obj`.
pub const TAG_SEPARATOR: char = '_';

/// Raw counts of a lemma pair as delivered by ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PairStats {
    pub frequency: u32,
    /// Signed mutual distance of the pair members. Only persisted by schema v2.
    pub distance: i32,
}

impl PairStats {
    pub fn new(frequency: u32) -> Self {
        Self { frequency, distance: 0 }
    }

    pub fn with_distance(frequency: u32, distance: i32) -> Self {
        Self { frequency, distance }
    }
}

/// The measure used to rank collocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortingMeasure {
    #[default]
    #[serde(alias = "log-dice")]
    LDice,
    #[serde(alias = "t-score")]
    TScore,
}

impl FromStr for SortingMeasure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ldice" | "log-dice" | "logdice" => Ok(SortingMeasure::LDice),
            "tscore" | "t-score" => Ok(SortingMeasure::TScore),
            other => Err(Error::precondition(format!("invalid sort measure '{}'", other))),
        }
    }
}

impl fmt::Display for SortingMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortingMeasure::LDice => write!(f, "ldice"),
            SortingMeasure::TScore => write!(f, "tscore"),
        }
    }
}

/// A single ranked result of a collocation query. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collocation {
    pub raw_lemma: String,
    pub raw_collocate: String,
    pub log_dice: f64,
    pub t_score: f64,
    pub mutual_dist: i32,
}

impl Collocation {
    pub fn lemma_and_fn(&self) -> (&str, &str) {
        split_by_last_separator(&self.raw_lemma)
    }

    pub fn collocate_and_fn(&self) -> (&str, &str) {
        split_by_last_separator(&self.raw_collocate)
    }

    /// `lemma\t(tag)\tcollocate\t(tag)\tlogDice\ttScore`
    pub fn tab_string(&self) -> String {
        let (lemma, lemma_fn) = self.lemma_and_fn();
        let (coll, coll_fn) = self.collocate_and_fn();
        format!(
            "{}\t({})\t{}\t({})\t{:.2}\t{:.2}",
            lemma, lemma_fn, coll, coll_fn, self.log_dice, self.t_score
        )
    }
}

/// Splits `base_tag` into `(base, tag)`; a lemma without a tag yields an empty tag.
pub fn split_by_last_separator(s: &str) -> (&str, &str) {
    match s.rfind(TAG_SEPARATOR) {
        Some(idx) => (&s[..idx], &s[idx + 1..]),
        None => (s, ""),
    }
}
