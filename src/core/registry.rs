// File: src/core/registry.rs
use crate::core::types::{TokenId, NO_TOKEN};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Mints dense token ids for one ingestion pass.
///
/// The cache lives only in memory; durable identity comes from what the
/// frequency store persists. Create one per bulk load and pass it by reference.
#[derive(Debug, Default)]
pub struct TokenIdSequence {
    value: TokenId,
    cache: HashMap<String, TokenId>,
}

impl TokenIdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues numbering after `last`, e.g. the highest id already in a store.
    pub fn starting_after(last: TokenId) -> Self {
        Self { value: last, cache: HashMap::new() }
    }

    /// Returns the id of `lemma`, minting a new one if the lemma is unseen.
    pub fn next(&mut self, lemma: &str) -> Result<TokenId> {
        if let Some(&id) = self.cache.get(lemma) {
            return Ok(id);
        }
        let id = self.value.checked_add(1).ok_or(Error::IdSpaceExhausted)?;
        self.value = id;
        self.cache.insert(lemma.to_string(), id);
        Ok(id)
    }

    /// Records an id that was assigned by an earlier session.
    pub fn adopt(&mut self, lemma: &str, id: TokenId) {
        self.value = self.value.max(id);
        self.cache.insert(lemma.to_string(), id);
    }

    /// Moves numbering past `last` so ids up to it are never minted.
    pub fn advance_past(&mut self, last: TokenId) {
        self.value = self.value.max(last);
    }

    /// Drops a minted id that turned out to be taken, so the next call to
    /// [`TokenIdSequence::next`] mints a fresh one for `lemma`.
    pub fn forget(&mut self, lemma: &str) {
        self.cache.remove(lemma);
    }

    /// Previously assigned id, or `NO_TOKEN` if the lemma was never registered.
    pub fn recall(&self, lemma: &str) -> TokenId {
        self.cache.get(lemma).copied().unwrap_or(NO_TOKEN)
    }

    pub fn last_id(&self) -> TokenId {
        self.value
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
