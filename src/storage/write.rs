// File: src/storage/write.rs
use crate::core::codec::{
    decode_frequency, decode_lemma, decode_token_id, encode_frequency, encode_id_to_lemma_key,
    encode_lemma_key, encode_pair_key, encode_single_token_key, encode_token_id,
};
use crate::core::registry::TokenIdSequence;
use crate::core::types::{PairStats, TokenId, NO_TOKEN};
use crate::error::{Error, Result};
use crate::kv::{KvStore, WriteTxn};
use crate::storage::read::max_token_id_txn;
use crate::storage::FreqDb;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// What a bulk load wrote and what it left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub lemmas: usize,
    pub pairs_stored: usize,
    pub pairs_below_threshold: usize,
    /// Pairs naming a lemma that has no single frequency.
    pub pairs_skipped: usize,
}

/// Forward and reverse mapping are written together so neither exists alone.
pub(crate) fn store_lemma_txn(txn: &mut dyn WriteTxn, lemma: &str, token_id: TokenId) -> Result<()> {
    txn.set(&encode_lemma_key(lemma), &encode_token_id(token_id))?;
    txn.set(&encode_id_to_lemma_key(token_id), lemma.as_bytes())
}

impl<S: KvStore> FreqDb<S> {
    /// Maps `lemma` to `token_id` in both directions. Rewriting an identical
    /// mapping is allowed; remapping either side to something else is not.
    pub fn store_lemma(&self, lemma: &str, token_id: TokenId) -> Result<()> {
        if token_id == NO_TOKEN {
            return Err(Error::precondition("token id 0 is reserved"));
        }
        self.store.update(|txn| {
            if let Some(raw) = txn.get(&encode_lemma_key(lemma))? {
                let existing = decode_token_id(&raw)?;
                if existing != token_id {
                    return Err(Error::precondition(format!(
                        "lemma '{}' is already mapped to token {}",
                        lemma, existing
                    )));
                }
            }
            if let Some(raw) = txn.get(&encode_id_to_lemma_key(token_id))? {
                let existing = decode_lemma(&raw)?;
                if existing != lemma {
                    return Err(Error::precondition(format!(
                        "token {} is already mapped to '{}'",
                        token_id, existing
                    )));
                }
            }
            store_lemma_txn(txn, lemma, token_id)
        })
    }

    pub fn store_single_freq(&self, token_id: TokenId, frequency: u32) -> Result<()> {
        self.store.update(|txn| {
            txn.set(&encode_single_token_key(token_id), &encode_frequency(frequency))
        })
    }

    pub fn store_pair_freq(&self, left: TokenId, right: TokenId, stats: PairStats) -> Result<()> {
        let value = self.schema.encode_pair_value(stats)?;
        self.store.update(|txn| txn.set(&encode_pair_key(left, right), &value))
    }

    /// Returns the persisted id of `lemma`, registering it with `tid_seq`
    /// (and persisting both mappings) when the store does not know it yet.
    pub fn register_lemma(&self, tid_seq: &mut TokenIdSequence, lemma: &str) -> Result<TokenId> {
        self.store.update(|txn| {
            if let Some(raw) = txn.get(&encode_lemma_key(lemma))? {
                let id = decode_token_id(&raw)?;
                tid_seq.adopt(lemma, id);
                return Ok(id);
            }
            let mut id = tid_seq.next(lemma)?;
            if txn.get(&encode_id_to_lemma_key(id))?.is_some() {
                // The sequence lags behind the store; continue after its highest id.
                tid_seq.forget(lemma);
                tid_seq.advance_past(max_token_id_txn(&*txn)?);
                id = tid_seq.next(lemma)?;
                debug!(lemma, id, "minted id was taken, renumbered");
            }
            store_lemma_txn(txn, lemma, id)?;
            Ok(id)
        })
    }

    /// Bulk load with overwrite semantics.
    ///
    /// Lemmas the store already knows keep their ids; new ones are numbered
    /// after the highest persisted id, whatever state `tid_seq` starts in.
    ///
    /// Every lemma of `single_freqs` gets an id and its frequency; every pair at
    /// or above `min_pair_freq` whose members are both known is stored. Each
    /// entry is its own transaction, so a failure leaves earlier entries in place.
    pub fn store_data(
        &self,
        tid_seq: &mut TokenIdSequence,
        single_freqs: &HashMap<String, u32>,
        pair_freqs: &HashMap<(String, String), PairStats>,
        min_pair_freq: u32,
    ) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();
        tid_seq.advance_past(self.max_token_id()?);

        let mut lemmas: Vec<&String> = single_freqs.keys().collect();
        lemmas.sort();
        for lemma in &lemmas {
            self.register_lemma(tid_seq, lemma)?;
        }
        summary.lemmas = lemmas.len();
        info!(lemmas = summary.lemmas, "stored lemma mappings");

        for lemma in &lemmas {
            self.store_single_freq(tid_seq.recall(lemma), single_freqs[*lemma])?;
        }

        let mut pairs: Vec<(&(String, String), &PairStats)> = pair_freqs.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        for ((left, right), stats) in pairs {
            if stats.frequency < min_pair_freq {
                summary.pairs_below_threshold += 1;
                continue;
            }
            let (left_id, right_id) = (tid_seq.recall(left), tid_seq.recall(right));
            if left_id == NO_TOKEN || right_id == NO_TOKEN {
                warn!(%left, %right, "pair member has no single frequency, skipping");
                summary.pairs_skipped += 1;
                continue;
            }
            self.store_pair_freq(left_id, right_id, *stats)?;
            summary.pairs_stored += 1;
        }
        info!(
            stored = summary.pairs_stored,
            below_threshold = summary.pairs_below_threshold,
            skipped = summary.pairs_skipped,
            "stored pair frequencies"
        );
        Ok(summary)
    }

    /// Adds `increment` to a token's counter in one read-modify-write
    /// transaction and returns the new value. A missing counter counts as zero.
    pub fn increment_single(&self, token_id: TokenId, increment: u32) -> Result<u32> {
        let key = encode_single_token_key(token_id);
        let updated = self.store.update(|txn| {
            let current = match txn.get(&key)? {
                Some(raw) => decode_frequency(&raw)?,
                None => 0,
            };
            let updated = checked_sum(current, increment)?;
            txn.set(&key, &encode_frequency(updated))?;
            Ok(updated)
        })?;
        debug!(token_id, updated, "incremented single frequency");
        Ok(updated)
    }

    /// Pair counterpart of [`FreqDb::increment_single`]. A stored distance is kept.
    pub fn increment_pair(&self, left: TokenId, right: TokenId, increment: u32) -> Result<u32> {
        let key = encode_pair_key(left, right);
        let schema = self.schema;
        let updated = self.store.update(|txn| {
            let current = match txn.get(&key)? {
                Some(raw) => schema.decode_pair_value(&raw)?,
                None => PairStats::default(),
            };
            let next = PairStats {
                frequency: checked_sum(current.frequency, increment)?,
                ..current
            };
            txn.set(&key, &schema.encode_pair_value(next)?)?;
            Ok(next.frequency)
        })?;
        debug!(left, right, updated, "incremented pair frequency");
        Ok(updated)
    }
}

fn checked_sum(current: u32, increment: u32) -> Result<u32> {
    current.checked_add(increment).ok_or_else(|| {
        Error::precondition(format!("counter overflow: {} + {}", current, increment))
    })
}
