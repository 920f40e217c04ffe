// File: src/storage/read.rs
use crate::core::codec::{
    decode_frequency, decode_lemma, decode_lemma_key, decode_pair_key, decode_token_id,
    decode_token_id_key, encode_id_to_lemma_key, encode_lemma_key, encode_pair_key,
    encode_pair_prefix, encode_single_token_key, ID_TO_LEMMA_PREFIX,
};
use crate::core::registry::TokenIdSequence;
use crate::core::types::{PairStats, TokenId, NO_TOKEN, TAG_SEPARATOR};
use crate::error::{Error, Result};
use crate::kv::{KvStore, ReadTxn};
use crate::storage::{FreqDb, SchemaVersion};

/// A stored lemma variant matched by a prefix query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LemmaMatch {
    pub value: String,
    pub token_id: TokenId,
}

pub(crate) fn lemma_id_txn(txn: &dyn ReadTxn, lemma: &str) -> Result<TokenId> {
    match txn.get(&encode_lemma_key(lemma))? {
        Some(raw) => decode_token_id(&raw),
        None => Err(Error::not_found(format!("lemma '{}'", lemma))),
    }
}

pub(crate) fn lemma_by_id_txn(txn: &dyn ReadTxn, token_id: TokenId) -> Result<String> {
    match txn.get(&encode_id_to_lemma_key(token_id))? {
        Some(raw) => Ok(decode_lemma(&raw)?.trim().to_string()),
        None => Err(Error::not_found(format!("lemma for token {}", token_id))),
    }
}

pub(crate) fn single_freq_txn(txn: &dyn ReadTxn, token_id: TokenId) -> Result<u32> {
    match txn.get(&encode_single_token_key(token_id))? {
        Some(raw) => decode_frequency(&raw),
        None => Err(Error::not_found(format!("frequency of token {}", token_id))),
    }
}

pub(crate) fn max_token_id_txn<T: ReadTxn + ?Sized>(txn: &T) -> Result<TokenId> {
    let mut max = NO_TOKEN;
    for (key, _) in txn.scan_prefix(&[ID_TO_LEMMA_PREFIX]) {
        let (_, id) = decode_token_id_key(&key)?;
        max = max.max(id);
    }
    Ok(max)
}

/// Pairs with `left` as their left member, in key order.
pub(crate) fn pairs_of_txn(
    txn: &dyn ReadTxn,
    schema: SchemaVersion,
    left: TokenId,
) -> Result<Vec<(TokenId, PairStats)>> {
    txn.scan_prefix(&encode_pair_prefix(left))
        .map(|(key, value)| -> Result<(TokenId, PairStats)> {
            let (_, right) = decode_pair_key(&key)?;
            Ok((right, schema.decode_pair_value(&value)?))
        })
        .collect()
}

/// The key prefix used to find all variants of `query`.
///
/// A bare lemma is extended with the tag separator so that `run` matches
/// `run_obj`, `run_nsubj`... but not `runway_obj`.
pub fn variant_scan_prefix(query: &str) -> String {
    if query.contains(TAG_SEPARATOR) {
        query.to_string()
    } else {
        format!("{}{}", query, TAG_SEPARATOR)
    }
}

impl<S: KvStore> FreqDb<S> {
    pub fn lemma_id(&self, lemma: &str) -> Result<TokenId> {
        self.store.view(|txn| lemma_id_txn(txn, lemma))
    }

    /// Legacy lookup returning `NO_TOKEN` instead of a not-found error.
    pub fn lemma_id_or_zero(&self, lemma: &str) -> Result<TokenId> {
        match self.lemma_id(lemma) {
            Err(Error::NotFound(_)) => Ok(NO_TOKEN),
            other => other,
        }
    }

    pub fn lemma_by_id(&self, token_id: TokenId) -> Result<String> {
        self.store.view(|txn| lemma_by_id_txn(txn, token_id))
    }

    pub fn single_freq(&self, token_id: TokenId) -> Result<u32> {
        self.store.view(|txn| single_freq_txn(txn, token_id))
    }

    pub fn pair_freq(&self, left: TokenId, right: TokenId) -> Result<PairStats> {
        self.store.view(|txn| match txn.get(&encode_pair_key(left, right))? {
            Some(raw) => self.schema.decode_pair_value(&raw),
            None => Err(Error::not_found(format!("pair ({}, {})", left, right))),
        })
    }

    pub fn pairs_of(&self, left: TokenId) -> Result<Vec<(TokenId, PairStats)>> {
        self.store.view(|txn| pairs_of_txn(txn, self.schema, left))
    }

    /// All stored lemma variants of `query`, in key order.
    pub fn lemma_ids_by_prefix(&self, query: &str) -> Result<Vec<LemmaMatch>> {
        let prefix = encode_lemma_key(&variant_scan_prefix(query));
        self.store.view(|txn| {
            txn.scan_prefix(&prefix)
                .map(|(key, value)| -> Result<LemmaMatch> {
                    Ok(LemmaMatch {
                        value: decode_lemma_key(&key)?.trim().to_string(),
                        token_id: decode_token_id(&value)?,
                    })
                })
                .collect()
        })
    }

    /// Highest token id present in the reverse index, `NO_TOKEN` for an empty store.
    pub fn max_token_id(&self) -> Result<TokenId> {
        self.store.view(|txn| max_token_id_txn(txn))
    }

    /// A fresh registry numbering after the ids already persisted.
    pub fn token_sequence(&self) -> Result<TokenIdSequence> {
        Ok(TokenIdSequence::starting_after(self.max_token_id()?))
    }
}

