// File: src/core/engine.rs
use crate::core::codec::{decode_pair_key, encode_pair_prefix};
use crate::core::measures::{log_dice, t_score};
use crate::core::types::{Collocation, SortingMeasure};
use crate::error::{Error, Result};
use crate::kv::{KvStore, ReadTxn};
use crate::storage::read::{lemma_by_id_txn, single_freq_txn};
use crate::storage::{FreqDb, LemmaMatch};
use tracing::{debug, trace};

/// A validated collocation query.
#[derive(Debug, Clone, PartialEq)]
pub struct CollocationQuery {
    pub lemma: String,
    pub corpus_size: u64,
    pub limit: usize,
    pub sort_by: SortingMeasure,
}

impl CollocationQuery {
    pub fn new(lemma: impl Into<String>, corpus_size: u64, limit: usize, sort_by: SortingMeasure) -> Self {
        Self { lemma: lemma.into(), corpus_size, limit, sort_by }
    }

    /// Builds a query from unchecked caller input.
    pub fn from_raw(lemma: &str, corpus_size: i64, limit: i64, sort_by: &str) -> Result<Self> {
        if limit < 0 {
            return Err(Error::precondition(format!("invalid limit value {}", limit)));
        }
        if corpus_size < 0 {
            return Err(Error::precondition(format!("invalid corpus size {}", corpus_size)));
        }
        let sort_by = sort_by.parse()?;
        Ok(Self::new(lemma, corpus_size as u64, limit as usize, sort_by))
    }
}

/// Joins single and pair frequencies of a lemma and ranks its collocates.
pub struct CollocationEngine<'a, S: KvStore> {
    db: &'a FreqDb<S>,
}

impl<'a, S: KvStore> CollocationEngine<'a, S> {
    pub fn new(db: &'a FreqDb<S>) -> Self {
        Self { db }
    }

    pub fn calculate_measures(&self, query: &CollocationQuery) -> Result<Vec<Collocation>> {
        let variants = self.db.lemma_ids_by_prefix(&query.lemma)?;
        if variants.is_empty() {
            return Err(Error::not_found(format!("no lemma matching '{}'", query.lemma)));
        }

        let mut results = Vec::new();
        for variant in &variants {
            let target_freq = self.db.single_freq(variant.token_id)?;
            let found = self
                .db
                .store()
                .view(|txn| self.collocates_of(txn, variant, target_freq, query.corpus_size))?;
            debug!(lemma = %variant.value, found = found.len(), "scanned pairs");
            results.extend(found);
        }

        sort_results(&mut results, query.sort_by);
        results.truncate(query.limit);
        Ok(results)
    }

    /// Scans all pairs with `variant` on the left. Pairs whose partner has no
    /// frequency or no reverse mapping are skipped, as are pairs whose
    /// measures would not be finite.
    fn collocates_of(
        &self,
        txn: &dyn ReadTxn,
        variant: &LemmaMatch,
        target_freq: u32,
        corpus_size: u64,
    ) -> Result<Vec<Collocation>> {
        let schema = self.db.schema();
        let mut found = Vec::new();

        for (key, value) in txn.scan_prefix(&encode_pair_prefix(variant.token_id)) {
            let (_, right_id) = decode_pair_key(&key)?;
            let pair = schema.decode_pair_value(&value)?;

            let second_freq = match single_freq_txn(txn, right_id) {
                Ok(f) => f,
                Err(Error::NotFound(_)) => {
                    trace!(right_id, "no frequency for collocate, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let second_lemma = match lemma_by_id_txn(txn, right_id) {
                Ok(l) => l,
                Err(Error::NotFound(_)) => {
                    trace!(right_id, "no lemma for collocate, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let scores = log_dice(pair.frequency, target_freq, second_freq)
                .zip(t_score(pair.frequency, target_freq, second_freq, corpus_size));
            let Some((ld, ts)) = scores else {
                debug!(right_id, freq = pair.frequency, "non-finite measure, skipping");
                continue;
            };

            found.push(Collocation {
                raw_lemma: variant.value.clone(),
                raw_collocate: second_lemma,
                log_dice: ld,
                t_score: ts,
                mutual_dist: pair.distance,
            });
        }
        Ok(found)
    }
}

/// Descending by `measure`; ties by collocate then lemma text.
pub fn sort_results(results: &mut [Collocation], measure: SortingMeasure) {
    let score = |c: &Collocation| match measure {
        SortingMeasure::LDice => c.log_dice,
        SortingMeasure::TScore => c.t_score,
    };
    results.sort_by(|a, b| {
        score(b)
            .total_cmp(&score(a))
            .then_with(|| a.raw_collocate.cmp(&b.raw_collocate))
            .then_with(|| a.raw_lemma.cmp(&b.raw_lemma))
    });
}

impl<S: KvStore> FreqDb<S> {
    /// Shorthand for running a [`CollocationEngine`] over this store.
    pub fn calculate_measures(
        &self,
        lemma: &str,
        corpus_size: u64,
        limit: usize,
        sort_by: SortingMeasure,
    ) -> Result<Vec<Collocation>> {
        CollocationEngine::new(self)
            .calculate_measures(&CollocationQuery::new(lemma, corpus_size, limit, sort_by))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::TokenIdSequence;
    use crate::core::types::PairStats;
    use crate::kv::MemoryStore;
    use crate::storage::SchemaVersion;
    use std::collections::HashMap;

    fn load(
        singles: &[(&str, u32)],
        pairs: &[(&str, &str, u32)],
        schema: SchemaVersion,
    ) -> FreqDb<MemoryStore> {
        let db = FreqDb::open(MemoryStore::new(), schema).unwrap();
        let singles: HashMap<String, u32> =
            singles.iter().map(|(l, f)| (l.to_string(), *f)).collect();
        let pairs: HashMap<(String, String), PairStats> = pairs
            .iter()
            .map(|(a, b, f)| ((a.to_string(), b.to_string()), PairStats::with_distance(*f, 2)))
            .collect();
        db.store_data(&mut TokenIdSequence::new(), &singles, &pairs, 1)
            .unwrap();
        db
    }

    #[test]
    fn reference_measures() {
        let db = load(
            &[("run_obj", 100), ("fast_advmod", 50)],
            &[("run_obj", "fast_advmod", 10)],
            SchemaVersion::V1,
        );
        let res = db
            .calculate_measures("run", 1_000_000, 10, SortingMeasure::LDice)
            .unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].raw_lemma, "run_obj");
        assert_eq!(res[0].raw_collocate, "fast_advmod");
        assert!((res[0].log_dice - 11.09).abs() < 0.01);
        assert!((res[0].t_score - 3.16).abs() < 0.01);
        assert_eq!(res[0].mutual_dist, 0);
    }

    #[test]
    fn ranks_and_caps() {
        let db = load(
            &[("x_obj", 100), ("a_n", 10), ("b_n", 20), ("c_n", 40), ("d_n", 80), ("e_n", 160)],
            &[
                ("x_obj", "a_n", 5),
                ("x_obj", "b_n", 5),
                ("x_obj", "c_n", 5),
                ("x_obj", "d_n", 5),
                ("x_obj", "e_n", 5),
            ],
            SchemaVersion::V1,
        );
        let res = db
            .calculate_measures("x", 1_000, 3, SortingMeasure::LDice)
            .unwrap();
        let names: Vec<&str> = res.iter().map(|c| c.raw_collocate.as_str()).collect();
        // Equal pair counts: the rarer the partner, the higher the log-Dice.
        assert_eq!(names, vec!["a_n", "b_n", "c_n"]);
        assert!(res.windows(2).all(|w| w[0].log_dice > w[1].log_dice));

        let all = db
            .calculate_measures("x", 1_000, 100, SortingMeasure::TScore)
            .unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].t_score >= w[1].t_score));
    }

    #[test]
    fn joins_all_tag_variants() {
        let db = load(
            &[("run_obj", 10), ("run_nsubj", 10), ("runway_obj", 10), ("fast_advmod", 10)],
            &[
                ("run_obj", "fast_advmod", 3),
                ("run_nsubj", "fast_advmod", 2),
                ("runway_obj", "fast_advmod", 4),
            ],
            SchemaVersion::V1,
        );
        let res = db.calculate_measures("run", 100, 10, SortingMeasure::LDice).unwrap();
        let mut lemmas: Vec<&str> = res.iter().map(|c| c.raw_lemma.as_str()).collect();
        lemmas.sort();
        assert_eq!(lemmas, vec!["run_nsubj", "run_obj"]);

        let exact = db.calculate_measures("run_obj", 100, 10, SortingMeasure::LDice).unwrap();
        assert_eq!(exact.len(), 1);
    }

    #[test]
    fn missing_partner_is_skipped() {
        let db = load(
            &[("run_obj", 10), ("fast_advmod", 10)],
            &[("run_obj", "fast_advmod", 3)],
            SchemaVersion::V1,
        );
        let run = db.lemma_id("run_obj").unwrap();
        // A pair pointing at an id with neither frequency nor lemma.
        db.store_pair_freq(run, 999, PairStats::new(4)).unwrap();
        // And one whose partner has a lemma but no frequency.
        db.store_lemma("slow_advmod", 500).unwrap();
        db.store_pair_freq(run, 500, PairStats::new(4)).unwrap();

        let res = db.calculate_measures("run", 100, 10, SortingMeasure::LDice).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].raw_collocate, "fast_advmod");
    }

    #[test]
    fn zero_pair_frequency_is_not_ranked() {
        let db = load(&[("run_obj", 10), ("fast_advmod", 10)], &[], SchemaVersion::V1);
        let (run, fast) = (db.lemma_id("run_obj").unwrap(), db.lemma_id("fast_advmod").unwrap());
        db.store_pair_freq(run, fast, PairStats::new(0)).unwrap();
        let res = db.calculate_measures("run", 100, 10, SortingMeasure::TScore).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn zero_corpus_size_still_ranks() {
        let db = load(
            &[("run_obj", 100), ("fast_advmod", 50)],
            &[("run_obj", "fast_advmod", 10)],
            SchemaVersion::V1,
        );
        let res = db.calculate_measures("run", 0, 10, SortingMeasure::LDice).unwrap();
        assert_eq!(res.len(), 1);
        assert!((res[0].log_dice - 11.09).abs() < 0.01);
        assert!((res[0].t_score - 10f64.sqrt()).abs() < 1e-9);

        let q = CollocationQuery::from_raw("run", 0, 10, "tscore").unwrap();
        assert_eq!(CollocationEngine::new(&db).calculate_measures(&q).unwrap().len(), 1);
    }

    #[test]
    fn distance_is_reported_under_v2() {
        let db = load(
            &[("run_obj", 10), ("fast_advmod", 10)],
            &[("run_obj", "fast_advmod", 3)],
            SchemaVersion::V2,
        );
        let res = db.calculate_measures("run", 100, 10, SortingMeasure::LDice).unwrap();
        assert_eq!(res[0].mutual_dist, 2);
    }

    #[test]
    fn unknown_lemma_is_not_found() {
        let db = load(&[("run_obj", 10)], &[], SchemaVersion::V1);
        let err = db.calculate_measures("walk", 100, 10, SortingMeasure::LDice).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn raw_query_validation() {
        assert!(CollocationQuery::from_raw("run", 10, -1, "ldice").unwrap_err().is_fatal());
        assert!(CollocationQuery::from_raw("run", -10, 1, "ldice").unwrap_err().is_fatal());
        assert!(CollocationQuery::from_raw("run", 10, 1, "pmi").unwrap_err().is_fatal());
        let q = CollocationQuery::from_raw("run", 10, 0, "tscore").unwrap();
        assert_eq!(q.limit, 0);
        assert_eq!(q.sort_by, SortingMeasure::TScore);
    }

    #[test]
    fn ties_are_deterministic() {
        let mk = |coll: &str| Collocation {
            raw_lemma: "x_obj".into(),
            raw_collocate: coll.into(),
            log_dice: 5.0,
            t_score: 1.0,
            mutual_dist: 0,
        };
        let mut results = vec![mk("c_n"), mk("a_n"), mk("b_n")];
        sort_results(&mut results, SortingMeasure::LDice);
        let names: Vec<&str> = results.iter().map(|c| c.raw_collocate.as_str()).collect();
        assert_eq!(names, vec!["a_n", "b_n", "c_n"]);
    }
}
