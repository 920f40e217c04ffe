// File: src/storage/schema.rs
use crate::core::codec::{
    decode_distance, decode_frequency, decode_frequency_and_dist, encode_distance,
    encode_frequency, encode_frequency_and_dist, encode_meta_key,
};
use crate::core::types::PairStats;
use crate::error::{Error, Result};
use crate::kv::KvStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

const SCHEMA_KEY: &str = "schema";

/// On-disk format of pair values. One store uses exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// 4-byte frequency.
    #[default]
    V1,
    /// 4-byte frequency followed by a 2-byte biased mutual distance.
    V2,
}

impl SchemaVersion {
    pub fn as_byte(self) -> u8 {
        match self {
            SchemaVersion::V1 => 1,
            SchemaVersion::V2 => 2,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            1 => Ok(SchemaVersion::V1),
            2 => Ok(SchemaVersion::V2),
            other => Err(Error::malformed(format!("unknown schema version {}", other))),
        }
    }

    pub fn tracks_distance(self) -> bool {
        self == SchemaVersion::V2
    }

    pub fn encode_pair_value(self, stats: PairStats) -> Result<Vec<u8>> {
        match self {
            SchemaVersion::V1 => Ok(encode_frequency(stats.frequency)),
            SchemaVersion::V2 => Ok(encode_frequency_and_dist(
                stats.frequency,
                encode_distance(stats.distance)?,
            )),
        }
    }

    pub fn decode_pair_value(self, data: &[u8]) -> Result<PairStats> {
        match self {
            SchemaVersion::V1 => Ok(PairStats::new(decode_frequency(data)?)),
            SchemaVersion::V2 => {
                let (frequency, dist) = decode_frequency_and_dist(data)?;
                Ok(PairStats::with_distance(frequency, decode_distance(dist)))
            }
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "v1" | "1" => Ok(SchemaVersion::V1),
            "v2" | "2" => Ok(SchemaVersion::V2),
            other => Err(Error::precondition(format!("unknown schema '{}'", other))),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_byte())
    }
}

/// Reads the schema marker, writing `requested` into a store that has none.
/// A store that already carries a different version is rejected.
pub fn ensure_schema<S: KvStore>(store: &S, requested: SchemaVersion) -> Result<SchemaVersion> {
    let key = encode_meta_key(SCHEMA_KEY);
    store.update(|txn| match txn.get(&key)? {
        Some(raw) => {
            let stored = match raw.as_slice() {
                [b] => SchemaVersion::from_byte(*b)?,
                _ => return Err(Error::malformed("invalid schema marker length")),
            };
            if stored != requested {
                return Err(Error::precondition(format!(
                    "store uses schema {:?}, requested {:?}",
                    stored, requested
                )));
            }
            Ok(stored)
        }
        None => {
            info!(schema = ?requested, "writing schema marker");
            txn.set(&key, &[requested.as_byte()])?;
            Ok(requested)
        }
    })
}

/// Reads the schema marker without writing one.
pub fn stored_schema<S: KvStore>(store: &S) -> Result<Option<SchemaVersion>> {
    let key = encode_meta_key(SCHEMA_KEY);
    store.view(|txn| match txn.get(&key)? {
        Some(raw) if raw.len() == 1 => SchemaVersion::from_byte(raw[0]).map(Some),
        Some(_) => Err(Error::malformed("invalid schema marker length")),
        None => Ok(None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[test]
    fn marker_is_written_once_and_checked() {
        let store = MemoryStore::new();
        assert_eq!(stored_schema(&store).unwrap(), None);
        assert_eq!(ensure_schema(&store, SchemaVersion::V2).unwrap(), SchemaVersion::V2);
        assert_eq!(stored_schema(&store).unwrap(), Some(SchemaVersion::V2));
        assert_eq!(ensure_schema(&store, SchemaVersion::V2).unwrap(), SchemaVersion::V2);
        assert!(ensure_schema(&store, SchemaVersion::V1).unwrap_err().is_fatal());
    }

    #[test]
    fn pair_values_follow_the_schema() {
        let stats = PairStats::with_distance(7, -2);
        let v1 = SchemaVersion::V1.encode_pair_value(stats).unwrap();
        assert_eq!(v1.len(), 4);
        assert_eq!(SchemaVersion::V1.decode_pair_value(&v1).unwrap(), PairStats::new(7));

        let v2 = SchemaVersion::V2.encode_pair_value(stats).unwrap();
        assert_eq!(v2.len(), 6);
        assert_eq!(SchemaVersion::V2.decode_pair_value(&v2).unwrap(), stats);

        // Reading one format with the other is a schema mismatch.
        assert!(matches!(SchemaVersion::V2.decode_pair_value(&v1), Err(Error::Malformed(_))));
        assert!(matches!(SchemaVersion::V1.decode_pair_value(&v2), Err(Error::Malformed(_))));
    }

    #[test]
    fn parses_names() {
        assert_eq!("v2".parse::<SchemaVersion>().unwrap(), SchemaVersion::V2);
        assert_eq!("1".parse::<SchemaVersion>().unwrap(), SchemaVersion::V1);
        assert_eq!(SchemaVersion::V2.to_string(), "v2");
        assert!("v3".parse::<SchemaVersion>().unwrap_err().is_fatal());
    }

    #[test]
    fn v2_rejects_out_of_range_distance() {
        let err = SchemaVersion::V2
            .encode_pair_value(PairStats::with_distance(1, 20_000))
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
