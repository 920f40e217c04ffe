// File: src/core/codec.rs
//! Binary layout of the store.
//!
//! Every key starts with a one-byte type tag so entity kinds never collide.
//! Integers are fixed-width little-endian. Pair keys put the left id first so
//! a scan on `tag + left_id` yields exactly that token's pairs.

use crate::core::types::TokenId;
use crate::error::{Error, Result};

pub const LEMMA_TO_ID_PREFIX: u8 = 0x00; // "lemma" -> tokenID
pub const SINGLE_TOKEN_PREFIX: u8 = 0x01; // tokenID -> frequency
pub const PAIR_TOKEN_PREFIX: u8 = 0x02; // (tokenID1, tokenID2) -> frequency[, distance]
pub const ID_TO_LEMMA_PREFIX: u8 = 0x03; // tokenID -> "lemma"
pub const META_PREFIX: u8 = 0xFF; // store metadata

pub const DISTANCE_BIAS: i32 = 32768;
pub const MAX_ABS_DISTANCE: i32 = 16384;

const ID_WIDTH: usize = 4;
const FREQ_WIDTH: usize = 4;
const DIST_WIDTH: usize = 2;

pub fn encode_lemma_key(lemma: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + lemma.len());
    key.push(LEMMA_TO_ID_PREFIX);
    key.extend_from_slice(lemma.as_bytes());
    key
}

/// Inverse of [`encode_lemma_key`].
pub fn decode_lemma_key(key: &[u8]) -> Result<&str> {
    match key.split_first() {
        Some((&LEMMA_TO_ID_PREFIX, rest)) => decode_lemma(rest),
        _ => Err(Error::malformed("not a lemma key")),
    }
}

pub fn encode_token_id_key(prefix: u8, token_id: TokenId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + ID_WIDTH);
    key.push(prefix);
    key.extend_from_slice(&token_id.to_le_bytes());
    key
}

pub fn encode_single_token_key(token_id: TokenId) -> Vec<u8> {
    encode_token_id_key(SINGLE_TOKEN_PREFIX, token_id)
}

pub fn encode_id_to_lemma_key(token_id: TokenId) -> Vec<u8> {
    encode_token_id_key(ID_TO_LEMMA_PREFIX, token_id)
}

/// Returns `(prefix, token_id)` of a key built by [`encode_token_id_key`].
pub fn decode_token_id_key(key: &[u8]) -> Result<(u8, TokenId)> {
    if key.len() != 1 + ID_WIDTH {
        return Err(Error::malformed(format!("invalid token key length: {}", key.len())));
    }
    Ok((key[0], read_u32(&key[1..])))
}

pub fn encode_pair_key(left: TokenId, right: TokenId) -> Vec<u8> {
    let mut key = encode_pair_prefix(left);
    key.extend_from_slice(&right.to_le_bytes());
    key
}

/// Scan prefix for all pairs whose left member is `left`.
pub fn encode_pair_prefix(left: TokenId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 2 * ID_WIDTH);
    key.push(PAIR_TOKEN_PREFIX);
    key.extend_from_slice(&left.to_le_bytes());
    key
}

pub fn decode_pair_key(key: &[u8]) -> Result<(TokenId, TokenId)> {
    if key.len() != 1 + 2 * ID_WIDTH || key[0] != PAIR_TOKEN_PREFIX {
        return Err(Error::malformed(format!("invalid pair key length: {}", key.len())));
    }
    Ok((read_u32(&key[1..5]), read_u32(&key[5..9])))
}

pub fn encode_meta_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + name.len());
    key.push(META_PREFIX);
    key.extend_from_slice(name.as_bytes());
    key
}

pub fn encode_token_id(token_id: TokenId) -> Vec<u8> {
    token_id.to_le_bytes().to_vec()
}

pub fn decode_token_id(data: &[u8]) -> Result<TokenId> {
    if data.len() != ID_WIDTH {
        return Err(Error::malformed(format!("invalid token id data length: {}", data.len())));
    }
    Ok(read_u32(data))
}

pub fn encode_frequency(freq: u32) -> Vec<u8> {
    freq.to_le_bytes().to_vec()
}

pub fn decode_frequency(data: &[u8]) -> Result<u32> {
    if data.len() != FREQ_WIDTH {
        return Err(Error::malformed(format!("invalid frequency data length: {}", data.len())));
    }
    Ok(read_u32(data))
}

pub fn encode_frequency_and_dist(freq: u32, dist: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FREQ_WIDTH + DIST_WIDTH);
    buf.extend_from_slice(&freq.to_le_bytes());
    buf.extend_from_slice(&dist.to_le_bytes());
    buf
}

pub fn decode_frequency_and_dist(data: &[u8]) -> Result<(u32, u16)> {
    if data.len() != FREQ_WIDTH + DIST_WIDTH {
        return Err(Error::malformed(format!(
            "invalid frequency+distance data length: {}",
            data.len()
        )));
    }
    Ok((read_u32(&data[..4]), u16::from_le_bytes([data[4], data[5]])))
}

/// Maps a signed distance in `[-16384, 16384]` onto the biased unsigned range.
pub fn encode_distance(dist: i32) -> Result<u16> {
    if !(-MAX_ABS_DISTANCE..=MAX_ABS_DISTANCE).contains(&dist) {
        return Err(Error::precondition(format!(
            "cannot encode distance {} - outside [-{}, {}]",
            dist, MAX_ABS_DISTANCE, MAX_ABS_DISTANCE
        )));
    }
    Ok((DISTANCE_BIAS + dist) as u16)
}

pub fn decode_distance(v: u16) -> i32 {
    i32::from(v) - DISTANCE_BIAS
}

pub fn decode_lemma(data: &[u8]) -> Result<&str> {
    std::str::from_utf8(data).map_err(|e| Error::malformed(format!("lemma is not UTF-8: {}", e)))
}

fn read_u32(data: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[..4]);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_tagged_and_little_endian() {
        assert_eq!(encode_lemma_key("dům"), [&[0x00][..], "dům".as_bytes()].concat());
        assert_eq!(encode_single_token_key(1), vec![0x01, 1, 0, 0, 0]);
        assert_eq!(encode_id_to_lemma_key(0x0102_0304), vec![0x03, 4, 3, 2, 1]);
        assert_eq!(encode_pair_key(1, 2), vec![0x02, 1, 0, 0, 0, 2, 0, 0, 0]);
        assert!(encode_pair_key(7, 99).starts_with(&encode_pair_prefix(7)));
    }

    #[test]
    fn keys_decode_back() {
        assert_eq!(decode_lemma_key(&encode_lemma_key("run_obj")).unwrap(), "run_obj");
        assert_eq!(
            decode_token_id_key(&encode_single_token_key(u32::MAX)).unwrap(),
            (SINGLE_TOKEN_PREFIX, u32::MAX)
        );
        assert_eq!(decode_pair_key(&encode_pair_key(5, 6)).unwrap(), (5, 6));
    }

    #[test]
    fn entity_kinds_never_share_keys() {
        // Same numeric payload, different tags.
        let single = encode_single_token_key(1);
        let reverse = encode_id_to_lemma_key(1);
        assert_ne!(single, reverse);
        // A lemma whose bytes look like an id still lives under its own tag.
        let lemma = encode_lemma_key("\u{1}\u{0}\u{0}\u{0}");
        assert_eq!(lemma[0], LEMMA_TO_ID_PREFIX);
        assert_eq!(&lemma[1..], &single[1..]);
        assert_ne!(lemma, single);
    }

    #[test]
    fn values_round_trip() {
        assert_eq!(decode_frequency(&encode_frequency(123_456)).unwrap(), 123_456);
        assert_eq!(decode_token_id(&encode_token_id(9)).unwrap(), 9);
        let v = encode_frequency_and_dist(10, encode_distance(-3).unwrap());
        let (freq, dist) = decode_frequency_and_dist(&v).unwrap();
        assert_eq!((freq, decode_distance(dist)), (10, -3));
    }

    #[test]
    fn distance_bounds() {
        assert_eq!(decode_distance(encode_distance(16384).unwrap()), 16384);
        assert_eq!(decode_distance(encode_distance(-16384).unwrap()), -16384);
        assert_eq!(encode_distance(0).unwrap(), 32768);
        assert!(encode_distance(16385).unwrap_err().is_fatal());
        assert!(encode_distance(-16385).unwrap_err().is_fatal());
    }

    #[test]
    fn wrong_widths_are_malformed() {
        assert!(matches!(decode_frequency(&[1, 2, 3]), Err(Error::Malformed(_))));
        assert!(matches!(decode_frequency_and_dist(&[0; 4]), Err(Error::Malformed(_))));
        assert!(matches!(decode_pair_key(&[0x02, 0, 0]), Err(Error::Malformed(_))));
        assert!(matches!(decode_lemma(&[0xff, 0xfe]), Err(Error::Malformed(_))));
    }
}
