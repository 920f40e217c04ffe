// File: src/ingest.rs
//! Tab-separated frequency tables fed into a bulk load.
//!
//! Singles: `lemma<TAB>freq`. Pairs: `lemma1<TAB>lemma2<TAB>freq[<TAB>distance]`.
//! Blank lines and lines starting with `#` are ignored. A lemma or pair that
//! appears twice is rejected.

use crate::core::types::PairStats;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

pub fn read_single_freqs<R: BufRead>(reader: R) -> Result<HashMap<String, u32>> {
    let mut freqs: HashMap<String, u32> = HashMap::new();
    for_each_record(reader, |line_no, fields| {
        let [lemma, freq] = fields[..] else {
            return Err(bad_line(line_no, "expected 2 columns"));
        };
        let freq = parse_field(line_no, freq)?;
        if freqs.insert(lemma.to_string(), freq).is_some() {
            return Err(bad_line(line_no, &format!("duplicate lemma '{}'", lemma)));
        }
        Ok(())
    })?;
    Ok(freqs)
}

pub fn read_pair_freqs<R: BufRead>(reader: R) -> Result<HashMap<(String, String), PairStats>> {
    let mut freqs: HashMap<(String, String), PairStats> = HashMap::new();
    for_each_record(reader, |line_no, fields| {
        let stats = match fields[..] {
            [_, _, freq] => PairStats::new(parse_field(line_no, freq)?),
            [_, _, freq, dist] => {
                PairStats::with_distance(parse_field(line_no, freq)?, parse_field(line_no, dist)?)
            }
            _ => return Err(bad_line(line_no, "expected 3 or 4 columns")),
        };
        let key = (fields[0].to_string(), fields[1].to_string());
        if freqs.insert(key, stats).is_some() {
            return Err(bad_line(
                line_no,
                &format!("duplicate pair '{}' '{}'", fields[0], fields[1]),
            ));
        }
        Ok(())
    })?;
    Ok(freqs)
}

pub fn read_single_freqs_file(path: &Path) -> Result<HashMap<String, u32>> {
    read_single_freqs(BufReader::new(File::open(path)?))
}

pub fn read_pair_freqs_file(path: &Path) -> Result<HashMap<(String, String), PairStats>> {
    read_pair_freqs(BufReader::new(File::open(path)?))
}

fn for_each_record<R, F>(reader: R, mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(usize, Vec<&str>) -> Result<()>,
{
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }
        f(idx + 1, trimmed.split('\t').collect())?;
    }
    Ok(())
}

fn parse_field<T: FromStr>(line_no: usize, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| bad_line(line_no, &format!("invalid number '{}'", raw)))
}

fn bad_line(line_no: usize, msg: &str) -> Error {
    Error::malformed(format!("line {}: {}", line_no, msg))
}
