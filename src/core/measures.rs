// File: src/core/measures.rs
//! Association measures over single and pair frequencies.

/// `14 + log2(2 * F(x,y) / (F(x) + F(y)))`
///
/// Returns `None` when the result would not be finite.
pub fn log_dice(pair_freq: u32, freq_x: u32, freq_y: u32) -> Option<f64> {
    let denom = f64::from(freq_x) + f64::from(freq_y);
    if pair_freq == 0 || denom == 0.0 {
        return None;
    }
    let value = 14.0 + (2.0 * f64::from(pair_freq) / denom).log2();
    value.is_finite().then_some(value)
}

/// `(F(x,y) - F(x) * F(y) / N) / sqrt(F(x,y))`
///
/// An unknown corpus size (`N = 0`) drops the expected-frequency term, which
/// leaves `sqrt(F(x,y))`.
pub fn t_score(pair_freq: u32, freq_x: u32, freq_y: u32, corpus_size: u64) -> Option<f64> {
    if pair_freq == 0 {
        return None;
    }
    let observed = f64::from(pair_freq);
    let expected = match corpus_size {
        0 => 0.0,
        n => f64::from(freq_x) * f64::from(freq_y) / n as f64,
    };
    let value = (observed - expected) / observed.sqrt();
    value.is_finite().then_some(value)
}
