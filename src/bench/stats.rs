//! Outlier-filtered summary statistics for timing samples
//!
//! Scheduling jitter only ever makes an iteration slower, so the filter is a
//! Tukey fence over the inter-quartile range applied as a single contiguous
//! run of the sorted samples:
//!
//! 1. sort ascending
//! 2. `Q1 = s[n/4]`, `Q3 = s[3n/4]` (integer division, no interpolation)
//! 3. fences at `Q1 - 1.5 IQR` and `Q3 + 1.5 IQR`
//! 4. the valid run starts at the first sample at or above the low fence and
//!    extends while samples stay at or below the high fence
//!
//! Results are comparable only with other results produced by exactly this
//! procedure, so the index formulas and the contiguous-run rule are fixed.

use serde::{Deserialize, Serialize};

use crate::core::error::{HarnessError, HarnessResult};

/// Tukey fence multiplier
const FENCE: f64 = 1.5;

/// Summary of one session's samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsResult {
    /// Samples kept after outlier filtering
    pub iterations: usize,
    /// Fastest kept sample (seconds)
    pub min: f64,
    /// Median of the kept samples (seconds)
    pub median: f64,
    /// Standard deviation divided by the mean
    pub std_dev: f64,
}

/// Sort `samples` in place and summarize them.
///
/// Fails with [`HarnessError::InvalidInput`] for an empty set, for negative
/// or non-finite samples, and when the mean of the kept samples is zero.
pub fn summarize(samples: &mut [f64]) -> HarnessResult<StatsResult> {
    if samples.is_empty() {
        return Err(HarnessError::InvalidInput("no samples to summarize".into()));
    }
    if let Some(bad) = samples.iter().find(|s| !s.is_finite() || **s < 0.0) {
        return Err(HarnessError::InvalidInput(format!(
            "sample {} is not a non-negative finite duration",
            bad
        )));
    }

    samples.sort_by(f64::total_cmp);

    let n = samples.len();
    let q1 = samples[n / 4];
    let q3 = samples[3 * n / 4];
    let iqr = q3 - q1;
    let lower = q1 - FENCE * iqr;
    let upper = q3 + FENCE * iqr;

    // The low fence never exceeds Q1, so the run always starts at or before n/4.
    let min_valid = samples.iter().position(|&s| s >= lower).unwrap_or(n);
    let num_valid = samples[min_valid..]
        .iter()
        .take_while(|&&s| s <= upper)
        .count();

    if num_valid == 0 {
        return Err(HarnessError::InvalidInput(
            "no samples survived outlier filtering".into(),
        ));
    }

    let valid = &samples[min_valid..min_valid + num_valid];
    let mean = valid.iter().sum::<f64>() / num_valid as f64;
    if mean == 0.0 {
        return Err(HarnessError::InvalidInput(
            "mean duration is zero; the clock is too coarse for this operation".into(),
        ));
    }

    let variance = valid.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / num_valid as f64;

    Ok(StatsResult {
        iterations: num_valid,
        min: valid[0],
        median: samples[min_valid + num_valid / 2],
        std_dev: variance.sqrt() / mean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples() {
        let mut samples = vec![1.0; 8];
        let stats = summarize(&mut samples).unwrap();
        assert_eq!(stats.iterations, 8);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.median, 1.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_trailing_outlier_excluded() {
        let mut samples = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 100.0];
        let stats = summarize(&mut samples).unwrap();
        assert_eq!(stats.iterations, 7);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.median, 1.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let mut samples = vec![4.0, 1.0, 3.0, 2.0];
        let stats = summarize(&mut samples).unwrap();
        assert_eq!(samples, vec![1.0, 2.0, 3.0, 4.0]);
        // Q1 = 2, Q3 = 4, fences [-1, 7]: everything is kept.
        assert_eq!(stats.iterations, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.median, 3.0);

        let mean = 2.5;
        let sd = ((1.5f64.powi(2) + 0.5f64.powi(2)) * 2.0 / 4.0).sqrt();
        assert!((stats.std_dev - sd / mean).abs() < 1e-12);
    }

    #[test]
    fn test_low_outlier_skipped_by_start_index() {
        // Q1 = s[2] = 10, Q3 = s[6] = 12, fences [7, 15].
        let mut samples = vec![0.5, 10.0, 10.0, 11.0, 11.0, 12.0, 12.0, 40.0];
        let stats = summarize(&mut samples).unwrap();
        assert_eq!(stats.iterations, 6);
        assert_eq!(stats.min, 10.0);
        // min_valid = 1, median index = 1 + 6 / 2 = 4.
        assert_eq!(stats.median, 11.0);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let input = vec![3.2, 1.1, 9.7, 1.3, 1.2, 1.25, 50.0, 1.15, 1.05, 1.4];
        let mut first = input.clone();
        let mut second = input.clone();
        assert_eq!(summarize(&mut first).unwrap(), summarize(&mut second).unwrap());

        // Re-summarizing an already sorted set gives the same answer too.
        let again = summarize(&mut first).unwrap();
        assert_eq!(again, summarize(&mut input.clone()).unwrap());
    }

    #[test]
    fn test_non_degenerate_sets_keep_samples() {
        let mut rng_state = 0x2545_f491_4f6c_dd1du64;
        for n in 4..64 {
            let mut samples: Vec<f64> = (0..n)
                .map(|_| {
                    rng_state ^= rng_state << 13;
                    rng_state ^= rng_state >> 7;
                    rng_state ^= rng_state << 17;
                    1e-6 + (rng_state % 10_000) as f64 * 1e-9
                })
                .collect();
            let stats = summarize(&mut samples).unwrap();
            assert!(stats.iterations >= 1);
            assert!(stats.iterations <= n);
            assert!(stats.std_dev >= 0.0);
            assert!(stats.min <= stats.median);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(summarize(&mut []), Err(HarnessError::InvalidInput(_))));
        assert!(matches!(
            summarize(&mut [0.0, 0.0, 0.0, 0.0]),
            Err(HarnessError::InvalidInput(_))
        ));
        assert!(summarize(&mut [1.0, f64::NAN, 1.0, 1.0]).is_err());
        assert!(summarize(&mut [1.0, -1.0, 1.0, 1.0]).is_err());
        assert!(summarize(&mut [1.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_small_inputs_degrade_quietly() {
        let stats = summarize(&mut [2.0]).unwrap();
        assert_eq!(stats.iterations, 1);
        assert_eq!(stats.median, 2.0);

        let stats = summarize(&mut [3.0, 1.0]).unwrap();
        assert_eq!(stats.min, 1.0);
        assert!(stats.iterations >= 1);
    }
}
