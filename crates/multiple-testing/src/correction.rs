//! Benjamini-Hochberg FDR correction
//!
//! Adjusts a batch of raw p-values with the BH step-up procedure and reports a
//! Bonferroni value alongside as a conservative reference. Significance calls
//! use the BH value only.

use serde::{Deserialize, Serialize};
use stats_core::summary::{check_alpha, check_probability};
use stats_core::{HypothesisTest, StatsError, StatsResult};
use std::cmp::Ordering;

/// Default FDR level used by the screening reports
pub const DEFAULT_ALPHA: f64 = 0.10;

/// A hypothesis test with its batch-level correction applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedTest {
    /// Original record, unchanged
    #[serde(flatten)]
    pub test: HypothesisTest,
    /// 1-indexed rank in ascending p-value order (ties keep input order)
    pub rank: usize,
    /// Benjamini-Hochberg adjusted p-value
    pub adjusted_p_value: f64,
    /// Bonferroni adjusted p-value (reference only)
    pub bonferroni_p_value: f64,
    /// Whether `adjusted_p_value < alpha`
    pub rejected: bool,
}

/// Result of correcting a whole batch of tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionReport {
    /// FDR level used for the rejection decision
    pub alpha: f64,
    /// Number of hypotheses in the batch
    pub n_tests: usize,
    /// Number of hypotheses rejected after correction
    pub n_rejected: usize,
    /// One entry per input, in input order
    pub results: Vec<CorrectedTest>,
}

impl CorrectionReport {
    /// Rejected results, most significant first
    pub fn rejected(&self) -> Vec<&CorrectedTest> {
        let mut hits: Vec<&CorrectedTest> = self.results.iter().filter(|r| r.rejected).collect();
        hits.sort_by_key(|r| r.rank);
        hits
    }

    /// All results ordered by rank
    pub fn by_rank(&self) -> Vec<&CorrectedTest> {
        let mut ordered: Vec<&CorrectedTest> = self.results.iter().collect();
        ordered.sort_by_key(|r| r.rank);
        ordered
    }
}

fn validate_p_values(p_values: &[f64]) -> StatsResult<()> {
    if p_values.is_empty() {
        return Err(StatsError::InvalidInput(
            "p-value batch must contain at least one hypothesis".to_string(),
        ));
    }
    for (i, &p) in p_values.iter().enumerate() {
        check_probability(p, &format!("p-value #{}", i))?;
    }
    Ok(())
}

/// Indices of `p_values` in ascending order. The sort is stable, so tied
/// p-values keep their input order.
fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// BH step-up over already validated p-values. Returns (rank, adjusted) per input index.
fn step_up(p_values: &[f64]) -> Vec<(usize, f64)> {
    let n = p_values.len();
    let order = ascending_order(p_values);
    let mut out = vec![(0usize, 0.0f64); n];

    // Walk from the largest rank down, carrying the running minimum so
    // adjusted values never decrease as rank increases.
    let mut running = f64::INFINITY;
    for (pos, &idx) in order.iter().enumerate().rev() {
        let rank = pos + 1;
        let scaled = if rank == n {
            p_values[idx]
        } else {
            p_values[idx] * n as f64 / rank as f64
        };
        running = running.min(scaled);
        out[idx] = (rank, running.min(1.0));
    }

    out
}

/// Benjamini-Hochberg adjusted p-values, returned in input order.
pub fn benjamini_hochberg(p_values: &[f64]) -> StatsResult<Vec<f64>> {
    validate_p_values(p_values)?;
    Ok(step_up(p_values).into_iter().map(|(_, adj)| adj).collect())
}

/// Bonferroni adjusted p-values (`p * n`, capped at 1), in input order.
pub fn bonferroni(p_values: &[f64]) -> StatsResult<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len() as f64;
    Ok(p_values.iter().map(|p| (p * n).min(1.0)).collect())
}

/// Correct a batch of hypothesis tests at FDR level `alpha`.
///
/// The original records are carried through untouched; only the adjusted
/// columns and the rejection flag are derived, and always from the whole batch.
pub fn correct(tests: &[HypothesisTest], alpha: f64) -> StatsResult<CorrectionReport> {
    check_alpha(alpha)?;

    let p_values: Vec<f64> = tests.iter().map(|t| t.p_value).collect();
    validate_p_values(&p_values)?;

    let n = p_values.len();
    let adjusted = step_up(&p_values);

    let results: Vec<CorrectedTest> = tests
        .iter()
        .zip(adjusted)
        .map(|(test, (rank, adjusted_p_value))| CorrectedTest {
            test: test.clone(),
            rank,
            adjusted_p_value,
            bonferroni_p_value: (test.p_value * n as f64).min(1.0),
            rejected: adjusted_p_value < alpha,
        })
        .collect();

    let n_rejected = results.iter().filter(|r| r.rejected).count();
    tracing::debug!(
        "BH correction: {} of {} hypotheses rejected at alpha={}",
        n_rejected,
        n,
        alpha
    );

    Ok(CorrectionReport {
        alpha,
        n_tests: n,
        n_rejected,
        results,
    })
}
