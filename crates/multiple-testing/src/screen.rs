//! Synthetic-lethality screen
//!
//! For every (mutation, target gene) pair, compares the CRISPR dependency
//! scores of mutant cell lines against wild-type lines with a Welch test, then
//! BH-corrects the whole batch and splits the hits by effect direction.
//! Pairs that cannot be tested are skipped and reported, never silently lost.

use serde::{Deserialize, Serialize};
use stats_core::summary::{check_alpha, finite_values};
use stats_core::{EffectDirection, HypothesisTest, StatsError, StatsResult};

use crate::correction::{correct, CorrectionReport, DEFAULT_ALPHA};
use crate::direction::{split_by_direction, DirectionalSplit};
use crate::welch::welch_t_test;

/// Dependency scores for one mutation / target pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyComparison {
    /// Mutated gene defining the mutant group
    pub mutation: String,
    /// Gene whose knockout effect is measured
    pub target: String,
    /// Target dependency scores in mutant cell lines (NaN = missing)
    pub mutant_scores: Vec<f64>,
    /// Target dependency scores in wild-type cell lines (NaN = missing)
    pub wild_type_scores: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// FDR level for the BH correction
    pub alpha: f64,
    /// Hypothesized sign of mean(mutant) - mean(wild type)
    pub direction: EffectDirection,
    /// Minimum finite observations required in each group
    pub min_group_size: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            direction: EffectDirection::Negative,
            min_group_size: 3,
        }
    }
}

/// A pair left out of the batch, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedComparison {
    pub mutation: String,
    pub target: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenResult {
    pub correction: CorrectionReport,
    pub split: DirectionalSplit,
    pub skipped: Vec<SkippedComparison>,
}

impl DependencyComparison {
    /// Run the Welch test for this pair and package it as a hypothesis test.
    pub fn to_hypothesis_test(&self, min_group_size: usize) -> StatsResult<HypothesisTest> {
        let mutant = finite_values(&self.mutant_scores);
        let wild_type = finite_values(&self.wild_type_scores);

        if mutant.len() < min_group_size || wild_type.len() < min_group_size {
            return Err(StatsError::InsufficientData(format!(
                "{} mutant / {} wild-type lines, need {} each",
                mutant.len(),
                wild_type.len(),
                min_group_size
            )));
        }

        let welch = welch_t_test(&mutant, &wild_type)?;
        Ok(HypothesisTest::new(
            self.mutation.clone(),
            self.target.clone(),
            welch.p_value,
            welch.mean_difference,
        ))
    }
}

/// Test every comparison, correct the batch and split the hits by direction.
///
/// Fails with `InvalidInput` when nothing is left to correct.
pub fn run_screen(
    comparisons: &[DependencyComparison],
    config: &ScreenConfig,
) -> StatsResult<ScreenResult> {
    check_alpha(config.alpha)?;
    if config.min_group_size < 2 {
        return Err(StatsError::InvalidInput(format!(
            "min_group_size must be at least 2, got {}",
            config.min_group_size
        )));
    }

    let mut tests = Vec::with_capacity(comparisons.len());
    let mut skipped = Vec::new();

    for comparison in comparisons {
        match comparison.to_hypothesis_test(config.min_group_size) {
            Ok(test) => tests.push(test),
            Err(e) => {
                tracing::warn!(
                    "Skipping {} vs {}: {}",
                    comparison.mutation,
                    comparison.target,
                    e
                );
                skipped.push(SkippedComparison {
                    mutation: comparison.mutation.clone(),
                    target: comparison.target.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let correction = correct(&tests, config.alpha)?;
    let split = split_by_direction(&correction, config.direction);

    tracing::info!(
        "Screen: {} tested, {} skipped, {} significant ({} {} candidates)",
        correction.n_tests,
        skipped.len(),
        correction.n_rejected,
        split.n_candidates(),
        config.direction.as_str()
    );

    Ok(ScreenResult {
        correction,
        split,
        skipped,
    })
}
