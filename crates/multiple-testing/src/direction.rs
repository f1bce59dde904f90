//! Directionality post-filter
//!
//! A significant result only supports the biological hypothesis when its
//! effect points the hypothesized way. Results with the opposite sign (or a
//! zero effect) are kept apart rather than discarded so they can be reviewed.

use serde::{Deserialize, Serialize};
use stats_core::EffectDirection;

use crate::correction::{CorrectedTest, CorrectionReport};

/// Rejected hypotheses split by effect sign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionalSplit {
    /// Direction the hypothesis predicts
    pub direction: EffectDirection,
    /// Significant and pointing in `direction`
    pub candidates: Vec<CorrectedTest>,
    /// Significant but pointing the other way (or zero effect)
    pub opposite_direction: Vec<CorrectedTest>,
}

impl DirectionalSplit {
    pub fn n_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn n_opposite(&self) -> usize {
        self.opposite_direction.len()
    }
}

/// Split the rejected results of `report` by the sign of their effect size.
///
/// Both lists are ordered by rank. Non-rejected results appear in neither.
pub fn split_by_direction(report: &CorrectionReport, direction: EffectDirection) -> DirectionalSplit {
    let (candidates, opposite_direction): (Vec<CorrectedTest>, Vec<CorrectedTest>) = report
        .rejected()
        .into_iter()
        .cloned()
        .partition(|r| direction.matches(r.test.effect_size));

    if !opposite_direction.is_empty() {
        tracing::debug!(
            "{} significant results point opposite to the {} hypothesis",
            opposite_direction.len(),
            direction.as_str()
        );
    }

    DirectionalSplit {
        direction,
        candidates,
        opposite_direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::correct;
    use stats_core::HypothesisTest;

    fn report() -> CorrectionReport {
        let tests = vec![
            HypothesisTest::new("KRAS", "STK33", 0.001, -0.45),
            HypothesisTest::new("KRAS", "PLK1", 0.002, 0.30),
            HypothesisTest::new("BRCA1", "PARP1", 0.003, -0.60),
            HypothesisTest::new("TP53", "MDM2", 0.80, -0.90),
            HypothesisTest::new("APC", "CTNNB1", 0.004, 0.0),
        ];
        correct(&tests, 0.1).unwrap()
    }

    #[test]
    fn test_negative_direction_split() {
        let split = split_by_direction(&report(), EffectDirection::Negative);

        let candidates: Vec<&str> = split
            .candidates
            .iter()
            .map(|r| r.test.group_b_label.as_str())
            .collect();
        assert_eq!(candidates, vec!["STK33", "PARP1"]);

        let opposite: Vec<&str> = split
            .opposite_direction
            .iter()
            .map(|r| r.test.group_b_label.as_str())
            .collect();
        assert_eq!(opposite, vec!["PLK1", "CTNNB1"]);
    }

    #[test]
    fn test_non_significant_excluded() {
        let split = split_by_direction(&report(), EffectDirection::Negative);
        assert!(split
            .candidates
            .iter()
            .chain(split.opposite_direction.iter())
            .all(|r| r.test.group_a_label != "TP53"));
        assert_eq!(split.n_candidates() + split.n_opposite(), 4);
    }

    #[test]
    fn test_positive_direction_split() {
        let split = split_by_direction(&report(), EffectDirection::Positive);
        assert_eq!(split.n_candidates(), 1);
        assert_eq!(split.candidates[0].test.group_b_label, "PLK1");
        assert_eq!(split.n_opposite(), 3);
    }

    #[test]
    fn test_effect_size_carried_unchanged() {
        let split = split_by_direction(&report(), EffectDirection::Negative);
        assert_eq!(split.candidates[0].test.effect_size, -0.45);
    }
}
