//! Property-based tests for the BH / Bonferroni correction.

use multiple_testing::{benjamini_hochberg, bonferroni, correct};
use proptest::prelude::*;
use stats_core::HypothesisTest;

fn p_batch() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0..=1.0f64, 1..60)
}

/// Batches with many exact ties.
fn tied_batch() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop::sample::select(vec![0.001, 0.01, 0.02, 0.05, 0.2, 1.0]), 1..40)
}

fn ascending_pairs(raw: &[f64], adjusted: &[f64]) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = raw.iter().copied().zip(adjusted.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    pairs
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Adjusted values never decrease along ascending raw p-value.
    #[test]
    fn bh_monotone_in_rank(raw in p_batch()) {
        let adjusted = benjamini_hochberg(&raw).unwrap();
        let pairs = ascending_pairs(&raw, &adjusted);
        for w in pairs.windows(2) {
            prop_assert!(w[0].1 <= w[1].1, "adjusted decreased: {:?} -> {:?}", w[0], w[1]);
        }
    }

    /// Ties do not break monotonicity either.
    #[test]
    fn bh_monotone_with_ties(raw in tied_batch()) {
        let adjusted = benjamini_hochberg(&raw).unwrap();
        let pairs = ascending_pairs(&raw, &adjusted);
        for w in pairs.windows(2) {
            prop_assert!(w[0].1 <= w[1].1);
            if w[0].0 == w[1].0 {
                prop_assert_eq!(w[0].1, w[1].1);
            }
        }
    }

    /// Correction never makes a p-value more significant, and stays within [0, 1].
    #[test]
    fn bh_never_below_raw(raw in p_batch()) {
        let adjusted = benjamini_hochberg(&raw).unwrap();
        for (p, adj) in raw.iter().zip(adjusted.iter()) {
            prop_assert!(adj >= p, "adjusted {} < raw {}", adj, p);
            prop_assert!(*adj <= 1.0);
        }
    }

    /// Bonferroni is at least as conservative as BH.
    #[test]
    fn bonferroni_dominates_bh(raw in p_batch()) {
        let bh = benjamini_hochberg(&raw).unwrap();
        let bonf = bonferroni(&raw).unwrap();
        for (b, f) in bh.iter().zip(bonf.iter()) {
            prop_assert!(f >= b, "bonferroni {} < bh {}", f, b);
        }
    }

    /// A single hypothesis is returned unchanged.
    #[test]
    fn single_hypothesis_identity(p in 0.0..=1.0f64) {
        prop_assert_eq!(benjamini_hochberg(&[p]).unwrap(), vec![p]);
    }

    /// Rejection is exactly `adjusted < alpha` and the records pass through unchanged.
    #[test]
    fn rejection_matches_threshold(raw in p_batch(), alpha in 0.001..=1.0f64) {
        let tests: Vec<HypothesisTest> = raw
            .iter()
            .enumerate()
            .map(|(i, &p)| HypothesisTest::new(format!("G{}", i), "T", p, i as f64 - 10.0))
            .collect();
        let report = correct(&tests, alpha).unwrap();

        prop_assert_eq!(report.n_tests, raw.len());
        for (r, t) in report.results.iter().zip(tests.iter()) {
            prop_assert_eq!(r.rejected, r.adjusted_p_value < alpha);
            prop_assert_eq!(&r.test, t);
        }
        prop_assert_eq!(report.n_rejected, report.results.iter().filter(|r| r.rejected).count());
    }

    /// Correction depends on the batch, not on input order.
    #[test]
    fn permutation_invariant(raw in p_batch()) {
        let adjusted = benjamini_hochberg(&raw).unwrap();
        let reversed: Vec<f64> = raw.iter().rev().copied().collect();
        let adjusted_rev = benjamini_hochberg(&reversed).unwrap();
        let back: Vec<f64> = adjusted_rev.into_iter().rev().collect();
        for (a, b) in adjusted.iter().zip(back.iter()) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }
}
