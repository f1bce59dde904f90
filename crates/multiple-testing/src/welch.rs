//! Welch's unequal-variance two-sample t-test.

use serde::{Deserialize, Serialize};
use stats_core::summary::{mean, sample_variance};
use stats_core::{StatsError, StatsResult};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Outcome of a two-sided Welch t-test of `a` against `b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    pub t_statistic: f64,
    /// Welch-Satterthwaite degrees of freedom
    pub degrees_of_freedom: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// mean(a) - mean(b)
    pub mean_difference: f64,
    pub n_a: usize,
    pub n_b: usize,
}

/// Two-sided Welch t-test. Both groups need at least two observations and the
/// combined standard error must be non-zero.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> StatsResult<WelchTest> {
    if a.len() < 2 || b.len() < 2 {
        return Err(StatsError::InsufficientData(format!(
            "Welch test needs at least 2 observations per group, got {} and {}",
            a.len(),
            b.len()
        )));
    }
    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
        return Err(StatsError::InvalidInput(
            "Welch test observations must be finite".to_string(),
        ));
    }

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let se_a = sample_variance(a) / n_a;
    let se_b = sample_variance(b) / n_b;
    let se_sum = se_a + se_b;

    if se_sum <= 0.0 {
        return Err(StatsError::InsufficientData(
            "both groups have zero variance".to_string(),
        ));
    }

    let mean_difference = mean(a) - mean(b);
    let t_statistic = mean_difference / se_sum.sqrt();
    let degrees_of_freedom =
        se_sum.powi(2) / (se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0));

    let dist = StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map_err(|e| StatsError::CalculationError(format!("Student-t distribution: {}", e)))?;
    let p_value = (2.0 * dist.sf(t_statistic.abs())).clamp(0.0, 1.0);

    Ok(WelchTest {
        t_statistic,
        degrees_of_freedom,
        p_value,
        mean_difference,
        n_a: a.len(),
        n_b: b.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_values() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let result = welch_t_test(&a, &b).unwrap();

        assert_relative_eq!(result.t_statistic, -1.897_366_596_101_03, epsilon = 1e-9);
        assert_relative_eq!(result.degrees_of_freedom, 100.0 / 17.0, epsilon = 1e-9);
        assert_relative_eq!(result.p_value, 0.107_531_194_930_627, epsilon = 1e-6);
        assert_relative_eq!(result.mean_difference, -3.0);
    }

    #[test]
    fn test_symmetric_in_sign() {
        let a = [0.1, -0.3, -0.5, -0.2];
        let b = [0.2, 0.1, 0.4, 0.0, 0.3];
        let ab = welch_t_test(&a, &b).unwrap();
        let ba = welch_t_test(&b, &a).unwrap();

        assert_relative_eq!(ab.p_value, ba.p_value, epsilon = 1e-12);
        assert_relative_eq!(ab.t_statistic, -ba.t_statistic, epsilon = 1e-12);
        assert!(ab.mean_difference < 0.0);
    }

    #[test]
    fn test_identical_means_not_significant() {
        let result = welch_t_test(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert_relative_eq!(result.t_statistic, 0.0);
        assert_relative_eq!(result.p_value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_too_few_observations() {
        assert!(matches!(
            welch_t_test(&[1.0], &[1.0, 2.0]),
            Err(StatsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_zero_variance() {
        assert!(matches!(
            welch_t_test(&[1.0, 1.0], &[2.0, 2.0, 2.0]),
            Err(StatsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(matches!(
            welch_t_test(&[1.0, f64::NAN], &[2.0, 3.0]),
            Err(StatsError::InvalidInput(_))
        ));
    }
}
