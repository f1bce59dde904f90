//! Summary statistics and range checks shared by the testing and calibration crates.
//!
//! Everything here is a plain function over slices; callers decide what an
//! empty or degenerate sample means for them.

use crate::{StatsError, StatsResult};

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Unbiased sample variance (n - 1 denominator).
pub fn sample_variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

/// Compute sample standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    sample_variance(data).sqrt()
}

/// Keep only finite observations (screens carry NaN for missing cell lines).
pub fn finite_values(data: &[f64]) -> Vec<f64> {
    data.iter().copied().filter(|x| x.is_finite()).collect()
}

/// Check that `value` is a probability in [0, 1]. `what` names the value in the error.
pub fn check_probability(value: f64, what: &str) -> StatsResult<()> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(StatsError::InvalidInput(format!(
            "{} must be in [0, 1], got {}",
            what, value
        )));
    }
    Ok(())
}

/// Significance level must lie in (0, 1].
pub fn check_alpha(alpha: f64) -> StatsResult<()> {
    if alpha.is_nan() || alpha <= 0.0 || alpha > 1.0 {
        return Err(StatsError::InvalidInput(format!(
            "alpha must be in (0, 1], got {}",
            alpha
        )));
    }
    Ok(())
}
