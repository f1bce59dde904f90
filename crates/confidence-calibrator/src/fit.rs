//! Fitting calibration mappings from held-out predictions
//!
//! Every fitter takes `(raw_score, outcome)` pairs and returns an immutable
//! [`CalibrationMapping`].

use stats_core::{StatsError, StatsResult};
use std::cmp::Ordering;

use crate::mapping::{apply_temperature, platt_sigmoid, CalibrationMapping, CalibrationMethod};

/// Fewer held-out predictions than this cannot support a calibration fit
pub const MIN_FIT_SAMPLES: usize = 10;

const NEWTON_MAX_ITER: usize = 100;
const NEWTON_TOL: f64 = 1e-10;
const MIN_STEP: f64 = 1e-10;

/// Fit the requested method.
pub fn fit(samples: &[(f64, bool)], method: CalibrationMethod) -> StatsResult<CalibrationMapping> {
    match method {
        CalibrationMethod::PlattScaling => fit_platt(samples),
        CalibrationMethod::IsotonicRegression => fit_isotonic(samples),
        CalibrationMethod::TemperatureScaling => fit_temperature(samples),
        CalibrationMethod::None => {
            validate_samples(samples)?;
            Ok(CalibrationMapping::identity())
        }
    }
}

fn validate_samples(samples: &[(f64, bool)]) -> StatsResult<()> {
    if samples.len() < MIN_FIT_SAMPLES {
        return Err(StatsError::InsufficientData(format!(
            "Need at least {} predictions for calibration, got {}",
            MIN_FIT_SAMPLES,
            samples.len()
        )));
    }
    if let Some((score, _)) = samples.iter().find(|(s, _)| !s.is_finite()) {
        return Err(StatsError::InvalidInput(format!(
            "calibration scores must be finite, got {}",
            score
        )));
    }
    Ok(())
}

fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Log-loss of `1 / (1 + exp(a*x + b))` against soft targets.
fn platt_loss(samples: &[(f64, bool)], targets: &[f64], a: f64, b: f64) -> f64 {
    samples
        .iter()
        .zip(targets)
        .map(|(&(x, _), &t)| {
            let z = a * x + b;
            softplus(z) - (1.0 - t) * z
        })
        .sum()
}

/// Platt scaling fit: Newton-Raphson with backtracking on the log-loss,
/// using Platt's smoothed targets so separable data still has a finite optimum.
pub fn fit_platt(samples: &[(f64, bool)]) -> StatsResult<CalibrationMapping> {
    validate_samples(samples)?;

    let first = samples[0].0;
    if samples.iter().all(|(s, _)| *s == first) {
        return Err(StatsError::InsufficientData(
            "Platt scaling needs at least two distinct scores".to_string(),
        ));
    }

    let n_pos = samples.iter().filter(|(_, y)| *y).count() as f64;
    let n_neg = samples.len() as f64 - n_pos;
    let hi_target = (n_pos + 1.0) / (n_pos + 2.0);
    let lo_target = 1.0 / (n_neg + 2.0);
    let targets: Vec<f64> = samples
        .iter()
        .map(|(_, y)| if *y { hi_target } else { lo_target })
        .collect();

    let mut a = 0.0;
    let mut b = ((n_neg + 1.0) / (n_pos + 1.0)).ln();
    let mut loss = platt_loss(samples, &targets, a, b);

    for iter in 0..NEWTON_MAX_ITER {
        let (mut g_a, mut g_b) = (0.0, 0.0);
        let (mut h_aa, mut h_ab, mut h_bb) = (0.0, 0.0, 0.0);

        for (&(x, _), &t) in samples.iter().zip(&targets) {
            let p = platt_sigmoid(a, b, x);
            let d = t - p;
            let w = (p * (1.0 - p)).max(1e-12);
            g_a += d * x;
            g_b += d;
            h_aa += w * x * x;
            h_ab += w * x;
            h_bb += w;
        }

        if g_a.abs() < NEWTON_TOL && g_b.abs() < NEWTON_TOL {
            tracing::debug!("Platt fit converged after {} iterations", iter);
            break;
        }

        let det = h_aa * h_bb - h_ab * h_ab;
        if !det.is_finite() || det <= 0.0 {
            return Err(StatsError::CalculationError(
                "singular Hessian in Platt fit".to_string(),
            ));
        }
        let step_a = (h_bb * g_a - h_ab * g_b) / det;
        let step_b = (h_aa * g_b - h_ab * g_a) / det;

        let mut scale = 1.0;
        let mut improved = false;
        while scale >= MIN_STEP {
            let (next_a, next_b) = (a - scale * step_a, b - scale * step_b);
            let next_loss = platt_loss(samples, &targets, next_a, next_b);
            if next_loss <= loss {
                a = next_a;
                b = next_b;
                loss = next_loss;
                improved = true;
                break;
            }
            scale *= 0.5;
        }

        if !improved || (scale * step_a).abs() < NEWTON_TOL && (scale * step_b).abs() < NEWTON_TOL {
            tracing::debug!("Platt fit stopped after {} iterations", iter + 1);
            break;
        }
    }

    tracing::debug!("Platt fit: A={:.6}, B={:.6}, log-loss={:.6}", a, b, loss);
    CalibrationMapping::platt(a, b)
}

struct Block {
    x_lo: f64,
    x_hi: f64,
    sum: f64,
    weight: f64,
}

impl Block {
    fn mean(&self) -> f64 {
        self.sum / self.weight
    }
}

/// Isotonic regression fit (pool adjacent violators over unique scores).
///
/// Each pooled block contributes its lowest and highest score as control
/// points at the block's mean outcome.
pub fn fit_isotonic(samples: &[(f64, bool)]) -> StatsResult<CalibrationMapping> {
    validate_samples(samples)?;

    let mut sorted: Vec<(f64, f64)> = samples
        .iter()
        .map(|&(s, y)| (s, if y { 1.0 } else { 0.0 }))
        .collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let mut blocks: Vec<Block> = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let x = sorted[i].0;
        let mut block = Block { x_lo: x, x_hi: x, sum: 0.0, weight: 0.0 };
        while i < sorted.len() && sorted[i].0 == x {
            block.sum += sorted[i].1;
            block.weight += 1.0;
            i += 1;
        }
        blocks.push(block);

        // Pool backwards while the last two blocks violate monotonicity
        while blocks.len() >= 2 && blocks[blocks.len() - 2].mean() > blocks[blocks.len() - 1].mean() {
            if let Some(last) = blocks.pop() {
                if let Some(prev) = blocks.last_mut() {
                    prev.x_hi = last.x_hi;
                    prev.sum += last.sum;
                    prev.weight += last.weight;
                }
            }
        }
    }

    let mut points = Vec::with_capacity(blocks.len() * 2);
    for block in &blocks {
        let y = block.mean();
        points.push((block.x_lo, y));
        if block.x_hi > block.x_lo {
            points.push((block.x_hi, y));
        }
    }

    tracing::debug!(
        "Isotonic fit: {} samples pooled into {} blocks",
        samples.len(),
        blocks.len()
    );
    CalibrationMapping::isotonic(points)
}

/// Temperature scaling fit: grid search over T in 0.1..=10.0.
/// Scores must already be probabilities.
pub fn fit_temperature(samples: &[(f64, bool)]) -> StatsResult<CalibrationMapping> {
    validate_samples(samples)?;
    if let Some((score, _)) = samples.iter().find(|(s, _)| !(0.0..=1.0).contains(s)) {
        return Err(StatsError::InvalidInput(format!(
            "temperature scaling needs probability scores, got {}",
            score
        )));
    }

    let mut best_temp = 1.0;
    let mut best_loss = f64::MAX;

    for t in (1..=100).map(|i| i as f64 * 0.1) {
        let loss: f64 = samples
            .iter()
            .map(|&(pred, outcome)| {
                let scaled = apply_temperature(pred, t);
                // Negative log likelihood
                if outcome {
                    -scaled.max(1e-10).ln()
                } else {
                    -(1.0 - scaled).max(1e-10).ln()
                }
            })
            .sum();

        if loss < best_loss {
            best_loss = loss;
            best_temp = t;
        }
    }

    tracing::debug!("Temperature fit: T={:.1}, log-loss={:.6}", best_temp, best_loss);
    CalibrationMapping::temperature(best_temp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn threshold_samples() -> Vec<(f64, bool)> {
        (0..100)
            .map(|i| {
                let pred = (i as f64) / 100.0;
                (pred, pred > 0.6) // Model is overconfident below 0.6
            })
            .collect()
    }

    /// Outcome counts drawn from P(y=1|x) = 1 / (1 + exp(-1.5x + 0.5)), 100 per score.
    fn logistic_samples() -> Vec<(f64, bool)> {
        let positives = [(-2.0, 3), (-1.0, 12), (0.0, 38), (1.0, 73), (2.0, 92)];
        positives
            .iter()
            .flat_map(|&(x, k)| (0..100).map(move |j| (x, j < k)))
            .collect()
    }

    #[test]
    fn test_platt_recovers_parameters() {
        let mapping = fit_platt(&logistic_samples()).unwrap();
        let expected = 1.0 / (1.0 + (-1.5f64 + 0.5).exp());
        assert_relative_eq!(mapping.apply(1.0).unwrap(), expected, epsilon = 0.03);
        assert!(mapping.apply(-2.0).unwrap() < mapping.apply(2.0).unwrap());
    }

    #[test]
    fn test_platt_on_separable_data() {
        let mapping = fit_platt(&threshold_samples()).unwrap();
        let low = mapping.apply(0.2).unwrap();
        let high = mapping.apply(0.95).unwrap();

        assert_eq!(mapping.method(), CalibrationMethod::PlattScaling);
        assert!(low < 0.5 && high > 0.5);
        assert!(low > 0.0 && high < 1.0);
    }

    #[test]
    fn test_platt_needs_distinct_scores() {
        let samples: Vec<(f64, bool)> = (0..20).map(|i| (0.5, i % 2 == 0)).collect();
        assert!(matches!(fit_platt(&samples), Err(StatsError::InsufficientData(_))));
    }

    #[test]
    fn test_isotonic_threshold_data() {
        let mapping = fit_isotonic(&threshold_samples()).unwrap();

        assert_eq!(mapping.apply(0.3).unwrap(), 0.0);
        assert_eq!(mapping.apply(0.8).unwrap(), 1.0);
        assert_relative_eq!(mapping.apply(0.605).unwrap(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_isotonic_pools_violators() {
        let outcomes = [false, true, false, false, true, true, false, true, true, true];
        let samples: Vec<(f64, bool)> = outcomes
            .iter()
            .enumerate()
            .map(|(i, &y)| ((i + 1) as f64, y))
            .collect();
        let mapping = fit_isotonic(&samples).unwrap();

        assert_eq!(mapping.apply(1.0).unwrap(), 0.0);
        assert_relative_eq!(mapping.apply(3.0).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(mapping.apply(6.0).unwrap(), 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(mapping.apply(4.5).unwrap(), 0.5, epsilon = 1e-12);
        assert_eq!(mapping.apply(10.0).unwrap(), 1.0);

        let points = mapping.control_points().unwrap();
        assert!(points.windows(2).all(|w| w[0].0 <= w[1].0 && w[0].1 <= w[1].1));
    }

    #[test]
    fn test_isotonic_averages_tied_scores() {
        let mut samples = vec![(0.2, false); 6];
        samples.extend(vec![(0.2, true); 2]);
        samples.extend(vec![(0.8, true); 3]);
        samples.push((0.8, false));
        let mapping = fit_isotonic(&samples).unwrap();

        assert_relative_eq!(mapping.apply(0.2).unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(mapping.apply(0.8).unwrap(), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_temperature_fit() {
        // Overconfident: 0.9 predictions right only 70% of the time
        let mut samples = Vec::new();
        for i in 0..50 {
            samples.push((0.9, i % 10 < 7));
            samples.push((0.1, i % 10 >= 7));
        }
        let mapping = fit_temperature(&samples).unwrap();
        assert_eq!(mapping.method(), CalibrationMethod::TemperatureScaling);
        let calibrated = mapping.apply(0.9).unwrap();
        assert!(calibrated < 0.8 && calibrated > 0.6);
    }

    #[test]
    fn test_temperature_rejects_non_probabilities() {
        let samples: Vec<(f64, bool)> = (0..12).map(|i| (i as f64, i > 5)).collect();
        assert!(matches!(fit_temperature(&samples), Err(StatsError::InvalidInput(_))));
    }

    #[test]
    fn test_too_few_samples() {
        let samples = vec![(0.2, false), (0.8, true)];
        for method in [
            CalibrationMethod::PlattScaling,
            CalibrationMethod::IsotonicRegression,
            CalibrationMethod::TemperatureScaling,
            CalibrationMethod::None,
        ] {
            assert!(matches!(fit(&samples, method), Err(StatsError::InsufficientData(_))));
        }
    }

    #[test]
    fn test_fit_none_is_identity() {
        let mapping = fit(&threshold_samples(), CalibrationMethod::None).unwrap();
        assert_eq!(mapping.apply(0.37).unwrap(), 0.37);
    }
}
