//! Calibrated classification
//!
//! Wraps a fitted mapping with a decision threshold and an on/off switch, and
//! measures how well a set of held-out predictions is calibrated.

use serde::{Deserialize, Serialize};
use stats_core::{StatsError, StatsResult};

use crate::mapping::{CalibrationMapping, CalibrationMethod, DEFAULT_DOMAIN_TOLERANCE};

/// Default probability at or above which a prediction is positive
pub const DEFAULT_THRESHOLD: f64 = 0.5;

const RELIABILITY_BINS: usize = 10;

/// Direction the mapping moved a raw score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationShift {
    /// Raw and calibrated differ by less than 0.05
    WellCalibrated,
    /// Raw score overstates the probability
    Overconfident,
    /// Raw score understates the probability
    Underconfident,
}

impl CalibrationShift {
    fn between(raw: f64, calibrated: f64) -> Self {
        let diff = raw - calibrated;
        if diff.abs() < 0.05 {
            CalibrationShift::WellCalibrated
        } else if diff > 0.0 {
            CalibrationShift::Overconfident
        } else {
            CalibrationShift::Underconfident
        }
    }
}

/// A prediction with calibration information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratedPrediction {
    /// Original raw score from the model
    pub raw_score: f64,
    /// Probability used for the decision (raw score when calibration is off)
    pub probability: f64,
    /// Whether the mapping was applied
    pub calibrated: bool,
    /// `probability >= threshold`
    pub positive: bool,
    /// Calibration method of the wrapped mapping
    pub method: CalibrationMethod,
    /// Not reported for Platt scaling, whose raw score is not a probability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<CalibrationShift>,
}

/// Statistics about how well a set of probabilities is calibrated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationStats {
    /// Expected Calibration Error (lower is better)
    pub ece: f64,
    /// Maximum Calibration Error
    pub mce: f64,
    /// Brier score (mean squared error of probabilities)
    pub brier_score: f64,
    /// Number of predictions evaluated
    pub sample_size: usize,
    pub method: CalibrationMethod,
    /// Reliability diagram bins (empty bins omitted)
    pub reliability_bins: Vec<ReliabilityBin>,
}

/// A bin in the reliability diagram
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityBin {
    /// Average predicted probability in this bin
    pub avg_predicted: f64,
    /// Actual fraction of positives in this bin
    pub actual_positive_rate: f64,
    /// Number of samples in this bin
    pub count: usize,
}

impl CalibrationStats {
    /// Compute ECE / MCE / Brier over `(probability, outcome)` pairs.
    pub fn from_probabilities(
        predictions: &[(f64, bool)],
        method: CalibrationMethod,
    ) -> StatsResult<Self> {
        if predictions.is_empty() {
            return Err(StatsError::InsufficientData(
                "no predictions to evaluate".to_string(),
            ));
        }
        for &(p, _) in predictions {
            stats_core::summary::check_probability(p, "predicted probability")?;
        }

        let mut bins: Vec<Vec<(f64, bool)>> = vec![Vec::new(); RELIABILITY_BINS];
        for &(pred, outcome) in predictions {
            let bin_idx = ((pred * RELIABILITY_BINS as f64) as usize).min(RELIABILITY_BINS - 1);
            bins[bin_idx].push((pred, outcome));
        }

        let mut reliability_bins = Vec::new();
        let mut ece = 0.0;
        let mut mce: f64 = 0.0;
        let n = predictions.len() as f64;

        for bin in bins.iter().filter(|b| !b.is_empty()) {
            let count = bin.len() as f64;
            let avg_predicted = bin.iter().map(|(p, _)| p).sum::<f64>() / count;
            let actual_positive_rate = bin.iter().filter(|(_, o)| *o).count() as f64 / count;
            let calibration_error = (avg_predicted - actual_positive_rate).abs();

            ece += calibration_error * count / n;
            mce = mce.max(calibration_error);

            reliability_bins.push(ReliabilityBin {
                avg_predicted,
                actual_positive_rate,
                count: bin.len(),
            });
        }

        let brier_score = predictions
            .iter()
            .map(|&(pred, outcome)| {
                let y = if outcome { 1.0 } else { 0.0 };
                (pred - y).powi(2)
            })
            .sum::<f64>()
            / n;

        Ok(Self {
            ece,
            mce,
            brier_score,
            sample_size: predictions.len(),
            method,
            reliability_bins,
        })
    }
}

/// Classifier wrapper applying a calibration mapping before thresholding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratedClassifier {
    mapping: CalibrationMapping,
    /// When false, raw scores are used as probabilities unchanged
    pub enabled: bool,
    /// Decision threshold on the probability
    pub threshold: f64,
    /// Allowed excursion outside a method's domain before rejecting
    pub tolerance: f64,
}

impl CalibratedClassifier {
    pub fn new(mapping: CalibrationMapping) -> Self {
        Self {
            mapping,
            enabled: true,
            threshold: DEFAULT_THRESHOLD,
            tolerance: DEFAULT_DOMAIN_TOLERANCE,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> StatsResult<Self> {
        stats_core::summary::check_probability(threshold, "classification threshold")?;
        self.threshold = threshold;
        Ok(self)
    }

    pub fn with_calibration(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> StatsResult<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(StatsError::InvalidInput(format!(
                "domain tolerance must be finite and non-negative, got {}",
                tolerance
            )));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    pub fn mapping(&self) -> &CalibrationMapping {
        &self.mapping
    }

    /// Calibrated probability for `raw`, honoring the configured switch.
    pub fn probability(&self, raw: f64) -> StatsResult<f64> {
        self.probability_with(raw, self.enabled)
    }

    /// Calibrated probability for `raw` with calibration switched per call.
    pub fn probability_with(&self, raw: f64, enabled: bool) -> StatsResult<f64> {
        if !enabled {
            if !raw.is_finite() {
                return Err(StatsError::InvalidInput(format!(
                    "raw score must be finite, got {}",
                    raw
                )));
            }
            return Ok(raw);
        }
        self.mapping.apply_with_tolerance(raw, self.tolerance)
    }

    pub fn classify(&self, raw: f64) -> StatsResult<CalibratedPrediction> {
        self.classify_with(raw, self.enabled)
    }

    /// Probability plus the thresholded decision.
    pub fn classify_with(&self, raw: f64, enabled: bool) -> StatsResult<CalibratedPrediction> {
        let probability = self.probability_with(raw, enabled)?;
        let method = self.mapping.method();
        let shift = if enabled && method == CalibrationMethod::PlattScaling {
            None
        } else {
            Some(CalibrationShift::between(raw, probability))
        };
        Ok(CalibratedPrediction {
            raw_score: raw,
            probability,
            calibrated: enabled,
            positive: probability >= self.threshold,
            method,
            shift,
        })
    }

    /// Calibration quality of this classifier on held-out `(raw_score, outcome)` pairs.
    pub fn evaluate(&self, samples: &[(f64, bool)]) -> StatsResult<CalibrationStats> {
        let probabilities = samples
            .iter()
            .map(|&(raw, outcome)| Ok((self.probability(raw)?, outcome)))
            .collect::<StatsResult<Vec<_>>>()?;
        let method = if self.enabled {
            self.mapping.method()
        } else {
            CalibrationMethod::None
        };
        CalibrationStats::from_probabilities(&probabilities, method)
    }
}
