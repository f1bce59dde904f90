//! Calibration mappings
//!
//! A mapping is validated once at construction and is immutable afterwards;
//! applying it is a pure function of the raw score.

use serde::{Deserialize, Serialize};
use stats_core::{StatsError, StatsResult};

/// Default absolute distance outside a method's domain that is clamped
/// (and logged) instead of rejected.
pub const DEFAULT_DOMAIN_TOLERANCE: f64 = 0.05;

/// Probabilities are kept this far from 0 and 1 before taking a logit.
const LOGIT_EPS: f64 = 1e-12;

/// Method used for calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    /// Platt scaling - fits a sigmoid to the scores
    PlattScaling,
    /// Isotonic regression - non-parametric monotonic fit
    IsotonicRegression,
    /// Temperature scaling - single parameter scaling
    TemperatureScaling,
    /// No calibration applied
    None,
}

impl CalibrationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationMethod::PlattScaling => "platt_scaling",
            CalibrationMethod::IsotonicRegression => "isotonic_regression",
            CalibrationMethod::TemperatureScaling => "temperature_scaling",
            CalibrationMethod::None => "none",
        }
    }
}

/// Serialized form of a mapping; converted into a validated [`CalibrationMapping`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MappingSpec {
    /// `1 / (1 + exp(a * raw + b))`
    Platt { a: f64, b: f64 },
    /// Control points `(raw_score, calibrated_probability)`
    Isotonic { points: Vec<(f64, f64)> },
    /// `sigmoid(logit(raw) / temperature)`
    Temperature { temperature: f64 },
    /// Raw score passes through unchanged
    None,
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Platt { a: f64, b: f64 },
    Isotonic { points: Vec<(f64, f64)> },
    Temperature { temperature: f64 },
    Identity,
}

/// A fitted, validated score-to-probability mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MappingSpec", into = "MappingSpec")]
pub struct CalibrationMapping {
    kind: Kind,
}

impl CalibrationMapping {
    pub fn identity() -> Self {
        Self { kind: Kind::Identity }
    }

    pub fn platt(a: f64, b: f64) -> StatsResult<Self> {
        if !a.is_finite() || !b.is_finite() {
            return Err(StatsError::InvalidInput(format!(
                "Platt parameters must be finite, got A={} B={}",
                a, b
            )));
        }
        Ok(Self { kind: Kind::Platt { a, b } })
    }

    /// Isotonic mapping from control points, non-decreasing in both coordinates.
    pub fn isotonic(points: Vec<(f64, f64)>) -> StatsResult<Self> {
        if points.is_empty() {
            return Err(StatsError::InvalidInput(
                "isotonic mapping needs at least one control point".to_string(),
            ));
        }
        for (i, &(x, y)) in points.iter().enumerate() {
            if !x.is_finite() {
                return Err(StatsError::InvalidInput(format!(
                    "control point #{} has non-finite score {}",
                    i, x
                )));
            }
            stats_core::summary::check_probability(y, &format!("control point #{} probability", i))?;
        }
        for (i, w) in points.windows(2).enumerate() {
            if w[1].0 < w[0].0 || w[1].1 < w[0].1 {
                return Err(StatsError::InvalidInput(format!(
                    "control points must be non-decreasing, violated between #{} and #{}",
                    i,
                    i + 1
                )));
            }
        }
        Ok(Self { kind: Kind::Isotonic { points } })
    }

    pub fn temperature(temperature: f64) -> StatsResult<Self> {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(StatsError::InvalidInput(format!(
                "temperature must be finite and positive, got {}",
                temperature
            )));
        }
        Ok(Self { kind: Kind::Temperature { temperature } })
    }

    pub fn method(&self) -> CalibrationMethod {
        match self.kind {
            Kind::Platt { .. } => CalibrationMethod::PlattScaling,
            Kind::Isotonic { .. } => CalibrationMethod::IsotonicRegression,
            Kind::Temperature { .. } => CalibrationMethod::TemperatureScaling,
            Kind::Identity => CalibrationMethod::None,
        }
    }

    /// Control points of an isotonic mapping
    pub fn control_points(&self) -> Option<&[(f64, f64)]> {
        match &self.kind {
            Kind::Isotonic { points } => Some(points),
            _ => None,
        }
    }

    /// Apply with [`DEFAULT_DOMAIN_TOLERANCE`].
    pub fn apply(&self, raw: f64) -> StatsResult<f64> {
        self.apply_with_tolerance(raw, DEFAULT_DOMAIN_TOLERANCE)
    }

    /// Map a raw score to a calibrated probability.
    ///
    /// Platt accepts any finite score. Isotonic clamps to its first/last
    /// control point. Temperature and identity need a probability: scores up to
    /// `tolerance` outside [0, 1] are clamped with a warning, anything further
    /// is `InvalidInput`.
    pub fn apply_with_tolerance(&self, raw: f64, tolerance: f64) -> StatsResult<f64> {
        if !raw.is_finite() {
            return Err(StatsError::InvalidInput(format!(
                "raw score must be finite, got {}",
                raw
            )));
        }

        let calibrated = match &self.kind {
            Kind::Identity => clamp_to_unit(raw, tolerance, self.method())?,
            Kind::Platt { a, b } => platt_sigmoid(*a, *b, raw),
            Kind::Isotonic { points } => isotonic_lookup(points, raw),
            Kind::Temperature { temperature } => {
                let p = clamp_to_unit(raw, tolerance, self.method())?;
                apply_temperature(p, *temperature)
            }
        };

        Ok(calibrated)
    }
}

impl TryFrom<MappingSpec> for CalibrationMapping {
    type Error = StatsError;

    fn try_from(spec: MappingSpec) -> Result<Self, Self::Error> {
        match spec {
            MappingSpec::Platt { a, b } => Self::platt(a, b),
            MappingSpec::Isotonic { points } => Self::isotonic(points),
            MappingSpec::Temperature { temperature } => Self::temperature(temperature),
            MappingSpec::None => Ok(Self::identity()),
        }
    }
}

impl From<CalibrationMapping> for MappingSpec {
    fn from(mapping: CalibrationMapping) -> Self {
        match mapping.kind {
            Kind::Platt { a, b } => MappingSpec::Platt { a, b },
            Kind::Isotonic { points } => MappingSpec::Isotonic { points },
            Kind::Temperature { temperature } => MappingSpec::Temperature { temperature },
            Kind::Identity => MappingSpec::None,
        }
    }
}

/// P(y=1|x) = 1 / (1 + exp(A*x + B))
pub(crate) fn platt_sigmoid(a: f64, b: f64, raw: f64) -> f64 {
    (1.0 / (1.0 + (a * raw + b).exp())).clamp(0.0, 1.0)
}

pub(crate) fn apply_temperature(confidence: f64, temperature: f64) -> f64 {
    // Convert probability to logit, scale, convert back
    let p = confidence.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    let logit = (p / (1.0 - p)).ln();
    1.0 / (1.0 + (-logit / temperature).exp())
}

fn clamp_to_unit(raw: f64, tolerance: f64, method: CalibrationMethod) -> StatsResult<f64> {
    if (0.0..=1.0).contains(&raw) {
        return Ok(raw);
    }
    let distance = if raw < 0.0 { -raw } else { raw - 1.0 };
    if distance <= tolerance {
        tracing::warn!(
            "Raw score {} slightly outside [0, 1] for {}, clamping",
            raw,
            method.as_str()
        );
        Ok(raw.clamp(0.0, 1.0))
    } else {
        Err(StatsError::InvalidInput(format!(
            "raw score {} outside [0, 1] for {} (tolerance {})",
            raw,
            method.as_str(),
            tolerance
        )))
    }
}

fn isotonic_lookup(points: &[(f64, f64)], value: f64) -> f64 {
    // First control point strictly above `value`
    let idx = points.partition_point(|&(x, _)| x <= value);

    if idx == 0 {
        if value < points[0].0 {
            tracing::debug!("Score {} below isotonic range, clamping to first point", value);
        }
        return points[0].1;
    }
    if idx == points.len() {
        let (last_x, last_y) = points[points.len() - 1];
        if value > last_x {
            tracing::debug!("Score {} above isotonic range, clamping to last point", value);
        }
        return last_y;
    }

    // Linear interpolation; x0 <= value < x1 so x1 > x0
    let (x0, y0) = points[idx - 1];
    let (x1, y1) = points[idx];
    let t = (value - x0) / (x1 - x0);
    y0 + t * (y1 - y0)
}
