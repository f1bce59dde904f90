//! Confidence Calibrator Module
//!
//! Maps raw classifier scores to calibrated probabilities.
//! Implements Platt scaling, isotonic regression and temperature scaling,
//! with fitting from held-out predictions and calibration diagnostics.

pub mod calibrator;
pub mod fit;
pub mod mapping;

pub use calibrator::{
    CalibratedClassifier, CalibratedPrediction, CalibrationShift, CalibrationStats,
    ReliabilityBin, DEFAULT_THRESHOLD,
};
pub use fit::{fit, fit_isotonic, fit_platt, fit_temperature, MIN_FIT_SAMPLES};
pub use mapping::{CalibrationMapping, CalibrationMethod, MappingSpec, DEFAULT_DOMAIN_TOLERANCE};
