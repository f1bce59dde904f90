//! Input document and structured report for one analysis run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use confidence_calibrator::{
    fit, CalibratedClassifier, CalibratedPrediction, CalibrationMapping, CalibrationMethod,
    CalibrationStats,
};
use multiple_testing::{
    correct, run_screen, split_by_direction, CorrectionReport, DependencyComparison,
    DirectionalSplit, ScreenResult,
};
use serde::{Deserialize, Serialize};
use stats_core::HypothesisTest;

use crate::config::ReportConfig;

/// Everything a run can be asked to do; each section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// Hypothesis tests with precomputed p-values
    #[serde(default)]
    pub tests: Vec<HypothesisTest>,
    /// Raw dependency scores to screen
    #[serde(default)]
    pub comparisons: Vec<DependencyComparison>,
    #[serde(default)]
    pub calibration: Option<CalibrationInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationInput {
    /// Pre-fitted mapping
    #[serde(default)]
    pub mapping: Option<CalibrationMapping>,
    /// Fit a mapping instead (takes precedence over `mapping`)
    #[serde(default)]
    pub fit: Option<FitRequest>,
    /// Raw classifier scores to calibrate and classify
    #[serde(default)]
    pub scores: Vec<f64>,
    /// Held-out `(raw_score, outcome)` pairs for calibration diagnostics
    #[serde(default)]
    pub holdout: Vec<(f64, bool)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitRequest {
    pub method: CalibrationMethod,
    pub samples: Vec<(f64, bool)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionSection {
    pub report: CorrectionReport,
    pub split: DirectionalSplit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSection {
    pub enabled: bool,
    pub threshold: f64,
    pub mapping: CalibrationMapping,
    pub predictions: Vec<CalibratedPrediction>,
    pub n_positive: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CalibrationStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub config: ReportConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<CorrectionSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<ScreenResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationSection>,
}

fn calibration_section(input: &CalibrationInput, config: &ReportConfig) -> Result<CalibrationSection> {
    let mapping = match (&input.fit, &input.mapping) {
        (Some(request), _) => fit(&request.samples, request.method)
            .with_context(|| format!("fitting {} calibration", request.method.as_str()))?,
        (None, Some(mapping)) => mapping.clone(),
        (None, None) => {
            tracing::warn!("No calibration mapping supplied, using identity");
            CalibrationMapping::identity()
        }
    };

    let classifier = CalibratedClassifier::new(mapping)
        .with_calibration(config.calibration_enabled)
        .with_threshold(config.threshold)
        .context("invalid classification threshold")?
        .with_tolerance(config.tolerance)
        .context("invalid calibration tolerance")?;

    let predictions = input
        .scores
        .iter()
        .enumerate()
        .map(|(i, &raw)| {
            classifier
                .classify(raw)
                .with_context(|| format!("calibrating score #{}", i))
        })
        .collect::<Result<Vec<_>>>()?;

    let stats = if input.holdout.is_empty() {
        None
    } else {
        Some(
            classifier
                .evaluate(&input.holdout)
                .context("evaluating calibration on holdout")?,
        )
    };

    Ok(CalibrationSection {
        enabled: classifier.enabled,
        threshold: classifier.threshold,
        n_positive: predictions.iter().filter(|p| p.positive).count(),
        mapping: classifier.mapping().clone(),
        predictions,
        stats,
    })
}

/// Run every section present in `input`.
pub fn build_report(input: &AnalysisInput, config: &ReportConfig) -> Result<AnalysisReport> {
    let correction = if input.tests.is_empty() {
        None
    } else {
        let report = correct(&input.tests, config.alpha).context("correcting hypothesis tests")?;
        let split = split_by_direction(&report, config.direction);
        tracing::info!(
            "Corrected {} tests: {} significant, {} in the {} direction",
            report.n_tests,
            report.n_rejected,
            split.n_candidates(),
            config.direction.as_str()
        );
        Some(CorrectionSection { report, split })
    };

    let screen = if input.comparisons.is_empty() {
        None
    } else {
        Some(
            run_screen(&input.comparisons, &config.screen_config())
                .context("running dependency screen")?,
        )
    };

    let calibration = match &input.calibration {
        Some(calibration) => Some(calibration_section(calibration, config)?),
        None => None,
    };

    if correction.is_none() && screen.is_none() && calibration.is_none() {
        tracing::warn!("Input contained nothing to analyze");
    }

    Ok(AnalysisReport {
        generated_at: Utc::now(),
        config: config.clone(),
        correction,
        screen,
        calibration,
    })
}
