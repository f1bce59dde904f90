use anyhow::{bail, Context, Result};
use confidence_calibrator::{DEFAULT_DOMAIN_TOLERANCE, DEFAULT_THRESHOLD};
use multiple_testing::{ScreenConfig, DEFAULT_ALPHA};
use serde::{Deserialize, Serialize};
use stats_core::EffectDirection;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    // Multiple testing
    pub alpha: f64,                       // 0.10
    pub direction: EffectDirection,       // negative = synthetic lethal
    pub min_group_size: usize,            // 3 cell lines per group

    // Calibration
    pub calibration_enabled: bool,        // true
    pub threshold: f64,                   // 0.5
    pub tolerance: f64,                   // 0.05

    // Paths
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            direction: EffectDirection::Negative,
            min_group_size: 3,
            calibration_enabled: true,
            threshold: DEFAULT_THRESHOLD,
            tolerance: DEFAULT_DOMAIN_TOLERANCE,
            input: None,
            output: None,
        }
    }
}

fn parse_direction(value: &str) -> Result<EffectDirection> {
    match EffectDirection::parse(value) {
        Some(direction) => Ok(direction),
        None => bail!("direction must be 'negative' or 'positive', got '{}'", value),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a String>> {
    let Some(i) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    match args.get(i + 1) {
        Some(v) if !v.starts_with("--") => Ok(Some(v)),
        _ => bail!("{} requires a value", flag),
    }
}

impl ReportConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            alpha: match lookup("SCREEN_ALPHA") {
                Some(v) => v.parse().context("SCREEN_ALPHA must be a number")?,
                None => defaults.alpha,
            },
            direction: match lookup("SCREEN_DIRECTION") {
                Some(v) => parse_direction(&v)?,
                None => defaults.direction,
            },
            min_group_size: match lookup("SCREEN_MIN_GROUP_SIZE") {
                Some(v) => v.parse().context("SCREEN_MIN_GROUP_SIZE must be an integer")?,
                None => defaults.min_group_size,
            },
            calibration_enabled: match lookup("CALIBRATION_ENABLED") {
                Some(v) => v.parse().context("CALIBRATION_ENABLED must be true or false")?,
                None => defaults.calibration_enabled,
            },
            threshold: match lookup("CLASSIFICATION_THRESHOLD") {
                Some(v) => v.parse().context("CLASSIFICATION_THRESHOLD must be a number")?,
                None => defaults.threshold,
            },
            tolerance: match lookup("CALIBRATION_TOLERANCE") {
                Some(v) => v.parse().context("CALIBRATION_TOLERANCE must be a number")?,
                None => defaults.tolerance,
            },
            input: lookup("SCREEN_INPUT").map(PathBuf::from),
            output: lookup("SCREEN_OUTPUT").map(PathBuf::from),
        };

        Ok(config)
    }

    /// Command-line flags override the environment.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        let value_of = |flag: &str| flag_value(args, flag);

        if let Some(v) = value_of("--input")? {
            self.input = Some(PathBuf::from(v));
        }
        if let Some(v) = value_of("--output")? {
            self.output = Some(PathBuf::from(v));
        }
        if let Some(v) = value_of("--alpha")? {
            self.alpha = v.parse().with_context(|| format!("invalid --alpha '{}'", v))?;
        }
        if let Some(v) = value_of("--direction")? {
            self.direction = parse_direction(v)?;
        }
        if let Some(v) = value_of("--min-group-size")? {
            self.min_group_size = v
                .parse()
                .with_context(|| format!("invalid --min-group-size '{}'", v))?;
        }
        if let Some(v) = value_of("--threshold")? {
            self.threshold = v
                .parse()
                .with_context(|| format!("invalid --threshold '{}'", v))?;
        }
        if let Some(v) = value_of("--tolerance")? {
            self.tolerance = v
                .parse()
                .with_context(|| format!("invalid --tolerance '{}'", v))?;
        }
        if args.iter().any(|a| a == "--no-calibration") {
            self.calibration_enabled = false;
        }

        Ok(())
    }

    pub fn screen_config(&self) -> ScreenConfig {
        ScreenConfig {
            alpha: self.alpha,
            direction: self.direction,
            min_group_size: self.min_group_size,
        }
    }
}
