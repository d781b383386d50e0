//! Pipeline configuration. Every knob the pipeline has lives here and is
//! passed in explicitly; a config is checked once by
//! [`PipelineConfig::validate`] and never adjusted afterwards.
//!
//! Configs can be written by hand in [ron]:
//!
//! ```text
//! (
//!     criteria: (start_seconds: 0.0, end_seconds: 172800.0, quality_threshold: -102.0),
//!     outliers: Some((window_size: 21, iqr_multiplier: 3.0)),
//! )
//! ```
//!
//! Leaving `outliers` out turns the outlier stage off.

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, fs::File, io::Read, path::Path};

/// Which records to keep, by time and by reported quality.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct FilterCriteria {
    /// Start of the retained window, seconds after the first record. Inclusive.
    pub start_seconds: f64,
    /// End of the retained window, seconds after the first record. Inclusive.
    pub end_seconds: f64,
    /// Records with `quality >= quality_threshold` are kept.
    pub quality_threshold: f64,
}

/// Parameters of the two-pass IQR outlier detector.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct OutlierPolicy {
    /// Width of the centered local window, odd and at least 1.
    pub window_size: usize,
    /// How many IQRs away from the quartiles (global pass) or the local
    /// median (local pass) a height may sit before it is an outlier.
    pub iqr_multiplier: f64,
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Time window and quality threshold.
    pub criteria: FilterCriteria,
    /// Outlier detection, or `None` to skip that stage.
    pub outliers: Option<OutlierPolicy>,
}

/// Why a [`PipelineConfig`] was refused.
#[derive(Debug)]
pub enum ConfigError {
    /// A bound or threshold is NaN or infinite.
    NonFinite(&'static str),

    /// `end_seconds` is before `start_seconds`.
    InvertedTimeWindow {
        /// The configured start.
        start_seconds: f64,
        /// The configured end.
        end_seconds: f64,
    },

    /// The outlier window has no centre because its size is even or zero.
    InvalidWindowSize(usize),

    /// The IQR multiplier is zero, negative, or not a number.
    InvalidIqrMultiplier(f64),

    /// An IQR multiplier was given but nothing set a window size.
    MissingWindowSize,

    /// Returned when the config file cannot be read.
    IoError(std::io::Error),

    /// Returned when the config file is not valid ron for a [`PipelineConfig`].
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError as CE;
        let msg = match self {
            CE::NonFinite(field) => Cow::from(format!("{} must be a finite number", field)),
            CE::InvertedTimeWindow {
                start_seconds,
                end_seconds,
            } => Cow::from(format!(
                "end_seconds ({}) is before start_seconds ({})",
                end_seconds, start_seconds
            )),
            CE::InvalidWindowSize(size) => Cow::from(format!(
                "window_size must be an odd number of at least 1, got {}",
                size
            )),
            CE::InvalidIqrMultiplier(k) => {
                Cow::from(format!("iqr_multiplier must be greater than 0, got {}", k))
            }
            CE::MissingWindowSize => {
                Cow::from("an iqr multiplier needs a window_size for outlier detection")
            }
            CE::IoError(error) => Cow::from(format!("io error: {}", error)),
            CE::RonSpannedError(error) => Cow::from(format!("ron error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<ron::de::SpannedError> for ConfigError {
    fn from(value: ron::de::SpannedError) -> Self {
        Self::RonSpannedError(value)
    }
}

impl FilterCriteria {
    /// Check the window and threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.start_seconds.is_finite() {
            return Err(ConfigError::NonFinite("start_seconds"));
        }
        if !self.end_seconds.is_finite() {
            return Err(ConfigError::NonFinite("end_seconds"));
        }
        if !self.quality_threshold.is_finite() {
            return Err(ConfigError::NonFinite("quality_threshold"));
        }
        if self.end_seconds < self.start_seconds {
            return Err(ConfigError::InvertedTimeWindow {
                start_seconds: self.start_seconds,
                end_seconds: self.end_seconds,
            });
        }
        Ok(())
    }
}

impl OutlierPolicy {
    /// Check the window size and multiplier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(ConfigError::InvalidWindowSize(self.window_size));
        }
        // NaN fails this comparison too
        if !(self.iqr_multiplier > 0.0) || !self.iqr_multiplier.is_finite() {
            return Err(ConfigError::InvalidIqrMultiplier(self.iqr_multiplier));
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.criteria.validate()?;
        if let Some(policy) = &self.outliers {
            policy.validate()?;
        }
        Ok(())
    }

    /// Read and validate a config from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut handle = File::open(path)?;
        Self::from_file(&mut handle)
    }

    /// Read and validate a config from the [Read]able object provided.
    pub fn from_file(file: &mut impl Read) -> Result<Self, ConfigError> {
        let mut raw_text = Vec::new();
        file.read_to_end(&mut raw_text)?;

        let config = ron::de::from_bytes::<PipelineConfig>(&raw_text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the config as pretty ron, for writing next to a report.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}
