// Commandline argument parser using clap for wavelog

use crate::config::{ConfigError, FilterCriteria, OutlierPolicy, PipelineConfig};

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct WaveArgs {
    #[command(subcommand, long_about)]
    /// Which task to perform
    pub command: CommandTask,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Filter wave logs and summarize what is left
    #[command(about)]
    Analyze(AnalyzeCommand),

    /// Compare a wave log against NOAA tide data
    #[command(about)]
    Tide(TideCommand),

    /// Find the dominant wave periods in a log
    #[command(about)]
    Spectrum(SpectrumCommand),

    /// Write a synthetic wave log
    #[command(about)]
    Simulate(SimulateCommand),

    /// Play a captured presence-detector transcript through the gauges
    #[command(about)]
    Replay(ReplayCommand),
}

/// Filter settings shared by every command that runs the pipeline. A RON
/// config file, when given, supplies anything not set by a flag.
#[derive(Debug, Args, Clone)]
pub struct FilterArgs {
    /// RON file holding a full pipeline configuration
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Start of the time window, in seconds after the first record
    #[arg(short = 's', long = "start")]
    pub start: Option<f64>,

    /// End of the time window, in seconds after the first record
    #[arg(short = 'e', long = "end")]
    pub end: Option<f64>,

    /// Lowest signal quality to keep
    #[arg(short = 'q', long = "quality", allow_negative_numbers = true)]
    pub quality: Option<f64>,

    /// Odd window size for local outlier detection, enables the stage
    #[arg(short = 'w', long = "window")]
    pub window: Option<usize>,

    /// IQR multiplier for outlier detection, 3.0 when only --window is given
    #[arg(short = 'k', long = "iqr")]
    pub iqr: Option<f64>,
}

/// Used when neither a flag nor a config file sets a value: the first two
/// days of a deployment, with a quality floor of -102.
pub const DEFAULT_CRITERIA: FilterCriteria = FilterCriteria {
    start_seconds: 0.0,
    end_seconds: 48.0 * 3600.0,
    quality_threshold: -102.0,
};

/// IQR multiplier used when only a window size is given.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 3.0;

impl FilterArgs {
    /// Build and validate the pipeline configuration these flags describe.
    pub fn to_config(&self) -> Result<PipelineConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => PipelineConfig::from_path(path)?,
            None => PipelineConfig {
                criteria: DEFAULT_CRITERIA,
                outliers: None,
            },
        };

        let criteria = FilterCriteria {
            start_seconds: self.start.unwrap_or(base.criteria.start_seconds),
            end_seconds: self.end.unwrap_or(base.criteria.end_seconds),
            quality_threshold: self.quality.unwrap_or(base.criteria.quality_threshold),
        };

        let outliers = match (self.window, self.iqr, base.outliers) {
            (None, None, existing) => existing,
            (window, iqr, existing) => {
                let window_size = window
                    .or(existing.map(|p| p.window_size))
                    .ok_or(ConfigError::MissingWindowSize)?;
                let iqr_multiplier = iqr
                    .or(existing.map(|p| p.iqr_multiplier))
                    .unwrap_or(DEFAULT_IQR_MULTIPLIER);
                Some(OutlierPolicy {
                    window_size,
                    iqr_multiplier,
                })
            }
        };

        let config = PipelineConfig { criteria, outliers };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct AnalyzeCommand {
    /// Wave logs to process
    #[clap(num_args = 1.., required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Write the kept points as tab-separated `seconds height` here
    #[arg(short = 'o', long = "out")]
    pub out: Option<PathBuf>,

    /// Write a RON report of the statistics and summary here
    #[arg(short = 'r', long = "report")]
    pub report: Option<PathBuf>,

    /// Sensor elevation in meters, turns distances into water levels
    #[arg(long = "elevation")]
    pub elevation: Option<f64>,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct TideCommand {
    /// Wave log to compare
    pub wave: PathBuf,

    /// NOAA predictions table or JSON export
    pub tide: PathBuf,

    /// Treat the tide file as JSON regardless of its content
    #[arg(long = "json")]
    pub json: bool,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Sensor elevation in meters, defaults to the log header's value
    #[arg(long = "elevation")]
    pub elevation: Option<f64>,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct SpectrumCommand {
    /// Wave log to analyze
    pub file: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Lowest trial frequency, in Hz
    #[arg(long = "min-freq", default_value_t = 0.01)]
    pub min_freq: f64,

    /// Highest trial frequency, in Hz, clipped to the Nyquist estimate
    #[arg(long = "max-freq", default_value_t = 2.0)]
    pub max_freq: f64,

    /// Number of trial frequencies
    #[arg(long = "freqs", default_value_t = 2000)]
    pub freqs: usize,

    /// Space the trial frequencies logarithmically
    #[arg(long = "log")]
    pub log: bool,

    /// How many peaks to report
    #[arg(long = "peaks", default_value_t = 5)]
    pub peaks: usize,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct SimulateCommand {
    /// Filename for the synthetic log to be written to
    #[arg(short = 'o', long = "out")]
    pub out: PathBuf,

    /// Number of readings
    #[arg(short = 'n', long = "samples", default_value_t = 600)]
    pub samples: usize,

    /// Readings per second
    #[arg(long = "rate", default_value_t = 10.0)]
    pub rate: f64,

    /// Swell amplitude, in meters
    #[arg(long = "amplitude", default_value_t = 0.15)]
    pub amplitude: f64,

    /// Swell period, in seconds
    #[arg(long = "period", default_value_t = 8.0)]
    pub period: f64,

    /// Share of low-quality readings
    #[arg(long = "low-quality", default_value_t = 0.0)]
    pub low_quality: f64,

    /// Share of spikes
    #[arg(long = "spikes", default_value_t = 0.0)]
    pub spikes: f64,

    /// Share of truncated lines
    #[arg(long = "corrupt", default_value_t = 0.0)]
    pub corrupt: f64,

    /// Start the log with a settings header
    #[arg(long = "header")]
    pub header: bool,

    /// Random seed
    #[arg(long = "seed", default_value_t = 0)]
    pub seed: u64,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct ReplayCommand {
    /// Raw serial capture from the presence detector
    pub transcript: PathBuf,
}
