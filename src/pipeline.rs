//! The wave-log pipeline: parse, anchor to the first record and clip to
//! the time window, drop low-quality readings, optionally drop outliers,
//! and summarize what is left.
//!
//! ```no_run
//! use watersense::config::{FilterCriteria, PipelineConfig};
//! use watersense::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new(PipelineConfig {
//!     criteria: FilterCriteria {
//!         start_seconds: 0.0,
//!         end_seconds: 3600.0,
//!         quality_threshold: -102.0,
//!     },
//!     outliers: None,
//! })
//! .unwrap();
//!
//! let output = pipeline.run_path("mbari.txt").unwrap();
//! println!("{:?}", output.summary);
//! ```

use crate::config::{ConfigError, PipelineConfig};
use crate::log_header::LogHeader;
use crate::outliers::OutlierDetector;
use crate::quality_filter::QualityFilter;
use crate::record::MeasurementSeries;
use crate::stage::{run_stages, Stage};
use crate::summary::{PipelineStats, Summary};
use crate::time_window::{normalize, TimeWindow};
use crate::wave_log_parser::WaveLogParser;

use log::{debug, info};
use std::{
    borrow::Cow,
    fmt,
    fs::File,
    io::Read,
    path::Path,
};

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Settings block from the top of the log, possibly empty.
    pub header: LogHeader,
    /// The records that survived every stage.
    pub series: MeasurementSeries,
    /// Where every input line ended up.
    pub stats: PipelineStats,
    /// Descriptive statistics over `series`.
    pub summary: Summary,
}

/// Returned when a log cannot be run through the pipeline at all. Bad lines
/// inside a readable log are never an error.
#[derive(Debug)]
pub enum PipelineError {
    /// Returned when the log file cannot be opened or read.
    IoError(std::io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            PipelineError::IoError(error) => Cow::from(format!("io error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

/// A validated configuration, ready to process any number of logs. Runs
/// share nothing, so one `Pipeline` can be used from several threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Check `config` and build a pipeline from it.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the log at `path`. The file is closed before this returns.
    pub fn run_path(&self, path: impl AsRef<Path>) -> Result<PipelineOutput, PipelineError> {
        let path = path.as_ref();
        debug!("Reading wave log {}", path.display());
        let mut handle = File::open(path)?;
        self.run_reader(&mut handle)
    }

    /// Run the log in the [Read]able object provided.
    pub fn run_reader(&self, reader: &mut impl Read) -> Result<PipelineOutput, PipelineError> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        Ok(self.run_bytes(&raw))
    }

    /// Run a log that is already in memory. Cannot fail: anything that does
    /// not parse is counted and skipped.
    pub fn run_bytes(&self, bytes: &[u8]) -> PipelineOutput {
        let header = LogHeader::parse(bytes);

        let mut parser = WaveLogParser::new(bytes);
        let mut records: Vec<_> = parser.by_ref().collect();
        let mut stats = PipelineStats {
            total_seen: parser.lines_seen(),
            rejected_lines: parser.lines_rejected(),
            ..PipelineStats::default()
        };
        debug!(
            "Parsed {} records from {} lines.",
            records.len(),
            stats.total_seen
        );

        let Some(origin) = normalize(&mut records) else {
            info!("No valid data found in the log.");
            let series = MeasurementSeries::empty();
            let summary = Summary::of(&series, stats);
            return PipelineOutput {
                header,
                series,
                stats,
                summary,
            };
        };

        let criteria = &self.config.criteria;
        let window = TimeWindow::new(criteria, origin);
        let quality = QualityFilter::new(criteria.quality_threshold);
        let detector = self.config.outliers.map(OutlierDetector::new);

        let mut stages: Vec<&dyn Stage> = vec![&window, &quality];
        if let Some(detector) = &detector {
            stages.push(detector);
        }

        let kept = run_stages(&stages, records, &mut stats);
        stats.retained = kept.len();

        // Every stage keeps order, and `normalize` sorted the input
        let series = MeasurementSeries::new(origin, kept).unwrap_or_else(MeasurementSeries::empty);
        let summary = Summary::of(&series, stats);

        info!(
            "Kept {} of {} lines ({} malformed, {} outside the window, {} low quality, {} outliers).",
            stats.retained,
            stats.total_seen,
            stats.rejected_lines,
            stats.excluded_by_time_window,
            stats.excluded_by_quality,
            stats.excluded_by_outlier_detection
        );

        PipelineOutput {
            header,
            series,
            stats,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterCriteria, OutlierPolicy};
    use crate::synthetic::SyntheticLog;
    use std::io::Write;

    const SCENARIO: &str = "[24/11/15 02:39:01.000] 1.234 m, 5.0\n\
        [24/11/15 02:39:02.000] 1.300 m, -200.0\n\
        garbage line\n\
        [24/11/15 02:39:03.000] 1.210 m, 6.0\n";

    fn pipeline(start: f64, end: f64, threshold: f64, outliers: Option<OutlierPolicy>) -> Pipeline {
        Pipeline::new(PipelineConfig {
            criteria: FilterCriteria {
                start_seconds: start,
                end_seconds: end,
                quality_threshold: threshold,
            },
            outliers,
        })
        .unwrap()
    }

    #[test]
    fn scenario_drops_garbage_and_low_quality() {
        let output = pipeline(0.0, 10.0, 0.0, None).run_bytes(SCENARIO.as_bytes());

        assert_eq!(output.stats.total_seen, 4);
        assert_eq!(output.stats.rejected_lines, 1);
        assert_eq!(output.stats.parsed(), 3);
        assert_eq!(output.stats.excluded_by_quality, 1);
        assert_eq!(output.stats.retained, 2);
        assert_eq!(output.series.heights(), vec![1.234, 1.210]);
        assert_eq!(output.series.elapsed_seconds_all(), vec![0.0, 2.0]);
    }

    #[test]
    fn window_edges_are_kept() {
        let output = pipeline(1.0, 2.0, -1000.0, None).run_bytes(SCENARIO.as_bytes());

        assert_eq!(output.series.elapsed_seconds_all(), vec![1.0, 2.0]);
        assert_eq!(output.stats.excluded_by_time_window, 1);
    }

    #[test]
    fn origin_is_first_parsed_record_not_first_line() {
        let log = "Elevation: 3.2\n---\ngarbage\n[24/11/15 02:39:05.500] 1.000 m, 5.0\n\
                   [24/11/15 02:39:06.000] 1.000 m, 5.0\n";
        let output = pipeline(0.0, 10.0, 0.0, None).run_bytes(log.as_bytes());

        assert_eq!(output.series.elapsed_seconds_all(), vec![0.0, 0.5]);
        assert_eq!(output.header.elevation_m(), Some(3.2));
        assert_eq!(output.stats.rejected_lines, 3);
    }

    #[test]
    fn origin_stays_on_first_record_when_clock_steps_back() {
        let log = "[24/11/15 02:39:05.000] 1.000 m, 5.0\n\
                   [24/11/15 02:39:01.000] 2.000 m, 5.0\n\
                   [24/11/15 02:39:05.500] 3.000 m, 5.0\n";

        let output = pipeline(0.0, 1.0, 0.0, None).run_bytes(log.as_bytes());

        assert_eq!(output.series.origin(), output.series.records().first().map(|r| r.timestamp()));
        assert_eq!(output.series.heights(), vec![1.0, 3.0]);
        assert_eq!(output.series.elapsed_seconds_all(), vec![0.0, 0.5]);
        assert_eq!(output.stats.excluded_by_time_window, 1);
        assert_eq!(output.stats.accounted(), output.stats.total_seen);
    }

    #[test]
    fn empty_log_is_not_an_error() {
        let output = pipeline(0.0, 10.0, 0.0, None).run_bytes(b"nothing\nto see\n");

        assert!(output.series.is_empty());
        assert_eq!(output.stats.retained, 0);
        assert_eq!(output.stats.total_seen, 2);
        assert_eq!(output.summary.heights, None);
        assert_eq!(output.summary.mean_quality, None);
    }

    #[test]
    fn outlier_stage_runs_when_configured() {
        let log = [1.0, 1.01, 1.02, 5.0, 1.03, 1.02]
            .iter()
            .enumerate()
            .map(|(i, h)| format!("[24/11/15 02:39:0{}.000] {:.3} m, 5.0\n", i, h))
            .collect::<String>();
        let policy = OutlierPolicy {
            window_size: 3,
            iqr_multiplier: 1.5,
        };

        let output = pipeline(0.0, 10.0, 0.0, Some(policy)).run_bytes(log.as_bytes());

        assert_eq!(output.series.heights(), vec![1.0, 1.01, 1.02, 1.03, 1.02]);
        assert_eq!(output.stats.excluded_by_outlier_detection, 1);
        assert_eq!(output.stats.accounted(), output.stats.total_seen);
    }

    #[test]
    fn every_line_is_accounted_for() {
        let log = SyntheticLog::builder()
            .samples(2_000)
            .low_quality_fraction(0.1)
            .spike_fraction(0.02)
            .corrupt_fraction(0.05)
            .seed(7)
            .build()
            .render();
        let policy = OutlierPolicy {
            window_size: 21,
            iqr_multiplier: 3.0,
        };

        let output = pipeline(10.0, 150.0, 0.0, Some(policy)).run_bytes(log.as_bytes());

        let stats = output.stats;
        assert_eq!(stats.accounted(), stats.total_seen);
        assert!(stats.rejected_lines > 0);
        assert!(stats.excluded_by_time_window > 0);
        assert!(stats.excluded_by_quality > 0);
        assert!(stats.excluded_by_outlier_detection > 0);
        assert!(stats.retained > 0);

        let elapsed = output.series.elapsed_seconds_all();
        assert!(elapsed.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn running_twice_gives_identical_results() {
        let log = SyntheticLog::builder().samples(500).seed(3).build().render();
        let p = pipeline(0.0, 1e6, 0.0, Some(OutlierPolicy {
            window_size: 5,
            iqr_multiplier: 2.0,
        }));

        let first = p.run_bytes(log.as_bytes());
        let second = p.run_bytes(log.as_bytes());

        assert_eq!(first, second);
    }

    #[test]
    fn reads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();

        let output = pipeline(0.0, 10.0, 0.0, None).run_path(file.path()).unwrap();

        assert_eq!(output.stats.retained, 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = pipeline(0.0, 10.0, 0.0, None).run_path(dir.path().join("missing.txt"));
        assert!(matches!(result, Err(PipelineError::IoError(_))));
    }

    #[test]
    fn invalid_config_is_refused_up_front() {
        let result = Pipeline::new(PipelineConfig {
            criteria: FilterCriteria {
                start_seconds: 0.0,
                end_seconds: 10.0,
                quality_threshold: 0.0,
            },
            outliers: Some(OutlierPolicy {
                window_size: 4,
                iqr_multiplier: 1.5,
            }),
        });
        assert!(matches!(result, Err(ConfigError::InvalidWindowSize(4))));
    }
}
