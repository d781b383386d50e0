//! Bookkeeping for a pipeline run: how many lines went in, where each one
//! dropped out, and some descriptive statistics over what was left.

use crate::record::MeasurementSeries;
use crate::stats;

use serde::Serialize;

/// Per-stage counters for one pipeline run.
///
/// Every line of the input ends up in exactly one bucket, so
/// `total_seen == rejected_lines + excluded_by_time_window +
/// excluded_by_quality + excluded_by_outlier_detection + retained`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Lines read from the log.
    pub total_seen: usize,
    /// Lines that did not match the measurement grammar.
    pub rejected_lines: usize,
    /// Records outside the configured time window.
    pub excluded_by_time_window: usize,
    /// Records whose quality was below the threshold.
    pub excluded_by_quality: usize,
    /// Records flagged by the outlier detector.
    pub excluded_by_outlier_detection: usize,
    /// Records in the final series.
    pub retained: usize,
}

impl PipelineStats {
    /// Records that matched the grammar, whatever happened to them after.
    pub fn parsed(&self) -> usize {
        self.total_seen - self.rejected_lines
    }

    /// Sum of every bucket; equals `total_seen` for a finished run.
    pub fn accounted(&self) -> usize {
        self.rejected_lines
            + self.excluded_by_time_window
            + self.excluded_by_quality
            + self.excluded_by_outlier_detection
            + self.retained
    }
}

/// Mean, minimum and maximum of the surviving heights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeightStats {
    /// Mean height in meters.
    pub mean: f64,
    /// Smallest height in meters.
    pub min: f64,
    /// Largest height in meters.
    pub max: f64,
}

/// What the pipeline reports back about a run. Every statistic that needs at
/// least one record is `None` when nothing was retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Stage counters.
    pub stats: PipelineStats,
    /// Height statistics over the final series.
    pub heights: Option<HeightStats>,
    /// Mean reported quality over the final series.
    pub mean_quality: Option<f64>,
    /// Seconds between the first and last retained record.
    pub time_span_seconds: Option<f64>,
    /// Average sampling rate, `1 / mean(dt)`. Needs two records with
    /// distinct timestamps.
    pub sampling_rate_hz: Option<f64>,
}

impl Summary {
    /// Aggregate `series` together with the counters that produced it.
    pub fn of(series: &MeasurementSeries, stats: PipelineStats) -> Self {
        let heights = series.heights();
        let height_stats = stats::mean(&heights).map(|mean| HeightStats {
            mean,
            min: heights.iter().copied().fold(f64::INFINITY, f64::min),
            max: heights.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        });

        let elapsed = series.elapsed_seconds_all();
        let time_span_seconds = match (elapsed.first(), elapsed.last()) {
            (Some(first), Some(last)) => Some(last - first),
            _ => None,
        };
        let sampling_rate_hz = time_span_seconds
            .filter(|span| elapsed.len() > 1 && *span > 0.0)
            .map(|span| (elapsed.len() - 1) as f64 / span);

        Self {
            stats,
            heights: height_stats,
            mean_quality: stats::mean(&series.qualities()),
            time_span_seconds,
            sampling_rate_hz,
        }
    }
}
