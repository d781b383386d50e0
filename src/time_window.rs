//! Anchors parsed records to a common origin and clips them to the
//! configured window of elapsed seconds.

use crate::config::FilterCriteria;
use crate::record::MeasurementRecord;
use crate::stage::Stage;
use crate::summary::PipelineStats;

use chrono::NaiveDateTime;
use log::warn;
use std::fmt;

/// Put `records` in time order and return the origin for the run: the
/// first record in log order, taken before sorting. `None` when nothing
/// parsed.
///
/// A clock step backwards is reported and sorted away, keeping log order
/// between equal timestamps. Records stamped before the origin end up with
/// negative elapsed seconds and fall outside any window starting at zero.
pub fn normalize(records: &mut [MeasurementRecord]) -> Option<NaiveDateTime> {
    let origin = records.first().map(MeasurementRecord::timestamp);

    let out_of_order = records
        .windows(2)
        .filter(|pair| pair[1].timestamp() < pair[0].timestamp())
        .count();

    if out_of_order > 0 {
        warn!(
            "{} records were earlier than the record before them, sorting by timestamp",
            out_of_order
        );
        records.sort_by_key(MeasurementRecord::timestamp);
    }

    origin
}

/// Keeps records whose elapsed seconds fall inside
/// `[start_seconds, end_seconds]`, both ends inclusive.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    origin: NaiveDateTime,
    start_seconds: f64,
    end_seconds: f64,
}

impl TimeWindow {
    /// A window over `criteria`'s bounds, measured from `origin`.
    pub fn new(criteria: &FilterCriteria, origin: NaiveDateTime) -> Self {
        Self {
            origin,
            start_seconds: criteria.start_seconds,
            end_seconds: criteria.end_seconds,
        }
    }

    /// Whether `record` falls in the window.
    pub fn contains(&self, record: &MeasurementRecord) -> bool {
        let elapsed = record.seconds_since(self.origin);
        self.start_seconds <= elapsed && elapsed <= self.end_seconds
    }
}

impl Stage for TimeWindow {
    fn apply(
        &self,
        records: Vec<MeasurementRecord>,
        stats: &mut PipelineStats,
    ) -> Vec<MeasurementRecord> {
        let before = records.len();
        let kept: Vec<_> = records.into_iter().filter(|r| self.contains(r)).collect();
        stats.excluded_by_time_window += before - kept.len();
        kept
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeWindow[{}s, {}s]", self.start_seconds, self.end_seconds)
    }
}
