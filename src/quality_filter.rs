//! Drops readings the radar itself was not confident in.

use crate::record::MeasurementRecord;
use crate::stage::Stage;
use crate::summary::PipelineStats;

use std::fmt;

/// Keeps records with `quality >= threshold`. The threshold is compared
/// against the raw reported value, whatever convention the instrument uses.
#[derive(Debug, Clone, Copy)]
pub struct QualityFilter {
    threshold: f64,
}

impl QualityFilter {
    /// Filter at `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Stage for QualityFilter {
    fn apply(
        &self,
        records: Vec<MeasurementRecord>,
        stats: &mut PipelineStats,
    ) -> Vec<MeasurementRecord> {
        let before = records.len();
        let kept: Vec<_> = records
            .into_iter()
            .filter(|r| r.quality() >= self.threshold)
            .collect();
        stats.excluded_by_quality += before - kept.len();
        kept
    }
}

impl fmt::Display for QualityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QualityFilter[>= {}]", self.threshold)
    }
}
