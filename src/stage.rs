//! Defines the Stage trait, implemented by each filtering step of the
//! wave-log pipeline. Each stage consumes the records left by the stage
//! before it, drops what it does not want, and records the drops in the
//! run's [`PipelineStats`].

use crate::record::MeasurementRecord;
use crate::summary::PipelineStats;

use log::debug;
use std::fmt::Display;

/// One filtering step of the pipeline. A stage must keep the relative order
/// of the records it retains.
pub trait Stage: Display {
    /// Filter `records`, counting what was removed in `stats`.
    fn apply(
        &self,
        records: Vec<MeasurementRecord>,
        stats: &mut PipelineStats,
    ) -> Vec<MeasurementRecord>;
}

/// Feeds `records` through `stages` in order, each one fully consuming the
/// output of the one before it.
pub fn run_stages(
    stages: &[&dyn Stage],
    records: Vec<MeasurementRecord>,
    stats: &mut PipelineStats,
) -> Vec<MeasurementRecord> {
    stages.iter().fold(records, |records, stage| {
        let before = records.len();
        let kept = stage.apply(records, stats);
        debug!("{} : kept {} of {} records.", stage, kept.len(), before);
        kept
    })
}
