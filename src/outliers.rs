//! Outlier detection for wave heights, in two passes.
//!
//! The global pass throws out anything beyond `k` IQRs outside the
//! quartiles of the whole series. That catches the radar locking onto the
//! pier or the seabed, but real waves swing far enough that a single
//! spike can still sit inside the global bounds. The local pass catches
//! those by comparing each height to the median of its neighbours, with
//! the local IQR as the yardstick.

use crate::config::OutlierPolicy;
use crate::record::MeasurementRecord;
use crate::stage::Stage;
use crate::stats;
use crate::summary::PipelineStats;

use log::{debug, info};
use std::fmt;

/// Which pass (if any) flagged a height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutlierVerdict {
    /// Outside the global IQR bounds.
    pub global: bool,
    /// Too far from the median of its neighbourhood.
    pub local: bool,
}

impl OutlierVerdict {
    /// Flagged by either pass.
    pub fn is_outlier(&self) -> bool {
        self.global || self.local
    }
}

/// The result of running the detector over a run of heights.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierReport {
    /// Lower global bound, `q1 - k * iqr`.
    pub lower_bound: f64,
    /// Upper global bound, `q3 + k * iqr`.
    pub upper_bound: f64,
    /// One verdict per height, in input order.
    pub verdicts: Vec<OutlierVerdict>,
}

impl OutlierReport {
    /// How many heights were flagged by either pass.
    pub fn outlier_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_outlier()).count()
    }
}

/// The two-pass detector. Only runs on series longer than its window.
#[derive(Debug, Clone, Copy)]
pub struct OutlierDetector {
    policy: OutlierPolicy,
}

impl OutlierDetector {
    /// A detector with the given (already validated) policy.
    pub fn new(policy: OutlierPolicy) -> Self {
        Self { policy }
    }

    /// Flag outliers in `heights`. `None` if there are no heights at all.
    pub fn detect(&self, heights: &[f64]) -> Option<OutlierReport> {
        let k = self.policy.iqr_multiplier;
        let (q1, q3) = stats::quartiles(heights)?;
        let iqr = q3 - q1;
        let lower_bound = q1 - k * iqr;
        let upper_bound = q3 + k * iqr;

        let mut included: Vec<bool> = heights
            .iter()
            .map(|&h| lower_bound <= h && h <= upper_bound)
            .collect();
        let mut verdicts: Vec<OutlierVerdict> = included
            .iter()
            .map(|&inside| OutlierVerdict {
                global: !inside,
                local: false,
            })
            .collect();

        // A point dropped here is already missing from the windows of the
        // points after it.
        let half = self.policy.window_size / 2;
        for i in 0..heights.len() {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(heights.len());
            let window: Vec<f64> = (start..end)
                .filter(|&j| included[j])
                .map(|j| heights[j])
                .collect();

            let Some(local_median) = stats::median(&window) else {
                continue;
            };
            let Some((local_q1, local_q3)) = stats::quartiles(&window) else {
                continue;
            };

            if (heights[i] - local_median).abs() > k * (local_q3 - local_q1) {
                verdicts[i].local = true;
                included[i] = false;
            }
        }

        Some(OutlierReport {
            lower_bound,
            upper_bound,
            verdicts,
        })
    }
}

impl Stage for OutlierDetector {
    fn apply(
        &self,
        records: Vec<MeasurementRecord>,
        stats: &mut PipelineStats,
    ) -> Vec<MeasurementRecord> {
        if records.len() <= self.policy.window_size {
            debug!(
                "{} : {} records is not more than the window, skipping.",
                self,
                records.len()
            );
            return records;
        }

        let heights: Vec<f64> = records.iter().map(MeasurementRecord::height).collect();
        let Some(report) = self.detect(&heights) else {
            return records;
        };

        info!(
            "{} : global range {:.3} to {:.3} m, {} outliers detected.",
            self,
            report.lower_bound,
            report.upper_bound,
            report.outlier_count()
        );

        stats.excluded_by_outlier_detection += report.outlier_count();
        records
            .into_iter()
            .zip(report.verdicts)
            .filter(|(_, verdict)| !verdict.is_outlier())
            .map(|(record, _)| record)
            .collect()
    }
}

impl fmt::Display for OutlierDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OutlierDetector[window {}, k {}]",
            self.policy.window_size, self.policy.iqr_multiplier
        )
    }
}
