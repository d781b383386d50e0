//! The measurement types that flow through the wave-log pipeline.
//!
//! A [`MeasurementRecord`] is a single radar reading pulled out of a log
//! line. A [`MeasurementSeries`] is an ordered run of them that shares a
//! common time origin, which is what every downstream consumer (plots,
//! periodograms, tide comparisons) works from.

use chrono::NaiveDateTime;

/// One timestamped reading from the radar. Fields are private so that a
/// record cannot change once it has been parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRecord {
    timestamp: NaiveDateTime,
    height: f64,
    quality: f64,
}

impl MeasurementRecord {
    /// Build a record from its three fields.
    pub fn new(timestamp: NaiveDateTime, height: f64, quality: f64) -> Self {
        Self {
            timestamp,
            height,
            quality,
        }
    }

    /// Absolute time of the reading, millisecond precision.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Distance reported by the radar, in meters.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Instrument-reported quality score. The sign and range depend on the
    /// instrument, so it is never rescaled.
    pub fn quality(&self) -> f64 {
        self.quality
    }

    /// Seconds between `origin` and this record.
    pub fn seconds_since(&self, origin: NaiveDateTime) -> f64 {
        (self.timestamp - origin).num_milliseconds() as f64 / 1000.0
    }
}

/// An ordered run of [`MeasurementRecord`]s sharing a time origin.
///
/// Records are always in non-decreasing timestamp order; the only way to
/// build a series is through [`MeasurementSeries::new`], which checks that.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSeries {
    origin: Option<NaiveDateTime>,
    records: Vec<MeasurementRecord>,
}

impl MeasurementSeries {
    /// A series with no origin and no records, the result of a log that had
    /// nothing parseable in it.
    pub fn empty() -> Self {
        Self {
            origin: None,
            records: Vec::new(),
        }
    }

    /// Wrap already-ordered records with their origin. Returns `None` if the
    /// records are out of order.
    pub fn new(origin: NaiveDateTime, records: Vec<MeasurementRecord>) -> Option<Self> {
        let ordered = records
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp);

        ordered.then_some(Self {
            origin: Some(origin),
            records,
        })
    }

    /// The timestamp every elapsed-seconds value is measured from, which is
    /// the first record that survived parsing. `None` for an empty log.
    pub fn origin(&self) -> Option<NaiveDateTime> {
        self.origin
    }

    /// The surviving records, in time order.
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Number of records in the series.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing survived the pipeline.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Seconds between the series origin and `record`.
    pub fn elapsed_seconds(&self, record: &MeasurementRecord) -> f64 {
        self.origin
            .map(|origin| record.seconds_since(origin))
            .unwrap_or(0.0)
    }

    /// Elapsed seconds of every record, in order.
    pub fn elapsed_seconds_all(&self) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| self.elapsed_seconds(r))
            .collect()
    }

    /// Height of every record, in order.
    pub fn heights(&self) -> Vec<f64> {
        self.records.iter().map(MeasurementRecord::height).collect()
    }

    /// Quality of every record, in order.
    pub fn qualities(&self) -> Vec<f64> {
        self.records.iter().map(MeasurementRecord::quality).collect()
    }

    /// Absolute timestamps of every record, in order.
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.records
            .iter()
            .map(MeasurementRecord::timestamp)
            .collect()
    }

    /// `(elapsed_seconds, height)` pairs, the shape plotting code expects.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.records
            .iter()
            .map(|r| (self.elapsed_seconds(r), r.height))
            .collect()
    }

    /// `(elapsed_seconds, water_level)` pairs for a radar mounted
    /// `elevation_m` above the datum, looking down at the water.
    pub fn water_levels(&self, elevation_m: f64) -> Vec<(f64, f64)> {
        self.records
            .iter()
            .map(|r| (self.elapsed_seconds(r), elevation_m - r.height))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(sec: u32, milli: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 15)
            .unwrap()
            .and_hms_milli_opt(2, 39, sec, milli)
            .unwrap()
    }

    #[test]
    fn series_rejects_out_of_order_records() {
        let records = vec![
            MeasurementRecord::new(at(2, 0), 1.0, 0.0),
            MeasurementRecord::new(at(1, 0), 1.0, 0.0),
        ];
        assert!(MeasurementSeries::new(at(1, 0), records).is_none());
    }

    #[test]
    fn points_are_relative_to_origin() {
        let records = vec![
            MeasurementRecord::new(at(1, 0), 1.234, 5.0),
            MeasurementRecord::new(at(3, 500), 1.210, 6.0),
        ];
        let series = MeasurementSeries::new(at(1, 0), records).unwrap();

        assert_eq!(series.points(), vec![(0.0, 1.234), (2.5, 1.210)]);
        assert_eq!(series.qualities(), vec![5.0, 6.0]);
    }

    #[test]
    fn water_levels_subtract_distance_from_elevation() {
        let records = vec![MeasurementRecord::new(at(1, 0), 1.25, 5.0)];
        let series = MeasurementSeries::new(at(1, 0), records).unwrap();

        assert_eq!(series.water_levels(3.5), vec![(0.0, 2.25)]);
    }

    #[test]
    fn empty_series_has_no_origin() {
        let series = MeasurementSeries::empty();
        assert!(series.is_empty());
        assert_eq!(series.origin(), None);
        assert!(series.points().is_empty());
    }
}
