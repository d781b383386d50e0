//! Tide predictions and water-level records from NOAA, for checking the
//! radar against. Two formats are understood: the tab-separated high/low
//! predictions table,
//!
//! ```text
//! 2024/11/15	Fri	02:39 AM	0.56	L
//! 2024/11/15	Fri	08:53 AM	1.95	H
//! ```
//!
//! and the JSON the CO-OPS data API hands back,
//!
//! ```text
//! {"metadata": {...}, "data": [{"t": "2024-11-15 00:00", "v": "1.234", ...}, ...]}
//! ```

use crate::interpolate::{InterpolationError, Pchip};
use crate::record::MeasurementSeries;
use crate::stats;

use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::Deserialize;
use std::{borrow::Cow, fmt, fs::File, io::Read, path::Path};

/// One predicted or observed tide height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TidePoint {
    /// When the height applies.
    pub timestamp: NaiveDateTime,
    /// Height above the station datum, in meters.
    pub height: f64,
}

/// Tide heights in time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TideSeries {
    points: Vec<TidePoint>,
}

/// Things that can go wrong reading or using tide data.
#[derive(Debug)]
pub enum TideError {
    /// Returned when the tide file cannot be read.
    IoError(std::io::Error),
    /// Returned when a JSON export is not shaped like one.
    JsonError(serde_json::Error),
    /// Returned when the tide points cannot be interpolated.
    Interpolation(InterpolationError),
}

impl fmt::Display for TideError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            TideError::IoError(error) => Cow::from(format!("io error: {}", error)),
            TideError::JsonError(error) => Cow::from(format!("json error: {}", error)),
            TideError::Interpolation(error) => {
                Cow::from(format!("cannot interpolate tide: {}", error))
            }
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for TideError {}

impl From<std::io::Error> for TideError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<serde_json::Error> for TideError {
    fn from(value: serde_json::Error) -> Self {
        Self::JsonError(value)
    }
}

impl From<InterpolationError> for TideError {
    fn from(value: InterpolationError) -> Self {
        Self::Interpolation(value)
    }
}

#[derive(Debug, Deserialize)]
struct NoaaJson {
    data: Vec<NoaaReading>,
}

#[derive(Debug, Deserialize)]
struct NoaaReading {
    t: Option<String>,
    v: Option<String>,
}

/// Parse a NOAA predictions table. Rows that do not have a date, weekday,
/// time, AM/PM and height are skipped.
pub fn parse_noaa_predictions(text: &str) -> TideSeries {
    let points = text
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                return None;
            }
            let stamp = format!("{} {} {}", parts[0], parts[2], parts[3]);
            let timestamp = NaiveDateTime::parse_from_str(&stamp, "%Y/%m/%d %I:%M %p").ok()?;
            let height = parts[4].parse().ok()?;
            Some(TidePoint { timestamp, height })
        })
        .collect();

    TideSeries::new(points)
}

/// Parse a NOAA JSON export. Readings with a missing or malformed time or
/// value are skipped; a document without a `data` array is an error.
pub fn parse_noaa_json(bytes: &[u8]) -> Result<TideSeries, TideError> {
    let doc: NoaaJson = serde_json::from_slice(bytes)?;

    let points = doc
        .data
        .into_iter()
        .filter_map(|reading| {
            let point = reading.t.as_deref().zip(reading.v.as_deref()).and_then(|(t, v)| {
                let timestamp = NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M").ok()?;
                let height = v.trim().parse().ok()?;
                Some(TidePoint { timestamp, height })
            });
            if point.is_none() {
                warn!("Error parsing tide data point: {:?}", reading);
            }
            point
        })
        .collect();

    Ok(TideSeries::new(points))
}

/// How well the radar tracked the tide.
#[derive(Debug, Clone, PartialEq)]
pub struct TideComparison {
    /// `(elapsed_seconds, measured - predicted)` for every record inside
    /// the span of the tide data.
    pub residuals: Vec<(f64, f64)>,
    /// Mean residual, the datum offset between radar and tide station.
    pub mean_residual: Option<f64>,
    /// Root mean square residual.
    pub rms_residual: Option<f64>,
}

impl TideSeries {
    /// Wrap points, sorting them by time.
    pub fn new(mut points: Vec<TidePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self { points }
    }

    /// Read a tide file, choosing the format from its first non-blank byte.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TideError> {
        let mut handle = File::open(path)?;
        let mut raw = Vec::new();
        handle.read_to_end(&mut raw)?;

        match raw.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => parse_noaa_json(&raw),
            _ => Ok(parse_noaa_predictions(&String::from_utf8_lossy(&raw))),
        }
    }

    /// The points, in time order.
    pub fn points(&self) -> &[TidePoint] {
        &self.points
    }

    /// True when no tide points were read.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `(elapsed_seconds, height)` relative to `origin`, the same shape as
    /// [`MeasurementSeries::points`].
    pub fn elapsed_points(&self, origin: NaiveDateTime) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| {
                let elapsed = (p.timestamp - origin).num_milliseconds() as f64 / 1000.0;
                (elapsed, p.height)
            })
            .collect()
    }

    /// PCHIP curve through the points, on a time axis starting at `origin`.
    pub fn interpolant(&self, origin: NaiveDateTime) -> Result<Pchip, InterpolationError> {
        let (x, y): (Vec<f64>, Vec<f64>) = self.elapsed_points(origin).into_iter().unzip();
        Pchip::new(&x, &y)
    }

    /// Compare the measurements in `series` with this tide. With an
    /// `elevation_m`, radar distances are turned into water levels first.
    pub fn compare(
        &self,
        series: &MeasurementSeries,
        elevation_m: Option<f64>,
    ) -> Result<TideComparison, TideError> {
        let origin = match series.origin() {
            Some(origin) if !series.is_empty() => origin,
            _ => {
                return Ok(TideComparison {
                    residuals: Vec::new(),
                    mean_residual: None,
                    rms_residual: None,
                })
            }
        };

        let curve = self.interpolant(origin)?;
        let measured = match elevation_m {
            Some(elevation) => series.water_levels(elevation),
            None => series.points(),
        };

        let residuals: Vec<(f64, f64)> = measured
            .into_iter()
            .filter_map(|(t, h)| curve.evaluate(t).map(|predicted| (t, h - predicted)))
            .collect();
        debug!(
            "{} of {} records fall inside the tide data.",
            residuals.len(),
            series.len()
        );

        let values: Vec<f64> = residuals.iter().map(|&(_, r)| r).collect();
        Ok(TideComparison {
            mean_residual: stats::mean(&values),
            rms_residual: stats::rms(&values),
            residuals,
        })
    }
}
