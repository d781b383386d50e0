//! WaterSense is a radar wave gauge: a distance sensor looking straight
//! down at the water from a pier, logging one reading every tenth of a
//! second to an SD card. Each log line holds a timestamp and the distance to
//! the surface, followed by the signal quality the radar reported.
//!
//! This crate is the host-side tooling for those logs. The core is the
//! [pipeline], which parses a log, anchors it to its first valid record,
//! keeps a time window, drops low-quality readings and, optionally,
//! outliers, and summarizes what is left. Around it sit the things a
//! deployment needs afterwards:
//!
//! - [tide] comparison against NOAA predictions, through [interpolate];
//! - a Lomb-Scargle wave [spectrum];
//! - [batch] runs over a directory of logs;
//! - [synthetic] logs for testing without a sensor;
//! - decoding of the presence-detector firmware's serial output, in
//!   [telemetry_decoder] and [telemetry_sink].
//!
//! The `wavelog` binary puts all of it behind one command line.

#![warn(missing_docs)]
pub mod args;
pub mod batch;
pub mod config;
pub mod interpolate;
pub mod log_header;
pub mod outliers;
pub mod pipeline;
pub mod quality_filter;
pub mod record;
pub mod spectrum;
pub mod stage;
pub mod stats;
pub mod summary;
pub mod synthetic;
pub mod telemetry_decoder;
pub mod telemetry_sink;
pub mod tide;
pub mod time_window;
pub mod wave_log_parser;
