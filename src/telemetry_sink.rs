//! Where decoded telemetry goes. A [`LineFramer`] turns the raw byte stream
//! from the detector into lines and hands each one to a [`TelemetrySink`];
//! the [`GaugeBoard`] sink keeps the state a dashboard would draw.

use crate::telemetry_decoder::TelemetryEvent;

use log::{debug, warn};
use std::str::{self, FromStr};

/// Full scale of the intra presence gauge.
pub const INTRA_MAX: i32 = 2000;
/// Full scale of the inter presence gauge.
pub const INTER_MAX: i32 = 15000;
/// Full scale of the distance gauge, in millimeters.
pub const DISTANCE_MAX_MM: i32 = 1000;

/// Anything that consumes telemetry lines.
pub trait TelemetrySink {
    /// Take one complete, trimmed, non-empty line.
    fn accept(&mut self, line: &str);
}

/// Percentage of `max` that `value` reaches, clamped to `0..=100`.
pub fn gauge_percent(value: i32, max: i32) -> u8 {
    if max <= 0 {
        return 0;
    }
    (i64::from(value) * 100 / i64::from(max)).clamp(0, 100) as u8
}

/// Latest presence readings and motion state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GaugeBoard {
    intra: Option<i32>,
    inter: Option<i32>,
    distance_mm: Option<i32>,
    motion: Option<bool>,
    undecodable: usize,
}

#[allow(missing_docs)]
impl GaugeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a decoded event.
    pub fn apply(&mut self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::Presence {
                intra,
                inter,
                distance_mm,
            } => {
                self.intra = Some(intra);
                self.inter = Some(inter);
                self.distance_mm = Some(distance_mm);
            }
            TelemetryEvent::Motion => self.motion = Some(true),
            TelemetryEvent::NoMotion => self.motion = Some(false),
        }
    }

    pub fn intra(&self) -> Option<i32> {
        self.intra
    }

    pub fn inter(&self) -> Option<i32> {
        self.inter
    }

    pub fn distance_mm(&self) -> Option<i32> {
        self.distance_mm
    }

    pub fn intra_percent(&self) -> u8 {
        self.intra.map_or(0, |v| gauge_percent(v, INTRA_MAX))
    }

    pub fn inter_percent(&self) -> u8 {
        self.inter.map_or(0, |v| gauge_percent(v, INTER_MAX))
    }

    pub fn distance_percent(&self) -> u8 {
        self.distance_mm.map_or(0, |v| gauge_percent(v, DISTANCE_MAX_MM))
    }

    /// `Some(true)` after "Motion", `Some(false)` after "No motion".
    pub fn motion(&self) -> Option<bool> {
        self.motion
    }

    pub fn undecodable(&self) -> usize {
        self.undecodable
    }
}

impl TelemetrySink for GaugeBoard {
    fn accept(&mut self, line: &str) {
        match TelemetryEvent::from_str(line) {
            Ok(event) => {
                debug!("Received {:?}", event);
                self.apply(event);
            }
            Err(e) => {
                warn!("Was unable to parse telemetry line: {:?}", e);
                self.undecodable += 1;
            }
        }
    }
}

/// Splits a byte stream into lines on `\n`, across reads of any size.
#[derive(Debug, Default)]
pub struct LineFramer {
    read_buf: Vec<u8>,
}

impl LineFramer {
    /// An empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `bytes` and deliver every line they complete to `sink`. Returns
    /// how many lines were delivered.
    pub fn feed(&mut self, bytes: &[u8], sink: &mut impl TelemetrySink) -> usize {
        let mut delivered = 0;

        for &c in bytes {
            if c != b'\n' {
                self.read_buf.push(c);
                continue;
            }
            match str::from_utf8(&self.read_buf) {
                Ok(s) => {
                    let line = s.trim();
                    if !line.is_empty() {
                        sink.accept(line);
                        delivered += 1;
                    }
                }
                // Often happens at the start of a capture, with stale bytes
                // still in the device buffer
                Err(e) => {
                    warn!("Failed to decode utf-8: {:?}", e);
                }
            }
            self.read_buf.clear();
        }

        delivered
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.read_buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl TelemetrySink for Recorder {
        fn accept(&mut self, line: &str) {
            self.0.push(line.to_owned());
        }
    }

    #[test]
    fn lines_split_across_reads() {
        let mut framer = LineFramer::new();
        let mut sink = Recorder::default();

        assert_eq!(framer.feed(b"Mot", &mut sink), 0);
        assert_eq!(framer.pending(), 3);
        assert_eq!(framer.feed(b"ion\r\n\n  \nNo mo", &mut sink), 1);
        assert_eq!(framer.feed(b"tion\n", &mut sink), 1);

        assert_eq!(sink.0, vec!["Motion", "No motion"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn bad_utf8_line_is_dropped() {
        let mut framer = LineFramer::new();
        let mut sink = Recorder::default();

        framer.feed(b"\xff\xfe garbage\nMotion\n", &mut sink);

        assert_eq!(sink.0, vec!["Motion"]);
    }

    #[test]
    fn gauges_scale_and_clamp() {
        assert_eq!(gauge_percent(1000, INTRA_MAX), 50);
        assert_eq!(gauge_percent(30000, INTER_MAX), 100);
        assert_eq!(gauge_percent(-20, DISTANCE_MAX_MM), 0);
        assert_eq!(gauge_percent(999, DISTANCE_MAX_MM), 99);
    }

    #[test]
    fn board_tracks_the_latest_state() {
        let mut framer = LineFramer::new();
        let mut board = GaugeBoard::new();
        let transcript = b"Intra presence score: 500, Inter presence score: 3000, Distance: 250\n\
            Motion\n\
            calibrating...\n\
            Intra presence score: 1500, Inter presence score: 7500, Distance: 2000\n\
            No motion\n";

        framer.feed(transcript, &mut board);

        assert_eq!(board.intra(), Some(1500));
        assert_eq!(board.intra_percent(), 75);
        assert_eq!(board.inter_percent(), 50);
        assert_eq!(board.distance_mm(), Some(2000));
        assert_eq!(board.distance_percent(), 100);
        assert_eq!(board.motion(), Some(false));
        assert_eq!(board.undecodable(), 1);
    }

    #[test]
    fn fresh_board_is_empty() {
        let board = GaugeBoard::new();
        assert_eq!(board.intra_percent(), 0);
        assert_eq!(board.motion(), None);
    }
}
