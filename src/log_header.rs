//! The block of settings the logger writes at the top of every data file,
//! before the first measurement:
//!
//! ```text
//! First Data File Since Power On: True
//! Data File: /DATA/24-11-15_02-39-00_data.txt
//! Start Time: [24/11/15 02:39:00.000]
//! Elevation: 3.2
//! Start of range: 0.50 m
//! End of range: 7.00 m
//! Update rate: 10.0 Hz
//! ---
//! ```
//!
//! The measurement parser ignores these lines like any other non-matching
//! text; this module is for callers who want the settings back.

/// Ordered `Key: Value` pairs from a log header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogHeader {
    entries: Vec<(String, String)>,
}

const SEPARATOR: &str = "---";

#[allow(missing_docs)]
impl LogHeader {
    /// Read the header from the start of a raw log. Logs without a `---`
    /// separator before their first measurement have an empty header.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut entries = Vec::new();

        for line in bytes.split(|&b| b == b'\n') {
            let text = String::from_utf8_lossy(line);
            let text = text.trim_end();
            if text == SEPARATOR {
                return Self { entries };
            }
            // Measurements start with a timestamp; meeting one first means no header
            if text.starts_with('[') {
                break;
            }
            if let Some((key, value)) = text.split_once(':') {
                entries.push((key.trim().to_owned(), value.trim().to_owned()));
            }
        }

        Self::default()
    }

    /// True when the log had no header.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in file order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// The raw value for `key`, matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The leading number of `key`'s value, so `"7.00 m"` reads as `7.0`.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key)?.split_whitespace().next()?.parse().ok()
    }

    /// Logger clock time when the file was opened, as written.
    pub fn start_time(&self) -> Option<&str> {
        self.get("Start Time")
    }

    /// Height of the sensor above the datum, in meters.
    pub fn elevation_m(&self) -> Option<f64> {
        self.number("Elevation")
    }

    pub fn range_start_m(&self) -> Option<f64> {
        self.number("Start of range")
    }

    pub fn range_end_m(&self) -> Option<f64> {
        self.number("End of range")
    }

    /// Configured update rate.
    pub fn update_rate_hz(&self) -> Option<f64> {
        self.number("Update rate")
    }

    pub fn true_update_rate_hz(&self) -> Option<f64> {
        self.number("True update rate")
    }

    pub fn signal_quality(&self) -> Option<f64> {
        self.number("Signal quality")
    }
}
