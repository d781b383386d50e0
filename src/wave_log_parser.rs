//! Parser for the radar's wave log. Each measurement line looks like
//!
//! ```text
//! [24/11/15 02:39:01.000] 1.234 m, 5.0
//! ```
//!
//! and anything else in the file (header lines, half-written lines, bytes
//! mangled by the SD card) is noise that gets counted and skipped.

use crate::record::MeasurementRecord;

use chrono::{NaiveDate, NaiveDateTime};
use nom::{
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, digit0, digit1},
    combinator::{map_opt, map_res, opt, recognize},
    error::Error,
    sequence::{delimited, preceded, tuple},
    Finish, IResult,
};

use std::str::FromStr;

fn digits(s: &str, n: usize) -> IResult<&str, u32> {
    map_res(take_while_m_n(n, n, |c: char| c.is_ascii_digit()), |d: &str| {
        d.parse::<u32>()
    })(s)
}

fn two_digits(s: &str) -> IResult<&str, u32> {
    digits(s, 2)
}

fn three_digits(s: &str) -> IResult<&str, u32> {
    digits(s, 3)
}

/// Same pivot as `strptime("%y")`: 69-99 are the 1900s, everything else
/// lands in the 2000s.
fn expand_year(yy: u32) -> i32 {
    if yy >= 69 {
        1900 + yy as i32
    } else {
        2000 + yy as i32
    }
}

fn parse_timestamp(s: &str) -> IResult<&str, NaiveDateTime> {
    map_opt(
        delimited(
            char('['),
            tuple((
                two_digits,
                preceded(char('/'), two_digits),
                preceded(char('/'), two_digits),
                preceded(char(' '), two_digits),
                preceded(char(':'), two_digits),
                preceded(char(':'), two_digits),
                preceded(char('.'), three_digits),
            )),
            char(']'),
        ),
        |(yy, month, day, hour, minute, second, milli)| {
            NaiveDate::from_ymd_opt(expand_year(yy), month, day)?
                .and_hms_milli_opt(hour, minute, second, milli)
        },
    )(s)
}

fn parse_height(s: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            digit1,
            char('.'),
            take_while_m_n(3, 3, |c: char| c.is_ascii_digit()),
        ))),
        |h: &str| h.parse::<f64>(),
    )(s)
}

fn parse_quality(s: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, opt(char('.')), digit0))),
        |q: &str| q.parse::<f64>(),
    )(s)
}

/// Parse one log line. Only the start of the line is anchored, so trailing
/// carriage returns or junk after the quality value are left in the
/// remainder.
pub fn parse_record(s: &str) -> IResult<&str, MeasurementRecord> {
    let (rest, (timestamp, height, quality)) = tuple((
        parse_timestamp,
        preceded(tag(" "), parse_height),
        preceded(tag(" m, "), parse_quality),
    ))(s)?;

    Ok((rest, MeasurementRecord::new(timestamp, height, quality)))
}

impl FromStr for MeasurementRecord {
    type Err = Error<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_record(s).finish() {
            Ok((_remaining, record)) => Ok(record),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}

/// Lazily pulls [`MeasurementRecord`]s out of a raw byte buffer, one line
/// at a time, keeping count of how many lines it looked at and how many
/// were thrown away.
///
/// Lines are decoded with [`String::from_utf8_lossy`], so no byte sequence
/// in the file can stop the parse.
#[derive(Debug, Clone)]
pub struct WaveLogParser<'a> {
    remaining: &'a [u8],
    lines_seen: usize,
    lines_rejected: usize,
}

impl<'a> WaveLogParser<'a> {
    /// Start parsing `bytes` from the top.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            remaining: bytes,
            lines_seen: 0,
            lines_rejected: 0,
        }
    }

    /// Lines consumed so far, matching or not.
    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    /// Lines consumed so far that did not match the grammar.
    pub fn lines_rejected(&self) -> usize {
        self.lines_rejected
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.remaining.is_empty() {
            return None;
        }

        match self.remaining.iter().position(|&b| b == b'\n') {
            Some(idx) => {
                let line = &self.remaining[..idx];
                self.remaining = &self.remaining[idx + 1..];
                Some(line)
            }
            None => {
                let line = self.remaining;
                self.remaining = &[];
                Some(line)
            }
        }
    }
}

impl<'a> Iterator for WaveLogParser<'a> {
    type Item = MeasurementRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(line) = self.next_line() {
            self.lines_seen += 1;
            let text = String::from_utf8_lossy(line);
            match parse_record(&text) {
                Ok((_rest, record)) => return Some(record),
                Err(_) => self.lines_rejected += 1,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_a_measurement_line() {
        let s = "[24/11/15 02:39:01.250] 1.234 m, 5.0";

        let (leftover, record) = parse_record(s).unwrap();

        assert_eq!(leftover, "");
        assert_eq!(record.timestamp().year(), 2024);
        assert_eq!(record.timestamp().month(), 11);
        assert_eq!(record.timestamp().day(), 15);
        assert_eq!(record.timestamp().hour(), 2);
        assert_eq!(record.timestamp().second(), 1);
        assert_eq!(record.timestamp().nanosecond(), 250_000_000);
        assert_eq!(record.height(), 1.234);
        assert_eq!(record.quality(), 5.0);
    }

    #[test]
    fn quality_may_be_negative_or_integral() {
        let r: MeasurementRecord = "[24/11/15 02:39:01.000] 3.100 m, -102.5".parse().unwrap();
        assert_eq!(r.quality(), -102.5);

        let r: MeasurementRecord = "[24/11/15 02:39:01.000] 3.100 m, 7".parse().unwrap();
        assert_eq!(r.quality(), 7.0);

        let r: MeasurementRecord = "[24/11/15 02:39:01.000] 3.100 m, 7.".parse().unwrap();
        assert_eq!(r.quality(), 7.0);
    }

    #[test]
    fn trailing_text_is_ignored() {
        let (rest, r) = parse_record("[24/11/15 02:39:01.000] 3.100 m, 12.5\r").unwrap();
        assert_eq!(rest, "\r");
        assert_eq!(r.quality(), 12.5);
    }

    #[test]
    fn height_needs_exactly_three_decimals() {
        assert!("[24/11/15 02:39:01.000] 3.10 m, 5.0"
            .parse::<MeasurementRecord>()
            .is_err());
        assert!("[24/11/15 02:39:01.000] 3.1000 m, 5.0"
            .parse::<MeasurementRecord>()
            .is_err());
        assert!("[24/11/15 02:39:01.000] -3.100 m, 5.0"
            .parse::<MeasurementRecord>()
            .is_err());
    }

    #[test]
    fn impossible_dates_are_rejected() {
        assert!("[24/02/30 02:39:01.000] 3.100 m, 5.0"
            .parse::<MeasurementRecord>()
            .is_err());
        assert!("[24/11/15 25:39:01.000] 3.100 m, 5.0"
            .parse::<MeasurementRecord>()
            .is_err());
    }

    #[test]
    fn two_digit_years_pivot_like_strptime() {
        assert_eq!(expand_year(24), 2024);
        assert_eq!(expand_year(68), 2068);
        assert_eq!(expand_year(69), 1969);
        assert_eq!(expand_year(99), 1999);
    }

    #[test]
    fn iterator_counts_rejections() {
        let log = b"[24/11/15 02:39:01.000] 1.234 m, 5.0\n\
                    garbage line\n\
                    [24/11/15 02:39:02.000] 1.300 m, -200.0\n";
        let mut parser = WaveLogParser::new(log);

        let records: Vec<_> = parser.by_ref().collect();

        assert_eq!(records.len(), 2);
        assert_eq!(parser.lines_seen(), 3);
        assert_eq!(parser.lines_rejected(), 1);
    }

    #[test]
    fn non_utf8_bytes_do_not_stop_the_parse() {
        let mut log = Vec::new();
        log.extend_from_slice(b"[24/11/15 02:39:01.000] 1.234 m, 5.0\n");
        log.extend_from_slice(&[0xFF, 0xFE, 0x80, b'\n']);
        log.extend_from_slice(b"[24/11/15 02:39:0\xE92.000] 1.234 m, 5.0\n");
        log.extend_from_slice(b"[24/11/15 02:39:03.000] 1.210 m, 6.0");
        let mut parser = WaveLogParser::new(&log);

        let heights: Vec<f64> = parser.by_ref().map(|r| r.height()).collect();

        assert_eq!(heights, vec![1.234, 1.210]);
        assert_eq!(parser.lines_seen(), 4);
        assert_eq!(parser.lines_rejected(), 2);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut parser = WaveLogParser::new(b"");
        assert_eq!(parser.next(), None);
        assert_eq!(parser.lines_seen(), 0);
    }
}
