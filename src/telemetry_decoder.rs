//! Decodes the text lines the presence-detector firmware prints over
//! serial:
//!
//! ```text
//! Intra presence score: 412, Inter presence score: 3817, Distance: 655
//! Motion
//! No motion
//! ```

use nom::{
    bytes::complete::tag,
    character::complete::{i32, space0},
    combinator::map,
    error::{Error, ErrorKind},
    sequence::{delimited, preceded, tuple},
    Finish, IResult,
};

use std::str::FromStr;

const PRESENCE_TAG: &str = "Intra presence score:";

/// One decoded telemetry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// Presence detector scores and the distance to the target.
    Presence {
        /// Fast-moving presence score.
        intra: i32,
        /// Slow-moving presence score.
        inter: i32,
        /// Distance to the detected presence, in millimeters.
        distance_mm: i32,
    },
    /// The detector reports movement.
    Motion,
    /// The detector reports a still scene.
    NoMotion,
}

fn field<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, i32> {
    preceded(tuple((space0, tag(name), space0)), i32)
}

fn parse_presence(s: &str) -> IResult<&str, TelemetryEvent> {
    map(
        tuple((
            field(PRESENCE_TAG),
            preceded(tag(","), field("Inter presence score:")),
            delimited(tag(","), field("Distance:"), space0),
        )),
        |(intra, inter, distance_mm)| TelemetryEvent::Presence {
            intra,
            inter,
            distance_mm,
        },
    )(s)
}

impl FromStr for TelemetryEvent {
    type Err = Error<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(at) = s.find(PRESENCE_TAG) {
            return match parse_presence(&s[at..]).finish() {
                Ok((_remaining, event)) => Ok(event),
                Err(Error { input, code }) => Err(Error {
                    input: input.to_string(),
                    code,
                }),
            };
        }

        // "No motion" also contains "motion", so it is checked first
        if s.to_ascii_lowercase().contains("no motion") {
            Ok(TelemetryEvent::NoMotion)
        } else if s.contains("Motion") {
            Ok(TelemetryEvent::Motion)
        } else {
            Err(Error {
                input: s.to_string(),
                code: ErrorKind::Tag,
            })
        }
    }
}
