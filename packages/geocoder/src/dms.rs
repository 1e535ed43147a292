//! Sexagesimal (degrees/minutes/seconds) coordinate parsing.
//!
//! Some spot names are not names at all but a pasted coordinate, e.g.
//! `5°23'36.8"N 100°12'22.6"E`. Those can be resolved locally instead of
//! going through a map search.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use spot_coords_models::{BoundingWindow, CoordinatePair};

/// `D°M'S.s"H D°M'S.s"H`. Accepts ASCII and typographic prime marks, and
/// `''` as a stand-in for `"`.
static DMS_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(\d+)\s*°\s*(\d+)\s*['′’]\s*(\d+(?:\.\d+)?)\s*(?:''|["″”])\s*([NSns])[\s,;]*(\d+)\s*°\s*(\d+)\s*['′’]\s*(\d+(?:\.\d+)?)\s*(?:''|["″”])\s*([EWew])"#,
    )
    .expect("valid regex")
});

/// Why a string did not yield a usable coordinate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// No sexagesimal pair anywhere in the input.
    #[error("no sexagesimal coordinate found")]
    NoMatch,

    /// Pattern matched but a component is out of range.
    #[error("malformed sexagesimal coordinate: {message}")]
    Malformed {
        /// What was wrong.
        message: String,
    },

    /// Well-formed, but outside the accepted bounding window.
    #[error("coordinate {0} is outside the bounding window")]
    OutsideWindow(CoordinatePair),
}

/// Parses a sexagesimal pair, returning `None` for anything that is not a
/// valid coordinate inside `window`.
#[must_use]
pub fn parse(text: &str, window: &BoundingWindow) -> Option<CoordinatePair> {
    try_parse(text, window).ok()
}

/// Like [`parse`], but reports why parsing failed.
///
/// # Errors
///
/// * [`ParseError::NoMatch`] if the text contains no sexagesimal pair.
/// * [`ParseError::Malformed`] if minutes/seconds are `>= 60` or the
///   result is not a valid WGS84 coordinate.
/// * [`ParseError::OutsideWindow`] if the coordinate is valid but not
///   inside `window`.
pub fn try_parse(text: &str, window: &BoundingWindow) -> Result<CoordinatePair, ParseError> {
    let caps = DMS_PAIR_RE.captures(text).ok_or(ParseError::NoMatch)?;

    let latitude = component(&caps, 1)?;
    let longitude = component(&caps, 5)?;
    let pair = CoordinatePair::new(latitude, longitude);

    if !pair.is_valid() {
        return Err(ParseError::Malformed {
            message: format!("{pair} is not a valid WGS84 coordinate"),
        });
    }
    if !window.contains(pair) {
        return Err(ParseError::OutsideWindow(pair));
    }

    Ok(pair)
}

/// Converts the four capture groups starting at `first` (degrees, minutes,
/// seconds, hemisphere) into signed decimal degrees.
fn component(caps: &Captures<'_>, first: usize) -> Result<f64, ParseError> {
    let group = |i: usize| caps.get(first + i).map_or("", |m| m.as_str());
    let malformed = |what: &str, raw: &str| ParseError::Malformed {
        message: format!("invalid {what} '{raw}'"),
    };

    let degrees: u32 = group(0)
        .parse()
        .map_err(|_| malformed("degrees", group(0)))?;
    let minutes: u32 = group(1)
        .parse()
        .map_err(|_| malformed("minutes", group(1)))?;
    let seconds: f64 = group(2)
        .parse()
        .map_err(|_| malformed("seconds", group(2)))?;

    if minutes >= 60 {
        return Err(malformed("minutes", group(1)));
    }
    if seconds >= 60.0 {
        return Err(malformed("seconds", group(2)));
    }

    let magnitude = f64::from(degrees) + f64::from(minutes) / 60.0 + seconds / 3600.0;

    Ok(match group(3) {
        "S" | "s" | "W" | "w" => -magnitude,
        _ => magnitude,
    })
}
