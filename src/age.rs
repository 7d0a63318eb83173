use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, SubfetchError};

/// Which side of the age window a file must fall on to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgePolarity {
    /// Expression had a leading `+`: keep files modified within the window.
    NewerThan,
    /// No sign: keep files modified longer ago than the window.
    OlderThan,
}

/// Predicate over file modification age, compiled from a compact duration
/// expression of the form `[+]{weeks}w{days}d{hours}h`.
///
/// Examples: `12h`, `1w2d`, `+3d6h`. Every unit segment is optional and an
/// empty body is a valid zero-length window.
#[derive(Debug, Clone, Copy)]
pub struct AgeFilter {
    polarity: AgePolarity,
    window: Duration,
}

// Unit suffixes in grammar order, with their size in hours.
const UNITS: [(u8, i64); 3] = [(b'w', 7 * 24), (b'd', 24), (b'h', 1)];

impl AgeFilter {
    /// Compile an age expression into a filter.
    ///
    /// The grammar is anchored at the start of the input and units must
    /// appear in `w d h` order, each at most once. Anything after the
    /// longest valid prefix is ignored rather than rejected, so `2x`
    /// compiles to a zero-length window while `abc` is an error. This
    /// lenient-prefix acceptance is intentional compatibility with the
    /// historical expression format.
    pub fn parse(expr: &str) -> Result<Self> {
        let (polarity, body) = match expr.strip_prefix('+') {
            Some(rest) => (AgePolarity::NewerThan, rest),
            None => (AgePolarity::OlderThan, expr),
        };

        let hours = parse_window_hours(body)
            .ok_or_else(|| SubfetchError::MalformedDuration(expr.to_string()))?;
        let window = Duration::try_hours(hours)
            .ok_or_else(|| SubfetchError::MalformedDuration(expr.to_string()))?;

        Ok(Self { polarity, window })
    }

    pub fn polarity(&self) -> AgePolarity {
        self.polarity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Evaluate the predicate for a file modified at `mtime`.
    ///
    /// Wall-clock time is re-read on every call, so the answer for the same
    /// file can change between calls as the window slides.
    pub fn matches(&self, mtime: DateTime<Utc>) -> bool {
        let age = Utc::now() - mtime;
        match self.polarity {
            AgePolarity::NewerThan => age < self.window,
            AgePolarity::OlderThan => age > self.window,
        }
    }
}

/// Sum the unit segments of a sign-stripped expression body into hours.
///
/// Returns `None` when the body begins with something that can never start
/// a unit segment. Trailing input after the last complete segment is
/// discarded.
fn parse_window_hours(body: &str) -> Option<i64> {
    if body.is_empty() {
        return Some(0);
    }
    let bytes = body.as_bytes();
    if !bytes[0].is_ascii_digit() {
        return None;
    }

    let mut hours: i64 = 0;
    let mut units = &UNITS[..];
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let Some(&suffix) = bytes.get(i) else {
            // Bare trailing digits never complete a segment.
            break;
        };
        let Some(pos) = units.iter().position(|&(unit, _)| unit == suffix) else {
            break;
        };
        let value: i64 = body[start..i].parse().ok()?;
        hours = hours.checked_add(value.checked_mul(units[pos].1)?)?;
        // A unit consumes itself and everything before it in the order.
        units = &units[pos + 1..];
        i += 1;
    }

    Some(hours)
}
