//! Field-level formatting and parsing shared by the line codecs.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::coords::{self, coerce_lon, snap_zero, Bounds, LonRange};
use crate::error::{CatalogError, Result};

/// Token written in place of a missing string field.
pub const NULL_TOKEN: &str = "-";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Whitespace tokenizer over one line, tracking the current field.
///
/// Every failure is reported as a malformed line carrying the whole line and
/// the field being read.
#[derive(Debug)]
pub struct FieldCursor<'a> {
    line: &'a str,
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            line,
            tokens: line.split_whitespace().collect(),
            pos: 0,
        }
    }

    /// Total number of tokens on the line.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    /// Build a malformed-line error for `field`.
    pub fn error(&self, field: &str, detail: impl Into<String>) -> CatalogError {
        CatalogError::malformed(self.line, field, detail)
    }

    /// Require the total token count to lie in `[min, max]`.
    pub fn expect_count(&self, min: usize, max: usize) -> Result<()> {
        let n = self.tokens.len();
        if n < min || n > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min}..={max}")
            };
            return Err(self.error("line", format!("expected {expected} fields, found {n}")));
        }
        Ok(())
    }

    /// Require that every token has been consumed.
    pub fn finish(&self) -> Result<()> {
        if self.pos != self.tokens.len() {
            return Err(self.error(
                "line",
                format!("{} unexpected trailing field(s)", self.remaining()),
            ));
        }
        Ok(())
    }

    pub fn next_str(&mut self, field: &str) -> Result<&'a str> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error(field, "missing"))?;
        self.pos += 1;
        Ok(token)
    }

    /// Next token, mapping [`NULL_TOKEN`] to `None`.
    pub fn next_opt_str(&mut self, field: &str) -> Result<Option<&'a str>> {
        let token = self.next_str(field)?;
        Ok((token != NULL_TOKEN).then_some(token))
    }

    pub fn next_i64(&mut self, field: &str) -> Result<i64> {
        let token = self.next_str(field)?;
        token
            .parse::<i64>()
            .map_err(|_| self.error(field, format!("invalid integer '{token}'")))
    }

    pub fn next_u32(&mut self, field: &str) -> Result<u32> {
        let token = self.next_str(field)?;
        token
            .parse::<u32>()
            .map_err(|_| self.error(field, format!("invalid integer '{token}'")))
    }

    pub fn next_usize(&mut self, field: &str) -> Result<usize> {
        let token = self.next_str(field)?;
        token
            .parse::<usize>()
            .map_err(|_| self.error(field, format!("invalid count '{token}'")))
    }

    pub fn next_f64(&mut self, field: &str) -> Result<f64> {
        let token = self.next_str(field)?;
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(self.error(field, format!("invalid number '{token}'"))),
        }
    }

    /// Next number, coerced into `bounds`.
    pub fn next_bounded(&mut self, field: &str, bounds: Bounds) -> Result<f64> {
        let v = self.next_f64(field)?;
        bounds
            .coerce(v)
            .map_err(|e| self.error(field, e.to_string()))
    }

    /// Next longitude, validated against `range`.
    pub fn next_lon(&mut self, field: &str, range: LonRange) -> Result<f64> {
        let v = self.next_f64(field)?;
        coerce_lon(v, range, range).map_err(|e| self.error(field, e.to_string()))
    }

    /// Next token as a URL-encoded description.
    pub fn next_description(&mut self, field: &str) -> Result<Option<String>> {
        let token = self.next_str(field)?;
        decode_description(token).map_err(|detail| self.error(field, detail))
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Fixed-point formatting that never produces a negative zero.
pub fn fmt_fixed(value: f64, digits: usize) -> String {
    let s = format!("{:.*}", digits, snap_zero(value));
    match s.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => s,
    }
}

/// Fixed-point formatting, right-aligned in `width` columns.
pub fn fmt_padded(value: f64, digits: usize, width: usize) -> String {
    format!("{:>width$}", fmt_fixed(value, digits), width = width)
}

/// Shortest formatting that parses back to the identical value.
pub fn fmt_exact(value: f64) -> String {
    format!("{}", snap_zero(value))
}

/// A string field or [`NULL_TOKEN`].
pub fn fmt_opt_str(value: Option<&str>) -> &str {
    value.unwrap_or(NULL_TOKEN)
}

/// URL-encode a description; `None` becomes [`NULL_TOKEN`].
pub fn encode_description(description: Option<&str>) -> String {
    match description {
        None => NULL_TOKEN.to_string(),
        Some(NULL_TOKEN) => "%2D".to_string(),
        Some(text) => urlencoding::encode(text).into_owned(),
    }
}

/// Inverse of [`encode_description`].
pub fn decode_description(token: &str) -> std::result::Result<Option<String>, String> {
    if token == NULL_TOKEN {
        return Ok(None);
    }
    urlencoding::decode(token)
        .map(|text| Some(text.into_owned()))
        .map_err(|e| format!("invalid encoded text '{token}': {e}"))
}

// ---------------------------------------------------------------------------
// Calendar fields
// ---------------------------------------------------------------------------

/// Calendar breakdown of an epoch-millisecond time, in UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    /// Seconds including the millisecond fraction.
    pub second: f64,
}

impl CalendarTime {
    pub fn from_millis(millis: i64) -> Result<Self> {
        let dt = coords::millis_to_datetime(millis)?;
        Ok(Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second() as f64 + dt.timestamp_subsec_millis() as f64 / 1000.0,
        })
    }

    /// Epoch milliseconds, rounding the seconds to the nearest millisecond.
    pub fn to_millis(&self) -> Option<i64> {
        if !(0.0..60.0005).contains(&self.second) {
            return None;
        }
        let base = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, 0)?
            .and_utc()
            .timestamp_millis();
        Some(base + (self.second * 1000.0).round() as i64)
    }
}

/// Format as `YYYY-MM-DD` and `HH:MM:SS.sss`.
pub fn fmt_date_time(millis: i64) -> Result<(String, String)> {
    let dt = coords::millis_to_datetime(millis)?;
    Ok((
        dt.format("%Y-%m-%d").to_string(),
        dt.format("%H:%M:%S%.3f").to_string(),
    ))
}

/// Parse the output of [`fmt_date_time`]; fractional seconds are optional.
pub fn parse_date_time(date: &str, time: &str) -> Option<i64> {
    let text = format!("{date} {time}");
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}
