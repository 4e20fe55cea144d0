//! Time/location value objects and numeric range coercion.
//!
//! Absolute coordinates are wall-clock milliseconds plus geographic
//! latitude/longitude/depth. Relative coordinates are days and kilometres
//! measured from an origin chosen by a converter.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Distance beyond a bound that is still snapped onto the bound.
pub const COERCE_TOLERANCE: f64 = 1.0e-4;

/// Magnitude below which a value is snapped to exactly zero.
pub const TINY: f64 = 1.0e-16;

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Coerce `value` into `[min, max]`.
///
/// Values strictly inside `(tiny_min, tiny_max)` become `0.0`. Values in
/// `[coerce_min, min)` become `min` and values in `(max, coerce_max]` become
/// `max`. Anything else outside the range (including NaN) is an error.
#[allow(clippy::too_many_arguments)]
pub fn coerce(
    name: &'static str,
    value: f64,
    min: f64,
    coerce_min: f64,
    max: f64,
    coerce_max: f64,
    tiny_min: f64,
    tiny_max: f64,
) -> Result<f64> {
    if value > tiny_min && value < tiny_max {
        return Ok(0.0);
    }
    if value >= min && value <= max {
        return Ok(value);
    }
    if value >= coerce_min && value < min {
        return Ok(min);
    }
    if value > max && value <= coerce_max {
        return Ok(max);
    }
    Err(CatalogError::RangeInvalid {
        name,
        value,
        min,
        max,
    })
}

/// A closed range with the standard tolerance and zero snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Name used in error messages.
    pub name: &'static str,
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Bounds {
    /// Coerce a value into these bounds.
    pub fn coerce(&self, value: f64) -> Result<f64> {
        coerce(
            self.name,
            value,
            self.min,
            self.min - COERCE_TOLERANCE,
            self.max,
            self.max + COERCE_TOLERANCE,
            -TINY,
            TINY,
        )
    }

    /// Whether `value` lies within the bounds without coercion.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const LATITUDE: Bounds = Bounds {
    name: "latitude",
    min: -90.0,
    max: 90.0,
};

pub const DEPTH: Bounds = Bounds {
    name: "depth",
    min: -5.0,
    max: 700.0,
};

pub const MAGNITUDE: Bounds = Bounds {
    name: "magnitude",
    min: -12.0,
    max: 12.0,
};

pub const REL_HORIZONTAL: Bounds = Bounds {
    name: "horizontal offset",
    min: -9999.0,
    max: 9999.0,
};

pub const REL_DEPTH: Bounds = Bounds {
    name: "depth offset",
    min: -99.0,
    max: 999.0,
};

/// Snap values within [`TINY`] of zero to exactly zero.
pub fn snap_zero(value: f64) -> f64 {
    if value > -TINY && value < TINY {
        0.0
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Longitude ranges
// ---------------------------------------------------------------------------

/// Convention for representing longitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LonRange {
    /// `[-180, 180]`.
    #[default]
    Spherical,
    /// `[0, 360]`.
    Wrapped,
    /// `[-180, 360]`.
    Location,
    /// `[-360, 360]`.
    Full,
}

impl LonRange {
    pub const ALL: [LonRange; 4] = [
        LonRange::Spherical,
        LonRange::Wrapped,
        LonRange::Location,
        LonRange::Full,
    ];

    /// Bounds of this range.
    pub fn bounds(&self) -> Bounds {
        let (min, max) = match self {
            LonRange::Spherical => (-180.0, 180.0),
            LonRange::Wrapped => (0.0, 360.0),
            LonRange::Location => (-180.0, 360.0),
            LonRange::Full => (-360.0, 360.0),
        };
        Bounds {
            name: "longitude",
            min,
            max,
        }
    }

    /// Name used in descriptions and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            LonRange::Spherical => "spherical",
            LonRange::Wrapped => "wrapped",
            LonRange::Location => "location",
            LonRange::Full => "full",
        }
    }
}

impl fmt::Display for LonRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LonRange {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spherical" => Ok(LonRange::Spherical),
            "wrapped" => Ok(LonRange::Wrapped),
            "location" => Ok(LonRange::Location),
            "full" => Ok(LonRange::Full),
            other => Err(CatalogError::config(format!(
                "unknown longitude range '{other}'"
            ))),
        }
    }
}

/// Convert a longitude expressed in `in_range` into `out_range`.
///
/// The value is first coerced to the bounds of `in_range`, shifted by 360
/// degrees where needed, and finally coerced to the bounds of `out_range`.
pub fn coerce_lon(lon: f64, in_range: LonRange, out_range: LonRange) -> Result<f64> {
    use LonRange::*;

    let v = in_range.bounds().coerce(lon)?;
    let shifted = match (in_range, out_range) {
        (Spherical, Spherical) | (Wrapped, Wrapped) | (Location, Location) | (Full, Full) => v,

        (Spherical, Wrapped) => wrap_positive(v),
        (Spherical, Location) => v,
        (Spherical, Full) => v,

        (Wrapped, Spherical) => wrap_high(v),
        (Wrapped, Location) => v,
        (Wrapped, Full) => v,

        (Location, Spherical) => wrap_high(v),
        (Location, Wrapped) => wrap_positive(v),
        (Location, Full) => v,

        (Full, Spherical) => {
            if v < -180.0 {
                v + 360.0
            } else {
                wrap_high(v)
            }
        }
        (Full, Wrapped) => wrap_positive(v),
        (Full, Location) => {
            if v < -180.0 {
                v + 360.0
            } else {
                v
            }
        }
    };
    out_range.bounds().coerce(shifted)
}

fn wrap_positive(v: f64) -> f64 {
    if v < 0.0 {
        v + 360.0
    } else {
        v
    }
}

fn wrap_high(v: f64) -> f64 {
    if v > 180.0 {
        v - 360.0
    } else {
        v
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Convert epoch milliseconds to a UTC date-time.
pub fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(CatalogError::ValueInvalid {
            what: "time",
            value: millis.to_string(),
        })
}

/// Format epoch milliseconds as RFC 3339 with millisecond precision.
pub fn format_timestamp(millis: i64) -> Result<String> {
    Ok(millis_to_datetime(millis)?.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse either raw epoch milliseconds or an RFC 3339 timestamp.
pub fn parse_timestamp(text: &str) -> Result<i64> {
    let text = text.trim();
    if let Ok(millis) = text.parse::<i64>() {
        return Ok(millis);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| CatalogError::ValueInvalid {
            what: "timestamp",
            value: text.to_string(),
        })
}

// ---------------------------------------------------------------------------
// AbsoluteTimeLocation
// ---------------------------------------------------------------------------

/// Wall-clock time and geographic location of a rupture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteTimeLocation {
    /// Milliseconds since the Unix epoch.
    pub time: i64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Depth in kilometres.
    pub depth: f64,
}

impl AbsoluteTimeLocation {
    pub fn new(time: i64, lat: f64, lon: f64, depth: f64) -> Self {
        Self {
            time,
            lat,
            lon,
            depth,
        }
    }

    /// Coerce latitude and depth into range and express longitude in `lon_range`.
    pub fn coerce(&mut self, lon_range: LonRange) -> Result<()> {
        self.lat = LATITUDE.coerce(self.lat)?;
        self.lon = coerce_lon(self.lon, LonRange::Full, lon_range)?;
        self.depth = DEPTH.coerce(self.depth)?;
        Ok(())
    }

    /// A coerced copy.
    pub fn coerced(mut self, lon_range: LonRange) -> Result<Self> {
        self.coerce(lon_range)?;
        Ok(self)
    }

    /// The time as a UTC date-time.
    pub fn datetime(&self) -> Result<DateTime<Utc>> {
        millis_to_datetime(self.time)
    }
}

impl fmt::Display for AbsoluteTimeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time={}, lat={}, lon={}, depth={}",
            self.time, self.lat, self.lon, self.depth
        )
    }
}

// ---------------------------------------------------------------------------
// RelativeTimeLocation
// ---------------------------------------------------------------------------

/// Time and location relative to a converter's origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RelativeTimeLocation {
    /// Days since the origin time.
    pub t_day: f64,
    /// East offset in kilometres.
    pub x_km: f64,
    /// North offset in kilometres.
    pub y_km: f64,
    /// Depth offset in kilometres.
    pub d_km: f64,
}

impl RelativeTimeLocation {
    pub fn new(t_day: f64, x_km: f64, y_km: f64, d_km: f64) -> Self {
        Self {
            t_day,
            x_km,
            y_km,
            d_km,
        }
    }

    /// Coerce offsets into range; the time is only snapped near zero.
    pub fn coerce(&mut self) -> Result<()> {
        self.t_day = snap_zero(self.t_day);
        self.x_km = REL_HORIZONTAL.coerce(self.x_km)?;
        self.y_km = REL_HORIZONTAL.coerce(self.y_km)?;
        self.d_km = REL_DEPTH.coerce(self.d_km)?;
        Ok(())
    }
}

impl fmt::Display for RelativeTimeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t_day={}, x_km={}, y_km={}, d_km={}",
            self.t_day, self.x_km, self.y_km, self.d_km
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_coerce_inside_range_unchanged() {
        assert_eq!(LATITUDE.coerce(45.5).unwrap(), 45.5);
        assert_eq!(LATITUDE.coerce(90.0).unwrap(), 90.0);
        assert_eq!(LATITUDE.coerce(-90.0).unwrap(), -90.0);
    }

    #[test]
    fn test_coerce_snaps_within_tolerance() {
        assert_eq!(LATITUDE.coerce(90.00005).unwrap(), 90.0);
        assert_eq!(LATITUDE.coerce(-90.0001).unwrap(), -90.0);
        assert_eq!(DEPTH.coerce(700.00009).unwrap(), 700.0);
    }

    #[test]
    fn test_coerce_fails_beyond_tolerance() {
        let err = LATITUDE.coerce(90.0002).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeInvalid);
        assert!(DEPTH.coerce(-5.001).is_err());
        assert!(MAGNITUDE.coerce(f64::NAN).is_err());
    }

    #[test]
    fn test_coerce_snaps_tiny_to_zero() {
        assert_eq!(LATITUDE.coerce(1.0e-17).unwrap(), 0.0);
        assert_eq!(LATITUDE.coerce(-1.0e-17).unwrap(), 0.0);
        let z = LATITUDE.coerce(-0.0).unwrap();
        assert!(z == 0.0 && z.is_sign_positive());
        assert_eq!(snap_zero(5.0e-17), 0.0);
        assert_eq!(snap_zero(1.0e-15), 1.0e-15);
    }

    #[test]
    fn test_coerce_idempotent() {
        for x in [-90.00005, -45.0, 0.0, 1.0e-20, 12.25, 89.99999, 90.00009] {
            let once = LATITUDE.coerce(x).unwrap();
            assert_eq!(LATITUDE.coerce(once).unwrap(), once);
        }
    }

    #[test]
    fn test_coerce_raw_function() {
        assert_eq!(coerce("v", 5.5, 0.0, -1.0, 5.0, 6.0, -0.1, 0.1).unwrap(), 5.0);
        assert_eq!(coerce("v", -0.5, 0.0, -1.0, 5.0, 6.0, -0.1, 0.1).unwrap(), 0.0);
        assert_eq!(coerce("v", 0.05, 0.0, -1.0, 5.0, 6.0, -0.1, 0.1).unwrap(), 0.0);
        assert!(coerce("v", 6.5, 0.0, -1.0, 5.0, 6.0, -0.1, 0.1).is_err());
    }

    #[test]
    fn test_lon_range_parse_and_display() {
        for range in LonRange::ALL {
            assert_eq!(range.name().parse::<LonRange>().unwrap(), range);
        }
        let err = "polar".parse::<LonRange>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_coerce_lon_closure_over_all_pairs() {
        let samples = [-200.0, -180.0, -0.0000001, 0.0, 179.9999, 200.0, 400.0];
        for in_range in LonRange::ALL {
            for out_range in LonRange::ALL {
                for &lon in &samples {
                    match coerce_lon(lon, in_range, out_range) {
                        Ok(v) => {
                            assert!(
                                out_range.bounds().contains(v),
                                "{lon} {in_range}->{out_range} gave {v}"
                            );
                            if in_range == out_range {
                                assert_eq!(v, in_range.bounds().coerce(lon).unwrap());
                            }
                        }
                        Err(e) => {
                            assert_eq!(e.kind(), ErrorKind::RangeInvalid);
                            assert!(!in_range.bounds().contains(lon));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_coerce_lon_specific_values() {
        use LonRange::*;
        assert_eq!(coerce_lon(-118.25, Spherical, Wrapped).unwrap(), 241.75);
        assert_eq!(coerce_lon(241.75, Wrapped, Spherical).unwrap(), -118.25);
        assert_eq!(coerce_lon(-200.0, Full, Location).unwrap(), 160.0);
        assert_eq!(coerce_lon(-200.0, Full, Spherical).unwrap(), 160.0);
        assert_eq!(coerce_lon(200.0, Location, Spherical).unwrap(), -160.0);
        assert_eq!(coerce_lon(359.0, Full, Location).unwrap(), 359.0);
        assert!(coerce_lon(200.0, Spherical, Wrapped).is_err());
    }

    #[test]
    fn test_absolute_coerce() {
        let mut abs = AbsoluteTimeLocation::new(0, 90.00001, 241.75, 700.00002);
        abs.coerce(LonRange::Spherical).unwrap();
        assert_eq!(abs.lat, 90.0);
        assert_eq!(abs.lon, -118.25);
        assert_eq!(abs.depth, 700.0);

        let bad = AbsoluteTimeLocation::new(0, 91.0, 0.0, 0.0);
        assert!(bad.coerced(LonRange::Spherical).is_err());
    }

    #[test]
    fn test_relative_coerce() {
        let mut rel = RelativeTimeLocation::new(1.0e-18, 9999.00001, -3.0, -99.00005);
        rel.coerce().unwrap();
        assert_eq!(rel.t_day, 0.0);
        assert_eq!(rel.x_km, 9999.0);
        assert_eq!(rel.d_km, -99.0);

        let mut big = RelativeTimeLocation::new(1.0e6, 0.0, 0.0, 1000.0);
        assert!(big.coerce().is_err());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let text = format_timestamp(1_577_836_800_123).unwrap();
        assert_eq!(text, "2020-01-01T00:00:00.123Z");
        assert_eq!(parse_timestamp(&text).unwrap(), 1_577_836_800_123);
        assert_eq!(parse_timestamp("1577836800000").unwrap(), 1_577_836_800_000);
        assert_eq!(
            parse_timestamp("not-a-time").unwrap_err().kind(),
            ErrorKind::ValueInvalid
        );
    }
}
