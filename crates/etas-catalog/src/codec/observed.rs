//! Observed-catalog 7-field layout.
//!
//! `date  time  lat  lon  depth  mag  [id]` with two spaces between columns
//! and right-aligned fixed-precision numbers, so every line without an id
//! has the same length.

use super::fields::{fmt_date_time, fmt_padded, parse_date_time, FieldCursor};
use super::{parse_digits, parse_lon_range, LineCodec};
use crate::convert::Converter;
use crate::coords::{coerce_lon, AbsoluteTimeLocation, LonRange, DEPTH, LATITUDE};
use crate::error::Result;
use crate::rupture::RuptureRecord;

/// Type tag of this layout.
pub const TAG: &str = "observed_7";

const SEP: &str = "  ";

/// Column layout for observed catalogs.
#[derive(Debug, Clone)]
pub struct ObservedCodec {
    lon_range: LonRange,
    loc_digits: usize,
    depth_digits: usize,
    mag_digits: usize,
    converter: Option<Converter>,
}

impl Default for ObservedCodec {
    fn default() -> Self {
        Self::new(LonRange::Spherical, 4, 3, 2)
    }
}

impl ObservedCodec {
    pub fn new(lon_range: LonRange, loc_digits: usize, depth_digits: usize, mag_digits: usize) -> Self {
        Self {
            lon_range,
            loc_digits,
            depth_digits,
            mag_digits,
            converter: None,
        }
    }

    pub fn with_converter(mut self, converter: Option<Converter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    pub fn lon_range(&self) -> LonRange {
        self.lon_range
    }

    pub(crate) fn from_params(
        params: &[&str],
        converter: Option<Converter>,
    ) -> std::result::Result<Self, String> {
        let [lon_range, loc, depth, mag] = params else {
            return Err(format!("expected 4 parameters, found {}", params.len()));
        };
        Ok(Self::new(
            parse_lon_range(lon_range)?,
            parse_digits(loc, "location")?,
            parse_digits(depth, "depth")?,
            parse_digits(mag, "magnitude")?,
        )
        .with_converter(converter))
    }

    /// Id assigned to records whose line carries none.
    pub fn synthesize_id(time: i64, mag: f64) -> String {
        format!("t{}m{}", time, (mag * 100.0).round() as i64)
    }
}

impl LineCodec for ObservedCodec {
    fn format_line(&self, rup: &RuptureRecord) -> Result<String> {
        let abs = rup.to_absolute(self.converter.as_ref())?;
        let (date, time) = fmt_date_time(abs.time)?;
        let lon = coerce_lon(abs.lon, LonRange::Full, self.lon_range)?;

        let mut line = [
            date,
            time,
            fmt_padded(abs.lat, self.loc_digits, self.loc_digits + 4),
            fmt_padded(lon, self.loc_digits, self.loc_digits + 5),
            fmt_padded(abs.depth, self.depth_digits, self.depth_digits + 4),
            fmt_padded(rup.mag(), self.mag_digits, self.mag_digits + 4),
        ]
        .join(SEP);
        if let Some(id) = rup.strings().event_id() {
            line.push_str(SEP);
            line.push_str(id);
        }
        Ok(line)
    }

    fn parse_line(&self, rup: &mut RuptureRecord, line: &str) -> Result<()> {
        let mut cur = FieldCursor::new(line);
        cur.expect_count(6, 7)?;

        let date = cur.next_str("date")?;
        let clock = cur.next_str("time")?;
        let time = parse_date_time(date, clock)
            .ok_or_else(|| cur.error("time", format!("invalid date/time '{date} {clock}'")))?;
        let lat = cur.next_bounded("latitude", LATITUDE)?;
        let lon = cur.next_lon("longitude", self.lon_range)?;
        let depth = cur.next_bounded("depth", DEPTH)?;
        let mag = cur.next_f64("magnitude")?;
        let id = if cur.remaining() > 0 {
            Some(cur.next_str("id")?.to_string())
        } else {
            None
        };
        cur.finish()?;

        let mut parsed = RuptureRecord::new();
        parsed
            .set_mag(mag)
            .map_err(|e| cur.error("magnitude", e.to_string()))?;
        let id = id.unwrap_or_else(|| Self::synthesize_id(time, parsed.mag()));
        parsed
            .strings_mut()
            .set_event_id(Some(&id))
            .map_err(|e| cur.error("id", e.to_string()))?;
        parsed.set_absolute(AbsoluteTimeLocation::new(time, lat, lon, depth));
        *rup = parsed;
        Ok(())
    }

    fn type_tag(&self) -> &str {
        TAG
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "{} {} {} {} {}",
            TAG, self.lon_range, self.loc_digits, self.depth_digits, self.mag_digits
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample(id: Option<&str>) -> RuptureRecord {
        let abs = AbsoluteTimeLocation::new(1_577_836_800_250, 34.05, -118.25, 8.0);
        let mut rup = RuptureRecord::with_absolute(4.5, abs).unwrap();
        rup.strings_mut().set_event_id(id).unwrap();
        rup
    }

    #[test]
    fn test_format_without_id_has_no_trailing_separator() {
        let codec = ObservedCodec::default();
        let line = codec.format_line(&sample(None)).unwrap();
        assert_eq!(
            line,
            "2020-01-01  00:00:00.250   34.0500  -118.2500    8.000    4.50"
        );
        assert!(!line.ends_with(' '));
    }

    #[test]
    fn test_line_length_is_deterministic() {
        let codec = ObservedCodec::default();
        let a = codec.format_line(&sample(None)).unwrap();
        let abs = AbsoluteTimeLocation::new(1_600_000_000_000, -5.5, 2.0, 120.25);
        let other = RuptureRecord::with_absolute(-1.0, abs).unwrap();
        let b = codec.format_line(&other).unwrap();
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_extreme_values_keep_column_widths() {
        let codec = ObservedCodec::default();
        let a = codec.format_line(&sample(None)).unwrap();
        for (mag, lat, lon, depth) in [
            (-11.5, -90.0, -180.0, 700.0),
            (-12.0, 90.0, 180.0, -5.0),
            (12.0, 0.0, 0.0, 0.0),
        ] {
            let abs = AbsoluteTimeLocation::new(1_600_000_000_000, lat, lon, depth);
            let rup = RuptureRecord::with_absolute(mag, abs).unwrap();
            let b = codec.format_line(&rup).unwrap();
            assert_eq!(a.len(), b.len(), "{b}");
        }

        let abs = AbsoluteTimeLocation::new(1_600_000_000_000, 0.0, 0.0, 0.0);
        let rup = RuptureRecord::with_absolute(-11.0, abs).unwrap();
        assert!(codec.format_line(&rup).unwrap().ends_with("  -11.00"));
    }

    #[test]
    fn test_round_trip_with_id() {
        let codec = ObservedCodec::default();
        let original = sample(Some("ci12345"));
        let line = codec.format_line(&original).unwrap();
        assert!(line.ends_with("    4.50  ci12345"));
        let mut parsed = RuptureRecord::new();
        codec.parse_line(&mut parsed, &line).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_without_id_synthesizes_one() {
        let codec = ObservedCodec::default();
        let line = codec.format_line(&sample(None)).unwrap();
        let mut parsed = RuptureRecord::new();
        codec.parse_line(&mut parsed, &line).unwrap();
        assert_eq!(parsed.strings().event_id(), Some("t1577836800250m450"));
        assert_eq!(parsed.absolute(), sample(None).absolute());
    }

    #[test]
    fn test_parse_errors() {
        let codec = ObservedCodec::default();
        let mut rup = RuptureRecord::new();
        for line in [
            "2020-01-01  00:00:00.250  34.05  -118.25  8.0",
            "2020-01-01  00:00:00.250  34.05  -118.25  8.0  4.5  id  extra",
            "2020-13-01  00:00:00.250  34.05  -118.25  8.0  4.5",
            "2020-01-01  00:00:00.250  34.05  -118.25  8.0  4.5  -bad",
        ] {
            let err = codec.parse_line(&mut rup, line).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::LineMalformed, "{line}");
        }
    }
}
