//! Legacy 10-field tab-separated layout.
//!
//! `year month day hour minute second lat lon depth mag`, one tab between
//! fields. The layout carries no id, so parsed records take their event id
//! from an [`IdGenerator`].

use std::cell::RefCell;
use std::rc::Rc;

use super::fields::{fmt_fixed, CalendarTime, FieldCursor};
use super::{parse_lon_range, CodecContext, IdGenerator, LineCodec, SequentialIds, SharedIds};
use crate::convert::Converter;
use crate::coords::{coerce_lon, AbsoluteTimeLocation, LonRange, DEPTH, LATITUDE};
use crate::error::Result;
use crate::rupture::RuptureRecord;

/// Type tag of this layout.
pub const TAG: &str = "legacy_10";

const SEP: &str = "\t";
const SECOND_DIGITS: usize = 3;
const LOC_DIGITS: usize = 5;
const DEPTH_DIGITS: usize = 3;
const MAG_DIGITS: usize = 3;

/// Tab-separated calendar layout without ids.
#[derive(Debug, Clone)]
pub struct LegacyCodec {
    lon_range: LonRange,
    converter: Option<Converter>,
    ids: SharedIds,
}

impl LegacyCodec {
    /// A codec using sequential ids `ev1`, `ev2`, ...
    pub fn new(lon_range: LonRange) -> Self {
        Self::with_id_generator(lon_range, SequentialIds::default())
    }

    /// A codec drawing event ids from `ids`.
    pub fn with_id_generator<G: IdGenerator + 'static>(lon_range: LonRange, ids: G) -> Self {
        Self::with_shared_ids(lon_range, Rc::new(RefCell::new(ids)))
    }

    /// A codec drawing event ids from a generator shared with other codecs.
    pub fn with_shared_ids(lon_range: LonRange, ids: SharedIds) -> Self {
        Self {
            lon_range,
            converter: None,
            ids,
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
        ctx: &CodecContext,
    ) -> std::result::Result<Self, String> {
        let [lon_range] = params else {
            return Err(format!("expected 1 parameter, found {}", params.len()));
        };
        Ok(
            Self::with_shared_ids(parse_lon_range(lon_range)?, Rc::clone(&ctx.ids))
                .with_converter(ctx.converter.clone()),
        )
    }
}

impl LineCodec for LegacyCodec {
    fn format_line(&self, rup: &RuptureRecord) -> Result<String> {
        let abs = rup.to_absolute(self.converter.as_ref())?;
        let cal = CalendarTime::from_millis(abs.time)?;
        let lon = coerce_lon(abs.lon, LonRange::Full, self.lon_range)?;
        let fields = [
            cal.year.to_string(),
            cal.month.to_string(),
            cal.day.to_string(),
            cal.hour.to_string(),
            cal.minute.to_string(),
            fmt_fixed(cal.second, SECOND_DIGITS),
            fmt_fixed(abs.lat, LOC_DIGITS),
            fmt_fixed(lon, LOC_DIGITS),
            fmt_fixed(abs.depth, DEPTH_DIGITS),
            fmt_fixed(rup.mag(), MAG_DIGITS),
        ];
        Ok(fields.join(SEP))
    }

    fn parse_line(&self, rup: &mut RuptureRecord, line: &str) -> Result<()> {
        let mut cur = FieldCursor::new(line);
        cur.expect_count(10, 10)?;

        let year = cur.next_i64("year")?;
        let cal = CalendarTime {
            year: i32::try_from(year).map_err(|_| cur.error("year", "out of range"))?,
            month: cur.next_u32("month")?,
            day: cur.next_u32("day")?,
            hour: cur.next_u32("hour")?,
            minute: cur.next_u32("minute")?,
            second: cur.next_f64("second")?,
        };
        let time = cal
            .to_millis()
            .ok_or_else(|| cur.error("date", "not a valid calendar time"))?;
        let lat = cur.next_bounded("latitude", LATITUDE)?;
        let lon = cur.next_lon("longitude", self.lon_range)?;
        let depth = cur.next_bounded("depth", DEPTH)?;
        let mag = cur.next_f64("magnitude")?;
        cur.finish()?;

        let mut parsed = RuptureRecord::new();
        parsed
            .set_mag(mag)
            .map_err(|e| cur.error("magnitude", e.to_string()))?;
        parsed.set_absolute(AbsoluteTimeLocation::new(time, lat, lon, depth));
        let id = self.ids.borrow_mut().next_id(&parsed);
        parsed.strings_mut().set_event_id(Some(&id))?;
        *rup = parsed;
        Ok(())
    }

    fn type_tag(&self) -> &str {
        TAG
    }

    fn description(&self) -> Option<String> {
        Some(format!("{} {}", TAG, self.lon_range))
    }
}
