//! Local-catalog layout.
//!
//! Space-separated: `network code time mag lat lon depth n id_1 .. id_n description`.
//! The time is epoch milliseconds, the first id is the event id, and the
//! description is URL-encoded so it occupies a single token. Numbers are
//! written in shortest round-trip form, so every field survives a round trip.

use super::fields::{encode_description, fmt_exact, fmt_opt_str, FieldCursor};
use super::{parse_lon_range, LineCodec};
use crate::convert::Converter;
use crate::coords::{coerce_lon, AbsoluteTimeLocation, LonRange, DEPTH, LATITUDE};
use crate::error::Result;
use crate::rupture::RuptureRecord;

/// Type tag of this layout.
pub const TAG: &str = "local_catalog";

/// Fields before the id list.
const FIXED_FIELDS: usize = 8;

#[derive(Debug, Clone)]
pub struct LocalCatalogCodec {
    lon_range: LonRange,
    converter: Option<Converter>,
}

impl Default for LocalCatalogCodec {
    fn default() -> Self {
        Self::new(LonRange::Spherical)
    }
}

impl LocalCatalogCodec {
    pub fn new(lon_range: LonRange) -> Self {
        Self {
            lon_range,
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
        let [lon_range] = params else {
            return Err(format!("expected 1 parameter, found {}", params.len()));
        };
        Ok(Self::new(parse_lon_range(lon_range)?).with_converter(converter))
    }
}

impl LineCodec for LocalCatalogCodec {
    fn format_line(&self, rup: &RuptureRecord) -> Result<String> {
        let abs = rup.to_absolute(self.converter.as_ref())?;
        let lon = coerce_lon(abs.lon, LonRange::Full, self.lon_range)?;
        let strings = rup.strings();
        let ids = strings.merged_ids();

        let mut fields: Vec<String> = Vec::with_capacity(FIXED_FIELDS + ids.len() + 1);
        fields.push(fmt_opt_str(strings.network()).to_string());
        fields.push(fmt_opt_str(strings.code()).to_string());
        fields.push(abs.time.to_string());
        fields.push(fmt_exact(rup.mag()));
        fields.push(fmt_exact(abs.lat));
        fields.push(fmt_exact(lon));
        fields.push(fmt_exact(abs.depth));
        fields.push(ids.len().to_string());
        fields.extend(ids);
        fields.push(encode_description(strings.description()));
        Ok(fields.join(" "))
    }

    fn parse_line(&self, rup: &mut RuptureRecord, line: &str) -> Result<()> {
        let mut cur = FieldCursor::new(line);
        if cur.len() < FIXED_FIELDS + 1 {
            cur.expect_count(FIXED_FIELDS + 1, usize::MAX)?;
        }

        let network = cur.next_opt_str("network")?;
        let code = cur.next_opt_str("code")?;
        let time = cur.next_i64("time")?;
        let mag = cur.next_f64("magnitude")?;
        let lat = cur.next_bounded("latitude", LATITUDE)?;
        let lon = cur.next_lon("longitude", self.lon_range)?;
        let depth = cur.next_bounded("depth", DEPTH)?;
        let count = cur.next_usize("id count")?;
        let expected = count
            .checked_add(FIXED_FIELDS + 1)
            .ok_or_else(|| cur.error("id count", "too large"))?;
        cur.expect_count(expected, expected)?;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(cur.next_str("id")?);
        }
        let description = cur.next_description("description")?;
        cur.finish()?;

        let mut parsed = RuptureRecord::new();
        parsed
            .set_mag(mag)
            .map_err(|e| cur.error("magnitude", e.to_string()))?;
        let strings = parsed.strings_mut();
        strings
            .set_network(network)
            .map_err(|e| cur.error("network", e.to_string()))?;
        strings
            .set_code(code)
            .map_err(|e| cur.error("code", e.to_string()))?;
        strings
            .set_event_id(ids.first().copied())
            .map_err(|e| cur.error("id", e.to_string()))?;
        let id_list = (!ids.is_empty()).then_some(ids.as_slice());
        strings
            .set_id_list(id_list)
            .map_err(|e| cur.error("id", e.to_string()))?;
        strings.set_description(description.as_deref());
        parsed.set_absolute(AbsoluteTimeLocation::new(time, lat, lon, depth));
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
