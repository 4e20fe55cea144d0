//! Absolute/relative time-location converters.
//!
//! A converter translates between wall-clock geographic coordinates and
//! origin-relative day/kilometre coordinates. The built-in
//! [`OriginConverter`] is described textually as
//! `etas_origin <time> <lat> <lon> <depth>`; additional converter types can
//! be registered with a [`ConverterFactory`].

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::coords::{
    coerce_lon, format_timestamp, parse_timestamp, AbsoluteTimeLocation, LonRange,
    RelativeTimeLocation, DEPTH, LATITUDE, MILLIS_PER_DAY,
};
use crate::error::{CatalogError, Result};

/// Kilometres per degree of arc on a sphere of radius 6371 km.
pub const KM_PER_DEGREE: f64 = 111.194_926_644_558_73;

/// Type tag of the built-in origin converter.
pub const ORIGIN_TAG: &str = "etas_origin";

/// Translates between absolute and relative time/location.
pub trait AbsRelConverter: fmt::Debug {
    /// Compute `rel` from `abs`.
    fn convert_abs_to_rel(
        &self,
        abs: &AbsoluteTimeLocation,
        rel: &mut RelativeTimeLocation,
    ) -> Result<()>;

    /// Compute `abs` from `rel`.
    fn convert_rel_to_abs(
        &self,
        rel: &RelativeTimeLocation,
        abs: &mut AbsoluteTimeLocation,
    ) -> Result<()>;

    /// Type tag used as the first token of the description.
    fn type_tag(&self) -> &str;

    /// Full single-line description, or `None` if this converter cannot be
    /// persisted.
    fn description(&self) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// OriginConverter
// ---------------------------------------------------------------------------

/// Converter measuring time and distance from a fixed origin.
///
/// Uses an equirectangular projection about the origin latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginConverter {
    origin: AbsoluteTimeLocation,
}

impl OriginConverter {
    /// Create a converter about `origin`; its longitude is kept in `[-180, 360]`.
    pub fn new(origin: AbsoluteTimeLocation) -> Result<Self> {
        Ok(Self {
            origin: origin.coerced(LonRange::Location)?,
        })
    }

    pub fn origin(&self) -> &AbsoluteTimeLocation {
        &self.origin
    }

    fn output_lon_range(&self) -> LonRange {
        if self.origin.lon > 180.0 {
            LonRange::Wrapped
        } else {
            LonRange::Spherical
        }
    }

    /// Parse the parameters following the type tag.
    pub fn from_params(params: &[&str]) -> std::result::Result<Self, String> {
        let [time, lat, lon, depth] = params else {
            return Err(format!("expected 4 parameters, found {}", params.len()));
        };
        let time = parse_timestamp(time).map_err(|e| e.to_string())?;
        let lat = parse_param(lat, "latitude")?;
        let lon = parse_param(lon, "longitude")?;
        let depth = parse_param(depth, "depth")?;
        Self::new(AbsoluteTimeLocation::new(time, lat, lon, depth)).map_err(|e| e.to_string())
    }
}

fn parse_param(token: &str, name: &str) -> std::result::Result<f64, String> {
    token
        .parse::<f64>()
        .map_err(|_| format!("invalid {name} '{token}'"))
}

/// `origin + t_day` in epoch milliseconds, rounded to the nearest millisecond.
fn offset_millis(origin: i64, t_day: f64) -> Result<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper check is exclusive.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let delta = (t_day * MILLIS_PER_DAY).round();
    let out_of_range = || CatalogError::RangeInvalid {
        name: "relative time",
        value: t_day,
        min: (i64::MIN as f64 - origin as f64) / MILLIS_PER_DAY,
        max: (i64::MAX as f64 - origin as f64) / MILLIS_PER_DAY,
    };
    if !(delta >= -LIMIT && delta < LIMIT) {
        return Err(out_of_range());
    }
    origin.checked_add(delta as i64).ok_or_else(out_of_range)
}

impl AbsRelConverter for OriginConverter {
    fn convert_abs_to_rel(
        &self,
        abs: &AbsoluteTimeLocation,
        rel: &mut RelativeTimeLocation,
    ) -> Result<()> {
        let o = &self.origin;
        let mut dlon = abs.lon - o.lon;
        while dlon > 180.0 {
            dlon -= 360.0;
        }
        while dlon < -180.0 {
            dlon += 360.0;
        }
        let dt = abs
            .time
            .checked_sub(o.time)
            .ok_or(CatalogError::RangeInvalid {
                name: "time",
                value: abs.time as f64,
                min: i64::MIN as f64 + o.time.max(0) as f64,
                max: i64::MAX as f64 + o.time.min(0) as f64,
            })?;
        let mut out = RelativeTimeLocation::new(
            dt as f64 / MILLIS_PER_DAY,
            dlon * KM_PER_DEGREE * o.lat.to_radians().cos(),
            (abs.lat - o.lat) * KM_PER_DEGREE,
            abs.depth - o.depth,
        );
        out.coerce()?;
        *rel = out;
        Ok(())
    }

    fn convert_rel_to_abs(
        &self,
        rel: &RelativeTimeLocation,
        abs: &mut AbsoluteTimeLocation,
    ) -> Result<()> {
        let o = &self.origin;
        let scale = KM_PER_DEGREE * o.lat.to_radians().cos();
        let dlon = if scale.abs() < 1.0e-9 { 0.0 } else { rel.x_km / scale };
        let lon = (o.lon + dlon + 180.0).rem_euclid(360.0) - 180.0;

        let out = AbsoluteTimeLocation::new(
            offset_millis(o.time, rel.t_day)?,
            LATITUDE.coerce(o.lat + rel.y_km / KM_PER_DEGREE)?,
            coerce_lon(lon, LonRange::Spherical, self.output_lon_range())?,
            DEPTH.coerce(o.depth + rel.d_km)?,
        );
        *abs = out;
        Ok(())
    }

    fn type_tag(&self) -> &str {
        ORIGIN_TAG
    }

    fn description(&self) -> Option<String> {
        let time = format_timestamp(self.origin.time).ok()?;
        Some(format!(
            "{} {} {} {} {}",
            ORIGIN_TAG, time, self.origin.lat, self.origin.lon, self.origin.depth
        ))
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// A converter held by a section: either built in or user supplied.
#[derive(Debug, Clone)]
pub enum Converter {
    /// Fixed-origin converter.
    Origin(OriginConverter),
    /// Any other implementation.
    Custom(Rc<dyn AbsRelConverter>),
}

impl Converter {
    /// The single-line description of this converter.
    pub fn describe(&self) -> Result<String> {
        self.description()
            .ok_or_else(|| CatalogError::UnrecognizedType {
                what: "converter",
                type_name: self.type_tag().to_string(),
            })
    }

    /// Reconstruct a built-in converter from its description.
    pub fn from_description(description: &str) -> Result<Self> {
        ConverterFactory::with_builtins().build(description)
    }
}

impl From<OriginConverter> for Converter {
    fn from(c: OriginConverter) -> Self {
        Converter::Origin(c)
    }
}

impl PartialEq for Converter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Converter::Origin(a), Converter::Origin(b)) => a == b,
            (Converter::Custom(a), Converter::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl AbsRelConverter for Converter {
    fn convert_abs_to_rel(
        &self,
        abs: &AbsoluteTimeLocation,
        rel: &mut RelativeTimeLocation,
    ) -> Result<()> {
        match self {
            Converter::Origin(c) => c.convert_abs_to_rel(abs, rel),
            Converter::Custom(c) => c.convert_abs_to_rel(abs, rel),
        }
    }

    fn convert_rel_to_abs(
        &self,
        rel: &RelativeTimeLocation,
        abs: &mut AbsoluteTimeLocation,
    ) -> Result<()> {
        match self {
            Converter::Origin(c) => c.convert_rel_to_abs(rel, abs),
            Converter::Custom(c) => c.convert_rel_to_abs(rel, abs),
        }
    }

    fn type_tag(&self) -> &str {
        match self {
            Converter::Origin(c) => c.type_tag(),
            Converter::Custom(c) => c.type_tag(),
        }
    }

    fn description(&self) -> Option<String> {
        match self {
            Converter::Origin(c) => c.description(),
            Converter::Custom(c) => c.description(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConverterFactory
// ---------------------------------------------------------------------------

/// Constructor taking the whitespace-separated parameters after the type tag.
pub type ConverterCtor = Box<dyn Fn(&[&str]) -> std::result::Result<Converter, String>>;

/// Registry mapping converter type tags to constructors.
pub struct ConverterFactory {
    ctors: HashMap<String, ConverterCtor>,
}

impl fmt::Debug for ConverterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.ctors.keys().collect();
        tags.sort();
        f.debug_struct("ConverterFactory")
            .field("tags", &tags)
            .finish()
    }
}

impl Default for ConverterFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ConverterFactory {
    /// Create a factory that knows only the built-in converter.
    pub fn with_builtins() -> Self {
        let mut factory = Self {
            ctors: HashMap::new(),
        };
        factory.register(ORIGIN_TAG, |params| {
            OriginConverter::from_params(params).map(Converter::Origin)
        });
        factory
    }

    /// Register a constructor for a type tag, replacing any existing one.
    pub fn register<F>(&mut self, tag: &str, ctor: F)
    where
        F: Fn(&[&str]) -> std::result::Result<Converter, String> + 'static,
    {
        self.ctors.insert(tag.to_string(), Box::new(ctor));
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.ctors.contains_key(tag)
    }

    /// Describe a converter.
    pub fn describe(&self, converter: &Converter) -> Result<String> {
        converter.describe()
    }

    /// Reconstruct a converter from its description.
    pub fn build(&self, description: &str) -> Result<Converter> {
        let tokens: Vec<&str> = description.split_whitespace().collect();
        let Some((tag, params)) = tokens.split_first() else {
            return Err(CatalogError::DescriptionInvalid {
                what: "converter",
                description: description.to_string(),
                detail: "empty description".to_string(),
            });
        };
        let ctor = self
            .ctors
            .get(*tag)
            .ok_or_else(|| CatalogError::UnrecognizedType {
                what: "converter",
                type_name: tag.to_string(),
            })?;
        ctor(params).map_err(|detail| CatalogError::DescriptionInvalid {
            what: "converter",
            description: description.trim().to_string(),
            detail,
        })
    }
}
