//! A single rupture: strings, magnitude, and time/location.

use serde::{Deserialize, Serialize};

use crate::convert::{AbsRelConverter, Converter};
use crate::coords::{AbsoluteTimeLocation, RelativeTimeLocation, MAGNITUDE};
use crate::error::{CatalogError, Result};
use crate::strings::RuptureStrings;

/// One rupture record.
///
/// Holds an absolute time/location, a relative one, or both. A missing
/// representation is computed on demand through a converter supplied by
/// the caller; the record never invents a converter of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuptureRecord {
    strings: RuptureStrings,
    mag: f64,
    absolute: Option<AbsoluteTimeLocation>,
    relative: Option<RelativeTimeLocation>,
}

impl RuptureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record with an absolute time/location.
    pub fn with_absolute(mag: f64, abs: AbsoluteTimeLocation) -> Result<Self> {
        let mut rup = Self::new();
        rup.set_mag(mag)?;
        rup.set_absolute(abs);
        Ok(rup)
    }

    /// A record with a relative time/location.
    pub fn with_relative(mag: f64, rel: RelativeTimeLocation) -> Result<Self> {
        let mut rup = Self::new();
        rup.set_mag(mag)?;
        rup.set_relative(rel);
        Ok(rup)
    }

    pub fn strings(&self) -> &RuptureStrings {
        &self.strings
    }

    pub fn strings_mut(&mut self) -> &mut RuptureStrings {
        &mut self.strings
    }

    pub fn mag(&self) -> f64 {
        self.mag
    }

    /// Set the magnitude, coercing it into `[-12, 12]`.
    pub fn set_mag(&mut self, mag: f64) -> Result<()> {
        self.mag = MAGNITUDE.coerce(mag)?;
        Ok(())
    }

    pub fn absolute(&self) -> Option<&AbsoluteTimeLocation> {
        self.absolute.as_ref()
    }

    pub fn relative(&self) -> Option<&RelativeTimeLocation> {
        self.relative.as_ref()
    }

    pub fn has_absolute(&self) -> bool {
        self.absolute.is_some()
    }

    pub fn has_relative(&self) -> bool {
        self.relative.is_some()
    }

    /// Replace the absolute time/location, discarding any relative one.
    pub fn set_absolute(&mut self, abs: AbsoluteTimeLocation) {
        self.absolute = Some(abs);
        self.relative = None;
    }

    /// Replace the relative time/location, discarding any absolute one.
    pub fn set_relative(&mut self, rel: RelativeTimeLocation) {
        self.relative = Some(rel);
        self.absolute = None;
    }

    /// Set both representations at once; the caller vouches they agree.
    pub fn set_both(&mut self, abs: AbsoluteTimeLocation, rel: RelativeTimeLocation) {
        self.absolute = Some(abs);
        self.relative = Some(rel);
    }

    /// The absolute time/location, computing it without caching if needed.
    pub fn to_absolute(&self, converter: Option<&Converter>) -> Result<AbsoluteTimeLocation> {
        if let Some(abs) = self.absolute {
            return Ok(abs);
        }
        match (self.relative.as_ref(), converter) {
            (Some(rel), Some(conv)) => {
                let mut abs = AbsoluteTimeLocation::default();
                conv.convert_rel_to_abs(rel, &mut abs)?;
                Ok(abs)
            }
            _ => Err(CatalogError::ConversionUnavailable { target: "absolute" }),
        }
    }

    /// The relative time/location, computing it without caching if needed.
    pub fn to_relative(&self, converter: Option<&Converter>) -> Result<RelativeTimeLocation> {
        if let Some(rel) = self.relative {
            return Ok(rel);
        }
        match (self.absolute.as_ref(), converter) {
            (Some(abs), Some(conv)) => {
                let mut rel = RelativeTimeLocation::default();
                conv.convert_abs_to_rel(abs, &mut rel)?;
                Ok(rel)
            }
            _ => Err(CatalogError::ConversionUnavailable { target: "relative" }),
        }
    }

    /// Ensure the absolute representation is present, caching a conversion.
    pub fn require_has_absolute(&mut self, converter: Option<&Converter>) -> Result<()> {
        if self.absolute.is_none() {
            self.absolute = Some(self.to_absolute(converter)?);
        }
        Ok(())
    }

    /// Ensure the relative representation is present, caching a conversion.
    pub fn require_has_relative(&mut self, converter: Option<&Converter>) -> Result<()> {
        if self.relative.is_none() {
            self.relative = Some(self.to_relative(converter)?);
        }
        Ok(())
    }

    /// Reset to an empty record.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
