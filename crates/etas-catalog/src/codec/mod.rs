//! Line codecs: one rupture record per line of text.
//!
//! Three column layouts are built in:
//!
//! - **legacy_10** — tab-separated calendar fields, location, magnitude
//! - **observed_7** — date, time, location, magnitude, optional id
//! - **local_catalog** — network, code, epoch time, location, id list, description
//!
//! Each codec is described by a single line (type tag plus parameters) so a
//! catalog file can declare which layout its records use. Additional layouts
//! implement [`LineCodec`] and are registered with a [`CodecFactory`].

pub mod fields;
pub mod legacy;
pub mod local;
pub mod observed;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub use legacy::LegacyCodec;
pub use local::LocalCatalogCodec;
pub use observed::ObservedCodec;

use crate::convert::Converter;
use crate::coords::LonRange;
use crate::error::{CatalogError, Result};
use crate::rupture::RuptureRecord;

/// Formats a rupture as one line of text and parses it back.
pub trait LineCodec: fmt::Debug {
    /// Format `rup` as a single line (without a line terminator).
    fn format_line(&self, rup: &RuptureRecord) -> Result<String>;

    /// Replace the contents of `rup` with the record parsed from `line`.
    fn parse_line(&self, rup: &mut RuptureRecord, line: &str) -> Result<()>;

    /// Type tag used as the first token of the description.
    fn type_tag(&self) -> &str;

    /// Full single-line description, or `None` if this codec cannot be
    /// persisted.
    fn description(&self) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// Id generation
// ---------------------------------------------------------------------------

/// Supplies event ids for layouts that do not carry one.
pub trait IdGenerator: fmt::Debug {
    fn next_id(&mut self, rup: &RuptureRecord) -> String;
}

/// Generates `<prefix>1`, `<prefix>2`, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("ev")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, _rup: &RuptureRecord) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Shared handle to an id generator.
pub type SharedIds = Rc<RefCell<dyn IdGenerator>>;

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// A codec held by a section: one of the built-in layouts or user supplied.
#[derive(Debug, Clone)]
pub enum Codec {
    Legacy(LegacyCodec),
    Observed(ObservedCodec),
    LocalCatalog(LocalCatalogCodec),
    Custom(Rc<dyn LineCodec>),
}

impl Codec {
    /// The single-line description of this codec.
    pub fn describe(&self) -> Result<String> {
        self.description()
            .ok_or_else(|| CatalogError::UnrecognizedType {
                what: "codec",
                type_name: self.type_tag().to_string(),
            })
    }

    /// Reconstruct a built-in codec from its description.
    pub fn from_description(description: &str, converter: Option<Converter>) -> Result<Self> {
        CodecFactory::with_builtins().build(description, converter)
    }

    /// The converter consulted when a record lacks an absolute time/location.
    pub fn converter(&self) -> Option<&Converter> {
        match self {
            Codec::Legacy(c) => c.converter(),
            Codec::Observed(c) => c.converter(),
            Codec::LocalCatalog(c) => c.converter(),
            Codec::Custom(_) => None,
        }
    }

    /// This codec with `converter` injected. Custom codecs are returned unchanged.
    pub fn with_converter(self, converter: Option<Converter>) -> Self {
        match self {
            Codec::Legacy(c) => Codec::Legacy(c.with_converter(converter)),
            Codec::Observed(c) => Codec::Observed(c.with_converter(converter)),
            Codec::LocalCatalog(c) => Codec::LocalCatalog(c.with_converter(converter)),
            Codec::Custom(c) => Codec::Custom(c),
        }
    }
}

impl From<LegacyCodec> for Codec {
    fn from(c: LegacyCodec) -> Self {
        Codec::Legacy(c)
    }
}

impl From<ObservedCodec> for Codec {
    fn from(c: ObservedCodec) -> Self {
        Codec::Observed(c)
    }
}

impl From<LocalCatalogCodec> for Codec {
    fn from(c: LocalCatalogCodec) -> Self {
        Codec::LocalCatalog(c)
    }
}

impl LineCodec for Codec {
    fn format_line(&self, rup: &RuptureRecord) -> Result<String> {
        match self {
            Codec::Legacy(c) => c.format_line(rup),
            Codec::Observed(c) => c.format_line(rup),
            Codec::LocalCatalog(c) => c.format_line(rup),
            Codec::Custom(c) => c.format_line(rup),
        }
    }

    fn parse_line(&self, rup: &mut RuptureRecord, line: &str) -> Result<()> {
        match self {
            Codec::Legacy(c) => c.parse_line(rup, line),
            Codec::Observed(c) => c.parse_line(rup, line),
            Codec::LocalCatalog(c) => c.parse_line(rup, line),
            Codec::Custom(c) => c.parse_line(rup, line),
        }
    }

    fn type_tag(&self) -> &str {
        match self {
            Codec::Legacy(c) => c.type_tag(),
            Codec::Observed(c) => c.type_tag(),
            Codec::LocalCatalog(c) => c.type_tag(),
            Codec::Custom(c) => c.type_tag(),
        }
    }

    fn description(&self) -> Option<String> {
        match self {
            Codec::Legacy(c) => c.description(),
            Codec::Observed(c) => c.description(),
            Codec::LocalCatalog(c) => c.description(),
            Codec::Custom(c) => c.description(),
        }
    }
}

/// Parse a single longitude-range parameter.
pub(crate) fn parse_lon_range(token: &str) -> std::result::Result<LonRange, String> {
    token.parse::<LonRange>().map_err(|e| e.to_string())
}

/// Parse a digit-count parameter (at most 12).
pub(crate) fn parse_digits(token: &str, name: &str) -> std::result::Result<usize, String> {
    match token.parse::<usize>() {
        Ok(n) if n <= 12 => Ok(n),
        _ => Err(format!("invalid {name} digit count '{token}'")),
    }
}

// ---------------------------------------------------------------------------
// CodecFactory
// ---------------------------------------------------------------------------

/// What a constructor receives besides the description parameters.
#[derive(Debug, Clone)]
pub struct CodecContext {
    /// Converter to inject into the new codec.
    pub converter: Option<Converter>,
    /// Id generator shared by every codec the factory builds.
    pub ids: SharedIds,
}

/// Constructor taking the parameters after the type tag and the build context.
pub type CodecCtor = Box<dyn Fn(&[&str], &CodecContext) -> std::result::Result<Codec, String>>;

/// Registry mapping codec type tags to constructors.
///
/// Codecs built by one factory draw generated event ids from the same
/// generator, so records read into different sections never share an id.
pub struct CodecFactory {
    ctors: HashMap<String, CodecCtor>,
    ids: SharedIds,
}

impl fmt::Debug for CodecFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.ctors.keys().collect();
        tags.sort();
        f.debug_struct("CodecFactory").field("tags", &tags).finish()
    }
}

impl Default for CodecFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CodecFactory {
    /// Create a factory pre-loaded with the three built-in layouts.
    pub fn with_builtins() -> Self {
        let mut factory = Self {
            ctors: HashMap::new(),
            ids: Rc::new(RefCell::new(SequentialIds::default())),
        };
        factory.register(legacy::TAG, |params, ctx| {
            LegacyCodec::from_params(params, ctx).map(Codec::Legacy)
        });
        factory.register(observed::TAG, |params, ctx| {
            ObservedCodec::from_params(params, ctx.converter.clone()).map(Codec::Observed)
        });
        factory.register(local::TAG, |params, ctx| {
            LocalCatalogCodec::from_params(params, ctx.converter.clone())
                .map(Codec::LocalCatalog)
        });
        factory
    }

    /// Register a constructor for a type tag, replacing any existing one.
    pub fn register<F>(&mut self, tag: &str, ctor: F)
    where
        F: Fn(&[&str], &CodecContext) -> std::result::Result<Codec, String> + 'static,
    {
        self.ctors.insert(tag.to_string(), Box::new(ctor));
    }

    /// Replace the id generator handed to codecs built from now on.
    pub fn set_id_generator<G: IdGenerator + 'static>(&mut self, ids: G) {
        self.ids = Rc::new(RefCell::new(ids));
    }

    /// The id generator handed to newly built codecs.
    pub fn id_generator(&self) -> SharedIds {
        Rc::clone(&self.ids)
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.ctors.contains_key(tag)
    }

    /// Registered type tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.ctors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Describe a codec.
    pub fn describe(&self, codec: &Codec) -> Result<String> {
        codec.describe()
    }

    /// Reconstruct a codec from its description, injecting `converter`.
    pub fn build(&self, description: &str, converter: Option<Converter>) -> Result<Codec> {
        let tokens: Vec<&str> = description.split_whitespace().collect();
        let Some((tag, params)) = tokens.split_first() else {
            return Err(CatalogError::DescriptionInvalid {
                what: "codec",
                description: description.to_string(),
                detail: "empty description".to_string(),
            });
        };
        let ctor = self
            .ctors
            .get(*tag)
            .ok_or_else(|| CatalogError::UnrecognizedType {
                what: "codec",
                type_name: tag.to_string(),
            })?;
        let ctx = CodecContext {
            converter,
            ids: self.id_generator(),
        };
        ctor(params, &ctx).map_err(|detail| CatalogError::DescriptionInvalid {
            what: "codec",
            description: description.trim().to_string(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_builtin_tags() {
        let factory = CodecFactory::with_builtins();
        assert_eq!(factory.tags(), vec!["legacy_10", "local_catalog", "observed_7"]);
    }

    #[test]
    fn test_description_round_trip_for_builtins() {
        let codecs = [
            Codec::from(LegacyCodec::new(LonRange::Wrapped)),
            Codec::from(ObservedCodec::default()),
            Codec::from(ObservedCodec::new(LonRange::Location, 3, 1, 1)),
            Codec::from(LocalCatalogCodec::new(LonRange::Spherical)),
        ];
        for codec in codecs {
            let desc = codec.describe().unwrap();
            let rebuilt = Codec::from_description(&desc, None).unwrap();
            assert_eq!(rebuilt.describe().unwrap(), desc);
            assert_eq!(rebuilt.type_tag(), codec.type_tag());
        }
    }

    #[test]
    fn test_build_errors() {
        let factory = CodecFactory::with_builtins();
        assert_eq!(
            factory.build("   ", None).unwrap_err().kind(),
            ErrorKind::DescriptionInvalid
        );
        assert_eq!(
            factory.build("csv_thing", None).unwrap_err().kind(),
            ErrorKind::UnrecognizedType
        );
        assert_eq!(
            factory.build("local_catalog", None).unwrap_err().kind(),
            ErrorKind::DescriptionInvalid
        );
        assert_eq!(
            factory.build("local_catalog polar", None).unwrap_err().kind(),
            ErrorKind::DescriptionInvalid
        );
        assert_eq!(
            factory
                .build("observed_7 spherical 4 3", None)
                .unwrap_err()
                .kind(),
            ErrorKind::DescriptionInvalid
        );
        assert_eq!(
            factory
                .build("observed_7 spherical 4 3 99", None)
                .unwrap_err()
                .kind(),
            ErrorKind::DescriptionInvalid
        );
    }

    #[derive(Debug)]
    struct MagOnly;

    impl LineCodec for MagOnly {
        fn format_line(&self, rup: &RuptureRecord) -> Result<String> {
            Ok(format!("{}", rup.mag()))
        }

        fn parse_line(&self, rup: &mut RuptureRecord, line: &str) -> Result<()> {
            let mag = line
                .trim()
                .parse::<f64>()
                .map_err(|_| CatalogError::malformed(line, "mag", "not a number"))?;
            rup.set_mag(mag)
        }

        fn type_tag(&self) -> &str {
            "mag_only"
        }
    }

    #[test]
    fn test_custom_codec_registration_and_describe() {
        let mut factory = CodecFactory::with_builtins();
        factory.register("mag_only", |_, _| Ok(Codec::Custom(Rc::new(MagOnly))));
        let codec = factory.build("mag_only", None).unwrap();
        assert_eq!(codec.describe().unwrap_err().kind(), ErrorKind::UnrecognizedType);

        let mut rup = RuptureRecord::new();
        codec.parse_line(&mut rup, "3.5").unwrap();
        assert_eq!(codec.format_line(&rup).unwrap(), "3.5");
    }

    const LEGACY_LINE: &str = "2020\t1\t1\t0\t0\t0.000\t34.00000\t-118.00000\t5.000\t3.000";

    fn parsed_id(codec: &Codec) -> String {
        let mut rup = RuptureRecord::new();
        codec.parse_line(&mut rup, LEGACY_LINE).unwrap();
        rup.strings().event_id().unwrap().to_string()
    }

    #[test]
    fn test_built_codecs_share_id_generator() {
        let factory = CodecFactory::with_builtins();
        let first = factory.build("legacy_10 spherical", None).unwrap();
        let second = factory.build("legacy_10 full", None).unwrap();
        assert_eq!(parsed_id(&first), "ev1");
        assert_eq!(parsed_id(&second), "ev2");
        assert_eq!(parsed_id(&first), "ev3");

        let other = CodecFactory::with_builtins();
        assert_eq!(parsed_id(&other.build("legacy_10 spherical", None).unwrap()), "ev1");
    }

    #[test]
    fn test_set_id_generator_applies_to_later_builds() {
        let mut factory = CodecFactory::with_builtins();
        let before = factory.build("legacy_10 spherical", None).unwrap();
        factory.set_id_generator(SequentialIds::new("q"));
        let after = factory.build("legacy_10 spherical", None).unwrap();
        assert_eq!(parsed_id(&after), "q1");
        assert_eq!(parsed_id(&before), "ev1");
    }

    #[test]
    fn test_sequential_ids() {
        let mut ids = SequentialIds::new("x");
        let rup = RuptureRecord::new();
        assert_eq!(ids.next_id(&rup), "x1");
        assert_eq!(ids.next_id(&rup), "x2");
    }
}
