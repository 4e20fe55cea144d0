//! Catalog engine error types.

use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification of a [`CatalogError`].
///
/// Wrapping an error in section context does not change its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RangeInvalid,
    ConfigInvalid,
    ConversionUnavailable,
    UnrecognizedType,
    DescriptionInvalid,
    LineMalformed,
    SectionLocked,
    SectionNotReady,
    CapacityExceeded,
    CodecMissing,
    ControlLineInvalid,
    DefinitionDisallowed,
    SectionNotSplittable,
    ValueInvalid,
    SectionUnknown,
    SectionExists,
    Io,
}

/// Errors produced by the catalog engine.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    /// A numeric value lies outside its permitted range (after tolerance).
    #[error("{name} value {value} is outside [{min}, {max}]")]
    #[diagnostic(code(catalog::range_invalid))]
    RangeInvalid {
        /// Name of the quantity being coerced.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Invalid engine configuration.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(catalog::config_invalid))]
    ConfigInvalid {
        /// Description.
        message: String,
    },

    /// The requested time/location representation is absent and no converter was supplied.
    #[error("no converter available to derive {target} time/location")]
    #[diagnostic(
        code(catalog::conversion_unavailable),
        help("declare a converter in the section or one of its parents")
    )]
    ConversionUnavailable {
        /// "absolute" or "relative".
        target: &'static str,
    },

    /// A converter or codec type that has no textual description.
    #[error("unrecognized {what} type '{type_name}'")]
    #[diagnostic(code(catalog::unrecognized_type))]
    UnrecognizedType {
        /// "converter" or "codec".
        what: &'static str,
        /// Type tag or implementation name.
        type_name: String,
    },

    /// A converter or codec description that cannot be reconstructed.
    #[error("invalid {what} description '{description}': {detail}")]
    #[diagnostic(code(catalog::description_invalid))]
    DescriptionInvalid {
        /// "converter" or "codec".
        what: &'static str,
        /// The offending description.
        description: String,
        /// What went wrong.
        detail: String,
    },

    /// A rupture line that could not be parsed.
    #[error("malformed line (field '{field}': {detail}): {line}")]
    #[diagnostic(code(catalog::line_malformed))]
    LineMalformed {
        /// The full line.
        line: String,
        /// Field being parsed when the failure occurred.
        field: String,
        /// What went wrong.
        detail: String,
    },

    /// Attempt to change a locked section's settings.
    #[error("section '{section}' is locked; cannot change {what}")]
    #[diagnostic(code(catalog::section_locked))]
    SectionLocked {
        /// Section name.
        section: String,
        /// The setting being changed.
        what: &'static str,
    },

    /// Attempt to add a rupture before the section is locked.
    #[error("section '{section}' is not locked; ruptures cannot be added yet")]
    #[diagnostic(code(catalog::section_not_ready))]
    SectionNotReady {
        /// Section name.
        section: String,
    },

    /// The section already holds its maximum number of ruptures.
    #[error("section '{section}' is full ({max} ruptures)")]
    #[diagnostic(code(catalog::capacity_exceeded))]
    CapacityExceeded {
        /// Section name.
        section: String,
        /// Maximum rupture count.
        max: usize,
    },

    /// Ruptures cannot be read or written without a codec.
    #[error("section '{section}' has ruptures but no line format")]
    #[diagnostic(code(catalog::codec_missing))]
    CodecMissing {
        /// Section name.
        section: String,
    },

    /// A control line that is not recognised or not permitted.
    #[error("invalid control line ({detail}): {line}")]
    #[diagnostic(code(catalog::control_line_invalid))]
    ControlLineInvalid {
        /// The line.
        line: String,
        /// What went wrong.
        detail: String,
    },

    /// A definition name outside the section's allow-list.
    #[error("definition '{name}' is not allowed in section '{section}'")]
    #[diagnostic(code(catalog::definition_disallowed))]
    DefinitionDisallowed {
        /// Section name.
        section: String,
        /// Definition name.
        name: String,
    },

    /// A non-splittable section appeared twice in the input.
    #[error("section '{section}' appears more than once but is not splittable")]
    #[diagnostic(code(catalog::section_not_splittable))]
    SectionNotSplittable {
        /// Section name.
        section: String,
    },

    /// A text value (id, identifier, definition value) that fails validation.
    #[error("invalid {what} '{value}'")]
    #[diagnostic(code(catalog::value_invalid))]
    ValueInvalid {
        /// What kind of value.
        what: &'static str,
        /// The offending value.
        value: String,
    },

    /// A header names a section that does not exist.
    #[error("unknown section '{name}'")]
    #[diagnostic(code(catalog::section_unknown))]
    SectionUnknown {
        /// Section name.
        name: String,
    },

    /// A section with this name already exists.
    #[error("section '{name}' already exists")]
    #[diagnostic(code(catalog::section_exists))]
    SectionExists {
        /// Section name.
        name: String,
    },

    /// The line source or sink failed.
    #[error("I/O error: {0}")]
    #[diagnostic(code(catalog::io))]
    Io(#[from] std::io::Error),

    /// An error raised while processing a particular section.
    #[error("in section '{section}': {source}")]
    #[diagnostic(code(catalog::in_section))]
    InSection {
        /// Section name.
        section: String,
        /// Underlying error.
        #[source]
        source: Box<CatalogError>,
    },
}

impl CatalogError {
    /// The failure kind, looking through section context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RangeInvalid { .. } => ErrorKind::RangeInvalid,
            Self::ConfigInvalid { .. } => ErrorKind::ConfigInvalid,
            Self::ConversionUnavailable { .. } => ErrorKind::ConversionUnavailable,
            Self::UnrecognizedType { .. } => ErrorKind::UnrecognizedType,
            Self::DescriptionInvalid { .. } => ErrorKind::DescriptionInvalid,
            Self::LineMalformed { .. } => ErrorKind::LineMalformed,
            Self::SectionLocked { .. } => ErrorKind::SectionLocked,
            Self::SectionNotReady { .. } => ErrorKind::SectionNotReady,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::CodecMissing { .. } => ErrorKind::CodecMissing,
            Self::ControlLineInvalid { .. } => ErrorKind::ControlLineInvalid,
            Self::DefinitionDisallowed { .. } => ErrorKind::DefinitionDisallowed,
            Self::SectionNotSplittable { .. } => ErrorKind::SectionNotSplittable,
            Self::ValueInvalid { .. } => ErrorKind::ValueInvalid,
            Self::SectionUnknown { .. } => ErrorKind::SectionUnknown,
            Self::SectionExists { .. } => ErrorKind::SectionExists,
            Self::Io(_) => ErrorKind::Io,
            Self::InSection { source, .. } => source.kind(),
        }
    }

    /// Wrap this error with the name of the section being processed.
    ///
    /// Errors already carrying section context are returned unchanged.
    pub fn in_section(self, section: &str) -> Self {
        match self {
            Self::InSection { .. } => self,
            other => Self::InSection {
                section: section.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn malformed(line: &str, field: &str, detail: impl Into<String>) -> Self {
        Self::LineMalformed {
            line: line.to_string(),
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, CatalogError>;
