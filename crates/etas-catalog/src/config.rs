//! Catalog engine configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! [format]
//! comment_prefix = "#"
//! control_prefix = ":"
//!
//! [file]
//! auto_create = true
//! emit_default_header = false
//! default_format = "local_catalog spherical"
//!
//! [new_section]
//! splittable = false
//! allowed_definitions = ["start_time", "region"]
//! max_ruptures = 10000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::format::SectionFormat;
use crate::strings::is_identifier;

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Text grammar.
    pub format: SectionFormat,
    /// File-level policy.
    pub file: FileConfig,
    /// Settings given to sections created while reading.
    pub new_section: NewSectionConfig,
}

/// File-level policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Create sections for unknown header names while reading.
    pub auto_create: bool,
    /// Write a header line for the default section.
    pub emit_default_header: bool,
    /// Converter description given to the default section.
    pub default_convert: Option<String>,
    /// Codec description given to the default section.
    pub default_format: Option<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            auto_create: true,
            emit_default_header: false,
            default_convert: None,
            default_format: None,
        }
    }
}

/// Permissions and limits of auto-created sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewSectionConfig {
    /// Whether the section may appear more than once in the input.
    pub splittable: bool,
    /// Permitted definition names; `None` permits all.
    pub allowed_definitions: Option<Vec<String>>,
    /// Whether a converter declaration line is accepted.
    pub allow_converter: bool,
    /// Whether a codec declaration line is accepted.
    pub allow_codec: bool,
    /// Maximum number of ruptures; `None` is unlimited.
    pub max_ruptures: Option<usize>,
}

impl Default for NewSectionConfig {
    fn default() -> Self {
        Self {
            splittable: false,
            allowed_definitions: None,
            allow_converter: true,
            allow_codec: true,
            max_ruptures: None,
        }
    }
}

impl CatalogConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: CatalogConfig =
            toml::from_str(text).map_err(|e| CatalogError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            CatalogError::ConfigInvalid { message } => {
                CatalogError::config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CatalogError::config(e.to_string()))
    }

    /// Check the grammar and the new-section settings.
    pub fn validate(&self) -> Result<()> {
        self.format.validate()?;
        if let Some(names) = &self.new_section.allowed_definitions {
            if let Some(bad) = names.iter().find(|n| !is_identifier(n)) {
                return Err(CatalogError::config(format!(
                    "allowed definition '{bad}' is not an identifier"
                )));
            }
        }
        for desc in [&self.file.default_convert, &self.file.default_format]
            .into_iter()
            .flatten()
        {
            if desc.trim().is_empty() {
                return Err(CatalogError::config("default description is blank"));
            }
        }
        Ok(())
    }
}
