//! Catalog text grammar: comment and control prefixes, control keywords.
//!
//! ```text
//! # a comment
//! :begin: aftershock
//! :define: start_time = 1000
//! :convert: etas_origin 2020-01-01T00:00:00.000Z 34 -118 5
//! :format: local_catalog spherical
//! ci 12345 1577836800000 4.5 34.05 -118.25 8 1 ci12345 Test
//! ```
//!
//! Whitespace is tolerated around the keyword, its `:` and the `=` of a
//! definition.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::strings::is_identifier;

/// One classified input line, borrowing from the line text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Empty or whitespace only.
    Blank,
    /// Comment text after the prefix.
    Comment(&'a str),
    /// Section header naming a section.
    Header(&'a str),
    /// Named definition.
    Definition { name: &'a str, value: &'a str },
    /// Converter description.
    Converter(&'a str),
    /// Codec description.
    Codec(&'a str),
    /// Anything else: a rupture record.
    Record(&'a str),
}

/// Prefixes and keywords of the section sublanguage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionFormat {
    /// Prefix of comment lines.
    pub comment_prefix: String,
    /// Prefix of control lines.
    pub control_prefix: String,
    /// Keyword of section header lines.
    pub begin_keyword: String,
    /// Keyword of definition lines.
    pub define_keyword: String,
    /// Keyword of converter-description lines.
    pub convert_keyword: String,
    /// Keyword of codec-description lines.
    pub format_keyword: String,
}

impl Default for SectionFormat {
    fn default() -> Self {
        Self {
            comment_prefix: "#".to_string(),
            control_prefix: ":".to_string(),
            begin_keyword: "begin".to_string(),
            define_keyword: "define".to_string(),
            convert_keyword: "convert".to_string(),
            format_keyword: "format".to_string(),
        }
    }
}

impl SectionFormat {
    /// Check that the prefixes are usable and the keywords distinct.
    pub fn validate(&self) -> Result<()> {
        if self.comment_prefix.trim().is_empty() || self.control_prefix.trim().is_empty() {
            return Err(CatalogError::config("comment and control prefixes must be non-blank"));
        }
        if self.comment_prefix.starts_with(&self.control_prefix)
            || self.control_prefix.starts_with(&self.comment_prefix)
        {
            return Err(CatalogError::config(format!(
                "comment prefix '{}' and control prefix '{}' overlap",
                self.comment_prefix, self.control_prefix
            )));
        }
        let keywords = self.keywords();
        for (i, kw) in keywords.iter().enumerate() {
            if !is_identifier(kw) {
                return Err(CatalogError::config(format!("invalid keyword '{kw}'")));
            }
            if keywords[..i].contains(kw) {
                return Err(CatalogError::config(format!("duplicate keyword '{kw}'")));
            }
        }
        Ok(())
    }

    fn keywords(&self) -> [&str; 4] {
        [
            &self.begin_keyword,
            &self.define_keyword,
            &self.convert_keyword,
            &self.format_keyword,
        ]
    }

    pub fn comment_line(&self, text: &str) -> String {
        format!("{}{}", self.comment_prefix, text)
    }

    pub fn header_line(&self, name: &str) -> String {
        self.control_line(&self.begin_keyword, name)
    }

    pub fn definition_line(&self, name: &str, value: &str) -> String {
        self.control_line(&self.define_keyword, &format!("{name} = {value}"))
    }

    pub fn converter_line(&self, description: &str) -> String {
        self.control_line(&self.convert_keyword, description)
    }

    pub fn codec_line(&self, description: &str) -> String {
        self.control_line(&self.format_keyword, description)
    }

    fn control_line(&self, keyword: &str, arg: &str) -> String {
        format!("{}{}: {}", self.control_prefix, keyword, arg)
    }

    /// Classify one line of input.
    pub fn classify<'a>(&self, line: &'a str) -> Result<LineKind<'a>> {
        if line.trim().is_empty() {
            return Ok(LineKind::Blank);
        }
        if let Some(text) = line.strip_prefix(self.comment_prefix.as_str()) {
            return Ok(LineKind::Comment(text));
        }
        let Some(body) = line.strip_prefix(self.control_prefix.as_str()) else {
            return Ok(LineKind::Record(line));
        };

        let invalid = |detail: &str| CatalogError::ControlLineInvalid {
            line: line.to_string(),
            detail: detail.to_string(),
        };
        let (keyword, arg) = body
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' after keyword"))?;
        let keyword = keyword.trim();
        let arg = arg.trim();

        if keyword == self.begin_keyword {
            if !is_identifier(arg) {
                return Err(invalid("section name must be an identifier"));
            }
            Ok(LineKind::Header(arg))
        } else if keyword == self.define_keyword {
            let (name, value) = arg
                .split_once('=')
                .ok_or_else(|| invalid("missing '=' in definition"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(invalid("missing definition name"));
            }
            Ok(LineKind::Definition {
                name,
                value: value.trim(),
            })
        } else if keyword == self.convert_keyword {
            if arg.is_empty() {
                return Err(invalid("empty converter description"));
            }
            Ok(LineKind::Converter(arg))
        } else if keyword == self.format_keyword {
            if arg.is_empty() {
                return Err(invalid("empty format description"));
            }
            Ok(LineKind::Codec(arg))
        } else {
            Err(invalid("unrecognized keyword"))
        }
    }
}
