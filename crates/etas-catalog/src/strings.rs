//! Identifier, network, code and description strings attached to a rupture.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

static ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.~-]*$").expect("Invalid regex pattern for rupture id")
});

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex pattern for identifier")
});

/// Whether `id` (already trimmed) is a valid rupture id.
pub fn is_valid_id(id: &str) -> bool {
    ID_REGEX.is_match(id)
}

/// Whether `name` is a valid section or definition name.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_REGEX.is_match(name)
}

/// Trim and validate an optional id. Blank ids become `None`.
pub fn normalize_id(what: &'static str, id: Option<&str>) -> Result<Option<String>> {
    match id.map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) if is_valid_id(t) => Ok(Some(t.to_string())),
        Some(t) => Err(CatalogError::ValueInvalid {
            what,
            value: t.to_string(),
        }),
    }
}

/// Replace control characters with spaces and trim. Blank text becomes `None`.
pub fn normalize_text(text: Option<&str>) -> Option<String> {
    let cleaned: String = text?
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Serialise an id list as comma-separated text.
pub fn ids_to_string(ids: &[String]) -> String {
    ids.join(",")
}

/// Parse comma-separated ids, skipping empty elements.
pub fn ids_from_string(text: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for part in text.split(',') {
        if let Some(id) = normalize_id("id", Some(part))? {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// The string fields of a rupture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuptureStrings {
    event_id: Option<String>,
    network: Option<String>,
    code: Option<String>,
    description: Option<String>,
    id_list: Option<Vec<String>>,
}

impl RuptureStrings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn id_list(&self) -> Option<&[String]> {
        self.id_list.as_deref()
    }

    /// Set the event id, validating it.
    pub fn set_event_id(&mut self, id: Option<&str>) -> Result<()> {
        self.event_id = normalize_id("event id", id)?;
        Ok(())
    }

    /// Set the network, validating it with the id rules.
    pub fn set_network(&mut self, network: Option<&str>) -> Result<()> {
        self.network = normalize_id("network", network)?;
        Ok(())
    }

    /// Set the network-specific code, validating it with the id rules.
    pub fn set_code(&mut self, code: Option<&str>) -> Result<()> {
        self.code = normalize_id("code", code)?;
        Ok(())
    }

    /// Set the description. Control characters are replaced and the text trimmed.
    pub fn set_description(&mut self, description: Option<&str>) {
        self.description = normalize_text(description);
    }

    /// Set the id list. Blank entries are dropped; `None` clears the list.
    pub fn set_id_list<S: AsRef<str>>(&mut self, ids: Option<&[S]>) -> Result<()> {
        self.id_list = match ids {
            None => None,
            Some(ids) => {
                let mut out = Vec::with_capacity(ids.len());
                for id in ids {
                    if let Some(id) = normalize_id("id", Some(id.as_ref()))? {
                        out.push(id);
                    }
                }
                Some(out)
            }
        };
        Ok(())
    }

    /// Set the id list from comma-separated text.
    pub fn set_id_list_string(&mut self, text: Option<&str>) -> Result<()> {
        self.id_list = text.map(ids_from_string).transpose()?;
        Ok(())
    }

    /// The id list as comma-separated text.
    pub fn id_list_string(&self) -> Option<String> {
        self.id_list.as_deref().map(ids_to_string)
    }

    /// All ids with the event id first and duplicates removed.
    pub fn merged_ids(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let all = self
            .event_id
            .iter()
            .chain(self.id_list.iter().flatten());
        for id in all {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }

    /// Reset every field to `None`.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
