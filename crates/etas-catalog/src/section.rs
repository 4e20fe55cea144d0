//! Catalog sections and the arena that links them.
//!
//! A [`CatalogSection`] is a named node holding definitions, comments and
//! rupture records plus an optional converter and codec. Sections live in a
//! [`SectionTree`] and refer to their parent by [`SectionId`]; definitions,
//! converters and codecs are inherited through the parent chain.
//!
//! A section starts unlocked. Locking resolves its converter and codec once,
//! after which its settings are frozen and ruptures may be appended.

use std::collections::{HashMap, HashSet};

use crate::codec::{Codec, CodecFactory, LineCodec};
use crate::convert::{AbsRelConverter, Converter, ConverterFactory};
use crate::error::{CatalogError, Result};
use crate::format::{LineKind, SectionFormat};
use crate::io::{LineSink, LineSource};
use crate::rupture::RuptureRecord;
use crate::strings::is_identifier;

/// Index of a section within its [`SectionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(usize);

impl SectionId {
    pub fn index(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// A converter or codec as configured on one section, before lock.
#[derive(Debug, Clone)]
enum Setting<T> {
    /// Nothing set locally; inherit from the parent.
    Unset,
    /// An object that a later description does not replace.
    Explicit(T),
    /// A description reconstructed through the factory at lock time.
    Deferred(String),
    /// An object that a later description replaces.
    Overridable(T),
}

impl<T> Setting<T> {
    fn from_object(value: Option<T>, overridable: bool) -> Self {
        match value {
            None => Setting::Unset,
            Some(v) if overridable => Setting::Overridable(v),
            Some(v) => Setting::Explicit(v),
        }
    }

    fn is_set(&self) -> bool {
        !matches!(self, Setting::Unset)
    }

    /// Apply a description. Returns false if an explicit object kept it out.
    fn apply_description(&mut self, description: Option<&str>) -> bool {
        if matches!(self, Setting::Explicit(_)) {
            return false;
        }
        match description {
            Some(desc) => *self = Setting::Deferred(desc.trim().to_string()),
            None if matches!(self, Setting::Deferred(_)) => *self = Setting::Unset,
            None => {}
        }
        true
    }
}

// ---------------------------------------------------------------------------
// CatalogSection
// ---------------------------------------------------------------------------

/// One named section of a catalog.
#[derive(Debug, Clone)]
pub struct CatalogSection {
    name: String,
    parent: Option<SectionId>,
    definitions: HashMap<String, String>,
    definition_order: Vec<String>,
    comments: Vec<String>,
    ruptures: Vec<RuptureRecord>,
    max_ruptures: Option<usize>,
    locked: bool,
    converter: Setting<Converter>,
    codec: Setting<Codec>,
    resolved_converter: Option<Converter>,
    resolved_codec: Option<Codec>,
    converter_inherited: bool,
    codec_inherited: bool,
    seen: bool,
    splittable: bool,
    allowed_definitions: Option<HashSet<String>>,
    allow_converter: bool,
    allow_codec: bool,
}

impl CatalogSection {
    fn new(name: &str, parent: Option<SectionId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            definitions: HashMap::new(),
            definition_order: Vec::new(),
            comments: Vec::new(),
            ruptures: Vec::new(),
            max_ruptures: None,
            locked: false,
            converter: Setting::Unset,
            codec: Setting::Unset,
            resolved_converter: None,
            resolved_codec: None,
            converter_inherited: false,
            codec_inherited: false,
            seen: false,
            splittable: true,
            allowed_definitions: None,
            allow_converter: true,
            allow_codec: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<SectionId> {
        self.parent
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn check_unlocked(&self, what: &'static str) -> Result<()> {
        if self.locked {
            return Err(CatalogError::SectionLocked {
                section: self.name.clone(),
                what,
            });
        }
        Ok(())
    }

    // --- definitions ---

    /// Set a local definition, replacing any existing value in place.
    pub fn set_definition(&mut self, name: &str, value: &str) -> Result<()> {
        self.check_unlocked("definitions")?;
        if !is_identifier(name) {
            return Err(CatalogError::ValueInvalid {
                what: "definition name",
                value: name.to_string(),
            });
        }
        if let Some(allowed) = &self.allowed_definitions {
            if !allowed.contains(name) {
                return Err(CatalogError::DefinitionDisallowed {
                    section: self.name.clone(),
                    name: name.to_string(),
                });
            }
        }
        if value.trim() != value || value.chars().any(char::is_control) {
            return Err(CatalogError::ValueInvalid {
                what: "definition value",
                value: value.to_string(),
            });
        }
        if self
            .definitions
            .insert(name.to_string(), value.to_string())
            .is_none()
        {
            self.definition_order.push(name.to_string());
        }
        Ok(())
    }

    /// Remove a local definition, returning its value.
    pub fn remove_definition(&mut self, name: &str) -> Result<Option<String>> {
        self.check_unlocked("definitions")?;
        let removed = self.definitions.remove(name);
        if removed.is_some() {
            self.definition_order.retain(|n| n != name);
        }
        Ok(removed)
    }

    /// A definition of this section only, without inheritance.
    pub fn local_definition(&self, name: &str) -> Option<&str> {
        self.definitions.get(name).map(String::as_str)
    }

    /// Local definitions in insertion order.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.definition_order.iter().filter_map(|name| {
            self.definitions
                .get(name)
                .map(|value| (name.as_str(), value.as_str()))
        })
    }

    // --- comments and ruptures ---

    /// Append a comment. Control characters other than tab become spaces,
    /// so the comment is written as a single line.
    pub fn add_comment(&mut self, text: &str) {
        let line = text
            .chars()
            .map(|c| if c.is_control() && c != '\t' { ' ' } else { c })
            .collect();
        self.comments.push(line);
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn ruptures(&self) -> &[RuptureRecord] {
        &self.ruptures
    }

    pub fn rupture_count(&self) -> usize {
        self.ruptures.len()
    }

    /// Append a rupture. The section must be locked and below capacity, and
    /// the record must carry an absolute or relative time/location.
    pub fn add_rupture(&mut self, rup: RuptureRecord) -> Result<()> {
        if !self.locked {
            return Err(CatalogError::SectionNotReady {
                section: self.name.clone(),
            });
        }
        if !rup.has_absolute() && !rup.has_relative() {
            return Err(CatalogError::ValueInvalid {
                what: "rupture",
                value: "no time/location".to_string(),
            });
        }
        if let Some(max) = self.max_ruptures {
            if self.ruptures.len() >= max {
                return Err(CatalogError::CapacityExceeded {
                    section: self.name.clone(),
                    max,
                });
            }
        }
        self.ruptures.push(rup);
        Ok(())
    }

    pub fn max_ruptures(&self) -> Option<usize> {
        self.max_ruptures
    }

    pub fn set_max_ruptures(&mut self, max: Option<usize>) -> Result<()> {
        self.check_unlocked("max ruptures")?;
        self.max_ruptures = max;
        Ok(())
    }

    // --- converter ---

    /// Set the local converter object. An overridable object gives way to a
    /// later description; an explicit one does not.
    pub fn set_converter(&mut self, converter: Option<Converter>, overridable: bool) -> Result<()> {
        self.check_unlocked("converter")?;
        self.converter = Setting::from_object(converter, overridable);
        Ok(())
    }

    /// Set the local converter description, resolved at lock time.
    pub fn set_converter_description(&mut self, description: Option<&str>) -> Result<()> {
        self.check_unlocked("converter")?;
        if !self.converter.apply_description(description) {
            tracing::debug!(section = %self.name, "Explicit converter kept over description");
        }
        Ok(())
    }

    /// Description of the locally configured converter, if any.
    pub fn converter_description(&self) -> Result<Option<String>> {
        match &self.converter {
            Setting::Unset => Ok(None),
            Setting::Deferred(desc) => Ok(Some(desc.clone())),
            Setting::Explicit(c) | Setting::Overridable(c) => c.describe().map(Some),
        }
    }

    pub fn has_local_converter(&self) -> bool {
        self.converter.is_set()
    }

    /// The converter resolved at lock time.
    pub fn converter(&self) -> Option<&Converter> {
        self.resolved_converter.as_ref()
    }

    /// Whether the resolved converter came from the parent.
    pub fn is_converter_inherited(&self) -> bool {
        self.converter_inherited
    }

    // --- codec ---

    /// Set the local codec object. An overridable object gives way to a
    /// later description; an explicit one does not.
    pub fn set_codec(&mut self, codec: Option<Codec>, overridable: bool) -> Result<()> {
        self.check_unlocked("codec")?;
        self.codec = Setting::from_object(codec, overridable);
        Ok(())
    }

    /// Set the local codec description, resolved at lock time.
    pub fn set_codec_description(&mut self, description: Option<&str>) -> Result<()> {
        self.check_unlocked("codec")?;
        if !self.codec.apply_description(description) {
            tracing::debug!(section = %self.name, "Explicit codec kept over description");
        }
        Ok(())
    }

    /// Description of the locally configured codec, if any.
    pub fn codec_description(&self) -> Result<Option<String>> {
        match &self.codec {
            Setting::Unset => Ok(None),
            Setting::Deferred(desc) => Ok(Some(desc.clone())),
            Setting::Explicit(c) | Setting::Overridable(c) => c.describe().map(Some),
        }
    }

    pub fn has_local_codec(&self) -> bool {
        self.codec.is_set()
    }

    /// The codec resolved at lock time.
    pub fn codec(&self) -> Option<&Codec> {
        self.resolved_codec.as_ref()
    }

    /// Whether the resolved codec came from the parent.
    pub fn is_codec_inherited(&self) -> bool {
        self.codec_inherited
    }

    // --- input policy ---

    /// Whether the section has been entered by a read.
    pub fn is_seen(&self) -> bool {
        self.seen
    }

    pub fn is_splittable(&self) -> bool {
        self.splittable
    }

    pub fn set_splittable(&mut self, splittable: bool) {
        self.splittable = splittable;
    }

    pub fn allowed_definitions(&self) -> Option<&HashSet<String>> {
        self.allowed_definitions.as_ref()
    }

    /// Restrict definition names; `None` lifts the restriction.
    pub fn set_allowed_definitions<I, S>(&mut self, names: Option<I>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_definitions = names.map(|n| n.into_iter().map(Into::into).collect());
    }

    pub fn allow_converter(&self) -> bool {
        self.allow_converter
    }

    pub fn set_allow_converter(&mut self, allow: bool) {
        self.allow_converter = allow;
    }

    pub fn allow_codec(&self) -> bool {
        self.allow_codec
    }

    pub fn set_allow_codec(&mut self, allow: bool) {
        self.allow_codec = allow;
    }
}

// ---------------------------------------------------------------------------
// SectionTree
// ---------------------------------------------------------------------------

/// Arena of sections plus the factories used to resolve descriptions.
#[derive(Debug, Default)]
pub struct SectionTree {
    sections: Vec<CatalogSection>,
    index: HashMap<String, SectionId>,
    converters: ConverterFactory,
    codecs: CodecFactory,
}

impl SectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section under `parent`.
    pub fn add_section(&mut self, name: &str, parent: Option<SectionId>) -> Result<SectionId> {
        if !is_identifier(name) {
            return Err(CatalogError::ValueInvalid {
                what: "section name",
                value: name.to_string(),
            });
        }
        if self.index.contains_key(name) {
            return Err(CatalogError::SectionExists {
                name: name.to_string(),
            });
        }
        if let Some(p) = parent {
            if p.0 >= self.sections.len() {
                return Err(CatalogError::SectionUnknown {
                    name: format!("#{}", p.0),
                });
            }
        }
        Ok(self.push_section(name, parent))
    }

    /// Append a section whose name and parent are already known to be valid.
    pub(crate) fn push_section(&mut self, name: &str, parent: Option<SectionId>) -> SectionId {
        let id = SectionId(self.sections.len());
        self.sections.push(CatalogSection::new(name, parent));
        self.index.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<SectionId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: SectionId) -> &CatalogSection {
        &self.sections[id.0]
    }

    pub fn get_mut(&mut self, id: SectionId) -> &mut CatalogSection {
        &mut self.sections[id.0]
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (SectionId, &CatalogSection)> {
        self.sections
            .iter()
            .enumerate()
            .map(|(i, s)| (SectionId(i), s))
    }

    pub fn converter_factory(&self) -> &ConverterFactory {
        &self.converters
    }

    pub fn converter_factory_mut(&mut self) -> &mut ConverterFactory {
        &mut self.converters
    }

    pub fn codec_factory(&self) -> &CodecFactory {
        &self.codecs
    }

    pub fn codec_factory_mut(&mut self) -> &mut CodecFactory {
        &mut self.codecs
    }

    // --- inherited definitions ---

    /// Look up a definition in the section, then in each ancestor.
    pub fn get_definition_string(&self, id: SectionId, name: &str) -> Option<&str> {
        let mut current = Some(id);
        while let Some(c) = current {
            let section = &self.sections[c.0];
            if let Some(value) = section.local_definition(name) {
                return Some(value);
            }
            current = section.parent;
        }
        None
    }

    fn get_definition_parsed<T: std::str::FromStr>(
        &self,
        id: SectionId,
        name: &str,
        what: &'static str,
    ) -> Result<Option<T>> {
        self.get_definition_string(id, name)
            .map(|value| {
                value.parse::<T>().map_err(|_| CatalogError::ValueInvalid {
                    what,
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    pub fn get_definition_i64(&self, id: SectionId, name: &str) -> Result<Option<i64>> {
        self.get_definition_parsed(id, name, "integer definition")
    }

    pub fn get_definition_f64(&self, id: SectionId, name: &str) -> Result<Option<f64>> {
        self.get_definition_parsed(id, name, "numeric definition")
    }

    /// Boolean definition; accepts `true` and `false`.
    pub fn get_definition_bool(&self, id: SectionId, name: &str) -> Result<Option<bool>> {
        self.get_definition_parsed(id, name, "boolean definition")
    }

    // --- locking ---

    /// Lock a section, locking its ancestors first. Locking twice is a no-op.
    ///
    /// The converter resolves from the local object or description, else
    /// from the parent. The codec resolves the same way; a description is
    /// built with the resolved converter, and a locally set converter is
    /// bound into whichever codec results.
    pub fn lock(&mut self, id: SectionId) -> Result<()> {
        if self.sections[id.0].locked {
            return Ok(());
        }
        if let Some(parent) = self.sections[id.0].parent {
            self.lock(parent)?;
        }
        self.resolve(id)
            .map_err(|e| e.in_section(&self.sections[id.0].name))
    }

    fn resolve(&mut self, id: SectionId) -> Result<()> {
        let (parent_converter, parent_codec) = match self.sections[id.0].parent {
            Some(p) => {
                let parent = &self.sections[p.0];
                (parent.resolved_converter.clone(), parent.resolved_codec.clone())
            }
            None => (None, None),
        };

        let section = &self.sections[id.0];
        let local_converter = section.converter.is_set();
        let converter = match &section.converter {
            Setting::Explicit(c) | Setting::Overridable(c) => Some(c.clone()),
            Setting::Deferred(desc) => Some(self.converters.build(desc)?),
            Setting::Unset => parent_converter,
        };

        let local_codec = section.codec.is_set();
        let codec = match &section.codec {
            Setting::Explicit(c) | Setting::Overridable(c) => Some(c.clone()),
            Setting::Deferred(desc) => Some(self.codecs.build(desc, converter.clone())?),
            Setting::Unset => parent_codec,
        };
        let codec = codec.map(|c| {
            if local_converter || c.converter().is_none() {
                c.with_converter(converter.clone())
            } else {
                c
            }
        });

        let section = &mut self.sections[id.0];
        tracing::debug!(
            section = %section.name,
            converter = converter.as_ref().map_or("none", |c| c.type_tag()),
            converter_inherited = !local_converter && converter.is_some(),
            codec = codec.as_ref().map_or("none", |c| c.type_tag()),
            codec_inherited = !local_codec && codec.is_some(),
            "Section locked"
        );
        section.converter_inherited = !local_converter && converter.is_some();
        section.codec_inherited = !local_codec && codec.is_some();
        section.resolved_converter = converter;
        section.resolved_codec = codec;
        section.locked = true;
        Ok(())
    }

    // --- write ---

    /// Write one section: header, comments, converter and codec
    /// descriptions, definitions, then one line per rupture.
    pub fn write_section(
        &self,
        id: SectionId,
        sink: &mut dyn LineSink,
        format: &SectionFormat,
        emit_header: bool,
    ) -> Result<()> {
        let section = &self.sections[id.0];
        self.write_section_lines(section, sink, format, emit_header)
            .map_err(|e| e.in_section(&section.name))
    }

    fn write_section_lines(
        &self,
        section: &CatalogSection,
        sink: &mut dyn LineSink,
        format: &SectionFormat,
        emit_header: bool,
    ) -> Result<()> {
        let codec = if section.ruptures.is_empty() {
            None
        } else {
            let codec = section.resolved_codec.as_ref().ok_or_else(|| {
                CatalogError::CodecMissing {
                    section: section.name.clone(),
                }
            })?;
            Some(codec)
        };

        let mut written = 0usize;
        if emit_header {
            sink.accept(&format.header_line(&section.name))?;
            written += 1;
        }
        for comment in &section.comments {
            sink.accept(&format.comment_line(comment))?;
            written += 1;
        }
        if let Some(desc) = section.converter_description()? {
            sink.accept(&format.converter_line(&desc))?;
            written += 1;
        }
        if let Some(desc) = section.codec_description()? {
            sink.accept(&format.codec_line(&desc))?;
            written += 1;
        }
        for (name, value) in section.definitions() {
            sink.accept(&format.definition_line(name, value))?;
            written += 1;
        }
        if let Some(codec) = codec {
            for rup in &section.ruptures {
                sink.accept(&codec.format_line(rup)?)?;
                written += 1;
            }
        }
        tracing::debug!(section = %section.name, lines = written, "Section written");
        Ok(())
    }

    // --- read ---

    /// Read lines into a section until a header naming another section
    /// (whose name is returned) or the end of input.
    pub fn read_section(
        &mut self,
        id: SectionId,
        src: &mut dyn LineSource,
        format: &SectionFormat,
    ) -> Result<Option<String>> {
        self.read_section_lines(id, src, format)
            .map_err(|e| e.in_section(&self.sections[id.0].name))
    }

    fn read_section_lines(
        &mut self,
        id: SectionId,
        src: &mut dyn LineSource,
        format: &SectionFormat,
    ) -> Result<Option<String>> {
        {
            let section = &mut self.sections[id.0];
            if section.seen && !section.splittable {
                return Err(CatalogError::SectionNotSplittable {
                    section: section.name.clone(),
                });
            }
            section.seen = true;
        }

        let mut records = 0usize;
        while let Some(line) = src.next_line()? {
            match format.classify(&line)? {
                LineKind::Blank => {}
                LineKind::Comment(text) => self.sections[id.0].add_comment(text),
                LineKind::Header(name) => {
                    if name != self.sections[id.0].name {
                        tracing::debug!(
                            section = %self.sections[id.0].name,
                            next = %name,
                            records,
                            "Section boundary"
                        );
                        return Ok(Some(name.to_string()));
                    }
                }
                LineKind::Definition { name, value } => {
                    self.sections[id.0].set_definition(name, value)?;
                }
                LineKind::Converter(desc) => {
                    let section = &mut self.sections[id.0];
                    if !section.allow_converter {
                        return Err(CatalogError::ControlLineInvalid {
                            line: line.clone(),
                            detail: "converter declarations are not allowed here".to_string(),
                        });
                    }
                    section.set_converter_description(Some(desc))?;
                }
                LineKind::Codec(desc) => {
                    let section = &mut self.sections[id.0];
                    if !section.allow_codec {
                        return Err(CatalogError::ControlLineInvalid {
                            line: line.clone(),
                            detail: "format declarations are not allowed here".to_string(),
                        });
                    }
                    section.set_codec_description(Some(desc))?;
                }
                LineKind::Record(text) => {
                    self.lock(id)?;
                    let section = &mut self.sections[id.0];
                    let codec = section.resolved_codec.as_ref().ok_or_else(|| {
                        CatalogError::CodecMissing {
                            section: section.name.clone(),
                        }
                    })?;
                    let mut rup = RuptureRecord::new();
                    codec.parse_line(&mut rup, text)?;
                    section.add_rupture(rup)?;
                    records += 1;
                }
            }
        }
        tracing::debug!(section = %self.sections[id.0].name, records, "Input exhausted");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LocalCatalogCodec, ObservedCodec};
    use crate::convert::OriginConverter;
    use crate::coords::{AbsoluteTimeLocation, LonRange, RelativeTimeLocation};
    use crate::error::ErrorKind;
    use crate::io::str_source;

    fn tree() -> (SectionTree, SectionId, SectionId, SectionId) {
        let mut tree = SectionTree::new();
        let root = tree.add_section("root", None).unwrap();
        let default = tree.add_section("default", Some(root)).unwrap();
        let data = tree.add_section("aftershock", Some(default)).unwrap();
        (tree, root, default, data)
    }

    fn origin() -> Converter {
        let abs = AbsoluteTimeLocation::new(1_577_836_800_000, 34.0, -118.0, 0.0);
        Converter::from(OriginConverter::new(abs).unwrap())
    }

    fn rupture() -> RuptureRecord {
        let abs = AbsoluteTimeLocation::new(1_577_836_800_000, 34.05, -118.25, 8.0);
        RuptureRecord::with_absolute(4.5, abs).unwrap()
    }

    #[test]
    fn test_lock_cascades_to_ancestors() {
        let (mut tree, root, default, data) = tree();
        tree.lock(data).unwrap();
        assert!(tree.get(root).is_locked());
        assert!(tree.get(default).is_locked());
        assert!(tree.get(data).is_locked());
        tree.lock(data).unwrap();
    }

    #[test]
    fn test_locked_section_rejects_setting_changes() {
        let (mut tree, _, _, data) = tree();
        tree.lock(data).unwrap();
        let section = tree.get_mut(data);
        for err in [
            section.set_definition("a", "1").unwrap_err(),
            section.remove_definition("a").unwrap_err(),
            section.set_max_ruptures(Some(1)).unwrap_err(),
            section.set_converter(None, false).unwrap_err(),
            section.set_converter_description(Some("etas_origin 0 0 0 0")).unwrap_err(),
            section.set_codec(None, false).unwrap_err(),
            section.set_codec_description(Some("local_catalog spherical")).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::SectionLocked);
        }
        section.add_comment("still fine");
        assert_eq!(section.comments().len(), 1);
    }

    #[test]
    fn test_add_rupture_requires_lock_and_capacity() {
        let (mut tree, _, _, data) = tree();
        tree.get_mut(data).set_max_ruptures(Some(1)).unwrap();
        let err = tree.get_mut(data).add_rupture(rupture()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SectionNotReady);

        tree.lock(data).unwrap();
        tree.get_mut(data).add_rupture(rupture()).unwrap();
        let err = tree.get_mut(data).add_rupture(rupture()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(tree.get(data).rupture_count(), 1);
    }

    #[test]
    fn test_add_rupture_requires_time_location() {
        let (mut tree, _, _, data) = tree();
        tree.lock(data).unwrap();
        let mut bare = RuptureRecord::new();
        bare.set_mag(3.0).unwrap();
        let err = tree.get_mut(data).add_rupture(bare).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueInvalid);
        assert_eq!(tree.get(data).rupture_count(), 0);

        let rel = RelativeTimeLocation::new(1.0, 0.0, 0.0, 5.0);
        let rup = RuptureRecord::with_relative(3.0, rel).unwrap();
        tree.get_mut(data).add_rupture(rup).unwrap();
    }

    #[test]
    fn test_comment_control_characters_become_spaces() {
        let (mut tree, _, _, data) = tree();
        let section = tree.get_mut(data);
        section.add_comment("line one\nline two\r\tend");
        assert_eq!(section.comments(), ["line one line two \tend".to_string()]);
    }

    #[test]
    fn test_multi_line_comment_round_trip() {
        let (mut original, _, _, data) = tree();
        original.get_mut(data).add_comment(" first\nsecond");
        original.get_mut(data).add_comment("third");
        original.lock(data).unwrap();
        let mut lines: Vec<String> = Vec::new();
        original
            .write_section(data, &mut lines, &SectionFormat::default(), true)
            .unwrap();
        assert_eq!(lines, vec![":begin: aftershock", "# first second", "#third"]);

        let (mut copy, _, _, data) = tree();
        let text = lines.join("\n");
        let next = copy
            .read_section(data, &mut str_source(&text), &SectionFormat::default())
            .unwrap();
        assert_eq!(next, None);
        assert_eq!(copy.get(data).comments(), original.get(data).comments());
        assert_eq!(copy.get(data).rupture_count(), 0);
    }

    #[test]
    fn test_definitions_inherit_and_keep_order() {
        let (mut tree, _, default, data) = tree();
        tree.get_mut(default).set_definition("start_time", "1000").unwrap();
        tree.get_mut(data).set_definition("zeta", "z").unwrap();
        tree.get_mut(data).set_definition("alpha", "a").unwrap();
        tree.get_mut(data).set_definition("zeta", "zz").unwrap();

        assert_eq!(tree.get_definition_string(data, "start_time"), Some("1000"));
        assert_eq!(tree.get_definition_i64(data, "start_time").unwrap(), Some(1000));
        assert_eq!(tree.get_definition_string(data, "missing"), None);
        let names: Vec<_> = tree.get(data).definitions().collect();
        assert_eq!(names, vec![("zeta", "zz"), ("alpha", "a")]);
    }

    #[test]
    fn test_definition_validation() {
        let (mut tree, _, _, data) = tree();
        let section = tree.get_mut(data);
        assert_eq!(
            section.set_definition("bad name", "1").unwrap_err().kind(),
            ErrorKind::ValueInvalid
        );
        assert_eq!(
            section.set_definition("x", " padded").unwrap_err().kind(),
            ErrorKind::ValueInvalid
        );
        section.set_allowed_definitions(Some(["x"]));
        assert_eq!(
            section.set_definition("y", "1").unwrap_err().kind(),
            ErrorKind::DefinitionDisallowed
        );
        section.set_definition("x", "").unwrap();
    }

    #[test]
    fn test_typed_definitions() {
        let (mut tree, _, _, data) = tree();
        let section = tree.get_mut(data);
        section.set_definition("rate", "0.25").unwrap();
        section.set_definition("enabled", "true").unwrap();
        section.set_definition("word", "abc").unwrap();
        assert_eq!(tree.get_definition_f64(data, "rate").unwrap(), Some(0.25));
        assert_eq!(tree.get_definition_bool(data, "enabled").unwrap(), Some(true));
        assert_eq!(
            tree.get_definition_i64(data, "word").unwrap_err().kind(),
            ErrorKind::ValueInvalid
        );
    }

    #[test]
    fn test_converter_and_codec_inherit_from_parent() {
        let (mut tree, _, default, data) = tree();
        tree.get_mut(default).set_converter(Some(origin()), false).unwrap();
        tree.get_mut(default)
            .set_codec_description(Some("local_catalog spherical"))
            .unwrap();
        tree.lock(data).unwrap();

        let section = tree.get(data);
        assert_eq!(section.converter(), Some(&origin()));
        assert!(section.is_converter_inherited());
        assert!(section.is_codec_inherited());
        let codec = section.codec().unwrap();
        assert_eq!(codec.type_tag(), "local_catalog");
        assert_eq!(codec.converter(), Some(&origin()));
    }

    #[test]
    fn test_local_converter_is_bound_into_inherited_codec() {
        let (mut tree, _, default, data) = tree();
        tree.get_mut(default)
            .set_codec(Some(LocalCatalogCodec::default().into()), false)
            .unwrap();
        tree.get_mut(data)
            .set_converter_description(Some("etas_origin 1577836800000 34 -118 0"))
            .unwrap();
        tree.lock(data).unwrap();
        assert_eq!(tree.get(data).codec().unwrap().converter(), Some(&origin()));
        assert_eq!(tree.get(default).codec().unwrap().converter(), None);

        let rel = RelativeTimeLocation::new(0.0, 0.0, 0.0, 5.0);
        let rup = RuptureRecord::with_relative(3.0, rel).unwrap();
        tree.get_mut(data).add_rupture(rup).unwrap();
        let mut lines: Vec<String> = Vec::new();
        tree.write_section(data, &mut lines, &SectionFormat::default(), false)
            .unwrap();
        assert_eq!(lines.last().unwrap(), "- - 1577836800000 3 34 -118 5 0 -");
    }

    #[test]
    fn test_explicit_object_wins_over_description() {
        let (mut tree, _, _, data) = tree();
        let observed = Codec::from(ObservedCodec::default());
        let section = tree.get_mut(data);
        section.set_codec(Some(observed), false).unwrap();
        section.set_codec_description(Some("local_catalog wrapped")).unwrap();
        tree.lock(data).unwrap();
        assert_eq!(tree.get(data).codec().unwrap().type_tag(), "observed_7");
    }

    #[test]
    fn test_overridable_object_gives_way_to_description() {
        let (mut tree, _, _, data) = tree();
        let observed = Codec::from(ObservedCodec::default());
        let section = tree.get_mut(data);
        section.set_codec(Some(observed), true).unwrap();
        section.set_codec_description(Some("local_catalog wrapped")).unwrap();
        assert_eq!(
            section.codec_description().unwrap().as_deref(),
            Some("local_catalog wrapped")
        );
        tree.lock(data).unwrap();
        assert_eq!(tree.get(data).codec().unwrap().type_tag(), "local_catalog");
    }

    #[test]
    fn test_bad_description_fails_lock_with_context() {
        let (mut tree, _, default, data) = tree();
        tree.get_mut(default).set_codec_description(Some("csv")).unwrap();
        let err = tree.lock(data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedType);
        assert!(err.to_string().contains("default"));
        assert!(!tree.get(data).is_locked());
    }

    #[test]
    fn test_write_section_order() {
        let (mut tree, _, _, data) = tree();
        let section = tree.get_mut(data);
        section.add_comment(" note");
        section.set_converter(Some(origin()), false).unwrap();
        section
            .set_codec(Some(LocalCatalogCodec::new(LonRange::Spherical).into()), false)
            .unwrap();
        section.set_definition("k", "v").unwrap();
        tree.lock(data).unwrap();
        tree.get_mut(data).add_rupture(rupture()).unwrap();

        let mut lines: Vec<String> = Vec::new();
        tree.write_section(data, &mut lines, &SectionFormat::default(), true)
            .unwrap();
        assert_eq!(
            lines,
            vec![
                ":begin: aftershock",
                "# note",
                ":convert: etas_origin 2020-01-01T00:00:00.000Z 34 -118 0",
                ":format: local_catalog spherical",
                ":define: k = v",
                "- - 1577836800000 4.5 34.05 -118.25 8 0 -",
            ]
        );
    }

    #[test]
    fn test_write_without_codec_fails() {
        let (mut tree, _, _, data) = tree();
        tree.lock(data).unwrap();
        let mut lines: Vec<String> = Vec::new();
        tree.write_section(data, &mut lines, &SectionFormat::default(), true)
            .unwrap();
        tree.get_mut(data).add_rupture(rupture()).unwrap();
        let err = tree
            .write_section(data, &mut lines, &SectionFormat::default(), true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CodecMissing);
    }

    #[test]
    fn test_read_section_stops_at_next_header() {
        let (mut tree, _, _, data) = tree();
        let text = "\
:begin: aftershock
# first
:define: start_time = 1000
:format: local_catalog spherical

ci 12345 1577836800000 4.5 34.05 -118.25 8 1 ci12345 Test
:begin: other
ignored";
        let mut src = str_source(text);
        let next = tree
            .read_section(data, &mut src, &SectionFormat::default())
            .unwrap();
        assert_eq!(next.as_deref(), Some("other"));

        let section = tree.get(data);
        assert!(section.is_locked());
        assert_eq!(section.comments(), [" first".to_string()]);
        assert_eq!(section.local_definition("start_time"), Some("1000"));
        assert_eq!(section.rupture_count(), 1);
        let rup = &section.ruptures()[0];
        assert_eq!(rup.strings().event_id(), Some("ci12345"));
        assert_eq!(rup.strings().description(), Some("Test"));
        assert_eq!(src.next_line().unwrap().as_deref(), Some("ignored"));
    }

    #[test]
    fn test_read_section_errors() {
        let format = SectionFormat::default();

        let (mut tree, _, _, data) = self::tree();
        let err = tree
            .read_section(data, &mut str_source(":bogus: x"), &format)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ControlLineInvalid);
        assert!(err.to_string().contains("aftershock"));

        let (mut tree, _, _, data) = self::tree();
        let err = tree
            .read_section(data, &mut str_source("ci 1 0 1 0 0 0 0 -"), &format)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CodecMissing);

        let (mut tree, _, _, data) = self::tree();
        tree.get_mut(data).set_allow_codec(false);
        let err = tree
            .read_section(data, &mut str_source(":format: local_catalog full"), &format)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ControlLineInvalid);

        let (mut tree, _, _, data) = self::tree();
        let text = ":format: local_catalog full\nci 1 x 1 0 0 0 0 -";
        let err = tree
            .read_section(data, &mut str_source(text), &format)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LineMalformed);
        assert!(err.to_string().contains("ci 1 x 1 0 0 0 0 -"));
    }

    #[test]
    fn test_reentering_non_splittable_section_fails() {
        let format = SectionFormat::default();
        let (mut tree, _, _, data) = self::tree();
        tree.read_section(data, &mut str_source("# a"), &format).unwrap();
        tree.read_section(data, &mut str_source("# b"), &format).unwrap();
        tree.get_mut(data).set_splittable(false);
        let err = tree
            .read_section(data, &mut str_source("# c"), &format)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SectionNotSplittable);
    }

    #[test]
    fn test_add_section_errors() {
        let (mut tree, _, default, _) = self::tree();
        assert_eq!(
            tree.add_section("aftershock", Some(default)).unwrap_err().kind(),
            ErrorKind::SectionExists
        );
        assert_eq!(
            tree.add_section("9lives", Some(default)).unwrap_err().kind(),
            ErrorKind::ValueInvalid
        );
        assert_eq!(tree.id("aftershock").map(SectionId::index), Some(2));
    }
}
