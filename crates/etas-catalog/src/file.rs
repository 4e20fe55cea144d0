//! Catalog files: a root section, a default section and data sections.
//!
//! Every data section's parent is `default`, whose parent is `root`. The
//! root section is never written; the default section is written without a
//! header unless configured otherwise, so its content leads the file and is
//! read back into `default` before the first header.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::codec::{CodecFactory, IdGenerator};
use crate::config::{CatalogConfig, NewSectionConfig};
use crate::convert::ConverterFactory;
use crate::error::{CatalogError, Result};
use crate::format::SectionFormat;
use crate::io::{BufReadSource, LineSink, LineSource, WriteSink};
use crate::rupture::RuptureRecord;
use crate::section::{CatalogSection, SectionId, SectionTree};

/// Name of the top-level section, never serialized.
pub const ROOT_SECTION: &str = "root";

/// Name of the file-scope section.
pub const DEFAULT_SECTION: &str = "default";

/// An ordered collection of sections read from or written to one text file.
#[derive(Debug)]
pub struct CatalogFile {
    tree: SectionTree,
    root: SectionId,
    default: SectionId,
    format: SectionFormat,
    auto_create: bool,
    emit_default_header: bool,
    new_section: NewSectionConfig,
    cursor: Option<String>,
}

impl Default for CatalogFile {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogFile {
    /// A file with the reference grammar, auto-creation on and no default header.
    pub fn new() -> Self {
        let config = CatalogConfig::default();
        let mut tree = SectionTree::new();
        let root = tree.push_section(ROOT_SECTION, None);
        let default = tree.push_section(DEFAULT_SECTION, Some(root));
        Self {
            tree,
            root,
            default,
            format: config.format,
            auto_create: config.file.auto_create,
            emit_default_header: config.file.emit_default_header,
            new_section: config.new_section,
            cursor: Some(DEFAULT_SECTION.to_string()),
        }
    }

    /// A file configured by `config`.
    pub fn with_config(config: &CatalogConfig) -> Result<Self> {
        config.validate()?;
        let mut file = Self::new();
        file.format = config.format.clone();
        file.auto_create = config.file.auto_create;
        file.emit_default_header = config.file.emit_default_header;
        file.new_section = config.new_section.clone();

        let default = file.tree.get_mut(file.default);
        if let Some(desc) = &config.file.default_convert {
            default.set_converter_description(Some(desc))?;
        }
        if let Some(desc) = &config.file.default_format {
            default.set_codec_description(Some(desc))?;
        }
        Ok(file)
    }

    pub fn format(&self) -> &SectionFormat {
        &self.format
    }

    pub fn auto_create(&self) -> bool {
        self.auto_create
    }

    pub fn set_auto_create(&mut self, auto_create: bool) {
        self.auto_create = auto_create;
    }

    pub fn emit_default_header(&self) -> bool {
        self.emit_default_header
    }

    pub fn set_emit_default_header(&mut self, emit: bool) {
        self.emit_default_header = emit;
    }

    /// Settings applied to sections created while reading.
    pub fn new_section_defaults(&self) -> &NewSectionConfig {
        &self.new_section
    }

    pub fn set_new_section_defaults(&mut self, defaults: NewSectionConfig) {
        self.new_section = defaults;
    }

    pub fn converter_factory_mut(&mut self) -> &mut ConverterFactory {
        self.tree.converter_factory_mut()
    }

    pub fn codec_factory_mut(&mut self) -> &mut CodecFactory {
        self.tree.codec_factory_mut()
    }

    /// Replace the generator supplying event ids to layouts without one.
    ///
    /// Codecs already built for locked sections keep their generator.
    pub fn set_id_generator<G: IdGenerator + 'static>(&mut self, ids: G) {
        self.tree.codec_factory_mut().set_id_generator(ids);
    }

    /// The underlying arena, for id-based access.
    pub fn tree(&self) -> &SectionTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SectionTree {
        &mut self.tree
    }

    // -----------------------------------------------------------------------
    // Sections
    // -----------------------------------------------------------------------

    pub fn root_id(&self) -> SectionId {
        self.root
    }

    pub fn default_id(&self) -> SectionId {
        self.default
    }

    /// Add a data section under `default`.
    pub fn add_section(&mut self, name: &str) -> Result<SectionId> {
        self.tree.add_section(name, Some(self.default))
    }

    pub fn section_id(&self, name: &str) -> Option<SectionId> {
        self.tree.id(name)
    }

    pub fn section(&self, name: &str) -> Option<&CatalogSection> {
        self.tree.id(name).map(|id| self.tree.get(id))
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut CatalogSection> {
        let id = self.tree.id(name)?;
        Some(self.tree.get_mut(id))
    }

    fn require_id(&self, name: &str) -> Result<SectionId> {
        self.tree.id(name).ok_or_else(|| CatalogError::SectionUnknown {
            name: name.to_string(),
        })
    }

    /// Names of the data sections in creation order.
    pub fn data_section_names(&self) -> Vec<&str> {
        self.tree
            .iter()
            .filter(|(id, _)| *id != self.root && *id != self.default)
            .map(|(_, s)| s.name())
            .collect()
    }

    /// Lock a section and its ancestors.
    pub fn lock_section(&mut self, name: &str) -> Result<()> {
        let id = self.require_id(name)?;
        self.tree.lock(id)
    }

    /// Append a rupture to a section, locking it first if needed.
    pub fn add_rupture(&mut self, name: &str, rup: RuptureRecord) -> Result<()> {
        let id = self.require_id(name)?;
        self.tree.lock(id)?;
        self.tree
            .get_mut(id)
            .add_rupture(rup)
            .map_err(|e| e.in_section(name))
    }

    /// Inherited definition lookup starting at section `section`.
    pub fn get_definition_string(&self, section: &str, name: &str) -> Option<&str> {
        let id = self.tree.id(section)?;
        self.tree.get_definition_string(id, name)
    }

    pub fn get_definition_i64(&self, section: &str, name: &str) -> Result<Option<i64>> {
        self.tree.get_definition_i64(self.require_id(section)?, name)
    }

    pub fn get_definition_f64(&self, section: &str, name: &str) -> Result<Option<f64>> {
        self.tree.get_definition_f64(self.require_id(section)?, name)
    }

    pub fn get_definition_bool(&self, section: &str, name: &str) -> Result<Option<bool>> {
        self.tree.get_definition_bool(self.require_id(section)?, name)
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Name of the section the next read starts in, if input remains.
    pub fn read_cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Point the read cursor back at `default`.
    pub fn restart_reading(&mut self) {
        self.cursor = Some(DEFAULT_SECTION.to_string());
    }

    /// Read one section. Returns false once the input has been consumed.
    pub fn read_next_section(&mut self, src: &mut dyn LineSource) -> Result<bool> {
        let Some(name) = self.cursor.take() else {
            return Ok(false);
        };
        let id = self.read_target(&name)?;
        self.cursor = self.tree.read_section(id, src, &self.format)?;
        Ok(true)
    }

    /// Read sections until the input is exhausted.
    pub fn read_all_sections(&mut self, src: &mut dyn LineSource) -> Result<()> {
        while self.read_next_section(src)? {}
        Ok(())
    }

    fn read_target(&mut self, name: &str) -> Result<SectionId> {
        if name == ROOT_SECTION {
            return Err(CatalogError::SectionUnknown {
                name: name.to_string(),
            });
        }
        if let Some(id) = self.tree.id(name) {
            return Ok(id);
        }
        if !self.auto_create {
            return Err(CatalogError::SectionUnknown {
                name: name.to_string(),
            });
        }

        let id = self.add_section(name)?;
        let defaults = &self.new_section;
        let section = self.tree.get_mut(id);
        section.set_splittable(defaults.splittable);
        section.set_allowed_definitions(defaults.allowed_definitions.clone());
        section.set_allow_converter(defaults.allow_converter);
        section.set_allow_codec(defaults.allow_codec);
        section.set_max_ruptures(defaults.max_ruptures)?;
        tracing::debug!(section = %name, "Section auto-created");
        Ok(id)
    }

    /// Read a whole file from `path`.
    pub fn read_from_path(&mut self, path: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(path)?);
        self.read_all_sections(&mut BufReadSource::new(reader))
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    /// Write every section except root, in creation order.
    pub fn write_all_sections(&self, sink: &mut dyn LineSink) -> Result<()> {
        for (id, _) in self.tree.iter() {
            if id == self.root {
                continue;
            }
            let emit_header = id != self.default || self.emit_default_header;
            self.tree.write_section(id, sink, &self.format, emit_header)?;
        }
        Ok(())
    }

    /// Write the whole file to `path`, replacing any existing file.
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let mut sink = WriteSink::new(BufWriter::new(File::create(path)?));
        self.write_all_sections(&mut sink)?;
        sink.into_inner()?;
        tracing::debug!(path = %path.display(), "Catalog written");
        Ok(())
    }
}
