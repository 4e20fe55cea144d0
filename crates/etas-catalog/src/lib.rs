#![forbid(unsafe_code)]
//! # Rupture Catalog Engine
//!
//! Reads and writes the earthquake-rupture catalogs that drive aftershock
//! forecasts: line-oriented text files split into named sections that carry
//! definitions, comments, converter and format declarations, and one
//! rupture record per line.
//!
//! ## Modules
//!
//! - **coords** — absolute and relative time/location values, range coercion
//! - **strings** — ids, network, code and description of a rupture
//! - **convert** — absolute/relative converters and their factory
//! - **rupture** — the rupture record
//! - **codec** — line layouts (`legacy_10`, `observed_7`, `local_catalog`) and their factory
//! - **format** — comment/control prefixes and control-line classification
//! - **section** — lockable sections with inheritance, section read/write
//! - **file** — root/default/data section files, multi-section read/write
//! - **config** — TOML configuration
//! - **io** — line sources and sinks
//!
//! ## Example
//!
//! ```
//! use etas_catalog::{CatalogFile, LocalCatalogCodec, RuptureRecord, AbsoluteTimeLocation};
//!
//! let mut file = CatalogFile::new();
//! file.add_section("aftershock").unwrap();
//! file.section_mut("aftershock")
//!     .unwrap()
//!     .set_codec(Some(LocalCatalogCodec::default().into()), false)
//!     .unwrap();
//! let abs = AbsoluteTimeLocation::new(1_577_836_800_000, 34.05, -118.25, 8.0);
//! file.add_rupture("aftershock", RuptureRecord::with_absolute(4.5, abs).unwrap())
//!     .unwrap();
//!
//! let mut lines: Vec<String> = Vec::new();
//! file.write_all_sections(&mut lines).unwrap();
//! assert_eq!(lines[0], ":begin: aftershock");
//! ```

pub mod codec;
pub mod config;
pub mod convert;
pub mod coords;
pub mod file;
pub mod format;
pub mod io;
pub mod rupture;
pub mod section;
pub mod strings;

mod error;

pub use codec::{
    Codec, CodecContext, CodecFactory, IdGenerator, LegacyCodec, LineCodec, LocalCatalogCodec,
    ObservedCodec, SequentialIds, SharedIds,
};
pub use config::{CatalogConfig, FileConfig, NewSectionConfig};
pub use convert::{AbsRelConverter, Converter, ConverterFactory, OriginConverter};
pub use coords::{coerce, coerce_lon, AbsoluteTimeLocation, LonRange, RelativeTimeLocation};
pub use error::{CatalogError, ErrorKind, Result};
pub use file::{CatalogFile, DEFAULT_SECTION, ROOT_SECTION};
pub use format::{LineKind, SectionFormat};
pub use io::{str_source, BufReadSource, IterSource, LineSink, LineSource, WriteSink};
pub use rupture::RuptureRecord;
pub use section::{CatalogSection, SectionId, SectionTree};
pub use strings::RuptureStrings;
