//! # forge-browse
//!
//! A Rust library for browsing the records stored in forge game-asset
//! archives.
//!
//! ## Overview
//!
//! Forge archives hold compressed datafiles; decompressing a datafile yields
//! a run of records, each starting with a 14-byte header (preamble, 64-bit
//! ID, 32-bit type code). This library provides:
//!
//! - A memory-bounded record cache with LRU eviction over open archives
//! - A persistent location index (`.ld` light dictionary) that remembers
//!   which datafile holds a record
//! - A decoder for the known record layouts, producing a typed tree
//! - DDS reconstruction from compiled texture records
//!
//! Decompression itself is delegated to a [`ForgeArchive`] implementation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_browse::{BrowserOptions, ForgeBrowser, MemoryArchive, RecordId};
//!
//! fn main() -> anyhow::Result<()> {
//!     let options = BrowserOptions::load("config.json")?;
//!     let mut browser = ForgeBrowser::new(options);
//!     browser.open_archive(Box::new(MemoryArchive::new("ACU")));
//!     browser.load_index()?;
//!
//!     if let Some(record) = browser.get_record(RecordId(0x1F2E_3D4C), Some("ACU"))? {
//!         println!("{} {}", record.resource_type, record.name);
//!     }
//!
//!     browser.save_index()?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod browser;
pub mod cache;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod forge_utils;
pub mod index;
pub mod options;
pub mod types;
pub mod utils;

pub use archive::{ArchiveSet, ForgeArchive, MemoryArchive, RawRecord};
pub use browser::ForgeBrowser;
pub use cache::{CachedRecord, ResourceCache};
pub use decoder::texture::{decode_texture, DdsHeader};
pub use decoder::{
    DecodeOptions, DecodedNode, DecodedRecord, Decoder, NestedRecord, Reference, ReferenceTarget,
};
pub use error::{Error, Result};
pub use index::{Location, LocationIndex};
pub use options::BrowserOptions;
pub use types::{RecordId, TypeCode};
pub use utils::{collect_files, create_glob_matcher, format_size, matches_filter};
