//! Forge archives as seen by the cache
//!
//! Reading a forge file and inflating its datafiles happens outside this
//! crate. An archive only has to list its datafile IDs and hand back the
//! records of one datafile on request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{RecordId, TypeCode};

/// A record produced by decompressing a datafile
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: RecordId,
    pub type_code: TypeCode,
    pub name: String,
    /// Record bytes, starting with the 14-byte record header
    pub data: Vec<u8>,
}

impl RawRecord {
    pub fn new(id: RecordId, type_code: TypeCode, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id,
            type_code,
            name: name.into(),
            data,
        }
    }
}

/// An open forge file
///
/// `decompress_datafile` may be expensive but must be idempotent: asking for
/// the same datafile twice yields the same records.
pub trait ForgeArchive: Send {
    /// Archive name, unique among open archives
    fn name(&self) -> &str;

    /// IDs of every datafile in the archive, in archive order
    fn datafile_ids(&self) -> Vec<RecordId>;

    fn contains_datafile(&self, id: RecordId) -> bool {
        self.datafile_ids().contains(&id)
    }

    /// Inflate one datafile into its records
    fn decompress_datafile(&self, datafile_id: RecordId) -> Result<Vec<RawRecord>>;
}

/// Archive whose datafiles are already decompressed in memory
#[derive(Debug, Default)]
pub struct MemoryArchive {
    name: String,
    order: Vec<RecordId>,
    datafiles: HashMap<RecordId, Vec<RawRecord>>,
    decompressions: AtomicUsize,
}

impl MemoryArchive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a datafile; its ID should equal the ID of its first record
    pub fn with_datafile(mut self, datafile_id: RecordId, records: Vec<RawRecord>) -> Self {
        self.insert_datafile(datafile_id, records);
        self
    }

    pub fn insert_datafile(&mut self, datafile_id: RecordId, records: Vec<RawRecord>) {
        if self.datafiles.insert(datafile_id, records).is_none() {
            self.order.push(datafile_id);
        }
    }

    /// Number of `decompress_datafile` calls served so far
    pub fn decompression_count(&self) -> usize {
        self.decompressions.load(Ordering::Relaxed)
    }
}

impl ForgeArchive for MemoryArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn datafile_ids(&self) -> Vec<RecordId> {
        self.order.clone()
    }

    fn contains_datafile(&self, id: RecordId) -> bool {
        self.datafiles.contains_key(&id)
    }

    fn decompress_datafile(&self, datafile_id: RecordId) -> Result<Vec<RawRecord>> {
        let records = self.datafiles.get(&datafile_id).ok_or_else(|| {
            Error::Decompression(format!(
                "datafile {} not present in {}",
                datafile_id, self.name
            ))
        })?;
        self.decompressions.fetch_add(1, Ordering::Relaxed);
        Ok(records.clone())
    }
}

/// Shared archives, so callers can keep a handle after opening
impl<A: ForgeArchive + Sync> ForgeArchive for Arc<A> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn datafile_ids(&self) -> Vec<RecordId> {
        self.as_ref().datafile_ids()
    }

    fn contains_datafile(&self, id: RecordId) -> bool {
        self.as_ref().contains_datafile(id)
    }

    fn decompress_datafile(&self, datafile_id: RecordId) -> Result<Vec<RawRecord>> {
        self.as_ref().decompress_datafile(datafile_id)
    }
}

/// The set of open archives, kept in open order
#[derive(Default)]
pub struct ArchiveSet {
    archives: Vec<Box<dyn ForgeArchive>>,
}

impl ArchiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an archive, replacing any archive with the same name
    pub fn open(&mut self, archive: Box<dyn ForgeArchive>) {
        if let Some(slot) = self
            .archives
            .iter_mut()
            .find(|a| a.name() == archive.name())
        {
            *slot = archive;
        } else {
            self.archives.push(archive);
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn ForgeArchive> {
        self.archives
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// First open archive holding a datafile with this ID
    pub fn find_datafile(&self, id: RecordId) -> Option<&str> {
        self.archives
            .iter()
            .find(|a| a.contains_datafile(id))
            .map(|a| a.name())
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }
}
