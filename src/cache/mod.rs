//! Resource cache
//!
//! Owns every materialised record buffer, keeps the total size under the
//! memory budget by evicting least recently used records, and works out
//! which archive and datafile hold a record.

mod lru;

pub use lru::LruRanks;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::{ArchiveSet, ForgeArchive, RawRecord};
use crate::error::{Error, Result};
use crate::index::{Location, LocationIndex};
use crate::types::{RecordId, TypeCode};

/// A resident record
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRecord {
    pub id: RecordId,
    pub archive: String,
    pub datafile: RecordId,
    pub type_code: TypeCode,
    pub name: String,
    /// Record bytes including the record header
    pub data: Arc<[u8]>,
}

impl CachedRecord {
    fn is_at(&self, location: &Location) -> bool {
        self.archive == location.archive && self.datafile == location.datafile
    }
}

pub struct ResourceCache {
    archives: ArchiveSet,
    index: LocationIndex,
    index_path: Option<PathBuf>,
    entries: HashMap<RecordId, CachedRecord>,
    ranks: LruRanks,
    memory: u64,
    budget: u64,
}

impl ResourceCache {
    /// Create an empty cache holding at most `budget` bytes of record data
    pub fn new(budget: u64) -> Self {
        Self {
            archives: ArchiveSet::new(),
            index: LocationIndex::new(),
            index_path: None,
            entries: HashMap::new(),
            ranks: LruRanks::new(),
            memory: 0,
            budget,
        }
    }

    pub fn open_archive(&mut self, archive: Box<dyn ForgeArchive>) {
        tracing::info!("Opened archive {}", archive.name());
        self.archives.open(archive);
    }

    pub fn archives(&self) -> &ArchiveSet {
        &self.archives
    }

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut LocationIndex {
        &mut self.index
    }

    /// Load the location index and remember its path for later saves
    pub fn load_index<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.index.load(path)?;
        self.index_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Save the location index to the path it was loaded from
    ///
    /// Returns whether anything was written.
    pub fn save_index(&mut self) -> Result<bool> {
        match &self.index_path {
            Some(path) => self.index.save(path),
            None => Ok(false),
        }
    }

    /// Work out which archive and datafile hold `id`
    pub fn resolve(&self, id: RecordId, hint: Option<&str>) -> Option<Location> {
        if id.is_null() {
            return None;
        }

        if let Some(entry) = self.entries.get(&id) {
            if hint.map_or(true, |archive| archive == entry.archive) {
                return Some(Location::new(entry.archive.as_str(), entry.datafile));
            }
        }

        if let Some(archive) = hint {
            if let Some(found) = self.archives.get(archive) {
                if found.contains_datafile(id) {
                    return Some(Location::new(archive, id));
                }
            }
        }
        if let Some(archive) = self.archives.find_datafile(id) {
            return Some(Location::new(archive, id));
        }

        let location = self.index.lookup(id, hint)?;
        if !self.archives.contains(&location.archive) {
            tracing::debug!(
                "Index places {} in {} which is not open",
                id,
                location.archive
            );
            return None;
        }
        Some(location)
    }

    /// Fetch a record, decompressing its datafile if needed.
    ///
    /// `Ok(None)` means the record could not be located. Errors come only
    /// from the archive collaborator.
    pub fn get(&mut self, id: RecordId, hint: Option<&str>) -> Result<Option<CachedRecord>> {
        let location = match self.resolve(id, hint) {
            Some(location) => location,
            None => return Ok(None),
        };

        let resident = self
            .entries
            .get(&id)
            .map_or(false, |entry| entry.is_at(&location));
        if resident {
            tracing::debug!("Cache hit for {}", id);
        } else {
            self.load_datafile(&location, id)?;
        }

        match self.entries.get(&id) {
            Some(entry) if entry.is_at(&location) => {
                let entry = entry.clone();
                self.ranks.touch(id);
                Ok(Some(entry))
            }
            _ => {
                tracing::debug!(
                    "Datafile {} in {} does not hold {}",
                    location.datafile,
                    location.archive,
                    id
                );
                Ok(None)
            }
        }
    }

    /// Look at a resident record without touching it or loading anything
    pub fn peek(&self, id: RecordId) -> Option<&CachedRecord> {
        self.entries.get(&id)
    }

    fn load_datafile(&mut self, location: &Location, requested: RecordId) -> Result<()> {
        let records = {
            let archive = self
                .archives
                .get(&location.archive)
                .ok_or_else(|| Error::ArchiveNotOpen(location.archive.clone()))?;
            archive.decompress_datafile(location.datafile)?
        };
        tracing::info!(
            "Decompressed datafile {} from {} ({} records)",
            location.datafile,
            location.archive,
            records.len()
        );

        let (requested_records, others): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| r.id == requested);
        for record in others.into_iter().chain(requested_records) {
            self.insert(&location.archive, location.datafile, record);
        }
        Ok(())
    }

    fn insert(&mut self, archive: &str, datafile: RecordId, record: RawRecord) {
        let id = record.id;
        if let Some(old) = self.entries.remove(&id) {
            self.memory -= old.data.len() as u64;
        }
        self.ranks.touch(id);
        self.memory += record.data.len() as u64;
        self.entries.insert(
            id,
            CachedRecord {
                id,
                archive: archive.to_string(),
                datafile,
                type_code: record.type_code,
                name: record.name,
                data: Arc::from(record.data),
            },
        );

        while self.memory > self.budget {
            let victim = match self.ranks.pop_lowest_except(id) {
                Some(victim) => victim,
                None => break,
            };
            if let Some(evicted) = self.entries.remove(&victim) {
                self.memory -= evicted.data.len() as u64;
                tracing::debug!("Evicted {} ({} bytes)", victim, evicted.data.len());
            }
        }

        if id != datafile {
            self.index.record(id, archive, datafile);
        }
    }

    /// Drop every cached record and reset the location index,
    /// saving the index first if it changed.
    pub fn clear(&mut self) -> Result<()> {
        if self.index.is_changed() {
            self.save_index()?;
        }
        self.index.clear();
        self.entries.clear();
        self.ranks.clear();
        self.memory = 0;
        Ok(())
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Resident record IDs from least to most recently used
    pub fn resident_ids(&self) -> Vec<RecordId> {
        self.ranks.iter_oldest_first().collect()
    }

    pub fn memory_used(&self) -> u64 {
        self.memory
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
