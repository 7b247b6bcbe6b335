//! Location index ("light dictionary")
//!
//! Remembers which datafile holds a record that is not the root of its own
//! datafile, so later sessions can find it without decompressing every
//! datafile of every archive.
//!
//! File layout (`<game>.ld`):
//!
//! ```text
//! u32 LE      header length N
//! N bytes     UTF-8 JSON {"forge_index": {"<archive>": <index>, ...}}
//! u64 LE * 3  (record_id, archive_index, datafile_id), repeated to EOF
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::RecordId;

/// Width of one persisted row: three u64 values
const ROW_LEN: usize = 24;

/// Largest archive index accepted from a file
const MAX_ARCHIVE_INDEX: u64 = u32::MAX as u64;

/// Where a record can be found
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub archive: String,
    pub datafile: RecordId,
}

impl Location {
    pub fn new(archive: impl Into<String>, datafile: RecordId) -> Self {
        Self {
            archive: archive.into(),
            datafile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexRow {
    record: RecordId,
    archive: u64,
    datafile: RecordId,
}

#[derive(Serialize, Deserialize)]
struct IndexHeader {
    forge_index: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct LocationIndex {
    archive_to_index: HashMap<String, u64>,
    index_to_archive: HashMap<u64, String>,
    next_archive: u64,
    /// Rows loaded from disk or merged by a previous save
    rows: Vec<IndexRow>,
    /// Rows learned since the last save
    pending: Vec<IndexRow>,
    by_archive: HashMap<(RecordId, u64), RecordId>,
    /// Most recently learned location per record, for lookups without a hint
    any_archive: HashMap<RecordId, (u64, RecordId)>,
    changed: bool,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, archive: &str) -> u64 {
        if let Some(index) = self.archive_to_index.get(archive) {
            return *index;
        }
        let index = self.next_archive;
        self.next_archive += 1;
        self.archive_to_index.insert(archive.to_string(), index);
        self.index_to_archive.insert(index, archive.to_string());
        index
    }

    /// Find the datafile holding `id`, preferring the hinted archive
    pub fn lookup(&self, id: RecordId, hint: Option<&str>) -> Option<Location> {
        if let Some(archive) = hint {
            if let Some(index) = self.archive_to_index.get(archive) {
                if let Some(datafile) = self.by_archive.get(&(id, *index)) {
                    return Some(Location::new(archive, *datafile));
                }
            }
        }
        let (index, datafile) = self.any_archive.get(&id)?;
        let archive = self.index_to_archive.get(index)?;
        Some(Location::new(archive.as_str(), *datafile))
    }

    /// Remember that `id` lives in `datafile` of `archive`.
    ///
    /// A record already known for that archive keeps its first datafile.
    pub fn record(&mut self, id: RecordId, archive: &str, datafile: RecordId) {
        let index = self.intern(archive);
        if self.by_archive.contains_key(&(id, index)) {
            return;
        }
        self.by_archive.insert((id, index), datafile);
        self.any_archive.insert(id, (index, datafile));
        self.pending.push(IndexRow {
            record: id,
            archive: index,
            datafile,
        });
    }

    /// Replace the in-memory index with the contents of `path`.
    ///
    /// A missing file leaves the index empty, and so does a file that fails
    /// to parse.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.clear();
        if !path.is_file() {
            tracing::debug!("No location index at {}", path.display());
            return Ok(());
        }
        let data = fs::read(path)?;
        *self = Self::parse(&data)?;
        tracing::info!(
            "Loaded location index {} ({} entries, {} archives)",
            path.display(),
            self.by_archive.len(),
            self.archive_to_index.len()
        );
        Ok(())
    }

    fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let header_len = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::InvalidIndex("missing header length".to_string()))?
            as usize;
        let mut header = vec![0u8; header_len];
        cursor.read_exact(&mut header).map_err(|_| {
            Error::InvalidIndex(format!("header length {} exceeds file", header_len))
        })?;
        let header: IndexHeader = serde_json::from_slice(&header)?;

        let body = &data[4 + header_len..];
        if body.len() % ROW_LEN != 0 {
            return Err(Error::InvalidIndex(format!(
                "body length {} is not a multiple of {}",
                body.len(),
                ROW_LEN
            )));
        }

        let mut index = Self::new();
        for (name, archive) in header.forge_index {
            if archive > MAX_ARCHIVE_INDEX {
                return Err(Error::InvalidIndex(format!(
                    "archive index {} for {} is out of range",
                    archive, name
                )));
            }
            if index.index_to_archive.contains_key(&archive) {
                let message = format!("archive index {} is used twice", archive);
                return Err(Error::InvalidIndex(message));
            }
            index.index_to_archive.insert(archive, name.clone());
            index.archive_to_index.insert(name, archive);
            index.next_archive = index.next_archive.max(archive + 1);
        }

        let mut cursor = Cursor::new(body);
        for _ in 0..body.len() / ROW_LEN {
            let row = IndexRow {
                record: RecordId(cursor.read_u64::<LittleEndian>()?),
                archive: cursor.read_u64::<LittleEndian>()?,
                datafile: RecordId(cursor.read_u64::<LittleEndian>()?),
            };
            if !index.index_to_archive.contains_key(&row.archive) {
                return Err(Error::InvalidIndex(format!(
                    "row for {} names unknown archive index {}",
                    row.record, row.archive
                )));
            }
            index
                .by_archive
                .entry((row.record, row.archive))
                .or_insert(row.datafile);
            index.any_archive.insert(row.record, (row.archive, row.datafile));
            index.rows.push(row);
        }
        Ok(index)
    }

    /// Merge pending rows and write the index if anything changed.
    ///
    /// Returns whether the file was written.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let path = path.as_ref();
        if !self.pending.is_empty() {
            self.rows.append(&mut self.pending);
            self.changed = true;
        }
        if !self.changed {
            return Ok(false);
        }

        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert((row.record, row.archive)));

        let header = IndexHeader {
            forge_index: self
                .archive_to_index
                .iter()
                .map(|(name, index)| (name.clone(), *index))
                .collect(),
        };
        let header = serde_json::to_vec(&header)?;

        let mut out = Vec::with_capacity(4 + header.len() + self.rows.len() * ROW_LEN);
        out.write_u32::<LittleEndian>(header.len() as u32)?;
        out.extend_from_slice(&header);
        for row in &self.rows {
            out.write_u64::<LittleEndian>(row.record.0)?;
            out.write_u64::<LittleEndian>(row.archive)?;
            out.write_u64::<LittleEndian>(row.datafile.0)?;
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, out)?;
        self.changed = false;

        tracing::info!(
            "Saved location index {} ({} rows)",
            path.display(),
            self.rows.len()
        );
        Ok(true)
    }

    /// Archive-agnostic view: one location per record, sorted by ID
    pub fn entries(&self) -> Vec<(RecordId, Location)> {
        let mut entries: Vec<_> = self
            .any_archive
            .iter()
            .filter_map(|(id, (index, datafile))| {
                let archive = self.index_to_archive.get(index)?;
                Some((*id, Location::new(archive.as_str(), *datafile)))
            })
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Known archive names in index order
    pub fn archives(&self) -> Vec<&str> {
        let mut archives: Vec<_> = self.index_to_archive.iter().collect();
        archives.sort_by_key(|(index, _)| **index);
        archives.into_iter().map(|(_, name)| name.as_str()).collect()
    }

    /// Number of known (record, archive) pairs
    pub fn len(&self) -> usize {
        self.by_archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_archive.is_empty()
    }

    /// Number of records known to live in `archive`
    pub fn len_in(&self, archive: &str) -> usize {
        match self.archive_to_index.get(archive) {
            Some(index) => self.by_archive.keys().filter(|(_, a)| a == index).count(),
            None => 0,
        }
    }

    /// Whether a save would write anything
    pub fn is_changed(&self) -> bool {
        self.changed || !self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_hint() {
        let mut index = LocationIndex::new();
        index.record(RecordId(10), "a.forge", RecordId(1));
        index.record(RecordId(10), "b.forge", RecordId(2));

        assert_eq!(
            index.lookup(RecordId(10), Some("a.forge")),
            Some(Location::new("a.forge", RecordId(1)))
        );
        // most recent mapping answers archive-agnostic lookups
        assert_eq!(
            index.lookup(RecordId(10), None),
            Some(Location::new("b.forge", RecordId(2)))
        );
        assert_eq!(
            index.lookup(RecordId(10), Some("c.forge")),
            Some(Location::new("b.forge", RecordId(2)))
        );
        assert_eq!(index.lookup(RecordId(11), None), None);
        assert_eq!(index.archives(), vec!["a.forge", "b.forge"]);
        assert_eq!(index.len_in("a.forge"), 1);
        assert_eq!(index.len_in("c.forge"), 0);
    }

    #[test]
    fn test_lookup_does_not_intern_hint() {
        let mut index = LocationIndex::new();
        index.lookup(RecordId(1), Some("ghost.forge"));
        assert!(index.archives().is_empty());
        index.record(RecordId(1), "real.forge", RecordId(2));
        assert_eq!(index.archives(), vec!["real.forge"]);
    }

    #[test]
    fn test_record_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ACU.ld");

        let mut index = LocationIndex::new();
        index.record(RecordId(5), "a.forge", RecordId(1));
        index.record(RecordId(5), "a.forge", RecordId(1));
        index.record(RecordId(5), "a.forge", RecordId(9));
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.lookup(RecordId(5), Some("a.forge")),
            Some(Location::new("a.forge", RecordId(1)))
        );
        assert!(index.save(&path).unwrap());

        let data = fs::read(&path).unwrap();
        let header_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        assert_eq!(data.len() - 4 - header_len, ROW_LEN);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lightDict").join("ACU.ld");

        let mut index = LocationIndex::new();
        index.record(RecordId(100), "DataPC.forge", RecordId(1));
        index.record(RecordId(101), "DataPC.forge", RecordId(1));
        index.record(RecordId(100), "DataPC_extra.forge", RecordId(7));
        assert!(index.is_changed());
        assert!(index.save(&path).unwrap());
        assert!(!index.is_changed());

        let mut loaded = LocationIndex::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        for (id, archive) in [
            (100, "DataPC.forge"),
            (101, "DataPC.forge"),
            (100, "DataPC_extra.forge"),
        ] {
            assert_eq!(
                loaded.lookup(RecordId(id), Some(archive)),
                index.lookup(RecordId(id), Some(archive))
            );
        }
        assert_eq!(loaded.entries(), index.entries());
    }

    #[test]
    fn test_save_without_changes_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ACU.ld");

        let mut index = LocationIndex::new();
        assert!(!index.save(&path).unwrap());
        assert!(!path.exists());

        index.record(RecordId(1), "a.forge", RecordId(2));
        assert!(index.save(&path).unwrap());
        assert!(!index.save(&path).unwrap());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = LocationIndex::new();
        index.record(RecordId(1), "a.forge", RecordId(2));
        index.load(dir.path().join("none.ld")).unwrap();
        assert!(index.is_empty());
        assert!(!index.is_changed());
    }

    #[test]
    fn test_load_rejects_partial_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ld");
        let header = br#"{"forge_index":{"a.forge":0}}"#;
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(header.len() as u32).unwrap();
        data.extend_from_slice(header);
        data.extend_from_slice(&[0u8; 30]);
        fs::write(&path, data).unwrap();

        let mut index = LocationIndex::new();
        assert!(matches!(index.load(&path), Err(Error::InvalidIndex(_))));
    }

    #[test]
    fn test_load_keeps_first_row_per_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.ld");
        let header = br#"{"forge_index":{"a.forge":0}}"#;
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(header.len() as u32).unwrap();
        data.extend_from_slice(header);
        for datafile in [3u64, 4] {
            data.write_u64::<LittleEndian>(9).unwrap();
            data.write_u64::<LittleEndian>(0).unwrap();
            data.write_u64::<LittleEndian>(datafile).unwrap();
        }
        fs::write(&path, data).unwrap();

        let mut index = LocationIndex::new();
        index.load(&path).unwrap();
        assert_eq!(
            index.lookup(RecordId(9), Some("a.forge")),
            Some(Location::new("a.forge", RecordId(3)))
        );
    }

    fn write_index_file(path: &Path, header: &[u8], rows: &[(u64, u64, u64)]) {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(header.len() as u32).unwrap();
        data.extend_from_slice(header);
        for (record, archive, datafile) in rows {
            data.write_u64::<LittleEndian>(*record).unwrap();
            data.write_u64::<LittleEndian>(*archive).unwrap();
            data.write_u64::<LittleEndian>(*datafile).unwrap();
        }
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_failed_load_leaves_index_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ACU.ld");
        let header = br#"{"forge_index":{"a.forge":0}}"#;
        write_index_file(&path, header, &[(5, 0, 1), (6, 7, 1)]);

        let mut index = LocationIndex::new();
        index.record(RecordId(8), "b.forge", RecordId(2));
        assert!(matches!(index.load(&path), Err(Error::InvalidIndex(_))));
        assert!(index.is_empty());
        assert_eq!(index.lookup(RecordId(5), None), None);
        assert_eq!(index.lookup(RecordId(8), None), None);
        assert!(index.archives().is_empty());
    }

    #[test]
    fn test_load_rejects_out_of_range_archive_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ACU.ld");
        let header = br#"{"forge_index":{"a.forge":18446744073709551615}}"#;
        write_index_file(&path, header, &[]);

        let mut index = LocationIndex::new();
        assert!(matches!(index.load(&path), Err(Error::InvalidIndex(_))));
        assert!(index.is_empty());

        let header = br#"{"forge_index":{"a.forge":1,"b.forge":1}}"#;
        write_index_file(&path, header, &[]);
        assert!(matches!(index.load(&path), Err(Error::InvalidIndex(_))));
    }
}
