//! Query surface for a browse session
//!
//! A [`ForgeBrowser`] owns the resource cache and the options it was built
//! with. It is `Send` but not shareable; wrap it in a single `Mutex` to use
//! it from several threads.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::ForgeArchive;
use crate::cache::{CachedRecord, ResourceCache};
use crate::cursor::{ByteCursor, RECORD_HEADER_LEN};
use crate::decoder::texture::decode_texture;
use crate::decoder::{DecodeOptions, DecodedRecord, Decoder};
use crate::error::{Error, Result};
use crate::options::BrowserOptions;
use crate::types::{RecordId, TypeCode};

pub struct ForgeBrowser {
    options: BrowserOptions,
    cache: ResourceCache,
}

impl ForgeBrowser {
    pub fn new(options: BrowserOptions) -> Self {
        let cache = ResourceCache::new(options.memory_budget());
        Self { options, cache }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn open_archive(&mut self, archive: Box<dyn ForgeArchive>) {
        self.cache.open_archive(archive);
    }

    /// Load `<light_dict_dir>/<game_identifier>.ld`
    pub fn load_index(&mut self) -> Result<()> {
        let path = self.options.light_dict_path();
        self.load_index_from(path)
    }

    pub fn load_index_from<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.cache.load_index(path)
    }

    /// Persist newly learned record locations; call at session end
    pub fn save_index(&mut self) -> Result<bool> {
        self.cache.save_index()
    }

    /// Datafile IDs of an open archive, in archive order
    pub fn list_datafiles(&self, archive: &str) -> Result<Vec<RecordId>> {
        self.cache
            .archives()
            .get(archive)
            .map(|a| a.datafile_ids())
            .ok_or_else(|| Error::ArchiveNotOpen(archive.to_string()))
    }

    /// Decode a record. `Ok(None)` means it could not be located.
    pub fn get_record(
        &mut self,
        id: RecordId,
        hint: Option<&str>,
    ) -> Result<Option<DecodedRecord>> {
        let options = DecodeOptions::from(&self.options);
        let mut decoder = Decoder::new(&mut self.cache, options);
        decoder.decode_record(id, hint)
    }

    /// Raw bytes and metadata of a record
    pub fn raw_record(&mut self, id: RecordId, hint: Option<&str>) -> Result<Option<CachedRecord>> {
        self.cache.get(id, hint)
    }

    /// Rebuild a DDS file from a compiled texture record
    pub fn export_texture(&mut self, id: RecordId, hint: Option<&str>) -> Result<Option<Vec<u8>>> {
        let record = match self.cache.get(id, hint)? {
            Some(record) => record,
            None => return Ok(None),
        };
        let mut cursor = ByteCursor::new(&record.data);
        let header = cursor.read_header()?;
        if header.type_code != TypeCode::TEXTURE {
            return Err(Error::NotATexture {
                id: id.to_string(),
                type_code: header.type_code.to_string(),
            });
        }
        decode_texture(&record.data[RECORD_HEADER_LEN..]).map(Some)
    }

    /// Export a texture into the dump folder as `<name>.dds`
    pub fn save_texture(&mut self, id: RecordId, hint: Option<&str>) -> Result<Option<PathBuf>> {
        let dds = match self.export_texture(id, hint)? {
            Some(dds) => dds,
            None => return Ok(None),
        };
        let name = self
            .cache
            .peek(id)
            .map(|r| r.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| id.to_string());

        fs::create_dir_all(&self.options.dump_folder)?;
        let path = self.options.dump_folder.join(format!("{}.dds", name));
        fs::write(&path, dds)?;
        tracing::info!("Exported texture {} to {}", id, path.display());
        Ok(Some(path))
    }

    /// Drop cached records and reset the index, saving it first if changed
    pub fn clear(&mut self) -> Result<()> {
        self.cache.clear()
    }
}
