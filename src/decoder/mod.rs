//! Record decoder
//!
//! Decoding walks a record's bytes with a [`ByteCursor`], dispatching on the
//! type code through the static [`registry`]. Nested records are decoded
//! inline on the same cursor. References are plain IDs; when
//! `follow_references` is on they are fetched through the [`ResourceCache`]
//! and decoded on a fresh cursor, and any failure stays inside the
//! reference. A reference back to a record that is still being decoded is
//! not followed.

mod entity;
mod flat;
mod node;
pub mod registry;
pub mod texture;
mod visual;

pub use node::{
    ByteRun, DecodedNode, DecodedRecord, NestedRecord, Reference, ReferenceTarget, TextureInfo,
    TypedReference,
};
pub use registry::{DecodeFn, TypeEntry};

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cache::ResourceCache;
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::options::BrowserOptions;
use crate::types::{RecordId, TypeCode};

/// Bytes of a compiled texture body kept in its type sample
const TEXTURE_SAMPLE_LEN: usize = 116;

/// Decoding settings taken from [`BrowserOptions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub follow_references: bool,
    pub max_depth: usize,
    pub diagnostic: bool,
    /// Append a hex sample of every decoded record to `<dir>/<TYPE>`
    pub type_samples: Option<PathBuf>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::from(&BrowserOptions::default())
    }
}

impl From<&BrowserOptions> for DecodeOptions {
    fn from(options: &BrowserOptions) -> Self {
        Self {
            follow_references: options.follow_references,
            max_depth: options.max_depth,
            diagnostic: options.diagnostic,
            type_samples: options
                .diagnostic
                .then(|| options.dump_folder.join("fileTypes")),
        }
    }
}

pub struct Decoder<'a> {
    cache: &'a mut ResourceCache,
    options: DecodeOptions,
    depth: usize,
    archive_hint: Option<String>,
    /// Records whose decode has started but not finished, outermost first
    in_progress: Vec<RecordId>,
}

impl<'a> Decoder<'a> {
    pub fn new(cache: &'a mut ResourceCache, options: DecodeOptions) -> Self {
        Self {
            cache,
            options,
            depth: 0,
            archive_hint: None,
            in_progress: Vec::new(),
        }
    }

    /// Decode a record body of type `type_code` starting at the cursor
    pub fn decode(
        &mut self,
        cursor: &mut ByteCursor<'_>,
        type_code: TypeCode,
    ) -> Result<DecodedNode> {
        if let Some(dir) = &self.options.type_samples {
            write_type_sample(dir, cursor, type_code);
        }
        let entry = match registry::lookup(type_code) {
            Some(entry) => entry,
            None => {
                tracing::warn!("{} not currently supported", type_code);
                cursor.note(format_args!("{} not currently supported", type_code));
                return Ok(DecodedNode::Unsupported);
            }
        };
        if self.depth >= self.options.max_depth {
            return Err(Error::DepthExceeded(self.options.max_depth));
        }

        self.depth += 1;
        cursor.indent();
        cursor.note(format_args!("{} ({})", entry.name, type_code));
        let result = (entry.decode)(self, cursor);
        cursor.outdent();
        self.depth -= 1;
        result
    }

    /// Fetch a record through the cache and decode it.
    ///
    /// `Ok(None)` means the record could not be located.
    pub fn decode_record(
        &mut self,
        id: RecordId,
        hint: Option<&str>,
    ) -> Result<Option<DecodedRecord>> {
        let record = match self.cache.get(id, hint)? {
            Some(record) => record,
            None => return Ok(None),
        };
        let data = record.data.clone();
        let mut cursor = ByteCursor::with_diagnostic(&data, self.options.diagnostic);
        let header = cursor.read_header()?;

        let previous = self.archive_hint.replace(record.archive.clone());
        self.in_progress.push(id);
        let result = self.decode(&mut cursor, header.type_code);
        self.in_progress.pop();
        self.archive_hint = previous;

        Ok(Some(DecodedRecord {
            id: header.id,
            type_code: header.type_code,
            name: record.name,
            resource_type: registry::label(header.type_code),
            node: result?,
            trailing: cursor.remaining(),
        }))
    }

    /// Decode a standalone record buffer, header included
    pub fn decode_bytes(&mut self, data: &[u8], name: &str) -> Result<DecodedRecord> {
        let mut cursor = ByteCursor::with_diagnostic(data, self.options.diagnostic);
        let header = cursor.read_header()?;

        self.in_progress.push(header.id);
        let result = self.decode(&mut cursor, header.type_code);
        self.in_progress.pop();

        Ok(DecodedRecord {
            id: header.id,
            type_code: header.type_code,
            name: name.to_string(),
            resource_type: registry::label(header.type_code),
            node: result?,
            trailing: cursor.remaining(),
        })
    }

    /// Nested record: ID, type code, then the body inline
    pub(crate) fn nested(&mut self, cursor: &mut ByteCursor<'_>) -> Result<NestedRecord> {
        let id = cursor.read_id()?;
        let type_code = cursor.read_type_code()?;
        let node = self.decode(cursor, type_code)?;
        Ok(NestedRecord {
            id,
            type_code,
            node,
        })
    }

    /// `count` nested records, each preceded by `separator` opaque bytes
    pub(crate) fn nested_list(
        &mut self,
        cursor: &mut ByteCursor<'_>,
        count: u32,
        separator: usize,
    ) -> Result<Vec<NestedRecord>> {
        let mut children = Vec::new();
        for _ in 0..count {
            cursor.skip(separator)?;
            children.push(self.nested(cursor)?);
        }
        Ok(children)
    }

    /// Reference: an ID, followed through the cache if enabled
    pub(crate) fn reference(&mut self, cursor: &mut ByteCursor<'_>) -> Result<Reference> {
        let id = cursor.read_id()?;
        if cursor.is_diagnostic() {
            self.describe_reference(cursor, id);
        }
        if !self.options.follow_references {
            return Ok(Reference::unresolved(id));
        }
        let target = self.follow(id);
        Ok(Reference { id, target })
    }

    /// `count` references, each preceded by `separator` opaque bytes
    pub(crate) fn reference_list(
        &mut self,
        cursor: &mut ByteCursor<'_>,
        count: u32,
        separator: usize,
    ) -> Result<Vec<Reference>> {
        let mut references = Vec::new();
        for _ in 0..count {
            cursor.skip(separator)?;
            references.push(self.reference(cursor)?);
        }
        Ok(references)
    }

    fn follow(&mut self, id: RecordId) -> ReferenceTarget {
        if id.is_null() {
            return ReferenceTarget::Missing;
        }
        if self.in_progress.contains(&id) {
            tracing::debug!("{} is already being decoded, not following", id);
            return ReferenceTarget::Cycle;
        }
        let hint = self.archive_hint.clone();
        match self.decode_record(id, hint.as_deref()) {
            Ok(Some(record)) => ReferenceTarget::Decoded(Box::new(record)),
            Ok(None) => ReferenceTarget::Missing,
            Err(e) => {
                tracing::warn!("Failed to decode referenced record {}: {}", id, e);
                ReferenceTarget::Failed(e.to_string())
            }
        }
    }

    fn describe_reference(&mut self, cursor: &ByteCursor<'_>, id: RecordId) {
        let hint = self.archive_hint.clone();
        match self.cache.get(id, hint.as_deref()) {
            Ok(Some(record)) => cursor.note(format_args!(
                "-> {}\t\t{}",
                record.name,
                registry::label(record.type_code)
            )),
            _ => cursor.note("-> Unknown File ID"),
        }
    }
}

/// Append the record (ID and type code onwards) as one hex line to `<dir>/<TYPE>`
fn write_type_sample(dir: &Path, cursor: &ByteCursor<'_>, type_code: TypeCode) {
    let mut sample = cursor.tail_from(12);
    if type_code == TypeCode::TEXTURE {
        sample = &sample[..sample.len().min(12 + TEXTURE_SAMPLE_LEN)];
    }
    let path = dir.join(type_code.to_string());
    let written = fs::create_dir_all(dir).and_then(|_| {
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", ByteRun::from(sample))
    });
    if let Err(e) = written {
        tracing::warn!("Failed to write type sample {}: {}", path.display(), e);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use byteorder::{LittleEndian, WriteBytesExt};

    use crate::types::{RecordId, TypeCode};

    /// Little helper for building record bytes in tests
    #[derive(Default)]
    pub struct RecordBuilder {
        pub data: Vec<u8>,
    }

    impl RecordBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Start a top-level record with its 14-byte header
        pub fn record(id: u64, type_code: TypeCode) -> Self {
            let mut builder = Self::new();
            builder.bytes(&[0x01, 0x00]);
            builder.id(id);
            builder.type_code(type_code);
            builder
        }

        pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
            self.data.extend_from_slice(bytes);
            self
        }

        pub fn zeros(&mut self, len: usize) -> &mut Self {
            self.data.extend(std::iter::repeat(0).take(len));
            self
        }

        pub fn u8(&mut self, value: u8) -> &mut Self {
            self.data.push(value);
            self
        }

        pub fn u32(&mut self, value: u32) -> &mut Self {
            self.data.write_u32::<LittleEndian>(value).unwrap();
            self
        }

        pub fn f32(&mut self, value: f32) -> &mut Self {
            self.data.write_f32::<LittleEndian>(value).unwrap();
            self
        }

        pub fn id(&mut self, id: u64) -> &mut Self {
            self.data.write_u64::<LittleEndian>(RecordId(id).0).unwrap();
            self
        }

        pub fn type_code(&mut self, code: TypeCode) -> &mut Self {
            self.data.write_u32::<LittleEndian>(code.0).unwrap();
            self
        }

        /// Nested record header: ID and type code
        pub fn nested(&mut self, id: u64, code: TypeCode) -> &mut Self {
            self.id(id).type_code(code)
        }

        pub fn matrix(&mut self, values: [f32; 16]) -> &mut Self {
            for v in values {
                self.f32(v);
            }
            self
        }

        pub fn identity(&mut self) -> &mut Self {
            self.matrix([
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
            ])
        }

        pub fn build(&self) -> Vec<u8> {
            self.data.clone()
        }
    }
}
