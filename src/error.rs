//! Error types for forge-browse

use thiserror::Error;

/// Main error type for forge-browse operations
///
/// A record that cannot be located is not an error: lookups return `Ok(None)`.
/// Record types without a registered decoder are not errors either, they
/// decode to [`DecodedNode::Unsupported`](crate::DecodedNode::Unsupported).
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record truncated: needed {needed} bytes at offset {offset:#x}")]
    Truncated { offset: u64, needed: usize },

    #[error("Unexpected {what} value {value:#x} at offset {offset:#x}")]
    UnexpectedValue {
        what: &'static str,
        value: u64,
        offset: u64,
    },

    #[error("{what} count {count} exceeds ceiling {ceiling} at offset {offset:#x}")]
    CountTooLarge {
        what: &'static str,
        count: u32,
        ceiling: u32,
        offset: u64,
    },

    #[error("Record nesting exceeds maximum depth {0}")]
    DepthExceeded(usize),

    #[error("Unsupported texture format selector: {0}")]
    UnsupportedTextureFormat(u32),

    #[error("Record {id} has type {type_code}, not a compiled texture")]
    NotATexture { id: String, type_code: String },

    #[error("Archive not open: {0}")]
    ArchiveNotOpen(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Invalid location index: {0}")]
    InvalidIndex(String),

    #[error("Invalid record ID: {0}")]
    InvalidRecordId(String),
}

impl Error {
    /// Whether the error means the cursor lost track of the record layout.
    ///
    /// Structural errors abort the record being decoded (and every record
    /// sharing its cursor) but never the browse session.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::Truncated { .. }
                | Error::UnexpectedValue { .. }
                | Error::CountTooLarge { .. }
                | Error::DepthExceeded(_)
        )
    }
}

/// Result type alias for forge-browse operations
pub type Result<T> = std::result::Result<T, Error>;
