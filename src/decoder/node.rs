//! Decoded record trees

use serde::{Serialize, Serializer};
use std::fmt;

use crate::cursor::Matrix4;
use crate::types::{RecordId, TypeCode};

/// Opaque bytes kept as read; serialised as spaced upper-case hex
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ByteRun(pub Vec<u8>);

impl From<&[u8]> for ByteRun {
    fn from(bytes: &[u8]) -> Self {
        ByteRun(bytes.to_vec())
    }
}

impl fmt::Display for ByteRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ByteRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteRun({})", self)
    }
}

impl Serialize for ByteRun {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A record whose body is stored inline in its parent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedRecord {
    pub id: RecordId,
    pub type_code: TypeCode,
    pub node: DecodedNode,
}

/// A record referred to by ID only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub id: RecordId,
    #[serde(skip_serializing_if = "ReferenceTarget::is_not_followed")]
    pub target: ReferenceTarget,
}

impl Reference {
    pub fn unresolved(id: RecordId) -> Self {
        Self {
            id,
            target: ReferenceTarget::NotFollowed,
        }
    }
}

/// Outcome of following a reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum ReferenceTarget {
    NotFollowed,
    /// Null reference, or the record could not be located
    Missing,
    Decoded(Box<DecodedRecord>),
    /// The record is already being decoded further up the chain
    Cycle,
    /// The referenced record was found but did not decode
    Failed(String),
}

impl ReferenceTarget {
    pub fn is_not_followed(&self) -> bool {
        matches!(self, ReferenceTarget::NotFollowed)
    }
}

/// A reference paired with the type code stored next to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedReference {
    pub reference: Reference,
    pub type_code: TypeCode,
}

/// A top-level decoded record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    pub id: RecordId,
    pub type_code: TypeCode,
    pub name: String,
    /// Label from the dispatch table, `"Unknown"` when unregistered
    pub resource_type: &'static str,
    pub node: DecodedNode,
    /// Bytes left after the body was decoded
    pub trailing: usize,
}

/// Summary of a compiled texture map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: u32,
    pub mip_count: u32,
    pub four_cc: String,
    pub payload_len: u32,
}

/// Structured result of decoding one record body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum DecodedNode {
    Entity {
        preamble: Vec<NestedRecord>,
        transform: Matrix4,
        children: Vec<NestedRecord>,
        trailer: ByteRun,
        data_layer_filters: Vec<NestedRecord>,
        tail: Option<Box<NestedRecord>>,
    },
    EntityGroup {
        preamble: Vec<NestedRecord>,
        transform: Matrix4,
        children: Vec<NestedRecord>,
        trailer: ByteRun,
        data_layer_filters: Vec<NestedRecord>,
    },
    MissionRoot {
        references: Vec<Reference>,
        children: Vec<NestedRecord>,
    },
    MissionContext {
        entries: Vec<TypedReference>,
    },
    ReferenceGroup {
        reference: Reference,
        first: Box<NestedRecord>,
        second: Box<NestedRecord>,
        transform: Matrix4,
        references: Vec<Reference>,
    },
    MergedShape {
        references: Vec<Reference>,
        transforms: Vec<Matrix4>,
        children: Vec<NestedRecord>,
    },
    CollisionFilterInfo {
        data: ByteRun,
    },
    DataBlock {
        references: Vec<Reference>,
    },
    Visual {
        reference: Reference,
        children: Vec<NestedRecord>,
        values: [f32; 7],
    },
    LodSelector {
        reference: Reference,
        slots: Vec<Option<NestedRecord>>,
    },
    MeshInstanceData {
        reference: Reference,
        children: Vec<NestedRecord>,
        transforms: Vec<Matrix4>,
        extras: Vec<NestedRecord>,
    },
    ReferenceList {
        references: Vec<Reference>,
    },
    ReferenceTriple {
        references: Vec<Reference>,
    },
    ReferencePair {
        first: Reference,
        second: Reference,
        values: [f32; 9],
    },
    Opaque {
        data: ByteRun,
    },
    FlaggedReference {
        reference: Reference,
    },
    EventListener {
        data: ByteRun,
    },
    BoundingVolume {
        bounds: [f32; 6],
        flags: u32,
    },
    EntityDescriptor {
        data: ByteRun,
    },
    DataLayerFilter {
        value: u32,
    },
    NestedTable {
        children: Vec<NestedRecord>,
        rows: Vec<ByteRun>,
    },
    Marker,
    Transform {
        transform: Matrix4,
    },
    NestedList {
        reference: Reference,
        children: Vec<NestedRecord>,
    },
    WeightedList {
        weight: f32,
        children: Vec<NestedRecord>,
        last: Box<NestedRecord>,
        reference: Reference,
    },
    PlayerReferencingSpecification {
        declared_count: u32,
        child: Box<NestedRecord>,
    },
    SoundEmitter {
        data: ByteRun,
    },
    Texture(TextureInfo),
    /// No decode routine is registered for the type code
    Unsupported,
}

impl DecodedNode {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DecodedNode::Unsupported)
    }

    /// Inline nested records in layout order
    pub fn nested(&self) -> Vec<&NestedRecord> {
        use DecodedNode::*;
        match self {
            Entity {
                preamble,
                children,
                data_layer_filters,
                tail,
                ..
            } => preamble
                .iter()
                .chain(children)
                .chain(data_layer_filters)
                .chain(tail.as_deref())
                .collect(),
            EntityGroup {
                preamble,
                children,
                data_layer_filters,
                ..
            } => preamble
                .iter()
                .chain(children)
                .chain(data_layer_filters)
                .collect(),
            ReferenceGroup { first, second, .. } => vec![first.as_ref(), second.as_ref()],
            MissionRoot { children, .. }
            | MergedShape { children, .. }
            | Visual { children, .. }
            | NestedTable { children, .. }
            | NestedList { children, .. } => children.iter().collect(),
            LodSelector { slots, .. } => slots.iter().flatten().collect(),
            MeshInstanceData {
                children, extras, ..
            } => children.iter().chain(extras).collect(),
            WeightedList { children, last, .. } => {
                children.iter().chain(Some(last.as_ref())).collect()
            }
            PlayerReferencingSpecification { child, .. } => vec![child.as_ref()],
            _ => Vec::new(),
        }
    }

    /// References held directly by this node
    pub fn references(&self) -> Vec<&Reference> {
        use DecodedNode::*;
        match self {
            MissionRoot { references, .. }
            | MergedShape { references, .. }
            | DataBlock { references }
            | ReferenceList { references }
            | ReferenceTriple { references } => references.iter().collect(),
            MissionContext { entries } => entries.iter().map(|e| &e.reference).collect(),
            ReferenceGroup {
                reference,
                references,
                ..
            } => std::iter::once(reference).chain(references).collect(),
            ReferencePair { first, second, .. } => vec![first, second],
            Visual { reference, .. }
            | LodSelector { reference, .. }
            | MeshInstanceData { reference, .. }
            | FlaggedReference { reference }
            | NestedList { reference, .. }
            | WeightedList { reference, .. } => vec![reference],
            _ => Vec::new(),
        }
    }
}
