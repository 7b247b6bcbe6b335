//! Entity family and the container layouts around it

use super::{ByteRun, DecodedNode, Decoder, NestedRecord, Reference, TypedReference};
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

const ENTITY_CHILD_CEILING: u32 = 10_000;
const ENTITY_TRAILER_LEN: usize = 43;
const DATA_LAYER_FILTERS: usize = 3;
const NESTED_TABLE_CEILING: u32 = 100;

/// Leading check byte: 0 means two preamble records follow, 3 means none
fn entity_preamble(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<Vec<NestedRecord>> {
    let mut preamble = Vec::new();
    if c.read_check("entity check byte", &[0, 3])? == 0 {
        for _ in 0..2 {
            preamble.push(d.nested(c)?);
        }
    }
    Ok(preamble)
}

fn data_layer_filters(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<Vec<NestedRecord>> {
    let mut filters = Vec::with_capacity(DATA_LAYER_FILTERS);
    for _ in 0..DATA_LAYER_FILTERS {
        filters.push(d.nested(c)?);
    }
    Ok(filters)
}

pub fn entity(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    let preamble = entity_preamble(d, c)?;
    let transform = c.read_matrix()?;

    let count = c.read_count("entity child", Some(ENTITY_CHILD_CEILING))?;
    let mut children = Vec::new();
    for _ in 0..count {
        let offset = c.position();
        let tag = c.read_bytes(2)?;
        if tag != [0x04, 0x00] && tag != [0x00, 0x01] {
            return Err(Error::UnexpectedValue {
                what: "entity child tag",
                value: u16::from_le_bytes([tag[0], tag[1]]) as u64,
                offset,
            });
        }
        children.push(d.nested(c)?);
    }

    let trailer = ByteRun::from(c.read_bytes(ENTITY_TRAILER_LEN)?);
    let data_layer_filters = data_layer_filters(d, c)?;

    let tail = match c.read_check("entity end marker", &[0, 3])? {
        0 => Some(Box::new(d.nested(c)?)),
        _ => None,
    };

    Ok(DecodedNode::Entity {
        preamble,
        transform,
        children,
        trailer,
        data_layer_filters,
        tail,
    })
}

pub fn entity_group(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    let preamble = entity_preamble(d, c)?;
    let transform = c.read_matrix()?;
    let count = c.read_count("entity group child", Some(ENTITY_CHILD_CEILING))?;
    let children = d.nested_list(c, count, 2)?;
    let trailer = ByteRun::from(c.read_bytes(ENTITY_TRAILER_LEN)?);
    let data_layer_filters = data_layer_filters(d, c)?;

    Ok(DecodedNode::EntityGroup {
        preamble,
        transform,
        children,
        trailer,
        data_layer_filters,
    })
}

pub fn mission_root(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    let count = c.read_count("mission reference", None)?;
    let references = d.reference_list(c, count, 2)?;
    let count = c.read_count("mission child", None)?;
    let children = d.nested_list(c, count, 2)?;
    Ok(DecodedNode::MissionRoot {
        references,
        children,
    })
}

pub fn mission_context(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(1)?;
    let count = c.read_count("mission context entry", None)?;
    let mut entries = Vec::new();
    for _ in 0..count {
        c.skip(2)?;
        let reference = d.reference(c)?;
        let type_code = c.read_type_code()?;
        c.skip(4)?;
        entries.push(TypedReference {
            reference,
            type_code,
        });
    }
    Ok(DecodedNode::MissionContext { entries })
}

pub fn reference_group(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(2)?;
    let reference = d.reference(c)?;
    let first = Box::new(d.nested(c)?);
    let second = Box::new(d.nested(c)?);
    let transform = c.read_matrix()?;
    let count = c.read_count("reference group entry", None)?;
    let references = d.reference_list(c, count, 1)?;
    Ok(DecodedNode::ReferenceGroup {
        reference,
        first,
        second,
        transform,
        references,
    })
}

pub fn merged_shape(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    let offset = c.position();
    let lead = c.read_u32()?;
    if lead != 0 {
        return Err(Error::UnexpectedValue {
            what: "merged shape lead count",
            value: lead as u64,
            offset,
        });
    }
    let count = c.read_count("merged shape reference", None)?;
    let references = d.reference_list(c, count, 2)?;

    let count = c.read_count("merged shape transform", None)?;
    let mut transforms = Vec::new();
    for _ in 0..count {
        transforms.push(c.read_matrix()?);
    }

    let count = c.read_count("merged shape child", None)?;
    let children = d.nested_list(c, count, 0)?;
    Ok(DecodedNode::MergedShape {
        references,
        transforms,
        children,
    })
}

pub fn data_block(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    let count = c.read_count("data block entry", None)?;
    let references: Vec<Reference> = d.reference_list(c, count, 2)?;
    Ok(DecodedNode::DataBlock { references })
}

pub fn nested_table(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(2)?;
    let count = c.read_count("nested table child", Some(NESTED_TABLE_CEILING))?;
    let children = d.nested_list(c, count, 0)?;
    let count = c.read_count("nested table row", Some(NESTED_TABLE_CEILING))?;
    let mut rows = Vec::new();
    for _ in 0..count {
        rows.push(ByteRun::from(c.read_bytes(12)?));
    }
    Ok(DecodedNode::NestedTable { children, rows })
}
