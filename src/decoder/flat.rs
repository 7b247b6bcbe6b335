//! Fixed layouts: opaque runs, short reference lists and plain values

use super::{ByteRun, DecodedNode, Decoder};
use crate::cursor::ByteCursor;
use crate::error::Result;

fn run(c: &mut ByteCursor<'_>, len: usize) -> Result<ByteRun> {
    Ok(ByteRun::from(c.read_bytes(len)?))
}

pub fn collision_filter_info(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    Ok(DecodedNode::CollisionFilterInfo { data: run(c, 15)? })
}

pub fn reference_list(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    let count = c.read_count("reference list entry", None)?;
    let references = d.reference_list(c, count, 1)?;
    Ok(DecodedNode::ReferenceList { references })
}

pub fn reference_triple(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    let mut references = Vec::with_capacity(3);
    for separator in [1, 1, 2] {
        c.skip(separator)?;
        references.push(d.reference(c)?);
    }
    Ok(DecodedNode::ReferenceTriple { references })
}

pub fn reference_pair(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(3)?;
    let first = d.reference(c)?;
    c.skip(5)?;
    let second = d.reference(c)?;
    let values = c.read_f32_array::<9>()?;
    Ok(DecodedNode::ReferencePair {
        first,
        second,
        values,
    })
}

pub fn opaque3(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    Ok(DecodedNode::Opaque { data: run(c, 3)? })
}

pub fn opaque13(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    Ok(DecodedNode::Opaque { data: run(c, 13)? })
}

pub fn opaque29(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    Ok(DecodedNode::Opaque { data: run(c, 29)? })
}

pub fn flagged_reference(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(1)?;
    let reference = d.reference(c)?;
    c.skip(1)?;
    Ok(DecodedNode::FlaggedReference { reference })
}

pub fn event_listener(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    Ok(DecodedNode::EventListener { data: run(c, 2)? })
}

pub fn bounding_volume(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    let bounds = c.read_f32_array::<6>()?;
    let flags = c.read_u32()?;
    Ok(DecodedNode::BoundingVolume { bounds, flags })
}

pub fn entity_descriptor(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    Ok(DecodedNode::EntityDescriptor { data: run(c, 19)? })
}

pub fn data_layer_filter(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    // non-zero values are sometimes followed by more data, layout unknown
    let value = c.read_u32()?;
    Ok(DecodedNode::DataLayerFilter { value })
}

pub fn marker(_: &mut Decoder<'_>, _: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    Ok(DecodedNode::Marker)
}

pub fn transform(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    Ok(DecodedNode::Transform {
        transform: c.read_matrix()?,
    })
}

pub fn sound_emitter(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    Ok(DecodedNode::SoundEmitter { data: run(c, 24)? })
}
