//! Visuals, LOD selection and the list containers that hold them

use super::{DecodedNode, Decoder};
use crate::cursor::ByteCursor;
use crate::error::Result;

const LOD_SLOTS: usize = 5;
const MESH_INSTANCE_CEILING: u32 = 20;
const WEIGHTED_LIST_CEILING: u32 = 10_000;

pub fn visual(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(4)?;
    let reference = d.reference(c)?;
    c.skip(1)?;

    let mut children = Vec::new();
    let mut marker;
    loop {
        let child = d.nested(c)?;
        let supported = !child.node.is_unsupported();
        children.push(child);
        marker = c.read_u8()?;
        // past an unsupported child the cursor position is a guess
        if marker != 0 || !supported {
            break;
        }
    }
    while marker != 0 {
        marker = c.read_u8()?;
    }

    let values = c.read_f32_array::<7>()?;
    Ok(DecodedNode::Visual {
        reference,
        children,
        values,
    })
}

pub fn lod_selector(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(1)?;
    let reference = d.reference(c)?;
    let mut slots = Vec::with_capacity(LOD_SLOTS);
    for _ in 0..LOD_SLOTS {
        match c.read_check("LOD slot marker", &[0, 3])? {
            0 => slots.push(Some(d.nested(c)?)),
            _ => slots.push(None),
        }
    }
    Ok(DecodedNode::LodSelector { reference, slots })
}

pub fn mesh_instance_data(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(1)?;
    let reference = d.reference(c)?;
    // holds a compiled mesh instance
    c.skip(40)?;

    let count = c.read_count("mesh instance child", None)?;
    let children = d.nested_list(c, count, 1)?;

    let count = c.read_count("mesh instance transform", Some(MESH_INSTANCE_CEILING))?;
    let mut transforms = Vec::new();
    for _ in 0..count {
        transforms.push(c.read_matrix()?);
    }

    let count = c.read_count("mesh instance extra", Some(MESH_INSTANCE_CEILING))?;
    let extras = d.nested_list(c, count, 0)?;

    Ok(DecodedNode::MeshInstanceData {
        reference,
        children,
        transforms,
        extras,
    })
}

pub fn nested_list(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(1)?;
    let reference = d.reference(c)?;
    c.skip(5)?;
    let count = c.read_count("nested list child", None)?;
    c.skip(1)?;
    let children = d.nested_list(c, count, 0)?;
    c.skip(16)?;
    Ok(DecodedNode::NestedList {
        reference,
        children,
    })
}

pub fn weighted_list(d: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    c.skip(4)?;
    let weight = c.read_f32()?;
    c.skip(1)?;
    let count = c.read_count("weighted list child", Some(WEIGHTED_LIST_CEILING))?;
    let children = d.nested_list(c, count, 0)?;
    c.skip(1)?;
    let last = Box::new(d.nested(c)?);
    c.skip(26)?;
    let reference = d.reference(c)?;
    c.skip(8)?;
    Ok(DecodedNode::WeightedList {
        weight,
        children,
        last,
        reference,
    })
}

pub fn player_referencing_specification(
    d: &mut Decoder<'_>,
    c: &mut ByteCursor<'_>,
) -> Result<DecodedNode> {
    // reads like a count, but exactly one record follows
    let declared_count = c.read_u32()?;
    let child = Box::new(d.nested(c)?);
    Ok(DecodedNode::PlayerReferencingSpecification {
        declared_count,
        child,
    })
}

#[cfg(test)]
mod tests {
    use crate::cache::ResourceCache;
    use crate::decoder::test_support::RecordBuilder;
    use crate::decoder::{DecodeOptions, DecodedNode, DecodedRecord, Decoder};
    use crate::error::{Error, Result};
    use crate::types::{RecordId, TypeCode};

    fn decode(data: &[u8]) -> Result<DecodedRecord> {
        let mut cache = ResourceCache::new(0);
        Decoder::new(&mut cache, DecodeOptions::default()).decode_bytes(data, "test")
    }

    fn seven_floats(b: &mut RecordBuilder) {
        for k in 0..7 {
            b.f32(k as f32);
        }
    }

    #[test]
    fn test_visual_continues_while_marker_zero() {
        let mut b = RecordBuilder::record(1, TypeCode::VISUAL);
        b.zeros(4).id(0x99).u8(0);
        b.nested(0x10, TypeCode::MARKER).u8(0);
        b.nested(0x11, TypeCode::DATA_LAYER_FILTER).u32(4).u8(0);
        b.nested(0x12, TypeCode::MARKER).u8(3);
        // non-zero markers are skipped up to the next zero
        b.bytes(&[5, 6, 0]);
        seven_floats(&mut b);

        let record = decode(&b.build()).unwrap();
        assert_eq!(record.trailing, 0);
        match record.node {
            DecodedNode::Visual {
                reference,
                children,
                values,
            } => {
                assert_eq!(reference.id, RecordId(0x99));
                assert_eq!(children.len(), 3);
                assert_eq!(values[6], 6.0);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_visual_stops_after_unsupported_child() {
        let mut b = RecordBuilder::record(1, TypeCode::VISUAL);
        b.zeros(4).id(0x99).u8(0);
        b.nested(0x10, TypeCode(0x0BAD_0BAD)).u8(0);
        seven_floats(&mut b);

        let record = decode(&b.build()).unwrap();
        assert_eq!(record.trailing, 0);
        match record.node {
            DecodedNode::Visual { children, .. } => {
                assert_eq!(children.len(), 1);
                assert!(children[0].node.is_unsupported());
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_lod_selector_slots() {
        let mut b = RecordBuilder::record(1, TypeCode::LOD_SELECTOR);
        b.u8(0).id(0x77);
        b.u8(0).nested(0x20, TypeCode::MARKER);
        b.u8(3);
        b.u8(0).nested(0x21, TypeCode::MARKER);
        b.u8(3).u8(3);

        let record = decode(&b.build()).unwrap();
        assert_eq!(record.trailing, 0);
        match record.node {
            DecodedNode::LodSelector { slots, .. } => {
                let filled: Vec<bool> = slots.iter().map(Option::is_some).collect();
                assert_eq!(filled, vec![true, false, true, false, false]);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_lod_selector_bad_marker() {
        let mut b = RecordBuilder::record(1, TypeCode::LOD_SELECTOR);
        b.u8(0).id(0x77).u8(3).u8(1);
        assert!(matches!(
            decode(&b.build()),
            Err(Error::UnexpectedValue { value: 1, offset: 24, .. })
        ));
    }

    #[test]
    fn test_mesh_instance_data() {
        let mut b = RecordBuilder::record(1, TypeCode::MESH_INSTANCE_DATA);
        b.u8(0).id(0x88).zeros(40);
        b.u32(2).u8(0).nested(0x30, TypeCode::MARKER).u8(0).nested(0x31, TypeCode::MARKER);
        b.u32(1).identity();
        b.u32(1).nested(0x32, TypeCode::DATA_LAYER_FILTER).u32(0);

        let record = decode(&b.build()).unwrap();
        assert_eq!(record.trailing, 0);
        match record.node {
            DecodedNode::MeshInstanceData {
                children,
                transforms,
                extras,
                ..
            } => {
                assert_eq!(children.len(), 2);
                assert_eq!(transforms[0][3][3], 1.0);
                assert_eq!(extras.len(), 1);
            }
            other => panic!("unexpected node {:?}", other),
        }

        let mut b = RecordBuilder::record(1, TypeCode::MESH_INSTANCE_DATA);
        b.u8(0).id(0x88).zeros(40).u32(0).u32(21);
        assert!(matches!(
            decode(&b.build()),
            Err(Error::CountTooLarge { count: 21, ceiling: 20, .. })
        ));
    }

    #[test]
    fn test_nested_list() {
        let mut b = RecordBuilder::record(1, TypeCode::NESTED_LIST);
        b.u8(0).id(0x40).zeros(5).u32(2).u8(0);
        b.nested(0x41, TypeCode::MARKER).nested(0x42, TypeCode::MARKER);
        b.zeros(16);
        let record = decode(&b.build()).unwrap();
        assert_eq!(record.trailing, 0);
        match record.node {
            DecodedNode::NestedList { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_weighted_list() {
        let mut b = RecordBuilder::record(1, TypeCode::WEIGHTED_LIST);
        b.zeros(4).f32(0.25).u8(0).u32(1).nested(0x50, TypeCode::MARKER);
        b.u8(0).nested(0x51, TypeCode::EVENT_LISTENER).zeros(2);
        b.zeros(26).id(0x52).zeros(8);
        let record = decode(&b.build()).unwrap();
        assert_eq!(record.trailing, 0);
        match record.node {
            DecodedNode::WeightedList {
                weight,
                children,
                last,
                reference,
            } => {
                assert_eq!(weight, 0.25);
                assert_eq!(children.len(), 1);
                assert_eq!(last.id, RecordId(0x51));
                assert_eq!(reference.id, RecordId(0x52));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_player_referencing_specification_reads_one_child() {
        let mut b = RecordBuilder::record(1, TypeCode::PLAYER_REFERENCING_SPECIFICATION);
        b.u32(4).nested(0x60, TypeCode::MARKER);
        let record = decode(&b.build()).unwrap();
        assert_eq!(record.trailing, 0);
        match record.node {
            DecodedNode::PlayerReferencingSpecification {
                declared_count,
                child,
            } => {
                assert_eq!(declared_count, 4);
                assert_eq!(child.id, RecordId(0x60));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }
}
