//! Type dispatch table
//!
//! Maps each known type code to its display name and decode routine. Codes
//! missing from the table decode to [`DecodedNode::Unsupported`].

use super::{entity, flat, texture, visual};
use super::{DecodedNode, Decoder};
use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::types::TypeCode;

/// Decode routine for one record layout
pub type DecodeFn = fn(&mut Decoder<'_>, &mut ByteCursor<'_>) -> Result<DecodedNode>;

pub struct TypeEntry {
    pub code: TypeCode,
    pub name: &'static str,
    pub decode: DecodeFn,
}

const fn entry(code: TypeCode, name: &'static str, decode: DecodeFn) -> TypeEntry {
    TypeEntry { code, name, decode }
}

pub static REGISTRY: &[TypeEntry] = &[
    entry(TypeCode::ENTITY, "Entity", entity::entity),
    entry(TypeCode::ENTITY_GROUP, "EntityGroup", entity::entity_group),
    entry(TypeCode::MISSION_ROOT, "MissionRoot", entity::mission_root),
    entry(TypeCode::MISSION_CONTEXT, "MissionContext", entity::mission_context),
    entry(TypeCode::REFERENCE_GROUP, "ReferenceGroup", entity::reference_group),
    entry(TypeCode::MERGED_SHAPE, "MergedShape", entity::merged_shape),
    entry(TypeCode::COLLISION_FILTER_INFO, "CollisionFilterInfo", flat::collision_filter_info),
    entry(TypeCode::DATA_BLOCK, "DataBlock", entity::data_block),
    entry(TypeCode::VISUAL, "Visual", visual::visual),
    entry(TypeCode::LOD_SELECTOR, "LodSelector", visual::lod_selector),
    entry(TypeCode::MESH_INSTANCE_DATA, "MeshInstanceData", visual::mesh_instance_data),
    entry(TypeCode::REFERENCE_LIST, "ReferenceList", flat::reference_list),
    entry(TypeCode::REFERENCE_TRIPLE, "ReferenceTriple", flat::reference_triple),
    entry(TypeCode::REFERENCE_PAIR, "ReferencePair", flat::reference_pair),
    entry(TypeCode(0xBE71_1F06), "Opaque", flat::opaque3),
    entry(TypeCode(0x2AA1_79AB), "Opaque", flat::opaque3),
    entry(TypeCode::FLAGGED_REFERENCE, "FlaggedReference", flat::flagged_reference),
    entry(TypeCode::EVENT_LISTENER, "EventListener", flat::event_listener),
    entry(TypeCode::BOUNDING_VOLUME, "BoundingVolume", flat::bounding_volume),
    entry(TypeCode::ENTITY_DESCRIPTOR, "EntityDescriptor", flat::entity_descriptor),
    entry(TypeCode::DATA_LAYER_FILTER, "DataLayerFilter", flat::data_layer_filter),
    entry(TypeCode::NESTED_TABLE, "NestedTable", entity::nested_table),
    entry(TypeCode::MARKER, "Marker", flat::marker),
    entry(TypeCode(0x344F_A659), "Opaque", flat::opaque29),
    entry(TypeCode::TRANSFORM, "Transform", flat::transform),
    entry(TypeCode(0x709F_B9D4), "Opaque", flat::opaque13),
    entry(TypeCode::NESTED_LIST, "NestedList", visual::nested_list),
    entry(TypeCode::WEIGHTED_LIST, "WeightedList", visual::weighted_list),
    entry(
        TypeCode::PLAYER_REFERENCING_SPECIFICATION,
        "PlayerReferencingSpecification",
        visual::player_referencing_specification,
    ),
    entry(TypeCode::SOUND_EMITTER, "SoundEmitter", flat::sound_emitter),
    entry(TypeCode::TEXTURE, "CompiledTextureMap", texture::texture),
];

pub fn lookup(code: TypeCode) -> Option<&'static TypeEntry> {
    REGISTRY.iter().find(|entry| entry.code == code)
}

/// Resource-type label for a type code
pub fn label(code: TypeCode) -> &'static str {
    lookup(code).map_or("Unknown", |entry| entry.name)
}
