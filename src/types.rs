//! Identifier types shared by every layer
//!
//! Both identifiers are stored little-endian in record bytes. They are shown
//! as upper-case hex of the numeric value, which is the big-endian reading of
//! the stored bytes.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// 64-bit record identifier
///
/// IDs are referenced globally but are not guaranteed unique: the same ID may
/// appear in several datafiles, in which case the contents are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId(pub u64);

impl RecordId {
    /// The null reference
    pub const NULL: RecordId = RecordId(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        RecordId(u64::from_le_bytes(bytes))
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// Parses the hex form used by the browser search box.
///
/// Whitespace anywhere in the input is ignored and case does not matter, so
/// `"00 00 01 4a 2b"` and `"0000014A2B"` are the same ID.
impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let digits = compact
            .strip_prefix("0x")
            .or_else(|| compact.strip_prefix("0X"))
            .unwrap_or(&compact);
        if digits.is_empty() || digits.len() > 16 {
            return Err(Error::InvalidRecordId(s.to_string()));
        }
        u64::from_str_radix(digits, 16)
            .map(RecordId)
            .map_err(|_| Error::InvalidRecordId(s.to_string()))
    }
}

impl RecordId {
    /// Parse a comma-separated list of hex IDs, skipping empty items
    pub fn parse_list(s: &str) -> Result<Vec<RecordId>, Error> {
        s.split(',')
            .filter(|item| !item.trim().is_empty())
            .map(str::parse)
            .collect()
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        RecordId(value)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Record type code selecting the decode routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TypeCode(pub u32);

impl TypeCode {
    pub const ENTITY: TypeCode = TypeCode(0x0984_415E);
    pub const ENTITY_GROUP: TypeCode = TypeCode(0x3F74_2D26);
    pub const MISSION_ROOT: TypeCode = TypeCode(0xE654_5731);
    pub const MISSION_CONTEXT: TypeCode = TypeCode(0x414F_F9F7);
    pub const REFERENCE_GROUP: TypeCode = TypeCode(0x1CBD_E084);
    pub const MERGED_SHAPE: TypeCode = TypeCode(0x2D67_5BA2);
    pub const COLLISION_FILTER_INFO: TypeCode = TypeCode(0x43EF_99C2);
    pub const DATA_BLOCK: TypeCode = TypeCode(0xAC2B_BF68);
    pub const VISUAL: TypeCode = TypeCode(0xEC65_8D29);
    pub const LOD_SELECTOR: TypeCode = TypeCode(0x0143_7462);
    pub const MESH_INSTANCE_DATA: TypeCode = TypeCode(0x536E_963B);
    pub const REFERENCE_LIST: TypeCode = TypeCode(0x7270_FC9D);
    pub const REFERENCE_TRIPLE: TypeCode = TypeCode(0x995B_FBF5);
    pub const REFERENCE_PAIR: TypeCode = TypeCode(0x132F_E22D);
    pub const FLAGGED_REFERENCE: TypeCode = TypeCode(0xB8B0_8A89);
    pub const EVENT_LISTENER: TypeCode = TypeCode(0x2E8B_5553);
    pub const BOUNDING_VOLUME: TypeCode = TypeCode(0x4AEC_3476);
    pub const ENTITY_DESCRIPTOR: TypeCode = TypeCode(0x6012_1A9E);
    pub const DATA_LAYER_FILTER: TypeCode = TypeCode(0xDB1D_406E);
    pub const NESTED_TABLE: TypeCode = TypeCode(0x55AF_1C3E);
    pub const MARKER: TypeCode = TypeCode(0x554C_614C);
    pub const TRANSFORM: TypeCode = TypeCode(0x788B_AA0D);
    pub const NESTED_LIST: TypeCode = TypeCode(0x7511_6750);
    pub const WEIGHTED_LIST: TypeCode = TypeCode(0xC2B1_A31C);
    pub const PLAYER_REFERENCING_SPECIFICATION: TypeCode = TypeCode(0x9E1C_D34A);
    pub const SOUND_EMITTER: TypeCode = TypeCode(0x0423_BD15);
    pub const TEXTURE: TypeCode = TypeCode(0xA2B7_E917);

    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        TypeCode(u32::from_le_bytes(bytes))
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl FromStr for TypeCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        if digits.len() != 8 {
            return Err(Error::InvalidRecordId(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(TypeCode)
            .map_err(|_| Error::InvalidRecordId(s.to_string()))
    }
}

impl Serialize for TypeCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_display_is_big_endian_hex() {
        let id = RecordId::from_le_bytes([0x2B, 0x4A, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(id.to_string(), "0000000000014A2B");
    }

    #[test]
    fn test_record_id_parse_ignores_spaces_and_case() {
        let a: RecordId = "00 00 01 4a 2b".parse().unwrap();
        let b: RecordId = "0x14A2B".parse().unwrap();
        assert_eq!(a, RecordId(0x14A2B));
        assert_eq!(a, b);
        assert!("".parse::<RecordId>().is_err());
        assert!("xyz".parse::<RecordId>().is_err());
        assert!("1234567890ABCDEF0".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_record_id_list() {
        let ids = RecordId::parse_list("14A2B, 00 00 00 01 ,,ff").unwrap();
        assert_eq!(ids, vec![RecordId(0x14A2B), RecordId(1), RecordId(0xFF)]);
        assert!(RecordId::parse_list("1,zz").is_err());
    }

    #[test]
    fn test_type_code_display() {
        let code = TypeCode::from_le_bytes([0x5E, 0x41, 0x84, 0x09]);
        assert_eq!(code, TypeCode::ENTITY);
        assert_eq!(code.to_string(), "0984415E");
        assert_eq!("A2B7E917".parse::<TypeCode>().unwrap(), TypeCode::TEXTURE);
    }
}
