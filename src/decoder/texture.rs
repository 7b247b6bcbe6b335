//! Compiled texture maps and DDS reconstruction
//!
//! The compiled texture body (after the record header) is:
//!
//! ```text
//! width u32, height u32, depth u32, format u32, 8 reserved bytes,
//! mip count u32, 84 skipped bytes, linear size u32, payload
//! ```
//!
//! The fields are passed through verbatim into a standard DDS header; the
//! format selector picks the FourCC.

use byteorder::{LittleEndian, WriteBytesExt};

use super::{DecodedNode, Decoder, TextureInfo};
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

pub const DDS_MAGIC: &[u8; 4] = b"DDS ";

const DDS_HEADER_SIZE: u32 = 124;
const DDS_PIXELFORMAT_SIZE: u32 = 32;

// CAPS | HEIGHT | WIDTH | PIXELFORMAT | MIPMAPCOUNT | LINEARSIZE
const DDSD_FLAGS: u32 = 0x1 | 0x2 | 0x4 | 0x1000 | 0x20000 | 0x80000;
// COMPLEX | TEXTURE | MIPMAP
const DDSCAPS: u32 = 0x8 | 0x1000 | 0x40_0000;

const DDPF_ALPHAPIXELS: u32 = 0x40;
const DDPF_FOURCC: u32 = 0x04;

/// DXGI_FORMAT_BC7_UNORM, 2D texture, one array element
const DX10_HEADER: [u8; 20] = [
    0x62, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];

/// FourCC for a format selector, and whether the DX10 extension follows
fn four_cc(format: u32) -> Result<(&'static [u8; 4], bool)> {
    match format {
        0..=3 | 7 => Ok((b"DXT1", false)),
        4 => Ok((b"DXT3", false)),
        5 | 6 => Ok((b"DXT5", false)),
        8 | 9 | 16 => Ok((b"DX10", true)),
        other => Err(Error::UnsupportedTextureFormat(other)),
    }
}

/// Fields read from a compiled texture body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTexture<'a> {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: u32,
    pub mip_count: u32,
    pub linear_size: u32,
    pub payload: &'a [u8],
}

impl<'a> CompiledTexture<'a> {
    pub fn read(c: &mut ByteCursor<'a>) -> Result<Self> {
        let width = c.read_u32()?;
        let height = c.read_u32()?;
        let depth = c.read_u32()?;
        let format = c.read_u32()?;
        c.skip(8)?;
        let mip_count = c.read_u32()?;
        // other data, then a copy of most of the above
        c.skip(84)?;
        let linear_size = c.read_u32()?;
        let payload = c.read_bytes(linear_size as usize)?;
        Ok(Self {
            width,
            height,
            depth,
            format,
            mip_count,
            linear_size,
            payload,
        })
    }

    pub fn dds_header(&self) -> Result<DdsHeader> {
        let (four_cc, dx10) = four_cc(self.format)?;
        Ok(DdsHeader {
            height: self.height,
            width: self.width,
            linear_size: self.linear_size,
            depth: self.depth,
            mip_count: self.mip_count,
            pixel_flags: if matches!(self.format, 0 | 7) {
                DDPF_ALPHAPIXELS
            } else {
                DDPF_FOURCC
            },
            four_cc: *four_cc,
            dx10,
        })
    }

    /// Summary for the decoded tree
    pub fn info(&self) -> Result<TextureInfo> {
        let (four_cc, _) = four_cc(self.format)?;
        Ok(TextureInfo {
            width: self.width,
            height: self.height,
            depth: self.depth,
            format: self.format,
            mip_count: self.mip_count,
            four_cc: String::from_utf8_lossy(four_cc).into_owned(),
            payload_len: self.linear_size,
        })
    }

    /// Complete DDS file: magic, header, optional DX10 header, payload
    pub fn to_dds(&self) -> Result<Vec<u8>> {
        let header = self.dds_header()?.to_bytes()?;
        let mut out = Vec::with_capacity(4 + header.len() + self.payload.len());
        out.extend_from_slice(DDS_MAGIC);
        out.extend_from_slice(&header);
        out.extend_from_slice(self.payload);
        Ok(out)
    }
}

/// The DDS_HEADER fields this reconstruction varies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdsHeader {
    pub height: u32,
    pub width: u32,
    pub linear_size: u32,
    pub depth: u32,
    pub mip_count: u32,
    pub pixel_flags: u32,
    pub four_cc: [u8; 4],
    pub dx10: bool,
}

impl DdsHeader {
    /// Header bytes starting at `dwSize`, DX10 extension included
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(DDS_HEADER_SIZE as usize + DX10_HEADER.len());
        out.write_u32::<LittleEndian>(DDS_HEADER_SIZE)?;
        out.write_u32::<LittleEndian>(DDSD_FLAGS)?;
        out.write_u32::<LittleEndian>(self.height)?;
        out.write_u32::<LittleEndian>(self.width)?;
        out.write_u32::<LittleEndian>(self.linear_size)?;
        out.write_u32::<LittleEndian>(self.depth)?;
        out.write_u32::<LittleEndian>(self.mip_count)?;
        // dwReserved1[11]
        out.extend_from_slice(&[0u8; 44]);

        out.write_u32::<LittleEndian>(DDS_PIXELFORMAT_SIZE)?;
        out.write_u32::<LittleEndian>(self.pixel_flags)?;
        out.extend_from_slice(&self.four_cc);
        // bit count and the four masks
        out.extend_from_slice(&[0u8; 20]);

        out.write_u32::<LittleEndian>(DDSCAPS)?;
        // caps2, caps3, caps4, reserved2
        out.extend_from_slice(&[0u8; 16]);

        if self.dx10 {
            out.extend_from_slice(&DX10_HEADER);
        }
        Ok(out)
    }
}

/// Convert a compiled texture body (record header already consumed) to DDS
pub fn decode_texture(body: &[u8]) -> Result<Vec<u8>> {
    let mut cursor = ByteCursor::new(body);
    CompiledTexture::read(&mut cursor)?.to_dds()
}

pub fn texture(_: &mut Decoder<'_>, c: &mut ByteCursor<'_>) -> Result<DecodedNode> {
    let texture = CompiledTexture::read(c)?;
    Ok(DecodedNode::Texture(texture.info()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::test_support::RecordBuilder;

    fn body(format: u32, payload: &[u8]) -> Vec<u8> {
        let mut b = RecordBuilder::new();
        b.u32(256).u32(128).u32(1).u32(format);
        b.zeros(8);
        b.u32(9);
        b.zeros(84);
        b.u32(payload.len() as u32);
        b.bytes(payload);
        b.build()
    }

    fn u32_at(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
    }

    #[test]
    fn test_dxt5_has_no_extension() {
        let payload = [0xAB; 16];
        let dds = decode_texture(&body(5, &payload)).unwrap();

        assert_eq!(&dds[0..4], b"DDS ");
        assert_eq!(dds.len(), 4 + 124 + 16);
        assert_eq!(u32_at(&dds, 4), 124);
        assert_eq!(u32_at(&dds, 8), 0x000A_1007);
        assert_eq!(u32_at(&dds, 12), 128);
        assert_eq!(u32_at(&dds, 16), 256);
        assert_eq!(u32_at(&dds, 20), 16);
        assert_eq!(u32_at(&dds, 24), 1);
        assert_eq!(u32_at(&dds, 28), 9);
        assert!(dds[32..76].iter().all(|b| *b == 0));
        assert_eq!(u32_at(&dds, 76), 32);
        assert_eq!(u32_at(&dds, 80), 0x04);
        assert_eq!(&dds[84..88], b"DXT5");
        assert_eq!(u32_at(&dds, 108), 0x0040_1008);
        assert_eq!(&dds[128..], &payload);
    }

    #[test]
    fn test_dx10_appends_extension() {
        let payload = [0x11; 8];
        let dds = decode_texture(&body(8, &payload)).unwrap();

        assert_eq!(dds.len(), 4 + 124 + 20 + 8);
        assert_eq!(&dds[84..88], b"DX10");
        assert_eq!(&dds[128..148], &DX10_HEADER);
        assert_eq!(&dds[148..], &payload);
    }

    #[test]
    fn test_four_cc_selection() {
        for (format, tag, flags) in [
            (0, b"DXT1", 0x40),
            (3, b"DXT1", 0x04),
            (4, b"DXT3", 0x04),
            (6, b"DXT5", 0x04),
            (7, b"DXT1", 0x40),
            (16, b"DX10", 0x04),
        ] {
            let dds = decode_texture(&body(format, &[])).unwrap();
            assert_eq!(&dds[84..88], tag, "format {}", format);
            assert_eq!(u32_at(&dds, 80), flags, "format {}", format);
        }
    }

    #[test]
    fn test_unknown_format_is_error() {
        assert!(matches!(
            decode_texture(&body(12, &[])),
            Err(Error::UnsupportedTextureFormat(12))
        ));
    }

    #[test]
    fn test_header_bytes_start_at_size_field() {
        let mut cursor_data = body(4, &[0; 4]);
        cursor_data.extend_from_slice(&[0xFF; 3]);
        let mut cursor = ByteCursor::new(&cursor_data);
        let texture = CompiledTexture::read(&mut cursor).unwrap();
        assert_eq!(cursor.remaining(), 3);

        let header = texture.dds_header().unwrap().to_bytes().unwrap();
        assert_eq!(header.len(), 124);
        assert_eq!(u32_at(&header, 0), 124);
    }

    #[test]
    fn test_truncated_payload() {
        let mut data = body(5, &[0; 16]);
        data.truncate(data.len() - 1);
        assert!(matches!(decode_texture(&data), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_tree_decode_rejects_unknown_format() {
        let mut cache = crate::cache::ResourceCache::new(0);
        let mut decoder = Decoder::new(&mut cache, Default::default());

        let mut record = RecordBuilder::record(0x51, crate::types::TypeCode::TEXTURE);
        record.bytes(&body(12, &[0; 4]));
        assert!(matches!(
            decoder.decode_bytes(&record.build(), "bad"),
            Err(Error::UnsupportedTextureFormat(12))
        ));

        let mut record = RecordBuilder::record(0x52, crate::types::TypeCode::TEXTURE);
        record.bytes(&body(6, &[0; 4]));
        let decoded = decoder.decode_bytes(&record.build(), "good").unwrap();
        match decoded.node {
            DecodedNode::Texture(info) => {
                assert_eq!(info.four_cc, "DXT5");
                assert_eq!((info.width, info.height, info.payload_len), (256, 128, 4));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }
}
