//! Forward-only reader over one record's bytes
//!
//! Every primitive read checks the remaining length first and fails with
//! [`Error::Truncated`] instead of reading past the end. In diagnostic mode
//! each read is also traced with its offset, the raw bytes and the value it
//! was interpreted as, indented by the current nesting level.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::{Cursor, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::types::{RecordId, TypeCode};

/// Size of the header at the start of every record
pub const RECORD_HEADER_LEN: usize = 14;

/// 4x4 matrix indexed as `m[row][col]`
pub type Matrix4 = [[f32; 4]; 4];

/// Fixed record header: 2-byte preamble, ID, type code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub preamble: [u8; 2],
    pub id: RecordId,
    pub type_code: TypeCode,
}

/// Byte cursor with optional diagnostic trace
pub struct ByteCursor<'a> {
    inner: Cursor<&'a [u8]>,
    diagnostic: bool,
    depth: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(data),
            diagnostic: false,
            depth: 0,
        }
    }

    /// Cursor that traces every read at `trace` level
    pub fn with_diagnostic(data: &'a [u8], diagnostic: bool) -> Self {
        Self {
            diagnostic,
            ..Self::new(data)
        }
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.inner.position() as usize)
    }

    pub fn is_diagnostic(&self) -> bool {
        self.diagnostic
    }

    /// Everything from `back` bytes before the current position to the end
    pub fn tail_from(&self, back: usize) -> &'a [u8] {
        let data: &'a [u8] = *self.inner.get_ref();
        let start = (self.inner.position() as usize)
            .saturating_sub(back)
            .min(data.len());
        &data[start..]
    }

    /// Increase the trace indentation by one level
    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn outdent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(Error::Truncated {
                offset: self.position(),
                needed,
            });
        }
        Ok(())
    }

    fn trace(&self, offset: u64, bytes: &[u8], value: &dyn fmt::Display) {
        if !self.diagnostic {
            return;
        }
        let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        tracing::trace!(
            "{:indent$}{:08X}: {} = {}",
            "",
            offset,
            hex.join(" "),
            value,
            indent = self.depth * 2
        );
    }

    /// Emit a free-form trace line at the current indentation
    pub fn note(&self, message: impl fmt::Display) {
        if self.diagnostic {
            tracing::trace!("{:indent$}{}", "", message, indent = self.depth * 2);
        }
    }

    /// Read a run of opaque bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let data: &'a [u8] = *self.inner.get_ref();
        let start = self.inner.position() as usize;
        let bytes = &data[start..start + len];
        self.inner.seek(SeekFrom::Current(len as i64))?;
        self.trace(start as u64, bytes, &"bytes");
        Ok(bytes)
    }

    /// Skip a run of bytes the layout does not interpret
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let offset = self.position();
        let value = self.inner.read_u8()?;
        self.trace(offset, &[value], &value);
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let offset = self.position();
        let value = self.inner.read_u32::<LittleEndian>()?;
        self.trace(offset, &value.to_le_bytes(), &value);
        Ok(value)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.ensure(4)?;
        let offset = self.position();
        let value = self.inner.read_f32::<LittleEndian>()?;
        self.trace(offset, &value.to_le_bytes(), &value);
        Ok(value)
    }

    pub fn read_f32_array<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut values = [0.0; N];
        for value in values.iter_mut() {
            *value = self.read_f32()?;
        }
        Ok(values)
    }

    pub fn read_id(&mut self) -> Result<RecordId> {
        self.ensure(8)?;
        let offset = self.position();
        let id = RecordId(self.inner.read_u64::<LittleEndian>()?);
        self.trace(offset, &id.to_le_bytes(), &id);
        Ok(id)
    }

    pub fn read_type_code(&mut self) -> Result<TypeCode> {
        self.ensure(4)?;
        let offset = self.position();
        let code = TypeCode(self.inner.read_u32::<LittleEndian>()?);
        self.trace(offset, &code.to_le_bytes(), &code);
        Ok(code)
    }

    /// Read 16 floats filling the matrix column by column
    pub fn read_matrix(&mut self) -> Result<Matrix4> {
        self.ensure(64)?;
        let mut matrix = [[0.0f32; 4]; 4];
        for k in 0..16 {
            matrix[k % 4][k / 4] = self.inner.read_f32::<LittleEndian>()?;
        }
        if self.diagnostic {
            let start = self.position() - 64;
            for (row, values) in matrix.iter().enumerate() {
                self.note(format_args!(
                    "{:08X}: mtx[{}] = {:?}",
                    start,
                    row,
                    values
                ));
            }
        }
        Ok(matrix)
    }

    /// Read a u32 repetition count and check it against a sanity ceiling
    pub fn read_count(&mut self, what: &'static str, ceiling: Option<u32>) -> Result<u32> {
        let offset = self.position();
        let count = self.read_u32()?;
        match ceiling {
            Some(ceiling) if count > ceiling => Err(Error::CountTooLarge {
                what,
                count,
                ceiling,
                offset,
            }),
            _ => Ok(count),
        }
    }

    /// Read a check byte that must be one of `allowed`
    pub fn read_check(&mut self, what: &'static str, allowed: &[u8]) -> Result<u8> {
        let offset = self.position();
        let value = self.read_u8()?;
        if allowed.contains(&value) {
            Ok(value)
        } else {
            Err(Error::UnexpectedValue {
                what,
                value: value as u64,
                offset,
            })
        }
    }

    pub fn read_header(&mut self) -> Result<RecordHeader> {
        let preamble = self.read_bytes(2)?;
        let id = self.read_id()?;
        let type_code = self.read_type_code()?;
        Ok(RecordHeader {
            preamble: [preamble[0], preamble[1]],
            id,
            type_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    #[test]
    fn test_reads_little_endian() {
        let mut data = vec![0xAA, 0xBB];
        data.write_u64::<LittleEndian>(0x14A2B).unwrap();
        data.write_u32::<LittleEndian>(0x0984_415E).unwrap();
        data.write_f32::<LittleEndian>(1.5).unwrap();

        let mut cursor = ByteCursor::new(&data);
        let header = cursor.read_header().unwrap();
        assert_eq!(header.preamble, [0xAA, 0xBB]);
        assert_eq!(header.id, RecordId(0x14A2B));
        assert_eq!(header.type_code, TypeCode::ENTITY);
        assert_eq!(cursor.position(), RECORD_HEADER_LEN as u64);
        assert_eq!(cursor.read_f32().unwrap(), 1.5);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_does_not_advance() {
        let data = [1u8, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        match cursor.read_u32() {
            Err(Error::Truncated { offset, needed }) => {
                assert_eq!(offset, 0);
                assert_eq!(needed, 4);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_bytes(3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_matrix_is_column_major() {
        let mut data = Vec::new();
        for k in 0..16 {
            data.write_f32::<LittleEndian>(k as f32).unwrap();
        }
        let mut cursor = ByteCursor::new(&data);
        let m = cursor.read_matrix().unwrap();
        assert_eq!(m[0][0], 0.0);
        assert_eq!(m[1][0], 1.0);
        assert_eq!(m[0][1], 4.0);
        assert_eq!(m[3][3], 15.0);
    }

    #[test]
    fn test_count_ceiling() {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(21).unwrap();
        data.write_u32::<LittleEndian>(20).unwrap();
        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            cursor.read_count("mesh", Some(20)),
            Err(Error::CountTooLarge { count: 21, ceiling: 20, .. })
        ));
        assert_eq!(cursor.read_count("mesh", Some(20)).unwrap(), 20);
    }

    #[test]
    fn test_check_byte() {
        let data = [3u8, 7];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_check("entity check", &[0, 3]).unwrap(), 3);
        assert!(matches!(
            cursor.read_check("entity check", &[0, 3]),
            Err(Error::UnexpectedValue { value: 7, offset: 1, .. })
        ));
    }

    #[test]
    fn test_tail_from() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.tail_from(12), &data);
        cursor.skip(3).unwrap();
        assert_eq!(cursor.tail_from(1), &[3, 4, 5]);
        assert_eq!(cursor.position(), 3);
    }
}
