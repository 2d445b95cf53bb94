use crate::common::{BitField, DecodeError, Stage};

/// A read that would run past the end of the buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OutOfRange {
    pub offset: usize,
    pub len: usize,
    pub available: usize,
}

impl OutOfRange {
    /// Attach the decode stage that attempted the read.
    pub fn during(self, stage: Stage) -> DecodeError {
        DecodeError::OutOfBounds {
            stage,
            offset: self.offset,
            len: self.len,
            available: self.available,
        }
    }
}

/// Read-only view over a whole gif source.
///
/// Unlike a streaming iterator the cursor keeps no position: every accessor takes an absolute
/// offset and callers do their own offset arithmetic.
#[derive(Debug, Copy, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn read_fixed(&self, offset: usize, len: usize) -> Result<&'a [u8], OutOfRange> {
        let err = OutOfRange {
            offset,
            len,
            available: self.bytes.len(),
        };
        let end = offset.checked_add(len).ok_or(err)?;
        self.bytes.get(offset..end).ok_or(err)
    }

    #[inline]
    pub fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], OutOfRange> {
        let mut arr = [0; N];
        arr.copy_from_slice(self.read_fixed(offset, N)?);
        Ok(arr)
    }

    #[inline]
    pub fn read_u8(&self, offset: usize) -> Result<u8, OutOfRange> {
        self.read_fixed(offset, 1).map(|b| b[0])
    }

    #[inline]
    pub fn read_u16_le(&self, offset: usize) -> Result<u16, OutOfRange> {
        self.read_array(offset).map(u16::from_le_bytes)
    }

    /// Mask `byte`, then shift the selected bits down.
    #[inline]
    pub const fn read_bit_field(byte: u8, mask: u8, shift: u8) -> u8 {
        BitField::new(mask, shift).extract(byte)
    }

    /// Offset of the first `needle` at or after `from`, if any.
    pub fn find_byte(&self, from: usize, needle: u8) -> Option<usize> {
        self.bytes
            .get(from..)?
            .iter()
            .position(|&b| b == needle)
            .map(|idx| from + idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_reads() {
        let cursor = ByteCursor::new(&[1, 2, 3, 4]);
        assert_eq!(cursor.read_fixed(1, 2), Ok(&[2, 3][..]));
        assert_eq!(cursor.read_fixed(4, 0), Ok(&[][..]));
        assert_eq!(
            cursor.read_fixed(3, 2),
            Err(OutOfRange {
                offset: 3,
                len: 2,
                available: 4
            })
        );
        assert!(cursor.read_fixed(usize::MAX, 2).is_err());
    }

    #[test]
    fn little_endian() {
        let cursor = ByteCursor::new(&[0x34, 0x12, 0xff]);
        assert_eq!(cursor.read_u16_le(0), Ok(0x1234));
        assert_eq!(cursor.read_u8(2), Ok(0xff));
        assert!(cursor.read_u16_le(2).is_err());
    }

    #[test]
    fn bit_fields() {
        assert_eq!(ByteCursor::read_bit_field(0b1011_0000, 0b0111_0000, 4), 0b011);
        assert_eq!(ByteCursor::read_bit_field(0xff, 0x80, 7), 1);
        assert_eq!(ByteCursor::read_bit_field(0x7f, 0x80, 7), 0);
    }

    #[test]
    fn find() {
        let cursor = ByteCursor::new(&[0, 0x2C, 0, 0x2C]);
        assert_eq!(cursor.find_byte(0, 0x2C), Some(1));
        assert_eq!(cursor.find_byte(2, 0x2C), Some(3));
        assert_eq!(cursor.find_byte(4, 0x2C), None);
        assert_eq!(cursor.find_byte(9, 0x2C), None);
    }

    #[test]
    fn stage_attached() {
        let err = ByteCursor::new(&[0; 4]).read_fixed(6, 7).unwrap_err();
        assert!(matches!(
            err.during(Stage::ScreenDescriptor),
            DecodeError::OutOfBounds {
                stage: Stage::ScreenDescriptor,
                available: 4,
                ..
            }
        ));
    }
}
