//! Bit-packed state blocks.
//!
//! A block holds one bit per logical field, field `k` living at bit `k`
//! (LSB-first within each byte). Capacity is `ceil(fields / 8)` bytes rounded
//! up to [`STATE_ALIGNMENT`]; bits past the last field are always zero.

use crate::error::{LayoutError, Result};
use crate::format::FourCC;
use bitvec::prelude::*;

/// Alignment unit of every state block, in bytes.
pub const STATE_ALIGNMENT: u32 = 4;

/// Byte capacity of a block with `field_count` one-bit fields.
pub const fn bit_block_size_in_bytes(field_count: u32, alignment: u32) -> u32 {
    let alignment = if alignment == 0 { 1 } else { alignment };
    let bytes = field_count.div_ceil(8);
    bytes.div_ceil(alignment) * alignment
}

/// Types that describe a fixed binary state shape.
pub trait InputStateTypeInfo {
    fn format(&self) -> FourCC;
}

/// Runtime-sized bit-packed block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitPackedBlock {
    format: FourCC,
    field_count: u32,
    bytes: Vec<u8>,
}

impl BitPackedBlock {
    /// A cleared block of `field_count` fields.
    pub fn new(format: FourCC, field_count: u32) -> Self {
        let size = bit_block_size_in_bytes(field_count, STATE_ALIGNMENT) as usize;
        Self {
            format,
            field_count,
            bytes: vec![0; size],
        }
    }

    /// A block with exactly the listed fields set. Order and duplicates don't matter.
    pub fn from_set_keys<I>(format: FourCC, field_count: u32, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut block = Self::new(format, field_count);
        for key in keys {
            block.write(key, true)?;
        }
        Ok(block)
    }

    /// Wrap existing bytes. The length must match the capacity and tail bits must be clear.
    pub fn from_bytes(format: FourCC, field_count: u32, bytes: &[u8]) -> Result<Self> {
        let mut block = Self::new(format, field_count);
        if bytes.len() != block.bytes.len() {
            return Err(LayoutError::BlockTooSmall {
                needed: block.bytes.len(),
                actual: bytes.len(),
            });
        }
        block.bytes.copy_from_slice(bytes);
        let tail = block.bytes.view_bits::<Lsb0>()[field_count as usize..].any();
        if tail {
            return Err(LayoutError::FieldOutOfRange {
                key: field_count,
                field_count,
            });
        }
        Ok(block)
    }

    /// `false` for keys past the last field.
    pub fn read(&self, key: u32) -> bool {
        key < self.field_count
            && self
                .bytes
                .view_bits::<Lsb0>()
                .get(key as usize)
                .is_some_and(|bit| *bit)
    }

    pub fn write(&mut self, key: u32, value: bool) -> Result<()> {
        if key >= self.field_count {
            return Err(LayoutError::FieldOutOfRange {
                key,
                field_count: self.field_count,
            });
        }
        self.bytes.view_bits_mut::<Lsb0>().set(key as usize, value);
        Ok(())
    }

    /// Clear every field.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Keys of the set fields, ascending.
    pub fn set_keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes.view_bits::<Lsb0>().iter_ones().map(|i| i as u32)
    }

    pub fn any(&self) -> bool {
        self.bytes.iter().any(|b| *b != 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn field_count(&self) -> u32 {
        self.field_count
    }

    pub fn size_in_bytes(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn size_in_bits(&self) -> u32 {
        self.size_in_bytes() * 8
    }
}

impl InputStateTypeInfo for BitPackedBlock {
    fn format(&self) -> FourCC {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FMT: FourCC = FourCC::new(b'T', b'E', b'S', b'T');

    #[test]
    fn capacity_rounds_to_words() {
        assert_eq!(bit_block_size_in_bytes(0, 4), 0);
        assert_eq!(bit_block_size_in_bytes(1, 4), 4);
        assert_eq!(bit_block_size_in_bytes(32, 4), 4);
        assert_eq!(bit_block_size_in_bytes(33, 4), 8);
        assert_eq!(bit_block_size_in_bytes(50, 4), 8);
        assert_eq!(bit_block_size_in_bytes(111, 4), 16);
        assert_eq!(bit_block_size_in_bytes(50, 1), 7);
    }

    #[test]
    fn fifty_keys_with_duplicates() {
        let block = BitPackedBlock::from_set_keys(FMT, 50, [3, 3, 40]).unwrap();
        assert_eq!(block.size_in_bytes(), 8);
        assert_eq!(block.set_keys().collect::<Vec<_>>(), [3, 40]);
        assert_eq!(block.as_bytes(), &[0x08, 0, 0, 0, 0, 0x01, 0, 0]);
        assert!(block.read(3) && block.read(40));
        assert!(!block.read(4));
    }

    #[test]
    fn reads_past_the_end_are_false_and_writes_fail() {
        let mut block = BitPackedBlock::new(FMT, 10);
        assert!(!block.read(10));
        assert!(!block.read(1000));
        assert!(matches!(
            block.write(10, true),
            Err(LayoutError::FieldOutOfRange { key: 10, field_count: 10 })
        ));
        assert!(!block.any());
        assert!(BitPackedBlock::from_set_keys(FMT, 10, [2, 12]).is_err());
    }

    #[test]
    fn write_then_clear() {
        let mut block = BitPackedBlock::new(FMT, 16);
        block.write(15, true).unwrap();
        assert_eq!(block.as_bytes(), &[0, 0x80, 0, 0]);
        block.write(15, false).unwrap();
        assert!(!block.any());
        block.write(0, true).unwrap();
        block.clear();
        assert!(!block.any());
        assert_eq!(block.format(), FMT);
    }

    #[test]
    fn from_bytes_rejects_dirty_tail() {
        assert!(BitPackedBlock::from_bytes(FMT, 4, &[0x0F, 0, 0, 0]).is_ok());
        assert!(BitPackedBlock::from_bytes(FMT, 4, &[0x10, 0, 0, 0]).is_err());
        assert!(BitPackedBlock::from_bytes(FMT, 4, &[0; 2]).is_err());
    }
}
