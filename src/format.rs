//! Four-character format tags.
//!
//! A [`FourCC`] names the binary shape of a block or field. Two blocks with the
//! same tag and size are binary-compatible; that is the only check the
//! struct-mapping pipeline and template matching rely on.
//!
//! Tags are packed big-endian by character (`'K'` lands in the most significant
//! byte), so the numeric value is stable across processes and matches what
//! native producers write.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbolic 4-byte binary shape identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FourCC(u32);

impl FourCC {
    /// The undefined tag. Produced for field widths that have no primitive shape.
    pub const EMPTY: FourCC = FourCC(0);

    /// Single bit.
    pub const BIT: FourCC = FourCC::new(b'B', b'I', b'T', b' ');
    /// 8-bit integer.
    pub const BYTE: FourCC = FourCC::new(b'B', b'Y', b'T', b'E');
    /// 16-bit integer.
    pub const SHORT: FourCC = FourCC::new(b'S', b'H', b'R', b'T');
    /// 32-bit integer.
    pub const INT: FourCC = FourCC::new(b'I', b'N', b'T', b' ');

    /// State of a generic HID whose layout was compiled from its descriptor.
    pub const HID: FourCC = FourCC::new(b'H', b'I', b'D', b' ');
    /// Bit-packed keyboard state.
    pub const KEYS: FourCC = FourCC::new(b'K', b'E', b'Y', b'S');

    #[inline]
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        FourCC(((a as u32) << 24) | ((b as u32) << 16) | ((c as u32) << 8) | (d as u32))
    }

    #[inline]
    pub const fn from_u32(code: u32) -> Self {
        FourCC(code)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Characters in declaration order.
    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Field width implied by one of the primitive tags.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            FourCC::BIT => Some(1),
            FourCC::BYTE => Some(8),
            FourCC::SHORT => Some(16),
            FourCC::INT => Some(32),
            _ => None,
        }
    }

    /// Primitive tag for a field width, or [`FourCC::EMPTY`] when none fits.
    pub fn for_bit_width(bits: u32) -> FourCC {
        match bits {
            1 => FourCC::BIT,
            8 => FourCC::BYTE,
            16 => FourCC::SHORT,
            32 => FourCC::INT,
            _ => FourCC::EMPTY,
        }
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            for b in bytes {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(bytes: [u8; 4]) -> Self {
        FourCC(u32::from_be_bytes(bytes))
    }
}
