//! Fixed-width unsigned bit vectors with truncating (wraparound) arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest value a [`BitVector`] can hold, in bits.
pub const MAX_WIDTH: u32 = 128;

/// Errors produced by [`BitVector`] construction and slicing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BitsError {
    /// A width of zero was requested.
    #[error("invalid bit width {width}: width must be at least 1")]
    InvalidWidth {
        /// The rejected width.
        width: u32,
    },

    /// The requested (or combined) width exceeds [`MAX_WIDTH`].
    #[error("width {width} exceeds maximum register width {max}")]
    WidthOverflow {
        /// The rejected width.
        width: u32,
        /// The maximum supported width.
        max: u32,
    },

    /// A slice range falls outside the value or is inverted.
    #[error("slice [{hi}:{lo}] out of range for {width}-bit value")]
    OutOfRange {
        /// Upper (inclusive) bit index of the slice.
        hi: u32,
        /// Lower (inclusive) bit index of the slice.
        lo: u32,
        /// Width of the sliced value.
        width: u32,
    },
}

/// A fixed-width unsigned integer, as carried on a hardware port.
///
/// The stored value always satisfies `value < 2^width`: every constructor
/// and arithmetic helper truncates its result to the declared width, the
/// same way a register of that width wraps around. Values are immutable;
/// operations return new vectors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBits")]
pub struct BitVector {
    width: u32,
    value: u128,
}

/// Unvalidated serde shape of a [`BitVector`].
#[derive(Deserialize)]
struct RawBits {
    width: u32,
    value: u128,
}

impl TryFrom<RawBits> for BitVector {
    type Error = BitsError;

    fn try_from(raw: RawBits) -> Result<Self, Self::Error> {
        BitVector::new(raw.width, raw.value)
    }
}

impl BitVector {
    /// Creates a vector of the given width, truncating `raw` into range.
    ///
    /// Overflowing values are not an error: high bits are silently dropped.
    pub fn new(width: u32, raw: u128) -> Result<Self, BitsError> {
        check_width(width)?;
        Ok(Self {
            width,
            value: raw & mask(width),
        })
    }

    /// Creates a vector from a signed integer using two's-complement wraparound.
    ///
    /// `from_signed(32, -1)` yields `0xFFFF_FFFF`.
    pub fn from_signed(width: u32, raw: i128) -> Result<Self, BitsError> {
        Self::new(width, raw as u128)
    }

    /// Creates an all-zero vector of the given width.
    pub fn zero(width: u32) -> Result<Self, BitsError> {
        Self::new(width, 0)
    }

    /// Creates a single-bit vector from a boolean.
    pub fn from_bool(value: bool) -> Self {
        Self {
            width: 1,
            value: u128::from(value),
        }
    }

    /// Returns the declared width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the unsigned value.
    pub fn value(&self) -> u128 {
        self.value
    }

    /// Returns true if every bit is zero.
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Returns bit 0 as a boolean. Intended for 1-bit control signals.
    pub fn as_bool(&self) -> bool {
        self.value & 1 != 0
    }

    /// Concatenates `self` (high bits) with `low` (low bits).
    ///
    /// The result is `self.width + low.width` bits wide.
    pub fn concat(&self, low: &BitVector) -> Result<BitVector, BitsError> {
        let width = self.width + low.width;
        if width > MAX_WIDTH {
            return Err(BitsError::WidthOverflow {
                width,
                max: MAX_WIDTH,
            });
        }
        Ok(BitVector {
            width,
            value: (self.value << low.width) | low.value,
        })
    }

    /// Extracts bits `[hi:lo]` (both inclusive) into a `hi - lo + 1` bit vector.
    pub fn slice(&self, hi: u32, lo: u32) -> Result<BitVector, BitsError> {
        if hi >= self.width || lo > hi {
            return Err(BitsError::OutOfRange {
                hi,
                lo,
                width: self.width,
            });
        }
        let width = hi - lo + 1;
        Ok(BitVector {
            width,
            value: (self.value >> lo) & mask(width),
        })
    }

    /// Golden-reference product: `(a * b) mod 2^result_width`.
    pub fn multiply_truncate(
        a: &BitVector,
        b: &BitVector,
        result_width: u32,
    ) -> Result<BitVector, BitsError> {
        // Reduction modulo 2^128 before masking is exact for any width <= 128.
        BitVector::new(result_width, a.value.wrapping_mul(b.value))
    }

    /// Number of hex digits needed to show the full width.
    pub fn hex_digits(&self) -> usize {
        self.width.div_ceil(4) as usize
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'h{:x}", self.width, self)
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector({self})")
    }
}

/// Zero-padded hex digits covering the full width, without prefix.
impl fmt::LowerHex for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0digits$x}", self.value, digits = self.hex_digits())
    }
}

fn check_width(width: u32) -> Result<(), BitsError> {
    if width == 0 {
        return Err(BitsError::InvalidWidth { width });
    }
    if width > MAX_WIDTH {
        return Err(BitsError::WidthOverflow {
            width,
            max: MAX_WIDTH,
        });
    }
    Ok(())
}

/// All-ones mask for `width` bits (`width` in `1..=MAX_WIDTH`).
fn mask(width: u32) -> u128 {
    if width >= MAX_WIDTH {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}
