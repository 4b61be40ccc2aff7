//! Shared foundational types used across the Strobe co-simulation harness.
//!
//! This crate provides the fixed-width [`BitVector`] value type carried on
//! every port and stream, and the textual operand parser used to build
//! stimulus from command-line values.

#![warn(missing_docs)]

pub mod bits;
pub mod operand;

pub use bits::{BitVector, BitsError, MAX_WIDTH};
pub use operand::{parse_operand, ParseOperandError};
