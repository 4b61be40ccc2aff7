//! Parsing of textual stimulus operands.
//!
//! Operands are written the way they are typed on a command line: decimal,
//! or prefixed hexadecimal (`0x`), octal (`0o`) and binary (`0b`), with an
//! optional leading `-` and `_` digit separators. Negative values are kept
//! signed here and wrap to two's complement once placed in a
//! [`BitVector`](crate::BitVector).

use std::fmt;

/// Error type for parsing operand strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOperandError {
    /// The input string that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseOperandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid operand: '{}'", self.input)
    }
}

impl std::error::Error for ParseOperandError {}

/// Parses a decimal or radix-prefixed integer operand.
///
/// ```
/// use strobe_common::parse_operand;
///
/// assert_eq!(parse_operand("42"), Ok(42));
/// assert_eq!(parse_operand("0xFFFF_FFFF"), Ok(0xffff_ffff));
/// assert_eq!(parse_operand("-1"), Ok(-1));
/// ```
pub fn parse_operand(s: &str) -> Result<i128, ParseOperandError> {
    let trimmed = s.trim();
    let err = || ParseOperandError {
        input: trimmed.to_string(),
    };

    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d)
    } else {
        (10, lower.as_str())
    };

    // Separators only between digits: no leading, trailing or doubled `_`.
    let digit_or_separator = |c: char| c.is_ascii_alphanumeric() || c == '_';
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
        || !digits.chars().all(digit_or_separator)
    {
        return Err(err());
    }
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    let magnitude = u128::from_str_radix(&cleaned, radix).map_err(|_| err())?;

    if negative {
        // -2^127 is the most negative representable operand.
        if magnitude > i128::MAX as u128 + 1 {
            return Err(err());
        }
        Ok((magnitude as i128).wrapping_neg())
    } else {
        i128::try_from(magnitude).map_err(|_| err())
    }
}
