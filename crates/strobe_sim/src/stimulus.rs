//! Multiplier stimulus: operand pairs and their golden-reference products.

use strobe_common::{parse_operand, BitVector};

use crate::error::SimError;
use crate::models::OPERAND_BITS;

/// Source messages and the sink messages expected for them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stimulus {
    /// `{in0, in1}` ingress messages, `2 * OPERAND_BITS` wide.
    pub inputs: Vec<BitVector>,
    /// Truncated products, `OPERAND_BITS` wide.
    pub expected: Vec<BitVector>,
}

impl Stimulus {
    /// Builds stimulus from `(in0, in1)` operand pairs.
    ///
    /// Each operand must fit in 32 bits, signed or unsigned: values in
    /// `-2^31..2^32` are accepted and negative ones wrap as two's complement.
    pub fn from_pairs(pairs: &[(i128, i128)]) -> Result<Self, SimError> {
        let mut stimulus = Self::default();
        for &(a, b) in pairs {
            let in0 = operand_bits(a)?;
            let in1 = operand_bits(b)?;
            stimulus.inputs.push(in0.concat(&in1)?);
            stimulus
                .expected
                .push(BitVector::multiply_truncate(&in0, &in1, OPERAND_BITS)?);
        }
        Ok(stimulus)
    }

    /// Pairs up a flat operand list as `in0, in1, in0, in1, ...`.
    pub fn from_operands(operands: &[i128]) -> Result<Self, SimError> {
        if operands.len() % 2 != 0 {
            return Err(SimError::InvalidStimulus {
                reason: format!(
                    "odd number of operands ({}); values pair up as in0 in1",
                    operands.len()
                ),
            });
        }
        let pairs: Vec<(i128, i128)> = operands.chunks_exact(2).map(|c| (c[0], c[1])).collect();
        Self::from_pairs(&pairs)
    }

    /// Parses textual operands (decimal, `0x`, `0o` or `0b`) and pairs them up.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, SimError> {
        let operands = values
            .iter()
            .map(|v| parse_operand(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SimError::InvalidStimulus {
                reason: e.to_string(),
            })?;
        Self::from_operands(&operands)
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// True if there are no operations.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Converts one operand, rejecting values a 32-bit port cannot carry.
fn operand_bits(value: i128) -> Result<BitVector, SimError> {
    let min = -(1i128 << (OPERAND_BITS - 1));
    let max = 1i128 << OPERAND_BITS;
    if !(min..max).contains(&value) {
        return Err(SimError::InvalidStimulus {
            reason: format!("operand {value} does not fit in {OPERAND_BITS} bits"),
        });
    }
    Ok(BitVector::from_signed(OPERAND_BITS, value)?)
}
