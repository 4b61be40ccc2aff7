//! Native models of the single-cycle integer multiplier.
//!
//! Three interface generations of the same datapath:
//!
//! - [`CombMultiplier`]: bare `in0`/`in1` operands and an `out` result.
//!   Operands are registered, so the product appears one cycle after the
//!   operands are presented.
//! - [`EnableMultiplier`]: adds `in_val`, registered alongside the operands
//!   and presented as `out_val`.
//! - [`StreamMultiplier`]: a `istream`/`ostream` valid/ready pair around a
//!   one-entry pipeline register. The ingress message is the concatenation
//!   `{in0, in1}`.
//!
//! Results are truncated to the operand width.

use strobe_common::BitVector;

use crate::device::{port, Device, PortDecl, PortFile};
use crate::error::SimError;

/// Operand width of the reference multiplier.
pub const OPERAND_BITS: u32 = 32;

/// The operand pipeline register shared by all three generations.
#[derive(Clone, Copy, Debug)]
struct OperandReg {
    in0: BitVector,
    in1: BitVector,
}

impl OperandReg {
    fn cleared(nbits: u32) -> Result<Self, SimError> {
        let zero = BitVector::zero(nbits)?;
        Ok(Self {
            in0: zero,
            in1: zero,
        })
    }

    fn product(&self) -> Result<BitVector, SimError> {
        Ok(BitVector::multiply_truncate(
            &self.in0,
            &self.in1,
            self.in0.width(),
        )?)
    }

    fn trace(&self) -> String {
        format!("{:x}*{:x}", self.in0, self.in1)
    }
}

/// Multiplier with plain operand and result ports.
#[derive(Clone, Debug)]
pub struct CombMultiplier {
    name: String,
    ports: PortFile,
    regs: OperandReg,
}

impl CombMultiplier {
    /// Creates a multiplier with `nbits`-wide operands and result.
    pub fn new(name: &str, nbits: u32) -> Result<Self, SimError> {
        let ports = PortFile::new(vec![
            PortDecl::input(port::RESET, 1),
            PortDecl::input(port::IN0, nbits),
            PortDecl::input(port::IN1, nbits),
            PortDecl::output(port::OUT, nbits),
        ])?;
        Ok(Self {
            name: name.to_string(),
            ports,
            regs: OperandReg::cleared(nbits)?,
        })
    }
}

impl Device for CombMultiplier {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[PortDecl] {
        self.ports.decls()
    }

    fn set_input(&mut self, name: &str, value: BitVector) -> Result<(), SimError> {
        self.ports.set_input(name, value)
    }

    fn get_output(&self, name: &str) -> Result<BitVector, SimError> {
        self.ports.get(name)
    }

    fn evaluate(&mut self) -> Result<(), SimError> {
        let product = self.regs.product()?;
        self.ports.drive(port::OUT, product)
    }

    fn tick(&mut self) -> Result<(), SimError> {
        if self.ports.bit(port::RESET)? {
            self.regs = OperandReg::cleared(self.regs.in0.width())?;
        } else {
            self.regs = OperandReg {
                in0: self.ports.get(port::IN0)?,
                in1: self.ports.get(port::IN1)?,
            };
        }
        Ok(())
    }

    fn latency(&self) -> u32 {
        1
    }

    fn line_trace(&self) -> String {
        self.regs.trace()
    }
}

/// Multiplier whose operands are qualified by an enable (`in_val`) bit.
#[derive(Clone, Debug)]
pub struct EnableMultiplier {
    name: String,
    ports: PortFile,
    regs: OperandReg,
    val_reg: bool,
}

impl EnableMultiplier {
    /// Creates a multiplier with `nbits`-wide operands and result.
    pub fn new(name: &str, nbits: u32) -> Result<Self, SimError> {
        let ports = PortFile::new(vec![
            PortDecl::input(port::RESET, 1),
            PortDecl::input(port::IN_VAL, 1),
            PortDecl::input(port::IN0, nbits),
            PortDecl::input(port::IN1, nbits),
            PortDecl::output(port::OUT_VAL, 1),
            PortDecl::output(port::OUT, nbits),
        ])?;
        Ok(Self {
            name: name.to_string(),
            ports,
            regs: OperandReg::cleared(nbits)?,
            val_reg: false,
        })
    }
}

impl Device for EnableMultiplier {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[PortDecl] {
        self.ports.decls()
    }

    fn set_input(&mut self, name: &str, value: BitVector) -> Result<(), SimError> {
        self.ports.set_input(name, value)
    }

    fn get_output(&self, name: &str) -> Result<BitVector, SimError> {
        self.ports.get(name)
    }

    fn evaluate(&mut self) -> Result<(), SimError> {
        self.ports
            .drive(port::OUT_VAL, BitVector::from_bool(self.val_reg))?;
        let product = self.regs.product()?;
        self.ports.drive(port::OUT, product)
    }

    fn tick(&mut self) -> Result<(), SimError> {
        if self.ports.bit(port::RESET)? {
            self.val_reg = false;
            self.regs = OperandReg::cleared(self.regs.in0.width())?;
            return Ok(());
        }
        self.val_reg = self.ports.bit(port::IN_VAL)?;
        if self.val_reg {
            self.regs = OperandReg {
                in0: self.ports.get(port::IN0)?,
                in1: self.ports.get(port::IN1)?,
            };
        }
        Ok(())
    }

    fn line_trace(&self) -> String {
        if self.val_reg {
            self.regs.trace()
        } else {
            String::new()
        }
    }
}

/// Multiplier behind valid/ready stream interfaces.
#[derive(Clone, Debug)]
pub struct StreamMultiplier {
    name: String,
    ports: PortFile,
    regs: OperandReg,
    full: bool,
}

impl StreamMultiplier {
    /// Creates a multiplier with a `2 * nbits` ingress and `nbits` egress message.
    pub fn new(name: &str, nbits: u32) -> Result<Self, SimError> {
        let ports = PortFile::new(vec![
            PortDecl::input(port::RESET, 1),
            PortDecl::input(port::ISTREAM_VAL, 1),
            PortDecl::output(port::ISTREAM_RDY, 1),
            PortDecl::input(port::ISTREAM_MSG, 2 * nbits),
            PortDecl::output(port::OSTREAM_VAL, 1),
            PortDecl::input(port::OSTREAM_RDY, 1),
            PortDecl::output(port::OSTREAM_MSG, nbits),
        ])?;
        Ok(Self {
            name: name.to_string(),
            ports,
            regs: OperandReg::cleared(nbits)?,
            full: false,
        })
    }

    /// The pipeline register accepts a message when it is empty or being drained.
    fn ingress_ready(&self) -> Result<bool, SimError> {
        Ok(self.ports.bit(port::OSTREAM_RDY)? || !self.full)
    }
}

impl Device for StreamMultiplier {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[PortDecl] {
        self.ports.decls()
    }

    fn set_input(&mut self, name: &str, value: BitVector) -> Result<(), SimError> {
        self.ports.set_input(name, value)
    }

    fn get_output(&self, name: &str) -> Result<BitVector, SimError> {
        self.ports.get(name)
    }

    fn evaluate(&mut self) -> Result<(), SimError> {
        let rdy = self.ingress_ready()?;
        self.ports
            .drive(port::ISTREAM_RDY, BitVector::from_bool(rdy))?;
        self.ports
            .drive(port::OSTREAM_VAL, BitVector::from_bool(self.full))?;
        let product = self.regs.product()?;
        self.ports.drive(port::OSTREAM_MSG, product)
    }

    fn tick(&mut self) -> Result<(), SimError> {
        let nbits = self.regs.in0.width();
        if self.ports.bit(port::RESET)? {
            self.full = false;
            self.regs = OperandReg::cleared(nbits)?;
            return Ok(());
        }
        if self.ingress_ready()? {
            let val = self.ports.bit(port::ISTREAM_VAL)?;
            if val {
                let msg = self.ports.get(port::ISTREAM_MSG)?;
                self.regs = OperandReg {
                    in0: msg.slice(2 * nbits - 1, nbits)?,
                    in1: msg.slice(nbits - 1, 0)?,
                };
            }
            self.full = val;
        }
        Ok(())
    }

    fn line_trace(&self) -> String {
        if self.full {
            self.regs.trace()
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(width: u32, value: u128) -> BitVector {
        BitVector::new(width, value).unwrap()
    }

    fn cycle(dut: &mut dyn Device) {
        dut.evaluate().unwrap();
        dut.tick().unwrap();
    }

    #[test]
    fn comb_product_appears_next_cycle() {
        let mut dut = CombMultiplier::new("imul", 32).unwrap();
        dut.set_input(port::IN0, bits(32, 3)).unwrap();
        dut.set_input(port::IN1, bits(32, 4)).unwrap();
        dut.evaluate().unwrap();
        assert_eq!(dut.get_output(port::OUT).unwrap().value(), 0);
        dut.tick().unwrap();
        dut.evaluate().unwrap();
        assert_eq!(dut.get_output(port::OUT).unwrap().value(), 12);
        assert_eq!(dut.latency(), 1);
    }

    #[test]
    fn comb_reset_clears_registers() {
        let mut dut = CombMultiplier::new("imul", 32).unwrap();
        dut.set_input(port::IN0, bits(32, 5)).unwrap();
        dut.set_input(port::IN1, bits(32, 5)).unwrap();
        cycle(&mut dut);
        dut.set_input(port::RESET, BitVector::from_bool(true))
            .unwrap();
        cycle(&mut dut);
        dut.evaluate().unwrap();
        assert_eq!(dut.get_output(port::OUT).unwrap().value(), 0);
    }

    #[test]
    fn comb_result_truncates() {
        let mut dut = CombMultiplier::new("imul", 32).unwrap();
        dut.set_input(port::IN0, bits(32, 0xffff_ffff)).unwrap();
        dut.set_input(port::IN1, bits(32, 2)).unwrap();
        cycle(&mut dut);
        dut.evaluate().unwrap();
        assert_eq!(dut.get_output(port::OUT).unwrap().value(), 0xffff_fffe);
    }

    #[test]
    fn enable_valid_follows_enable() {
        let mut dut = EnableMultiplier::new("imul", 32).unwrap();
        dut.set_input(port::IN_VAL, BitVector::from_bool(true))
            .unwrap();
        dut.set_input(port::IN0, bits(32, 7)).unwrap();
        dut.set_input(port::IN1, bits(32, 7)).unwrap();
        cycle(&mut dut);
        dut.set_input(port::IN_VAL, BitVector::from_bool(false))
            .unwrap();
        dut.evaluate().unwrap();
        assert!(dut.get_output(port::OUT_VAL).unwrap().as_bool());
        assert_eq!(dut.get_output(port::OUT).unwrap().value(), 49);
        dut.tick().unwrap();
        dut.evaluate().unwrap();
        assert!(!dut.get_output(port::OUT_VAL).unwrap().as_bool());
    }

    #[test]
    fn stream_accepts_and_presents() {
        let mut dut = StreamMultiplier::new("imul", 32).unwrap();
        let msg = bits(32, 6).concat(&bits(32, 7)).unwrap();
        dut.set_input(port::ISTREAM_VAL, BitVector::from_bool(true))
            .unwrap();
        dut.set_input(port::ISTREAM_MSG, msg).unwrap();
        dut.set_input(port::OSTREAM_RDY, BitVector::from_bool(false))
            .unwrap();
        dut.evaluate().unwrap();
        assert!(dut.get_output(port::ISTREAM_RDY).unwrap().as_bool());
        assert!(!dut.get_output(port::OSTREAM_VAL).unwrap().as_bool());
        dut.tick().unwrap();

        dut.evaluate().unwrap();
        assert!(dut.get_output(port::OSTREAM_VAL).unwrap().as_bool());
        assert_eq!(dut.get_output(port::OSTREAM_MSG).unwrap().value(), 42);
        // Full and the consumer is stalling: no room for another message.
        assert!(!dut.get_output(port::ISTREAM_RDY).unwrap().as_bool());
    }

    #[test]
    fn stream_holds_result_under_backpressure() {
        let mut dut = StreamMultiplier::new("imul", 32).unwrap();
        let first = bits(32, 6).concat(&bits(32, 7)).unwrap();
        let second = bits(32, 2).concat(&bits(32, 3)).unwrap();
        dut.set_input(port::ISTREAM_VAL, BitVector::from_bool(true))
            .unwrap();
        dut.set_input(port::ISTREAM_MSG, first).unwrap();
        cycle(&mut dut);
        dut.set_input(port::ISTREAM_MSG, second).unwrap();
        cycle(&mut dut);
        dut.evaluate().unwrap();
        assert_eq!(dut.get_output(port::OSTREAM_MSG).unwrap().value(), 42);

        dut.set_input(port::OSTREAM_RDY, BitVector::from_bool(true))
            .unwrap();
        cycle(&mut dut);
        dut.evaluate().unwrap();
        assert_eq!(dut.get_output(port::OSTREAM_MSG).unwrap().value(), 6);
    }

    #[test]
    fn stream_evaluate_is_idempotent() {
        let mut dut = StreamMultiplier::new("imul", 32).unwrap();
        dut.set_input(port::ISTREAM_VAL, BitVector::from_bool(true))
            .unwrap();
        dut.set_input(port::ISTREAM_MSG, bits(64, (9 << 32) | 9))
            .unwrap();
        cycle(&mut dut);
        dut.evaluate().unwrap();
        let first: Vec<_> = dut
            .ports()
            .iter()
            .map(|p| dut.get_output(&p.name).unwrap())
            .collect();
        dut.evaluate().unwrap();
        let second: Vec<_> = dut
            .ports()
            .iter()
            .map(|p| dut.get_output(&p.name).unwrap())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn stream_rejects_narrow_message() {
        let mut dut = StreamMultiplier::new("imul", 32).unwrap();
        let err = dut.set_input(port::ISTREAM_MSG, bits(32, 1)).unwrap_err();
        assert!(matches!(err, SimError::PortWidthMismatch { .. }));
    }

    #[test]
    fn zero_width_model_rejected() {
        assert!(CombMultiplier::new("imul", 0).is_err());
    }
}
