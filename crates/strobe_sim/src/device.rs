//! The device-under-test boundary.
//!
//! The harness never sees how a device computes its outputs. It only drives
//! named input ports, reads named ports back, and calls
//! [`evaluate`](Device::evaluate) and [`tick`](Device::tick). Native models
//! (see [`crate::models`]) and foreign bridges implement the same [`Device`]
//! trait.
//!
//! [`PortFile`] is the value store most implementations build on: a fixed
//! list of declared ports with width and direction checks.

use serde::{Deserialize, Serialize};
use strobe_common::{BitVector, BitsError};

use crate::error::SimError;

/// Well-known port names used by the harness conventions.
pub mod port {
    /// Synchronous active-high reset, present on every device.
    pub const RESET: &str = "reset";
    /// First operand.
    pub const IN0: &str = "in0";
    /// Second operand.
    pub const IN1: &str = "in1";
    /// Result.
    pub const OUT: &str = "out";
    /// Operand-valid qualifier.
    pub const IN_VAL: &str = "in_val";
    /// Result-valid qualifier.
    pub const OUT_VAL: &str = "out_val";
    /// Ingress stream valid (driven by the harness).
    pub const ISTREAM_VAL: &str = "istream.val";
    /// Ingress stream ready (driven by the device).
    pub const ISTREAM_RDY: &str = "istream.rdy";
    /// Ingress stream payload.
    pub const ISTREAM_MSG: &str = "istream.msg";
    /// Egress stream valid (driven by the device).
    pub const OSTREAM_VAL: &str = "ostream.val";
    /// Egress stream ready (driven by the harness).
    pub const OSTREAM_RDY: &str = "ostream.rdy";
    /// Egress stream payload.
    pub const OSTREAM_MSG: &str = "ostream.msg";
}

/// Direction of a device port as seen from the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Driven by the harness.
    Input,
    /// Driven by the device.
    Output,
}

/// A declared device port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDecl {
    /// Port name, unique within the device.
    pub name: String,
    /// Port direction.
    pub direction: PortDirection,
    /// Port width in bits.
    pub width: u32,
}

impl PortDecl {
    /// Declares an input port.
    pub fn input(name: &str, width: u32) -> Self {
        Self {
            name: name.to_string(),
            direction: PortDirection::Input,
            width,
        }
    }

    /// Declares an output port.
    pub fn output(name: &str, width: u32) -> Self {
        Self {
            name: name.to_string(),
            direction: PortDirection::Output,
            width,
        }
    }
}

/// Capability interface of a device under test.
///
/// `evaluate` must be a pure function of the current inputs and internal
/// registers: calling it twice without a `tick` in between yields the same
/// outputs. `tick` commits one rising clock edge.
pub trait Device {
    /// Instance name used to prefix trace signals.
    fn name(&self) -> &str;

    /// All declared ports, in a stable order.
    fn ports(&self) -> &[PortDecl];

    /// Drives a value onto an input port.
    fn set_input(&mut self, name: &str, value: BitVector) -> Result<(), SimError>;

    /// Reads the current value of a port. Input ports read back the last
    /// value driven onto them.
    fn get_output(&self, name: &str) -> Result<BitVector, SimError>;

    /// Recomputes combinational outputs from inputs and register state.
    fn evaluate(&mut self) -> Result<(), SimError>;

    /// Advances register state by one clock edge.
    fn tick(&mut self) -> Result<(), SimError>;

    /// Cycles between operands being presented and the matching result
    /// appearing on the output ports. Only consulted for devices without
    /// any valid signalling.
    fn latency(&self) -> u32 {
        0
    }

    /// Short per-cycle description of internal state for line traces.
    fn line_trace(&self) -> String {
        String::new()
    }
}

/// Current values of a device's declared ports.
#[derive(Clone, Debug)]
pub struct PortFile {
    decls: Vec<PortDecl>,
    values: Vec<BitVector>,
}

impl PortFile {
    /// Creates a port file with every port at zero.
    pub fn new(decls: Vec<PortDecl>) -> Result<Self, BitsError> {
        let values = decls
            .iter()
            .map(|d| BitVector::zero(d.width))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { decls, values })
    }

    /// Returns the port declarations.
    pub fn decls(&self) -> &[PortDecl] {
        &self.decls
    }

    fn index_of(&self, name: &str) -> Result<usize, SimError> {
        self.decls
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| SimError::UnknownPort {
                name: name.to_string(),
            })
    }

    fn store(&mut self, idx: usize, value: BitVector) -> Result<(), SimError> {
        let decl = &self.decls[idx];
        if decl.width != value.width() {
            return Err(SimError::PortWidthMismatch {
                name: decl.name.clone(),
                expected: decl.width,
                actual: value.width(),
            });
        }
        self.values[idx] = value;
        Ok(())
    }

    /// Harness-side write: only input ports are accepted.
    pub fn set_input(&mut self, name: &str, value: BitVector) -> Result<(), SimError> {
        let idx = self.index_of(name)?;
        if self.decls[idx].direction != PortDirection::Input {
            return Err(SimError::NotAnInput {
                name: name.to_string(),
            });
        }
        self.store(idx, value)
    }

    /// Device-side write of any port, normally an output.
    pub fn drive(&mut self, name: &str, value: BitVector) -> Result<(), SimError> {
        let idx = self.index_of(name)?;
        self.store(idx, value)
    }

    /// Reads a port value.
    pub fn get(&self, name: &str) -> Result<BitVector, SimError> {
        Ok(self.values[self.index_of(name)?])
    }

    /// Reads bit 0 of a port, for 1-bit control signals.
    pub fn bit(&self, name: &str) -> Result<bool, SimError> {
        Ok(self.get(name)?.as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ports() -> PortFile {
        PortFile::new(vec![
            PortDecl::input(port::IN0, 8),
            PortDecl::output(port::OUT, 8),
        ])
        .unwrap()
    }

    #[test]
    fn ports_start_at_zero() {
        let ports = make_ports();
        assert!(ports.get(port::IN0).unwrap().is_zero());
        assert_eq!(ports.get(port::OUT).unwrap().width(), 8);
    }

    #[test]
    fn set_input_roundtrip() {
        let mut ports = make_ports();
        let v = BitVector::new(8, 0x5a).unwrap();
        ports.set_input(port::IN0, v).unwrap();
        assert_eq!(ports.get(port::IN0).unwrap(), v);
    }

    #[test]
    fn set_input_rejects_output_port() {
        let mut ports = make_ports();
        let err = ports
            .set_input(port::OUT, BitVector::zero(8).unwrap())
            .unwrap_err();
        assert!(matches!(err, SimError::NotAnInput { .. }));
    }

    #[test]
    fn drive_writes_output_port() {
        let mut ports = make_ports();
        let value = BitVector::new(8, 3).unwrap();
        ports.drive(port::OUT, value).unwrap();
        assert_eq!(ports.get(port::OUT).unwrap().value(), 3);
    }

    #[test]
    fn width_mismatch_rejected() {
        let mut ports = make_ports();
        let err = ports
            .set_input(port::IN0, BitVector::zero(16).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::PortWidthMismatch {
                expected: 8,
                actual: 16,
                ..
            }
        ));
    }

    #[test]
    fn unknown_port_rejected() {
        let ports = make_ports();
        assert!(matches!(
            ports.get("in9"),
            Err(SimError::UnknownPort { .. })
        ));
    }

    #[test]
    fn zero_width_decl_rejected() {
        assert!(PortFile::new(vec![PortDecl::input("bad", 0)]).is_err());
    }

    #[test]
    fn bit_reads_control_signal() {
        let mut ports = PortFile::new(vec![PortDecl::input(port::IN_VAL, 1)]).unwrap();
        assert!(!ports.bit(port::IN_VAL).unwrap());
        ports
            .set_input(port::IN_VAL, BitVector::from_bool(true))
            .unwrap();
        assert!(ports.bit(port::IN_VAL).unwrap());
    }
}
