//! Uniform stream facade over the three device port conventions.
//!
//! The driver always sees an ingress stream (messages from the source) and
//! an egress stream (results for the sink). [`DeviceAdapter`] maps those
//! onto whatever ports the device actually has:
//!
//! | Convention        | ingress ready   | egress valid                    |
//! |-------------------|-----------------|---------------------------------|
//! | `Combinational`   | always          | operands issued `latency` ago   |
//! | `EnableQualified` | always          | device `out_val`                |
//! | `Streaming`       | `istream.rdy`   | `ostream.val`                   |
//!
//! Only the streaming convention can stall. On the other two a result the
//! sink cannot take would be lost, so evaluation reports it as a protocol
//! violation before the cycle commits.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use strobe_common::BitVector;

use crate::device::{port, Device};
use crate::error::SimError;
use crate::models::{CombMultiplier, EnableMultiplier, StreamMultiplier};
use crate::stream::Offer;

/// Device port convention, fixed for the lifetime of an adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortConvention {
    /// Operand and result ports only.
    Combinational,
    /// Operands qualified by `in_val`, result by `out_val`.
    EnableQualified,
    /// Valid/ready ingress and egress streams.
    Streaming,
}

impl PortConvention {
    /// Ports a device must declare to be driven under this convention.
    pub fn required_ports(self) -> &'static [&'static str] {
        match self {
            PortConvention::Combinational => &[port::RESET, port::IN0, port::IN1, port::OUT],
            PortConvention::EnableQualified => &[
                port::RESET,
                port::IN_VAL,
                port::IN0,
                port::IN1,
                port::OUT_VAL,
                port::OUT,
            ],
            PortConvention::Streaming => &[
                port::RESET,
                port::ISTREAM_VAL,
                port::ISTREAM_RDY,
                port::ISTREAM_MSG,
                port::OSTREAM_VAL,
                port::OSTREAM_RDY,
                port::OSTREAM_MSG,
            ],
        }
    }

    /// True if the device can hold off its producer.
    pub fn has_backpressure(self) -> bool {
        self == PortConvention::Streaming
    }
}

/// Signals the adapter presents to the endpoints for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdapterSignals {
    /// Device can take the source's message this cycle.
    pub ingress_ready: bool,
    /// Device presents a result this cycle.
    pub egress_valid: bool,
    /// Result data lines.
    pub egress_msg: BitVector,
}

/// Per-convention adapter state.
#[derive(Debug)]
enum Binding {
    Combinational {
        /// Whether real operands were issued, one flag per cycle of latency.
        issued: VecDeque<bool>,
    },
    EnableQualified,
    Streaming,
}

/// Evaluation results held until the cycle is committed.
#[derive(Clone, Copy, Debug)]
struct Pending {
    issued: bool,
}

/// Drives a [`Device`] under one of the [`PortConvention`]s.
pub struct DeviceAdapter {
    binding: Binding,
    dut: Box<dyn Device>,
    ingress_width: u32,
    egress_width: u32,
    pending: Option<Pending>,
}

impl DeviceAdapter {
    /// Wraps a device, checking it declares the ports the convention needs.
    pub fn new(convention: PortConvention, dut: Box<dyn Device>) -> Result<Self, SimError> {
        let width_of = |name: &str| -> Result<u32, SimError> {
            dut.ports()
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.width)
                .ok_or_else(|| SimError::MissingPort {
                    device: dut.name().to_string(),
                    port: name.to_string(),
                })
        };
        for name in convention.required_ports() {
            width_of(name)?;
        }

        let (ingress_width, egress_width) = match convention {
            PortConvention::Combinational | PortConvention::EnableQualified => {
                let in0 = width_of(port::IN0)?;
                let in1 = width_of(port::IN1)?;
                if in0 != in1 {
                    return Err(SimError::PortWidthMismatch {
                        name: port::IN1.to_string(),
                        expected: in0,
                        actual: in1,
                    });
                }
                (in0 + in1, width_of(port::OUT)?)
            }
            PortConvention::Streaming => {
                (width_of(port::ISTREAM_MSG)?, width_of(port::OSTREAM_MSG)?)
            }
        };

        let binding = match convention {
            PortConvention::Combinational => Binding::Combinational {
                issued: VecDeque::from(vec![false; dut.latency() as usize]),
            },
            PortConvention::EnableQualified => Binding::EnableQualified,
            PortConvention::Streaming => Binding::Streaming,
        };

        Ok(Self {
            binding,
            dut,
            ingress_width,
            egress_width,
            pending: None,
        })
    }

    /// Builds an adapter around the native multiplier model for `convention`.
    pub fn native(convention: PortConvention, name: &str, nbits: u32) -> Result<Self, SimError> {
        let dut: Box<dyn Device> = match convention {
            PortConvention::Combinational => Box::new(CombMultiplier::new(name, nbits)?),
            PortConvention::EnableQualified => Box::new(EnableMultiplier::new(name, nbits)?),
            PortConvention::Streaming => Box::new(StreamMultiplier::new(name, nbits)?),
        };
        Self::new(convention, dut)
    }

    /// The active convention.
    pub fn convention(&self) -> PortConvention {
        match self.binding {
            Binding::Combinational { .. } => PortConvention::Combinational,
            Binding::EnableQualified => PortConvention::EnableQualified,
            Binding::Streaming => PortConvention::Streaming,
        }
    }

    /// The wrapped device.
    pub fn device(&self) -> &dyn Device {
        self.dut.as_ref()
    }

    /// Width of ingress messages.
    pub fn ingress_width(&self) -> u32 {
        self.ingress_width
    }

    /// Width of egress messages.
    pub fn egress_width(&self) -> u32 {
        self.egress_width
    }

    /// Holds the device in reset for one cycle with all qualifiers low.
    pub fn reset_cycle(&mut self) -> Result<(), SimError> {
        self.dut.set_input(port::RESET, BitVector::from_bool(true))?;
        match &mut self.binding {
            Binding::Combinational { issued } => issued.iter_mut().for_each(|f| *f = false),
            Binding::EnableQualified => {
                self.dut
                    .set_input(port::IN_VAL, BitVector::from_bool(false))?;
            }
            Binding::Streaming => {
                self.dut
                    .set_input(port::ISTREAM_VAL, BitVector::from_bool(false))?;
                self.dut
                    .set_input(port::OSTREAM_RDY, BitVector::from_bool(false))?;
            }
        }
        self.pending = None;
        self.dut.evaluate()?;
        self.dut.tick()
    }

    /// Deasserts reset.
    pub fn release_reset(&mut self) -> Result<(), SimError> {
        self.dut.set_input(port::RESET, BitVector::from_bool(false))
    }

    /// Splits a `{in0, in1}` message onto the operand ports.
    fn drive_operands(&mut self, msg: &BitVector) -> Result<(), SimError> {
        let half = self.ingress_width / 2;
        self.dut
            .set_input(port::IN0, msg.slice(self.ingress_width - 1, half)?)?;
        self.dut.set_input(port::IN1, msg.slice(half - 1, 0)?)
    }

    /// Drives the device from the source's offer and the sink's readiness,
    /// evaluates it, and returns the resulting stream signals.
    ///
    /// Calling this again before [`tick`](Self::tick) recomputes the same
    /// signals from the same inputs.
    pub fn evaluate(
        &mut self,
        cycle: u64,
        offer: &Offer,
        sink_ready: bool,
    ) -> Result<AdapterSignals, SimError> {
        self.pending = None;
        if offer.msg.width() != self.ingress_width {
            return Err(SimError::protocol(
                cycle,
                format!(
                    "ingress message is {} bits, device takes {}",
                    offer.msg.width(),
                    self.ingress_width
                ),
            ));
        }

        let signals = match &self.binding {
            Binding::Combinational { issued } => {
                // A zero-latency device answers in the cycle it is asked.
                let egress_valid = issued.front().copied().unwrap_or(offer.valid);
                self.drive_operands(&offer.msg)?;
                self.dut.evaluate()?;
                AdapterSignals {
                    ingress_ready: true,
                    egress_valid,
                    egress_msg: self.dut.get_output(port::OUT)?,
                }
            }
            Binding::EnableQualified => {
                self.dut
                    .set_input(port::IN_VAL, BitVector::from_bool(offer.valid))?;
                self.drive_operands(&offer.msg)?;
                self.dut.evaluate()?;
                AdapterSignals {
                    ingress_ready: true,
                    egress_valid: self.dut.get_output(port::OUT_VAL)?.as_bool(),
                    egress_msg: self.dut.get_output(port::OUT)?,
                }
            }
            Binding::Streaming => {
                self.dut
                    .set_input(port::ISTREAM_VAL, BitVector::from_bool(offer.valid))?;
                self.dut.set_input(port::ISTREAM_MSG, offer.msg)?;
                self.dut
                    .set_input(port::OSTREAM_RDY, BitVector::from_bool(sink_ready))?;
                self.dut.evaluate()?;
                AdapterSignals {
                    ingress_ready: self.dut.get_output(port::ISTREAM_RDY)?.as_bool(),
                    egress_valid: self.dut.get_output(port::OSTREAM_VAL)?.as_bool(),
                    egress_msg: self.dut.get_output(port::OSTREAM_MSG)?,
                }
            }
        };

        // A result the sink cannot take is lost unless the device can stall,
        // so the cycle is refused before anything commits.
        if !self.convention().has_backpressure() && signals.egress_valid && !sink_ready {
            return Err(SimError::protocol(
                cycle,
                format!(
                    "'{}' produced {} but the sink was not ready to accept it",
                    self.dut.name(),
                    signals.egress_msg
                ),
            ));
        }

        self.pending = Some(Pending {
            issued: offer.valid && signals.ingress_ready,
        });
        Ok(signals)
    }

    /// Commits the cycle on the device.
    ///
    /// Fails if no [`evaluate`](Self::evaluate) succeeded since the last tick.
    pub fn tick(&mut self, cycle: u64) -> Result<(), SimError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| SimError::protocol(cycle, "device tick before evaluate"))?;

        if let Binding::Combinational { issued } = &mut self.binding {
            if !issued.is_empty() {
                issued.pop_front();
                issued.push_back(pending.issued);
            }
        }
        self.dut.tick()
    }

    /// Trace signal names and widths for every device port, prefixed with
    /// the device name.
    pub fn signal_decls(&self) -> Vec<(String, u32)> {
        self.dut
            .ports()
            .iter()
            .map(|p| (format!("{}.{}", self.dut.name(), p.name), p.width))
            .collect()
    }

    /// Current values of every device port, in [`signal_decls`](Self::signal_decls) order.
    pub fn port_values(&self) -> Result<Vec<BitVector>, SimError> {
        self.dut
            .ports()
            .iter()
            .map(|p| self.dut.get_output(&p.name))
            .collect()
    }

    /// Device line trace.
    pub fn line_trace(&self) -> String {
        self.dut.line_trace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{PortDecl, PortFile};

    fn operands(in0: u128, in1: u128) -> BitVector {
        BitVector::new(32, in0)
            .unwrap()
            .concat(&BitVector::new(32, in1).unwrap())
            .unwrap()
    }

    fn offer(valid: bool, msg: BitVector) -> Offer {
        Offer { valid, msg }
    }

    fn idle() -> Offer {
        offer(false, BitVector::zero(64).unwrap())
    }

    fn fresh(convention: PortConvention) -> DeviceAdapter {
        let mut adapter = DeviceAdapter::native(convention, "imul", 32).unwrap();
        adapter.reset_cycle().unwrap();
        adapter.release_reset().unwrap();
        adapter
    }

    #[test]
    fn widths_follow_device_ports() {
        for convention in [
            PortConvention::Combinational,
            PortConvention::EnableQualified,
            PortConvention::Streaming,
        ] {
            let adapter = DeviceAdapter::native(convention, "imul", 32).unwrap();
            assert_eq!(adapter.ingress_width(), 64);
            assert_eq!(adapter.egress_width(), 32);
            assert_eq!(adapter.convention(), convention);
        }
    }

    #[test]
    fn combinational_result_valid_one_cycle_later() {
        let mut adapter = fresh(PortConvention::Combinational);
        let first = adapter
            .evaluate(0, &offer(true, operands(3, 4)), true)
            .unwrap();
        assert!(first.ingress_ready);
        assert!(!first.egress_valid);
        adapter.tick(0).unwrap();

        let second = adapter.evaluate(1, &idle(), true).unwrap();
        assert!(second.egress_valid);
        assert_eq!(second.egress_msg.value(), 12);
        adapter.tick(1).unwrap();

        let third = adapter.evaluate(2, &idle(), true).unwrap();
        assert!(!third.egress_valid);
    }

    #[test]
    fn enable_forwards_out_val() {
        let mut adapter = fresh(PortConvention::EnableQualified);
        adapter
            .evaluate(0, &offer(true, operands(7, 7)), true)
            .unwrap();
        adapter.tick(0).unwrap();
        let signals = adapter.evaluate(1, &idle(), true).unwrap();
        assert!(signals.egress_valid);
        assert_eq!(signals.egress_msg.value(), 49);
    }

    #[test]
    fn streaming_ready_tracks_backpressure() {
        let mut adapter = fresh(PortConvention::Streaming);
        let s0 = adapter
            .evaluate(0, &offer(true, operands(6, 7)), false)
            .unwrap();
        assert!(s0.ingress_ready);
        adapter.tick(0).unwrap();
        let s1 = adapter
            .evaluate(1, &offer(true, operands(1, 1)), false)
            .unwrap();
        assert!(!s1.ingress_ready);
        assert!(s1.egress_valid);
        assert_eq!(s1.egress_msg.value(), 42);
    }

    #[test]
    fn evaluate_twice_is_idempotent() {
        let mut adapter = fresh(PortConvention::Streaming);
        adapter
            .evaluate(0, &offer(true, operands(2, 5)), true)
            .unwrap();
        adapter.tick(0).unwrap();
        let a = adapter.evaluate(1, &idle(), true).unwrap();
        let before = adapter.port_values().unwrap();
        let b = adapter.evaluate(1, &idle(), true).unwrap();
        assert_eq!(a, b);
        assert_eq!(before, adapter.port_values().unwrap());
    }

    #[test]
    fn tick_without_evaluate_is_violation() {
        let mut adapter = fresh(PortConvention::EnableQualified);
        let err = adapter.tick(5).unwrap_err();
        assert!(matches!(err, SimError::ProtocolViolation { cycle: 5, .. }));
    }

    #[test]
    fn second_tick_in_same_cycle_is_violation() {
        let mut adapter = fresh(PortConvention::Combinational);
        adapter.evaluate(0, &idle(), true).unwrap();
        adapter.tick(0).unwrap();
        assert!(adapter.tick(0).is_err());
    }

    #[test]
    fn dropped_result_is_refused_at_evaluate() {
        let mut adapter = fresh(PortConvention::Combinational);
        adapter
            .evaluate(0, &offer(true, operands(3, 4)), true)
            .unwrap();
        adapter.tick(0).unwrap();
        let err = adapter.evaluate(1, &idle(), false).unwrap_err();
        assert!(matches!(err, SimError::ProtocolViolation { cycle: 1, .. }));
        assert!(err.to_string().contains("not ready"));
        // The refused cycle leaves nothing to commit.
        assert!(adapter.tick(1).is_err());
    }

    #[test]
    fn streaming_result_may_wait_for_sink() {
        let mut adapter = fresh(PortConvention::Streaming);
        adapter
            .evaluate(0, &offer(true, operands(3, 4)), true)
            .unwrap();
        adapter.tick(0).unwrap();
        let signals = adapter.evaluate(1, &idle(), false).unwrap();
        assert!(signals.egress_valid);
        adapter.tick(1).unwrap();
    }

    #[test]
    fn wrong_ingress_width_is_violation() {
        let mut adapter = fresh(PortConvention::Streaming);
        let narrow = offer(true, BitVector::new(32, 1).unwrap());
        assert!(matches!(
            adapter.evaluate(0, &narrow, true),
            Err(SimError::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn signal_names_are_prefixed() {
        let adapter = DeviceAdapter::native(PortConvention::EnableQualified, "imul", 32).unwrap();
        let names: Vec<_> = adapter.signal_decls().into_iter().map(|(n, _)| n).collect();
        assert!(names.contains(&"imul.in_val".to_string()));
        assert!(names.contains(&"imul.out".to_string()));
        assert_eq!(names.len(), adapter.port_values().unwrap().len());
    }

    /// A device that only declares a reset port.
    struct Bare {
        ports: PortFile,
    }

    impl Device for Bare {
        fn name(&self) -> &str {
            "bare"
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
            Ok(())
        }
        fn tick(&mut self) -> Result<(), SimError> {
            Ok(())
        }
    }

    #[test]
    fn missing_port_rejected() {
        let bare = Bare {
            ports: PortFile::new(vec![PortDecl::input(port::RESET, 1)]).unwrap(),
        };
        let err = DeviceAdapter::new(PortConvention::Streaming, Box::new(bare))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SimError::MissingPort { ref port, .. } if port == "istream.val"
        ));
    }
}
