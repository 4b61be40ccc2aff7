//! Cycle-accurate valid/ready co-simulation harness.
//!
//! This crate drives a device under test through a deterministic sequence
//! of clock cycles: a [`StreamSource`] feeds it messages, a [`StreamSink`]
//! checks what comes out against a golden reference, and a
//! [`SimulationDriver`] sequences the two around the device with a
//! [`DeviceAdapter`] that hides which port convention the device uses.
//!
//! # Architecture
//!
//! Every cycle has two phases. First every component evaluates, in stream
//! order, from the state committed at the end of the previous cycle; a
//! transfer happens on an interface iff its `valid` and `ready` are both
//! high. Then the driver records a trace snapshot and ticks every
//! component. Mismatches are collected in the [`Verdict`]; protocol
//! violations abort the run.
//!
//! # Usage
//!
//! ```
//! use strobe_sim::{simulate, HarnessOptions, PortConvention, Stimulus};
//!
//! let stimulus = Stimulus::from_pairs(&[(3, 4), (7, 7)]).unwrap();
//! let options = HarnessOptions::new(PortConvention::Combinational);
//! let verdict = simulate(&stimulus, &options).unwrap();
//! assert!(verdict.passed());
//! assert_eq!(verdict.tally, "++");
//! ```
//!
//! # Modules
//!
//! - `error`: Simulation error types
//! - `clock`: Cycle counter and run phase
//! - `device`: Device capability trait and port declarations
//! - `models`: Native multiplier models
//! - `adapter`: Port-convention adapter
//! - `stream`: Handshake primitives and delay policy
//! - `source` / `sink`: Stream endpoints
//! - `trace`: Signal snapshots and rendering
//! - `waveform`: Waveform recording (VCD format)
//! - `stimulus`: Operand pairs and expected products
//! - `driver`: The cycle loop
//! - `verdict`: Run outcome

#![warn(missing_docs)]

pub mod adapter;
pub mod clock;
pub mod device;
pub mod driver;
pub mod error;
pub mod models;
pub mod sink;
pub mod source;
pub mod stimulus;
pub mod stream;
pub mod trace;
pub mod verdict;
pub mod waveform;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

pub use adapter::{AdapterSignals, DeviceAdapter, PortConvention};
pub use clock::{Phase, SimClock};
pub use device::{Device, PortDecl, PortDirection};
pub use driver::{DriverConfig, SimulationDriver, StepResult};
pub use error::SimError;
pub use models::{CombMultiplier, EnableMultiplier, StreamMultiplier, OPERAND_BITS};
pub use sink::{Mismatch, StreamSink};
pub use source::StreamSource;
pub use stimulus::Stimulus;
pub use stream::{EndpointDelay, Offer};
pub use trace::{TraceRecorder, TraceSignal};
pub use verdict::Verdict;
pub use waveform::{SignalId, VcdRecorder, WaveformRecorder};

/// Instance name of the device in traces and waveforms.
pub const DEVICE_NAME: &str = "imul";

/// Configuration for a harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessOptions {
    /// Which multiplier interface to drive.
    pub convention: PortConvention,
    /// Source throttling.
    pub source_delay: EndpointDelay,
    /// Sink throttling.
    pub sink_delay: EndpointDelay,
    /// Reset, drain and limit policy.
    pub driver: DriverConfig,
    /// Optional path for VCD output.
    pub waveform_path: Option<PathBuf>,
}

impl HarnessOptions {
    /// Default options for the given convention.
    pub fn new(convention: PortConvention) -> Self {
        Self {
            convention,
            source_delay: EndpointDelay::default(),
            sink_delay: EndpointDelay::default(),
            driver: DriverConfig::default(),
            waveform_path: None,
        }
    }
}

/// High-level entry point: runs the native multiplier over `stimulus`.
///
/// Builds the device for `options.convention`, wires the endpoints,
/// optionally attaches a VCD recorder, and runs to completion.
pub fn simulate(stimulus: &Stimulus, options: &HarnessOptions) -> Result<Verdict, SimError> {
    let adapter = DeviceAdapter::native(options.convention, DEVICE_NAME, OPERAND_BITS)?;
    let source = StreamSource::new(
        adapter.ingress_width(),
        stimulus.inputs.iter().copied(),
        options.source_delay,
    )?;
    let sink = StreamSink::new(
        adapter.egress_width(),
        stimulus.expected.iter().copied(),
        options.sink_delay,
    )?;
    let mut driver = SimulationDriver::new(source, adapter, sink, options.driver)?;

    if let Some(path) = &options.waveform_path {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        driver.attach_waveform(Box::new(VcdRecorder::new(writer)))?;
    }

    driver.run_to_completion()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_options_default() {
        let options = HarnessOptions::new(PortConvention::Streaming);
        assert_eq!(options.source_delay, EndpointDelay::default());
        assert_eq!(options.driver.reset_cycles, 2);
        assert_eq!(options.driver.drain_cycles, 3);
        assert!(options.waveform_path.is_none());
    }

    #[test]
    fn simulate_each_convention() {
        let stimulus = Stimulus::from_pairs(&[(6, 7), (100, 100)]).unwrap();
        for convention in [
            PortConvention::Combinational,
            PortConvention::EnableQualified,
            PortConvention::Streaming,
        ] {
            let verdict = simulate(&stimulus, &HarnessOptions::new(convention)).unwrap();
            assert!(verdict.passed(), "{convention:?}");
            assert_eq!(verdict.checks, 2);
        }
    }

    #[test]
    fn simulate_writes_vcd() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waves.vcd");
        let mut options = HarnessOptions::new(PortConvention::Streaming);
        options.waveform_path = Some(path.clone());
        simulate(&Stimulus::from_pairs(&[(2, 2)]).unwrap(), &options).unwrap();
        let vcd = std::fs::read_to_string(&path).unwrap();
        assert!(vcd.contains("$var wire 64"));
        assert!(vcd.contains("imul.ostream.msg"));
    }

    #[test]
    fn simulate_missing_waveform_dir_fails() {
        let mut options = HarnessOptions::new(PortConvention::Streaming);
        options.waveform_path = Some(PathBuf::from("/nonexistent/dir/waves.vcd"));
        let err = simulate(&Stimulus::default(), &options).unwrap_err();
        assert!(matches!(err, SimError::WaveformIo(_)));
    }
}
