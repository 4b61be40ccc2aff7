//! Simulation error types for the co-simulation harness.
//!
//! Every variant of [`SimError`] is fatal: the driver stops issuing cycles
//! and reports the error. Functional mismatches are not errors; they are
//! collected as [`Mismatch`](crate::sink::Mismatch) records instead.

use std::io;

use strobe_common::BitsError;

/// Errors that can occur during harness setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A bit-vector construction or slice was misused.
    #[error(transparent)]
    Bits(#[from] BitsError),

    /// A handshake or evaluate/tick ordering rule was broken.
    #[error("protocol violation at cycle {cycle}: {reason}")]
    ProtocolViolation {
        /// Cycle on which the violation was detected.
        cycle: u64,
        /// Description of the broken rule.
        reason: String,
    },

    /// An endpoint was asked for a message after its queue ran dry.
    #[error("{endpoint} queried for data after exhaustion at cycle {cycle}")]
    QueueExhaustionMisuse {
        /// Which endpoint was queried (`"source"` or `"sink"`).
        endpoint: &'static str,
        /// Cycle on which the query happened.
        cycle: u64,
    },

    /// A port name is not declared by the device.
    #[error("unknown port '{name}'")]
    UnknownPort {
        /// The requested port name.
        name: String,
    },

    /// An output port was written through the input interface.
    #[error("port '{name}' is not an input")]
    NotAnInput {
        /// The offending port name.
        name: String,
    },

    /// A value of the wrong width was driven onto a port.
    #[error("port '{name}' is {expected} bits wide, got a {actual}-bit value")]
    PortWidthMismatch {
        /// The port name.
        name: String,
        /// Declared width of the port.
        expected: u32,
        /// Width of the offered value.
        actual: u32,
    },

    /// The device lacks a port its declared convention requires.
    #[error("device '{device}' does not declare required port '{port}'")]
    MissingPort {
        /// Device instance name.
        device: String,
        /// The missing port name.
        port: String,
    },

    /// A trace or waveform signal was looked up but never declared.
    #[error("unknown signal: {reason}")]
    UnknownSignal {
        /// Description of the bad reference.
        reason: String,
    },

    /// A trace was declared or fed inconsistently.
    #[error("invalid trace: {reason}")]
    InvalidTrace {
        /// Description of the inconsistency.
        reason: String,
    },

    /// The run did not finish within the configured number of cycles.
    #[error("cycle limit exceeded: {limit} cycles")]
    CycleLimitExceeded {
        /// The configured limit.
        limit: u64,
    },

    /// Stimulus values could not be turned into messages.
    #[error("invalid stimulus: {reason}")]
    InvalidStimulus {
        /// Description of the problem.
        reason: String,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}

impl SimError {
    /// Builds a [`SimError::ProtocolViolation`].
    pub fn protocol(cycle: u64, reason: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            cycle,
            reason: reason.into(),
        }
    }

    /// Returns the cycle the error is pinned to, if it has one.
    pub fn cycle(&self) -> Option<u64> {
        match self {
            Self::ProtocolViolation { cycle, .. } | Self::QueueExhaustionMisuse { cycle, .. } => {
                Some(*cycle)
            }
            _ => None,
        }
    }
}
