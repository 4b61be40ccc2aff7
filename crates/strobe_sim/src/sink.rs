//! Synthetic downstream consumer and golden-reference checker.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use strobe_common::BitVector;

use crate::error::SimError;
use crate::stream::{DelayCounter, EndpointDelay};

/// A committed transfer whose payload differed from the expected message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Cycle on which the transfer committed.
    pub cycle: u64,
    /// Golden-reference message.
    pub expected: BitVector,
    /// Message observed on the data lines.
    pub actual: BitVector,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle {}: expected {}, got {}",
            self.cycle, self.expected, self.actual
        )
    }
}

/// What the sink saw during evaluation of the current cycle.
#[derive(Clone, Copy, Debug)]
struct Observation {
    valid: bool,
    ready: bool,
    msg: BitVector,
}

/// Stream sink: accepts messages and checks each against an expected queue.
///
/// Mismatches never stop the sink; they are recorded and the expected
/// message is consumed as if it had matched, so later transfers stay aligned.
#[derive(Clone, Debug)]
pub struct StreamSink {
    width: u32,
    expected: VecDeque<BitVector>,
    delay: DelayCounter,
    observed: Option<Observation>,
    mismatches: Vec<Mismatch>,
    tally: String,
}

impl StreamSink {
    /// Creates a sink expecting `width`-bit messages.
    ///
    /// Fails with [`SimError::InvalidStimulus`] if any message has another width.
    pub fn new(
        width: u32,
        msgs: impl IntoIterator<Item = BitVector>,
        delay: EndpointDelay,
    ) -> Result<Self, SimError> {
        let expected: VecDeque<BitVector> = msgs.into_iter().collect();
        if let Some(bad) = expected.iter().find(|m| m.width() != width) {
            return Err(SimError::InvalidStimulus {
                reason: format!("expected message {bad} is not {width} bits wide"),
            });
        }
        // Rejects a zero or oversized width up front.
        BitVector::zero(width)?;
        Ok(Self {
            width,
            expected,
            delay: DelayCounter::new(delay),
            observed: None,
            mismatches: Vec::new(),
            tally: String::new(),
        })
    }

    /// Message width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Reinitializes the delay policy; expected messages are kept.
    pub fn reset(&mut self) {
        self.delay.reset();
        self.observed = None;
    }

    /// Readiness for the current cycle. Depends only on sink state.
    pub fn ready(&self) -> bool {
        !self.expected.is_empty() && self.delay.elapsed()
    }

    /// Returns the next expected message.
    pub fn peek_expected(&self, cycle: u64) -> Result<&BitVector, SimError> {
        self.expected
            .front()
            .ok_or(SimError::QueueExhaustionMisuse {
                endpoint: "sink",
                cycle,
            })
    }

    /// Samples the producer's signals for this cycle and returns readiness.
    pub fn evaluate(&mut self, valid: bool, msg: BitVector) -> Result<bool, SimError> {
        if msg.width() != self.width {
            return Err(SimError::PortWidthMismatch {
                name: "sink".to_string(),
                expected: self.width,
                actual: msg.width(),
            });
        }
        let ready = self.ready();
        self.observed = Some(Observation { valid, ready, msg });
        Ok(ready)
    }

    /// Commits the cycle, checking any transferred message.
    ///
    /// Returns true if a message was transferred.
    pub fn tick(&mut self, cycle: u64) -> Result<bool, SimError> {
        let obs = self
            .observed
            .take()
            .ok_or_else(|| SimError::protocol(cycle, "sink tick before evaluate"))?;
        let transferred = obs.valid && obs.ready;
        if transferred {
            let expected = *self.peek_expected(cycle)?;
            self.expected.pop_front();
            if expected == obs.msg {
                self.tally.push('+');
            } else {
                tracing::warn!(cycle, %expected, actual = %obs.msg, "sink mismatch");
                self.tally.push('-');
                self.mismatches.push(Mismatch {
                    cycle,
                    expected,
                    actual: obs.msg,
                });
            }
        }
        self.delay.commit(transferred);
        Ok(transferred)
    }

    /// True once every expected message has been received.
    pub fn done(&self) -> bool {
        self.expected.is_empty()
    }

    /// Expected messages not yet received.
    pub fn remaining(&self) -> usize {
        self.expected.len()
    }

    /// Mismatches recorded so far.
    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// One `+` (match) or `-` (mismatch) per checked transfer, in order.
    pub fn tally(&self) -> &str {
        &self.tally
    }

    /// Number of transfers checked so far.
    pub fn checks(&self) -> usize {
        self.tally.len()
    }
}
