//! Valid/ready handshake primitives shared by the stream endpoints.
//!
//! A transfer happens on a cycle iff `valid` and `ready` are both asserted
//! during that cycle's evaluation. Endpoints throttle themselves with an
//! [`EndpointDelay`]: a number of idle cycles before the first transfer and
//! between successive transfers.

use serde::{Deserialize, Serialize};
use strobe_common::BitVector;

/// Initial and interval idle cycles imposed by an endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDelay {
    /// Idle cycles before the first transfer.
    pub initial: u32,
    /// Idle cycles between successive transfers.
    pub interval: u32,
}

impl EndpointDelay {
    /// Creates a delay policy.
    pub fn new(initial: u32, interval: u32) -> Self {
        Self { initial, interval }
    }
}

/// Down-counter enforcing an [`EndpointDelay`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct DelayCounter {
    policy: EndpointDelay,
    remaining: u32,
}

impl DelayCounter {
    pub(crate) fn new(policy: EndpointDelay) -> Self {
        Self {
            policy,
            remaining: policy.initial,
        }
    }

    /// Rearms the initial delay.
    pub(crate) fn reset(&mut self) {
        self.remaining = self.policy.initial;
    }

    /// True when the endpoint may take part in a transfer this cycle.
    pub(crate) fn elapsed(&self) -> bool {
        self.remaining == 0
    }

    /// Commits one cycle: a transfer rearms the interval delay, otherwise
    /// the counter runs down.
    pub(crate) fn commit(&mut self, transferred: bool) {
        if transferred {
            self.remaining = self.policy.interval;
        } else {
            self.remaining = self.remaining.saturating_sub(1);
        }
    }
}

/// The producer-side signals of one stream for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Producer asserts a message.
    pub valid: bool,
    /// Payload on the data lines; zero while `valid` is low.
    pub msg: BitVector,
}

/// Renders one channel for a line trace.
///
/// A transfer shows the message in hex; a stalled message shows `#`, an
/// idle channel with a ready consumer is blank, and an idle, stalled
/// channel shows `.`. Every form is padded to the message's hex width.
pub fn channel_trace(valid: bool, ready: bool, msg: &BitVector) -> String {
    let width = msg.hex_digits();
    match (valid, ready) {
        (true, true) => format!("{msg:x}"),
        (true, false) => format!("{:<width$}", "#"),
        (false, true) => " ".repeat(width),
        (false, false) => format!("{:<width$}", "."),
    }
}
