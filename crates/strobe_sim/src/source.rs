//! Synthetic upstream producer.

use std::collections::VecDeque;

use strobe_common::BitVector;

use crate::error::SimError;
use crate::stream::{DelayCounter, EndpointDelay, Offer};

/// Stream source: offers queued messages in order, one per transfer.
///
/// Each cycle the driver calls [`evaluate`](Self::evaluate) to obtain the
/// [`Offer`], then [`tick`](Self::tick) with the consumer's readiness to
/// commit. The front message is popped only on a committed transfer.
#[derive(Clone, Debug)]
pub struct StreamSource {
    width: u32,
    queue: VecDeque<BitVector>,
    delay: DelayCounter,
    offer: Option<Offer>,
    sent: usize,
}

impl StreamSource {
    /// Creates a source of `width`-bit messages.
    ///
    /// Fails with [`SimError::InvalidStimulus`] if any message has another width.
    pub fn new(
        width: u32,
        msgs: impl IntoIterator<Item = BitVector>,
        delay: EndpointDelay,
    ) -> Result<Self, SimError> {
        let queue: VecDeque<BitVector> = msgs.into_iter().collect();
        if let Some(bad) = queue.iter().find(|m| m.width() != width) {
            return Err(SimError::InvalidStimulus {
                reason: format!("source message {bad} is not {width} bits wide"),
            });
        }
        // Rejects a zero or oversized width up front.
        BitVector::zero(width)?;
        Ok(Self {
            width,
            queue,
            delay: DelayCounter::new(delay),
            offer: None,
            sent: 0,
        })
    }

    /// Message width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Reinitializes the delay policy; queued messages are kept.
    pub fn reset(&mut self) {
        self.delay.reset();
        self.offer = None;
    }

    /// Returns the next message to send.
    pub fn peek(&self, cycle: u64) -> Result<&BitVector, SimError> {
        self.queue
            .front()
            .ok_or(SimError::QueueExhaustionMisuse {
                endpoint: "source",
                cycle,
            })
    }

    /// Computes this cycle's offer. Repeated calls before `tick` return the
    /// same offer and leave the queue untouched.
    pub fn evaluate(&mut self, cycle: u64) -> Result<Offer, SimError> {
        let offer = if !self.queue.is_empty() && self.delay.elapsed() {
            Offer {
                valid: true,
                msg: *self.peek(cycle)?,
            }
        } else {
            Offer {
                valid: false,
                msg: BitVector::zero(self.width)?,
            }
        };
        self.offer = Some(offer);
        Ok(offer)
    }

    /// Commits the cycle. Returns true if a message was transferred.
    pub fn tick(&mut self, cycle: u64, ready: bool) -> Result<bool, SimError> {
        let offer = self
            .offer
            .take()
            .ok_or_else(|| SimError::protocol(cycle, "source tick before evaluate"))?;
        let transferred = offer.valid && ready;
        if transferred {
            self.queue.pop_front();
            self.sent += 1;
        }
        self.delay.commit(transferred);
        Ok(transferred)
    }

    /// True once every message has been transferred.
    pub fn done(&self) -> bool {
        self.queue.is_empty()
    }

    /// Messages still queued.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Messages transferred so far.
    pub fn sent(&self) -> usize {
        self.sent
    }
}
