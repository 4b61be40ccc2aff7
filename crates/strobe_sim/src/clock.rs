//! Simulation clock: the cycle counter and run phase owned by the driver.
//!
//! [`SimClock`] is the single source of cycle progression. Components never
//! hold their own notion of time; the driver passes the current cycle to
//! them explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a simulation run.
///
/// Phases only move forward: `Reset -> Running -> Draining -> Done`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Synchronous reset is being applied.
    Reset,
    /// Stimulus is flowing and responses are being checked.
    Running,
    /// Both endpoints are done; ticking on to flush pipeline state.
    Draining,
    /// Terminal phase.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Reset => "reset",
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Cycle counter plus run phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    cycle: u64,
    phase: Phase,
}

impl SimClock {
    /// Creates a clock at cycle zero in the reset phase.
    pub fn new() -> Self {
        Self {
            cycle: 0,
            phase: Phase::Reset,
        }
    }

    /// Returns the current cycle.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advances to the next cycle.
    pub fn advance(&mut self) {
        self.cycle += 1;
    }

    /// Clears the cycle counter. Only meaningful at the end of reset.
    pub fn clear(&mut self) {
        debug_assert_eq!(
            self.phase,
            Phase::Reset,
            "cycle counter cleared outside reset"
        );
        self.cycle = 0;
    }

    /// Moves to a later phase.
    pub fn enter(&mut self, phase: Phase) {
        debug_assert!(
            phase > self.phase,
            "cannot move phase backwards: {} -> {}",
            self.phase,
            phase
        );
        self.phase = phase;
    }

    /// Returns true once the run has reached [`Phase::Done`].
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle {} ({})", self.cycle, self.phase)
    }
}
