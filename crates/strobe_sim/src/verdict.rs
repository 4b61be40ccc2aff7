//! Final pass/fail report of a harness run.

use serde::{Deserialize, Serialize};

use crate::sink::Mismatch;

/// Outcome of a completed run.
///
/// A run passes iff no mismatch was recorded. Fatal errors never produce a
/// verdict; they surface as [`SimError`](crate::SimError) instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Cycles simulated after reset, including the drain tail.
    pub cycles: u64,
    /// Sink transfers checked against the golden reference.
    pub checks: usize,
    /// Every mismatch, in cycle order.
    pub mismatches: Vec<Mismatch>,
    /// One `+` or `-` per check.
    pub tally: String,
    /// Rendered signal table, if requested.
    pub textwave: Option<String>,
    /// Per-cycle line trace, if requested.
    pub line_trace: Vec<String>,
}

impl Verdict {
    /// True iff no mismatch was recorded.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Checks that matched.
    pub fn passed_checks(&self) -> usize {
        self.checks.saturating_sub(self.mismatches.len())
    }

    /// Checks that did not match.
    pub fn failed_checks(&self) -> usize {
        self.mismatches.len()
    }

    /// Process exit code: `0` on pass, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// One-line summary, e.g. `Passed 2 of 2`.
    pub fn summary(&self) -> String {
        format!("Passed {} of {}", self.passed_checks(), self.checks)
    }
}
