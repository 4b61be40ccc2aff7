//! Per-cycle signal snapshots and their textual rendering.
//!
//! The signal set is fixed when the recorder is built. Each call to
//! [`TraceRecorder::record`] appends one snapshot holding a value for every
//! signal; snapshots are never modified afterwards. When a waveform recorder
//! is attached, value changes are forwarded to it as they are recorded.

use std::fmt::Write as _;

use strobe_common::BitVector;

use crate::error::SimError;
use crate::waveform::{SignalId, WaveformRecorder};

/// Scope name used for waveform output.
const WAVE_SCOPE: &str = "harness";

/// A declared trace signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceSignal {
    /// Dotted signal name, e.g. `src.val` or `imul.out`.
    pub name: String,
    /// Bit width.
    pub width: u32,
}

#[derive(Clone, Debug)]
struct Snapshot {
    cycle: u64,
    values: Vec<BitVector>,
}

/// Append-only log of per-cycle signal values.
pub struct TraceRecorder {
    signals: Vec<TraceSignal>,
    snapshots: Vec<Snapshot>,
    waveform: Option<Box<dyn WaveformRecorder>>,
}

impl TraceRecorder {
    /// Creates a recorder for the given `(name, width)` signals, in row order.
    pub fn new(signals: impl IntoIterator<Item = (String, u32)>) -> Result<Self, SimError> {
        let mut declared: Vec<TraceSignal> = Vec::new();
        for (name, width) in signals {
            if declared.iter().any(|s| s.name == name) {
                return Err(SimError::InvalidTrace {
                    reason: format!("signal '{name}' declared twice"),
                });
            }
            BitVector::zero(width)?;
            declared.push(TraceSignal { name, width });
        }
        Ok(Self {
            signals: declared,
            snapshots: Vec::new(),
            waveform: None,
        })
    }

    /// Attaches a waveform recorder and registers every signal with it.
    pub fn attach_waveform(
        &mut self,
        mut recorder: Box<dyn WaveformRecorder>,
    ) -> Result<(), SimError> {
        recorder.begin_scope(WAVE_SCOPE)?;
        for (idx, sig) in self.signals.iter().enumerate() {
            recorder.register_signal(SignalId::from_raw(idx as u32), &sig.name, sig.width)?;
        }
        recorder.end_scope()?;
        self.waveform = Some(recorder);
        Ok(())
    }

    /// Declared signals, in row order.
    pub fn signals(&self) -> &[TraceSignal] {
        &self.signals
    }

    /// Number of recorded snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Cycle numbers of the recorded snapshots, in order.
    pub fn cycles(&self) -> impl Iterator<Item = u64> + '_ {
        self.snapshots.iter().map(|s| s.cycle)
    }

    /// Appends a snapshot. `values` must match the declared signals in
    /// count and width, and `cycle` must be later than the last snapshot.
    pub fn record(&mut self, cycle: u64, values: Vec<BitVector>) -> Result<(), SimError> {
        if values.len() != self.signals.len() {
            return Err(SimError::InvalidTrace {
                reason: format!(
                    "snapshot has {} values for {} signals",
                    values.len(),
                    self.signals.len()
                ),
            });
        }
        for (sig, value) in self.signals.iter().zip(&values) {
            if sig.width != value.width() {
                return Err(SimError::PortWidthMismatch {
                    name: sig.name.clone(),
                    expected: sig.width,
                    actual: value.width(),
                });
            }
        }
        let previous = self.snapshots.last();
        if let Some(prev) = previous {
            if cycle <= prev.cycle {
                return Err(SimError::protocol(
                    cycle,
                    format!("trace snapshot after cycle {} is out of order", prev.cycle),
                ));
            }
        }

        if let Some(wave) = self.waveform.as_mut() {
            for (idx, value) in values.iter().enumerate() {
                let changed = previous.map_or(true, |p| p.values[idx] != *value);
                if changed {
                    wave.record_change(cycle, SignalId::from_raw(idx as u32), value)?;
                }
            }
        }

        self.snapshots.push(Snapshot { cycle, values });
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<usize, SimError> {
        self.signals
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SimError::UnknownSignal {
                reason: format!("no trace column '{name}'"),
            })
    }

    /// Every recorded value of one signal, oldest first.
    pub fn column(&self, name: &str) -> Result<Vec<BitVector>, SimError> {
        let idx = self.index_of(name)?;
        Ok(self.snapshots.iter().map(|s| s.values[idx]).collect())
    }

    /// Value of `name` recorded at `cycle`.
    pub fn value(&self, name: &str, cycle: u64) -> Result<BitVector, SimError> {
        let idx = self.index_of(name)?;
        self.snapshots
            .iter()
            .find(|s| s.cycle == cycle)
            .map(|s| s.values[idx])
            .ok_or_else(|| SimError::UnknownSignal {
                reason: format!("no snapshot for cycle {cycle}"),
            })
    }

    /// Renders the trace as a table: one row per signal, one column per cycle.
    ///
    /// Single-bit signals print as `0`/`1`, wider ones as zero-padded hex.
    pub fn render(&self) -> String {
        let cell = |value: &BitVector| {
            if value.width() == 1 {
                let digit = if value.as_bool() { "1" } else { "0" };
                digit.to_string()
            } else {
                format!("{value:x}")
            }
        };

        let header: Vec<String> = self.snapshots.iter().map(|s| s.cycle.to_string()).collect();
        let rows: Vec<Vec<String>> = (0..self.signals.len())
            .map(|i| {
                self.snapshots.iter().map(|s| cell(&s.values[i])).collect()
            })
            .collect();

        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(col, h)| {
                rows.iter()
                    .map(|r| r[col].len())
                    .chain(std::iter::once(h.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let name_width = self
            .signals
            .iter()
            .map(|s| s.name.len())
            .chain(std::iter::once("cycle".len()))
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        let mut line = |label: &str, cells: &[String]| {
            let mut text = format!("{label:<name_width$} |");
            for (cell, &width) in cells.iter().zip(&widths) {
                let _ = write!(text, " {cell:>width$}");
            }
            out.push_str(text.trim_end());
            out.push('\n');
        };
        line("cycle", header.as_slice());
        for (sig, row) in self.signals.iter().zip(&rows) {
            line(sig.name.as_str(), row.as_slice());
        }
        out
    }

    /// Finalizes the attached waveform, if any.
    pub fn finish(&mut self) -> Result<(), SimError> {
        if let Some(wave) = self.waveform.as_mut() {
            wave.finalize()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn bit(b: bool) -> BitVector {
        BitVector::from_bool(b)
    }

    fn byte(v: u128) -> BitVector {
        BitVector::new(8, v).unwrap()
    }

    fn recorder() -> TraceRecorder {
        let signals = [("src.val", 1), ("src.msg", 8)];
        TraceRecorder::new(signals.map(|(name, width)| (name.to_string(), width))).unwrap()
    }

    #[test]
    fn columns_follow_records() {
        let mut trace = recorder();
        trace.record(0, vec![bit(true), byte(0x2a)]).unwrap();
        trace.record(1, vec![bit(false), byte(0)]).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(
            trace.column("src.val").unwrap(),
            vec![bit(true), bit(false)]
        );
        assert_eq!(trace.value("src.msg", 0).unwrap(), byte(0x2a));
        assert_eq!(trace.cycles().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn render_is_a_table() {
        let mut trace = recorder();
        trace.record(0, vec![bit(true), byte(0x2a)]).unwrap();
        trace.record(1, vec![bit(false), byte(0x05)]).unwrap();
        let expected = "\
cycle   |  0  1
src.val |  1  0
src.msg | 2a 05
";
        assert_eq!(trace.render(), expected);
    }

    #[test]
    fn render_empty_trace() {
        let trace = recorder();
        assert_eq!(trace.render(), "cycle   |\nsrc.val |\nsrc.msg |\n");
    }

    #[test]
    fn wrong_arity_rejected() {
        let mut trace = recorder();
        let err = trace.record(0, vec![bit(true)]).unwrap_err();
        assert!(matches!(err, SimError::InvalidTrace { .. }));
        assert_eq!(
            err.to_string(),
            "invalid trace: snapshot has 1 values for 2 signals"
        );
        assert!(trace.is_empty());
    }

    #[test]
    fn wrong_width_rejected() {
        let mut trace = recorder();
        let err = trace.record(0, vec![bit(true), bit(true)]).unwrap_err();
        assert!(matches!(err, SimError::PortWidthMismatch { .. }));
    }

    #[test]
    fn out_of_order_cycle_rejected() {
        let mut trace = recorder();
        trace.record(3, vec![bit(true), byte(1)]).unwrap();
        assert!(trace.record(3, vec![bit(true), byte(1)]).is_err());
    }

    #[test]
    fn duplicate_signal_rejected() {
        let signals = vec![("a".to_string(), 1), ("a".to_string(), 1)];
        let err = TraceRecorder::new(signals).err().unwrap();
        assert_eq!(err.to_string(), "invalid trace: signal 'a' declared twice");
    }

    #[test]
    fn unknown_column_rejected() {
        let trace = recorder();
        assert!(matches!(
            trace.column("sink.val"),
            Err(SimError::UnknownSignal { .. })
        ));
    }

    /// Records (cycle, signal) pairs seen by the waveform.
    struct Spy(Rc<RefCell<Vec<(u64, u32)>>>);

    impl WaveformRecorder for Spy {
        fn register_signal(&mut self, _: SignalId, _: &str, _: u32) -> Result<(), SimError> {
            Ok(())
        }
        fn begin_scope(&mut self, _: &str) -> Result<(), SimError> {
            Ok(())
        }
        fn end_scope(&mut self) -> Result<(), SimError> {
            Ok(())
        }
        fn record_change(
            &mut self,
            cycle: u64,
            id: SignalId,
            _: &BitVector,
        ) -> Result<(), SimError> {
            self.0.borrow_mut().push((cycle, id.as_raw()));
            Ok(())
        }
        fn finalize(&mut self) -> Result<(), SimError> {
            Ok(())
        }
    }

    #[test]
    fn waveform_sees_only_changes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut trace = recorder();
        let spy = Spy(Rc::clone(&seen));
        trace.attach_waveform(Box::new(spy)).unwrap();
        trace.record(0, vec![bit(true), byte(1)]).unwrap();
        trace.record(1, vec![bit(true), byte(2)]).unwrap();
        trace.record(2, vec![bit(true), byte(2)]).unwrap();
        trace.finish().unwrap();
        assert_eq!(*seen.borrow(), vec![(0, 0), (0, 1), (1, 1)]);
    }
}
