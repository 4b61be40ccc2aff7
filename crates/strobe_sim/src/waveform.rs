//! Waveform recording for harness runs.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! implements the IEEE 1364 Value Change Dump (VCD) format, producing text
//! files that can be viewed in GTKWave, Surfer, or other waveform viewers.
//! One VCD time unit corresponds to one harness cycle.

use std::io::Write;

use strobe_common::BitVector;

use crate::error::SimError;

/// Index of a signal in the trace's declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u32);

impl SignalId {
    /// Wraps a raw index.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Trait for recording simulation waveforms.
pub trait WaveformRecorder {
    /// Registers a signal for recording.
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a new scope (hierarchy level) in the waveform.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at the given cycle.
    fn record_change(
        &mut self,
        cycle: u64,
        id: SignalId,
        value: &BitVector,
    ) -> Result<(), SimError>;

    /// Finalizes the waveform output (flush, write trailer, etc.).
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD (Value Change Dump) format recorder following IEEE 1364.
///
/// Signal identifiers use printable ASCII characters starting from `!` (0x21).
/// The first cycle's values form the `$dumpvars` section, which is closed
/// with `$end` before the next timestamp or at finalization.
pub struct VcdRecorder<W: Write> {
    writer: W,
    id_map: Vec<(SignalId, String, u32)>, // (signal_id, id_code, width)
    next_id: u32,
    header_written: bool,
    current_time: Option<u64>,
    in_dumpvars: bool,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a new VCD recorder writing to the given output.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            id_map: Vec::new(),
            next_id: 0,
            header_written: false,
            current_time: None,
            in_dumpvars: false,
        }
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  Strobe co-simulation harness")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1ns")?;
        writeln!(self.writer, "$end")?;
        self.header_written = true;
        Ok(())
    }

    fn close_dumpvars(&mut self) -> Result<(), SimError> {
        if self.in_dumpvars {
            writeln!(self.writer, "$end")?;
            self.in_dumpvars = false;
        }
        Ok(())
    }

    /// Generates a VCD identifier code from a sequential index.
    ///
    /// Multi-character codes are generated for indices >= 94.
    fn make_id_code(index: u32) -> String {
        let mut result = String::new();
        let mut idx = index;
        loop {
            let c = (b'!' + (idx % 94) as u8) as char;
            result.push(c);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        result
    }

    /// Formats a value as a VCD scalar or `b`-prefixed vector.
    fn format_value(value: &BitVector, width: u32) -> String {
        if width == 1 {
            let digit = if value.as_bool() { "1" } else { "0" };
            digit.to_string()
        } else {
            format!("b{:0w$b}", value.value(), w = width as usize)
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError> {
        let id_code = Self::make_id_code(self.next_id);
        self.next_id += 1;

        writeln!(self.writer, "$var wire {width} {id_code} {name} $end")?;

        self.id_map.push((id, id_code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        if !self.header_written {
            self.write_header()?;
        }
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(
        &mut self,
        cycle: u64,
        id: SignalId,
        value: &BitVector,
    ) -> Result<(), SimError> {
        if !self.header_written {
            self.write_header()?;
        }

        if self.current_time != Some(cycle) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
                writeln!(self.writer, "#{cycle}")?;
                writeln!(self.writer, "$dumpvars")?;
                self.in_dumpvars = true;
            } else {
                self.close_dumpvars()?;
                writeln!(self.writer, "#{cycle}")?;
            }
            self.current_time = Some(cycle);
        }

        let (_, id_code, width) = self
            .id_map
            .iter()
            .find(|(sid, _, _)| *sid == id)
            .ok_or_else(|| SimError::UnknownSignal {
                reason: format!("unregistered VCD signal {}", id.as_raw()),
            })?;

        let val_str = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{val_str}{id_code}")?;
        } else {
            writeln!(self.writer, "{val_str} {id_code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            if !self.header_written {
                self.write_header()?;
            }
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.close_dumpvars()?;
        self.writer.flush()?;
        Ok(())
    }
}
