//! Configuration types deserialized from `strobe.toml`.

use serde::Deserialize;
use std::path::PathBuf;

/// The top-level harness configuration parsed from `strobe.toml`.
///
/// Every table is optional; an empty file yields [`HarnessConfig::default`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Device convention and cycle schedule.
    #[serde(default)]
    pub harness: HarnessSection,
    /// Delay policy of the stream source.
    #[serde(default)]
    pub source: DelayPolicy,
    /// Delay policy of the stream sink.
    #[serde(default)]
    pub sink: DelayPolicy,
    /// Trace and waveform outputs.
    #[serde(default)]
    pub trace: TraceSection,
}

/// The `[harness]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessSection {
    /// Which port convention the device under test exposes.
    #[serde(default)]
    pub variant: DeviceVariant,
    /// Cycles the synchronous reset is held before stimulus starts.
    #[serde(default = "default_reset_cycles")]
    pub reset_cycles: u32,
    /// Extra cycles simulated after both endpoints are done.
    #[serde(default = "default_drain_cycles")]
    pub drain_cycles: u32,
    /// Upper bound on running cycles before the run is aborted.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u64,
}

impl Default for HarnessSection {
    fn default() -> Self {
        Self {
            variant: DeviceVariant::default(),
            reset_cycles: default_reset_cycles(),
            drain_cycles: default_drain_cycles(),
            max_cycles: default_max_cycles(),
        }
    }
}

fn default_reset_cycles() -> u32 {
    2
}

fn default_drain_cycles() -> u32 {
    3
}

fn default_max_cycles() -> u64 {
    10_000
}

/// Port convention of the device under test.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceVariant {
    /// Plain operand ports and a result port (V1).
    Combinational,
    /// Operand ports qualified by an input valid bit (V2).
    Enable,
    /// Valid/ready stream interfaces (V3, default).
    #[default]
    Streaming,
}

/// Initial and interval delay policy of a stream endpoint.
///
/// Zero in both fields means back-to-back transfers.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DelayPolicy {
    /// Cycles of forced idleness before the first transfer.
    #[serde(default)]
    pub initial_delay: u32,
    /// Cycles of forced idleness between successive transfers.
    #[serde(default)]
    pub interval_delay: u32,
}

impl DelayPolicy {
    /// Returns true if this policy never inserts idle cycles.
    pub fn is_back_to_back(&self) -> bool {
        self.initial_delay == 0 && self.interval_delay == 0
    }
}

/// The `[trace]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceSection {
    /// Print the textual waveform at the end of the run.
    #[serde(default = "default_textwave")]
    pub textwave: bool,
    /// Emit a per-cycle `src > dut > sink` line trace.
    #[serde(default)]
    pub line_trace: bool,
    /// Optional VCD waveform output path.
    #[serde(default)]
    pub vcd: Option<PathBuf>,
}

impl Default for TraceSection {
    fn default() -> Self {
        Self {
            textwave: default_textwave(),
            line_trace: false,
            vcd: None,
        }
    }
}

fn default_textwave() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn variant_all_values() {
        for (input, expected) in [
            ("combinational", DeviceVariant::Combinational),
            ("enable", DeviceVariant::Enable),
            ("streaming", DeviceVariant::Streaming),
        ] {
            let toml = format!("[harness]\nvariant = \"{input}\"\n");
            let config = load_config_from_str(&toml).unwrap();
            assert_eq!(config.harness.variant, expected);
        }
    }

    #[test]
    fn unknown_variant_rejected() {
        let text = "[harness]\nvariant = \"pipelined\"\n";
        assert!(load_config_from_str(text).is_err());
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(load_config_from_str("[source]\nstart_delay = 3\n").is_err());
    }

    #[test]
    fn delay_policy_back_to_back() {
        assert!(DelayPolicy::default().is_back_to_back());
        let delayed = DelayPolicy {
            initial_delay: 2,
            interval_delay: 0,
        };
        assert!(!delayed.is_back_to_back());
    }

    #[test]
    fn trace_defaults() {
        let trace = TraceSection::default();
        assert!(trace.textwave);
        assert!(!trace.line_trace);
        assert!(trace.vcd.is_none());
    }
}
