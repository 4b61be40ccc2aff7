//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{DeviceVariant, HarnessConfig};
use std::path::Path;

/// File name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "strobe.toml";

/// Loads and validates a `strobe.toml` configuration from a project directory.
///
/// Reads `<project_dir>/strobe.toml`, parses it, and validates the values.
pub fn load_config(project_dir: &Path) -> Result<HarnessConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `strobe.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<HarnessConfig, ConfigError> {
    let config: HarnessConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are consistent.
///
/// Also called by the CLI after command-line overrides are applied.
pub fn validate_config(config: &HarnessConfig) -> Result<(), ConfigError> {
    if config.harness.reset_cycles == 0 {
        return Err(ConfigError::ValidationError(
            "harness.reset_cycles must be at least 1".to_string(),
        ));
    }
    if config.harness.max_cycles == 0 {
        return Err(ConfigError::ValidationError(
            "harness.max_cycles must be at least 1".to_string(),
        ));
    }
    // Only the streaming convention can stall the device, so a sink that
    // refuses results would drop them on the other two.
    if config.harness.variant != DeviceVariant::Streaming && !config.sink.is_back_to_back() {
        return Err(ConfigError::ValidationError(format!(
            "sink delays require the streaming variant (got {:?})",
            config.harness.variant
        )));
    }
    if let Some(vcd) = &config.trace.vcd {
        if vcd.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "trace.vcd must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DelayPolicy;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn parse_empty_config() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.harness.variant, DeviceVariant::Streaming);
        assert_eq!(config.harness.reset_cycles, 2);
        assert_eq!(config.harness.drain_cycles, 3);
        assert_eq!(config.harness.max_cycles, 10_000);
        assert!(config.source.is_back_to_back());
        assert!(config.sink.is_back_to_back());
        assert!(config.trace.textwave);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[harness]
variant = "streaming"
reset_cycles = 1
drain_cycles = 5
max_cycles = 500

[source]
initial_delay = 2
interval_delay = 1

[sink]
initial_delay = 0
interval_delay = 3

[trace]
textwave = false
line_trace = true
vcd = "waves/imul.vcd"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.harness.reset_cycles, 1);
        assert_eq!(config.harness.drain_cycles, 5);
        assert_eq!(config.harness.max_cycles, 500);
        assert_eq!(
            config.source,
            DelayPolicy {
                initial_delay: 2,
                interval_delay: 1
            }
        );
        assert_eq!(config.sink.interval_delay, 3);
        assert!(!config.trace.textwave);
        assert!(config.trace.line_trace);
        assert_eq!(config.trace.vcd, Some(PathBuf::from("waves/imul.vcd")));
    }

    #[test]
    fn zero_reset_cycles_errors() {
        let err = load_config_from_str("[harness]\nreset_cycles = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_max_cycles_errors() {
        let err = load_config_from_str("[harness]\nmax_cycles = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn sink_delay_needs_streaming() {
        let toml = r#"
[harness]
variant = "enable"

[sink]
interval_delay = 1
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("streaming"));
    }

    #[test]
    fn source_delay_allowed_on_combinational() {
        let toml = r#"
[harness]
variant = "combinational"

[source]
initial_delay = 4
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.source.initial_delay, 4);
    }

    #[test]
    fn empty_vcd_path_errors() {
        let err = load_config_from_str("[trace]\nvcd = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_project_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[harness]\nvariant = \"combinational\"\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.harness.variant, DeviceVariant::Combinational);
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
