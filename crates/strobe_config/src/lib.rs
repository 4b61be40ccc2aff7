//! Parsing and validation of `strobe.toml` harness configuration files.
//!
//! This crate reads the harness configuration file and produces a strongly-typed
//! [`HarnessConfig`] describing the device convention, reset and drain policy,
//! endpoint delay policies, and trace outputs.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    load_config, load_config_file, load_config_from_str, validate_config, CONFIG_FILE_NAME,
};
pub use types::*;
