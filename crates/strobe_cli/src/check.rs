//! `strobe check-config`: validate and print the effective configuration.

use strobe_config::HarnessConfig;

use crate::run::load_harness_config;
use crate::GlobalArgs;

/// Runs the `strobe check-config` command.
///
/// Prints the effective settings to stdout and returns exit code 0, or an
/// error if the configuration cannot be loaded or is invalid.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_harness_config(global)?;
    strobe_config::validate_config(&config)?;
    if !global.quiet {
        print!("{}", describe(&config));
    }
    Ok(0)
}

fn describe(config: &HarnessConfig) -> String {
    let vcd = config
        .trace
        .vcd
        .as_ref()
        .map_or_else(|| "none".into(), |p| p.display().to_string());
    format!(
        "variant       {:?}\n\
         reset_cycles  {}\n\
         drain_cycles  {}\n\
         max_cycles    {}\n\
         source delay  {} initial, {} interval\n\
         sink delay    {} initial, {} interval\n\
         textwave      {}\n\
         line_trace    {}\n\
         vcd           {vcd}\n",
        config.harness.variant,
        config.harness.reset_cycles,
        config.harness.drain_cycles,
        config.harness.max_cycles,
        config.source.initial_delay,
        config.source.interval_delay,
        config.sink.initial_delay,
        config.sink.interval_delay,
        config.trace.textwave,
        config.trace.line_trace,
    )
}
