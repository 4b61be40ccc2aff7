//! `strobe run`: drive the multiplier over command-line operands.
//!
//! Loads the harness configuration, applies command-line overrides, builds
//! the stimulus, and runs the harness. The signal table and line trace go to
//! stdout; the summary, tally and any mismatches go to stderr.

use std::path::{Path, PathBuf};

use strobe_config::{DeviceVariant, HarnessConfig, CONFIG_FILE_NAME};
use strobe_sim::{
    simulate, DriverConfig, EndpointDelay, HarnessOptions, PortConvention, Stimulus, Verdict,
};

use crate::{GlobalArgs, RunArgs, Variant};

/// Runs the `strobe run` command.
///
/// Returns exit code 0 if every result matched, 1 otherwise. Fatal harness
/// errors are returned as `Err`.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    // Step 1: Load config and apply overrides
    let mut config = load_harness_config(global)?;
    apply_overrides(&mut config, args);
    strobe_config::validate_config(&config)?;

    // Step 2: Build stimulus
    let stimulus = Stimulus::parse(&args.values)?;
    let options = harness_options(&config);
    tracing::debug!(?options, "harness options");

    if !global.quiet {
        eprintln!(
            "   Simulating {:?} multiplier over {} operation(s)",
            options.convention,
            stimulus.len()
        );
    }

    // Step 3: Run
    let verdict = simulate(&stimulus, &options)?;

    // Step 4: Report
    if let Some(textwave) = &verdict.textwave {
        print!("{textwave}");
    }
    for line in &verdict.line_trace {
        println!("{line}");
    }
    for mismatch in &verdict.mismatches {
        eprintln!("MISMATCH: {mismatch}");
    }
    if let Some(path) = &options.waveform_path {
        if !global.quiet {
            eprintln!("   Waveform written to {}", path.display());
        }
    }
    if let Some(dir) = &args.results {
        let path = write_results(Path::new(dir), &args.outname, &verdict)?;
        if !global.quiet {
            eprintln!("   Results written to {}", path.display());
        }
    }
    if !global.quiet {
        eprintln!("   {} [{}]", verdict.summary(), verdict.tally);
    }

    Ok(verdict.exit_code())
}

/// Loads `--config` if given, else `strobe.toml` in the working directory if
/// present, else the defaults.
pub fn load_harness_config(
    global: &GlobalArgs,
) -> Result<HarnessConfig, Box<dyn std::error::Error>> {
    if let Some(path) = &global.config {
        return Ok(strobe_config::load_config_file(Path::new(path))?);
    }
    let cwd = std::env::current_dir()?;
    if cwd.join(CONFIG_FILE_NAME).is_file() {
        Ok(strobe_config::load_config(&cwd)?)
    } else {
        Ok(HarnessConfig::default())
    }
}

/// Applies command-line flags on top of the file configuration.
fn apply_overrides(config: &mut HarnessConfig, args: &RunArgs) {
    if let Some(variant) = args.variant {
        config.harness.variant = match variant {
            Variant::Combinational => DeviceVariant::Combinational,
            Variant::Enable => DeviceVariant::Enable,
            Variant::Streaming => DeviceVariant::Streaming,
        };
    }
    if let Some(n) = args.src_initial_delay {
        config.source.initial_delay = n;
    }
    if let Some(n) = args.src_interval_delay {
        config.source.interval_delay = n;
    }
    if let Some(n) = args.sink_initial_delay {
        config.sink.initial_delay = n;
    }
    if let Some(n) = args.sink_interval_delay {
        config.sink.interval_delay = n;
    }
    if let Some(waves) = &args.waves {
        config.trace.vcd = Some(PathBuf::from(waves));
    }
    if args.no_textwave {
        config.trace.textwave = false;
    }
    if args.trace {
        config.trace.line_trace = true;
    }
}

/// Maps the validated configuration onto harness options.
fn harness_options(config: &HarnessConfig) -> HarnessOptions {
    let convention = match config.harness.variant {
        DeviceVariant::Combinational => PortConvention::Combinational,
        DeviceVariant::Enable => PortConvention::EnableQualified,
        DeviceVariant::Streaming => PortConvention::Streaming,
    };
    HarnessOptions {
        convention,
        source_delay: EndpointDelay::new(config.source.initial_delay, config.source.interval_delay),
        sink_delay: EndpointDelay::new(config.sink.initial_delay, config.sink.interval_delay),
        driver: DriverConfig {
            reset_cycles: config.harness.reset_cycles,
            drain_cycles: config.harness.drain_cycles,
            max_cycles: config.harness.max_cycles,
            line_trace: config.trace.line_trace,
            textwave: config.trace.textwave,
        },
        waveform_path: config.trace.vcd.clone(),
    }
}

/// Writes the tally line to `<dir>/<outname>.txt`.
fn write_results(dir: &Path, outname: &str, verdict: &Verdict) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{outname}.txt"));
    std::fs::write(&path, format!("{}\n", verdict.tally))?;
    Ok(path)
}
