//! Strobe CLI: command-line front end for the co-simulation harness.
//!
//! Provides `strobe run` to drive a multiplier through the harness with
//! operands given on the command line, and `strobe check-config` to
//! validate a `strobe.toml`.

#![warn(missing_docs)]

mod check;
mod run;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Strobe: cycle-accurate valid/ready co-simulation harness.
#[derive(Parser, Debug)]
#[command(name = "strobe", version, about = "Strobe co-simulation harness")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output, including the per-cycle line trace.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `strobe.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the harness over operand pairs.
    Run(RunArgs),
    /// Load and validate the configuration, then print it.
    CheckConfig,
}

/// Arguments for the `strobe run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Operands, paired as `in0 in1 in0 in1 ...` (decimal, 0x, 0o or 0b).
    #[arg(required = true, allow_negative_numbers = true)]
    pub values: Vec<String>,

    /// Multiplier interface to drive.
    #[arg(long, value_enum)]
    pub variant: Option<Variant>,

    /// Idle cycles before the source's first message.
    #[arg(long)]
    pub src_initial_delay: Option<u32>,

    /// Idle cycles between source messages.
    #[arg(long)]
    pub src_interval_delay: Option<u32>,

    /// Idle cycles before the sink first accepts.
    #[arg(long)]
    pub sink_initial_delay: Option<u32>,

    /// Idle cycles between sink acceptances.
    #[arg(long)]
    pub sink_interval_delay: Option<u32>,

    /// Output path for a VCD waveform.
    #[arg(long)]
    pub waves: Option<String>,

    /// Do not print the signal table.
    #[arg(long)]
    pub no_textwave: bool,

    /// Print the per-cycle line trace.
    #[arg(long)]
    pub trace: bool,

    /// Directory to write the tally file into.
    #[arg(long)]
    pub results: Option<String>,

    /// Tally file stem inside `--results` (writes `<outname>.txt`).
    #[arg(long, default_value = "imul")]
    pub outname: String,
}

/// Multiplier interface selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// Bare operand and result ports.
    Combinational,
    /// Operands qualified by `in_val`, results by `out_val`.
    Enable,
    /// Valid/ready streams.
    Streaming,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

/// Installs the `tracing` subscriber. `RUST_LOG` takes precedence over flags.
fn init_logging(global: &GlobalArgs) {
    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::CheckConfig => check::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
