//! # timelock CLI entry point
//!
//! Parses command-line arguments, initialises logging, and dispatches to the
//! command handlers in `timelock_cli::commands`. Events go to stdout as JSON
//! lines; logs go to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use timelock_cli::commands::{run, Command};
use timelock_cli::Context;

/// Timelock gate with veto and arbitration.
///
/// State lives in a single JSON snapshot file. Every mutating command loads
/// it, applies one operation as the principal given by `--as`, prints the
/// resulting events, and writes it back.
#[derive(Parser, Debug)]
#[command(name = "timelock", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the state snapshot.
    #[arg(long, global = true, default_value = ".timelock/state.json")]
    state: PathBuf,

    /// Pin "now" to this UNIX second instead of the system clock.
    #[arg(long, global = true)]
    now: Option<u64>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::debug!(state = %cli.state.display(), now = ?cli.now, "timelock CLI starting");

    let ctx = Context {
        state: cli.state,
        now: cli.now,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = run(&ctx, &cli.command, &mut out);
    let _ = out.flush();

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
