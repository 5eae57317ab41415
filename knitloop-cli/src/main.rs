//! knitloop: run one reconciliation loop of the knit backend.
//!
//! # Usage
//!
//! ```text
//! knitloop run --type <LOOP_TYPE> --policy <POLICY> [--config <PATH>] [--hooks <PATH>]
//! knitloop enqueue --type <LOOP_TYPE> [--config <PATH>] [--id <ID>] [--payload <JSON>]
//! ```
//!
//! `--config` defaults to `$KNIT_BACKEND_CONFIG`, `--hooks` to `$KNIT_HOOK_CONFIG`.
//! Log verbosity follows `RUST_LOG` (default `info`).

mod commands;
mod reconciler;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{enqueue::EnqueueArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "knitloop",
    version,
    about = "Run a knit backend control loop",
    long_about = None,
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one loop until its policy stops it or the process is signalled.
    Run(RunArgs),

    /// Add a pending work item to a loop's spool.
    Enqueue(EnqueueArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Enqueue(args) => args.run(),
    }
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
