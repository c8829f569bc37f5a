//! `bpsr` binary entry point.
//!
//! # Usage
//!
//! ```bash
//! # Decode combat packets into JSONL (stats to stdout)
//! bpsr decode capture.bin combat.jsonl
//!
//! # Reduce decoded combat data into a DPS summary
//! bpsr dps combat.jsonl dps.json
//!
//! # Extract trading-center listings
//! bpsr trade-decode capture.bin listings.json
//!
//! # Rebuild the item mapping from a data dump
//! bpsr update-items -s ref/StarResonanceData
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use bpsr_cli::commands;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// BPSR capture decoding toolkit
#[derive(Parser, Debug)]
#[command(name = "bpsr")]
#[command(about = "Decode BPSR network captures into combat and trading data")]
#[command(version)]
struct Args {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode combat packets from a binary capture into JSONL
    Decode {
        /// Binary capture file
        capture: PathBuf,
        /// Destination JSONL file
        output: PathBuf,
        /// Write parsing statistics to this path instead of stdout
        #[arg(long)]
        stats_out: Option<PathBuf>,
    },
    /// Reduce decoded combat JSONL into a DPS summary
    Dps {
        /// Decoded combat JSONL file
        decoded: PathBuf,
        /// Destination summary JSON file
        output: PathBuf,
    },
    /// Decode trading-center listings from a binary capture
    TradeDecode {
        /// Binary capture file
        capture: PathBuf,
        /// Destination listings JSON file
        output: PathBuf,
        /// Skip item name resolution
        #[arg(long)]
        no_item_names: bool,
        /// Suppress progress output
        #[arg(long)]
        quiet: bool,
    },
    /// Rebuild the item id → name mapping from game data dumps
    UpdateItems {
        /// Directory or file to scan for item tables (repeatable)
        #[arg(short = 's', long = "source")]
        sources: Vec<PathBuf>,
        /// Destination path for the generated mapping
        #[arg(short = 'o', long, default_value = "data/game-data/item_name_map.json")]
        output: PathBuf,
        /// Indentation width for the JSON output
        #[arg(long, default_value_t = 2)]
        indent: usize,
        /// Suppress informational output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    // Logs go to stderr; stdout carries machine-readable output only.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match &args.command {
        Command::Decode { capture, output, stats_out } => {
            commands::run_decode(capture, output, stats_out.as_deref())
        },
        Command::Dps { decoded, output } => commands::run_dps(decoded, output),
        Command::TradeDecode { capture, output, no_item_names, quiet } => {
            commands::run_trade_decode(capture, output, *no_item_names, *quiet)
        },
        Command::UpdateItems { sources, output, indent, quiet } => {
            commands::run_update_items(sources, output, *indent, *quiet)
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::from(err.exit_code())
        },
    }
}
