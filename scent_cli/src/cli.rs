//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "scent", version, about = "Fragrance blending rig CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/scent.toml")]
    pub config: PathBuf,

    /// Optional slot table CSV (strict header); replaces [[slots]] from the config
    #[arg(long, value_name = "FILE")]
    pub slots: Option<PathBuf>,

    /// Log and print as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve command envelopes (JSON lines) until input closes or Ctrl-C
    Run {
        /// Read commands from FILE instead of stdin
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Start recipes as soon as the inventory check passes
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "wait_for_start")]
        auto_start: bool,
        /// Hold accepted recipes until a "start" command arrives
        #[arg(long, action = ArgAction::SetTrue)]
        wait_for_start: bool,
    },
    /// Print persisted stock per slot
    Inventory,
    /// Print the motion plan for a recipe without moving anything
    Plan {
        /// Slot visit order, e.g. 3,1,4
        #[arg(long, value_delimiter = ',', required = true)]
        slots: Vec<u32>,
        /// Proportion per slot (same basis as the manufacture command)
        #[arg(long, value_delimiter = ',', required = true)]
        props: Vec<u32>,
        /// Append the carrier step from this slot
        #[arg(long, value_name = "SLOT")]
        carrier: Option<u32>,
    },
    /// Run a built-in recipe against simulated hardware and in-memory stock
    SelfCheck,
}
