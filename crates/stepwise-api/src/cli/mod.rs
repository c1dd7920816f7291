//! CLI command definitions and dispatch for the `stepwise` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod check;
pub mod display;
pub mod document;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Run validated, multi-step LLM workflows.
#[derive(Parser)]
#[command(name = "stepwise", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed logs (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export tracing spans to stdout via OpenTelemetry.
    #[arg(long, global = true, hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow file and report the finished run.
    Run(RunArgs),

    /// Apply one validation rule to a piece of text.
    Check(CheckArgs),

    /// Load a workflow file and check its structure.
    Validate {
        /// Path to a workflow (.json, .yaml or .yml).
        file: PathBuf,
    },

    /// Print a workflow as canonical JSON.
    Export {
        /// Path to a workflow (.json, .yaml or .yml).
        file: PathBuf,
    },

    /// Re-identify an exported JSON workflow and print it with a fresh id.
    Import {
        /// Path to an exported JSON workflow.
        file: PathBuf,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to a workflow (.json, .yaml or .yml).
    pub file: PathBuf,

    /// Initial context handed to the first step.
    #[arg(long, default_value = "")]
    pub context: String,

    /// Use the offline stub model instead of the Unbound gateway.
    #[arg(long)]
    pub stub: bool,

    /// Config file to use instead of the default location.
    #[arg(long, env = "STEPWISE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Rule as JSON, e.g. '{"type":"contains","expected":"def"}'.
    #[arg(long)]
    pub rule: String,

    /// File holding the text to check (reads stdin when omitted).
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Use the offline stub model for `llm_judge` rules.
    #[arg(long)]
    pub stub: bool,

    /// Config file to use instead of the default location.
    #[arg(long, env = "STEPWISE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Global output flags shared by every handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}
