//! Stepwise CLI entry point.
//!
//! Binary name: `stepwise`
//!
//! Parses CLI arguments, sets up tracing, then dispatches to the command
//! handler. Handlers return the process exit code: a FAILED run or a failed
//! check exits non-zero.

mod cli;

use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = stepwise_observe::verbosity_filter(cli.verbose, cli.quiet);
    if let Err(e) = stepwise_observe::init_tracing(filter, cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let output = cli::Output {
        json: cli.json,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Run(args) => cli::run::run_workflow(args, output).await,
        Commands::Check(args) => cli::check::check_output(args, output).await,
        Commands::Validate { file } => cli::document::validate_file(&file, output),
        Commands::Export { file } => cli::document::export_file(&file),
        Commands::Import { file } => cli::document::import_file(&file).await,
    };

    stepwise_observe::shutdown_tracing();
    result
}
