//! Tributary CLI
//!
//! Builds, inspects and runs pipeline files.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tributary",
    version,
    about = "Ingest paginated JSON APIs into a warehouse, then summarize"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, validate and execute a pipeline
    Run(commands::run::RunArgs),
    /// Print the dependency graph without running anything
    Plan {
        /// Path to pipeline JSON file
        pipeline: PathBuf,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate local records against one resource's rules
    Check {
        /// Path to pipeline JSON file
        pipeline: PathBuf,
        /// Resource whose rules apply
        #[arg(long)]
        resource: String,
        /// JSON array of records
        records: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    logging::init(&cli.log_level, cli.log_json);

    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Plan { pipeline, json } => commands::plan::execute(&pipeline, json),
        Commands::Check {
            pipeline,
            resource,
            records,
        } => commands::check::execute(&pipeline, &resource, &records),
    }
}
