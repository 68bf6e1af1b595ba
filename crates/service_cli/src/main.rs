//! Hazard CLI - Command Line Operations for Classical Hazard Calculations
//!
//! This is the operational entry point for the hazard engine.
//!
//! # Commands
//!
//! - `hazard run --job <file> [--format table|json]` - Run a calculation
//! - `hazard info --job <file>` - Show realizations, source groups and the
//!   realization association without running the calculation
//!
//! # Architecture
//!
//! As part of the **S**ervice layer, this crate reads job files and drives
//! `hazard_engine`, which in turn builds on `hazard_sources` and `hazard_core`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod error;
mod job;

pub use error::{CliError, Result};

use commands::OutputFormat;
use job::JobSpec;

/// Classical seismic hazard calculations
#[derive(Parser)]
#[command(name = "hazard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a calculation
    Run {
        /// Path to the job file
        #[arg(short, long)]
        job: PathBuf,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show the realizations and their association to source groups
    Info {
        /// Path to the job file
        #[arg(short, long)]
        job: PathBuf,
    },
}

impl Commands {
    fn job_path(&self) -> &PathBuf {
        match self {
            Commands::Run { job, .. } | Commands::Info { job } => job,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = cli.command.job_path().clone();
    let job = JobSpec::from_file(&path)?;

    // RUST_LOG wins over the job's log level
    let fallback = if cli.verbose {
        "debug"
    } else {
        job.calculation.log_level.as_filter_str()
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .init();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Run { format, .. } => {
            let format: OutputFormat = format.parse()?;
            commands::run::run(&job, &path, format)?;
        }
        Commands::Info { .. } => commands::info::run(&job, &path)?,
    }
    Ok(())
}
