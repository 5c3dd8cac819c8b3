//! # fiber CLI
//!
//! Reference host for the fiber core: lists and inspects the bundled demo
//! controllers, and drives a simulated frame loop from a YAML scenario.

mod commands;
mod demo;
mod scenario;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fiber")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available controller types
    List {
        /// Include hidden types
        #[arg(long)]
        all: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show channels and default model fields of one controller type
    Inspect {
        /// Type name or display name
        name: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run a scripted scenario through the frame loop
    Run {
        /// Scenario file (YAML)
        scenario: PathBuf,

        /// Override the number of frames to simulate
        #[arg(long)]
        frames: Option<u32>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::List { all, json } => commands::list_types(all, json),
        Commands::Inspect { name, json } => commands::inspect_type(&name, json),
        Commands::Run {
            scenario,
            frames,
            json,
        } => commands::run_scenario(&scenario, frames, json),
    }
}
