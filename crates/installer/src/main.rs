//! Wiki Family Installer CLI.
//!
//! Installs a single wiki of a family: creates its database artifacts, seeds
//! the main page and writes the settings file. Sysop accounts are managed
//! centrally and never created here.

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::install::InstallCommand;

/// Wiki Family Installer.
#[derive(Parser)]
#[command(
    name = "family-install",
    version,
    about = "Per-wiki installer for wiki families",
    long_about = "Install one wiki of a centrally managed wiki family.\n\n\
                  Runs the standard installation steps in order, skipping sysop\n\
                  creation (accounts are shared across the family) and, on request,\n\
                  interwiki seeding. Steps that find their work already done report\n\
                  a warning instead of failing."
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[allow(clippy::large_enum_variant)]
enum Commands {
    /// Install a wiki.
    ///
    /// Reads options, checks the environment, runs the filtered steps and
    /// writes LocalSettings.toml when nothing failed.
    Install(InstallCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("info,family_installer=debug,family_install=debug")
    } else {
        EnvFilter::new("warn,family_installer=info,family_install=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Install(cmd) => cmd.run().await,
    }
}
