//! Covertly - hide a message inside an ordinary file
//!
//! CLI over the covertly engine: encode, decode and inspect carriers.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use covertly::Config;

use commands::{CommandExecutor, DecodeCommand, EncodeCommand, InspectCommand};

/// Covertly - hide a message inside an ordinary file
///
/// Images, text, audio, video, PDF and DOCX carriers are supported.
/// The password is a tag checked on decode, not encryption.
#[derive(Parser)]
#[command(name = "covertly")]
#[command(version)]
#[command(about = "Hide a short message in images, text, audio, video, PDF and DOCX files")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.covertly/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "covertly=debug" (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a message in a carrier file
    Encode(EncodeCommand),

    /// Reveal a hidden message
    Decode(DecodeCommand),

    /// Show carrier capacity
    Inspect(InspectCommand),
}

fn init_tracing(cli_filter: Option<&str>, config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(cli_filter.or(config_filter).unwrap_or("warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };

    init_tracing(cli.log_level.as_deref(), config.log_filter.as_deref());

    match &cli.command {
        Commands::Encode(cmd) => cmd.execute(&config),
        Commands::Decode(cmd) => cmd.execute(&config),
        Commands::Inspect(cmd) => cmd.execute(&config),
    }
}
