//! Decode command - reveal a hidden message.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use covertly::Config;

use super::{carrier_kind, CommandExecutor};

/// Reveal the message hidden in a carrier file.
///
/// Prints the message, or "no hidden message found" / "incorrect password".
#[derive(Args, Debug)]
pub struct DecodeCommand {
    /// Path to the encoded carrier file
    #[arg(short, long)]
    pub carrier: PathBuf,

    /// Password used at encode time (empty for none)
    #[arg(short, long, default_value = "")]
    pub password: String,
}

impl CommandExecutor for DecodeCommand {
    fn execute(&self, config: &Config) -> Result<()> {
        let (kind, _) = carrier_kind(&self.carrier)?;
        let bytes = fs::read(&self.carrier)
            .with_context(|| format!("failed to read from {}", self.carrier.display()))?;

        let engine = config.engine_builder().build();
        let outcome = engine
            .decode(&bytes, kind, &self.password)
            .with_context(|| format!("failed to decode {}", self.carrier.display()))?;

        println!("{}", outcome.into_user_string());
        Ok(())
    }
}
