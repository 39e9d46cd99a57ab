//! Encode command - hide a message in a carrier file.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::debug;

use covertly::Config;

use super::{carrier_kind, default_output_path, write_atomic, CommandExecutor};

/// Hide a message inside a carrier file.
///
/// The carrier kind is picked from the file extension:
/// png/jpg/jpeg, txt, pdf, docx, wav/mp3, mp4/avi/mov.
/// Images are written as PNG and audio as WAV so the hidden bits survive.
#[derive(Args, Debug)]
pub struct EncodeCommand {
    /// Path to the carrier file
    #[arg(short, long)]
    pub carrier: PathBuf,

    /// Message to hide
    #[arg(short, long)]
    pub message: String,

    /// Password required to read the message back (empty for none; must not contain ':')
    #[arg(short, long, default_value = "")]
    pub password: String,

    /// Output path (default: <stem><suffix>.<ext> next to the carrier)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CommandExecutor for EncodeCommand {
    fn execute(&self, config: &Config) -> Result<()> {
        if self.message.is_empty() {
            bail!("message must not be empty");
        }

        let (kind, ext) = carrier_kind(&self.carrier)?;
        let bytes = fs::read(&self.carrier)
            .with_context(|| format!("failed to read from {}", self.carrier.display()))?;
        debug!(%kind, bytes = bytes.len(), "carrier loaded");

        let engine = config.engine_builder().build();
        let encoded = engine
            .encode(&bytes, kind, &self.message, &self.password)
            .with_context(|| format!("failed to hide message in {}", self.carrier.display()))?;

        let output = self.output.clone().unwrap_or_else(|| {
            default_output_path(&self.carrier, kind, &ext, &config.output_suffix)
        });
        write_atomic(&output, &encoded)?;

        println!("Encoded {} carrier written to {}", kind, output.display());
        Ok(())
    }
}
