//! Inspect command - show how much a carrier can hold.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use covertly::{CarrierInfo, Config, Framing};

use super::{carrier_kind, CommandExecutor};

/// Show carrier kind, framing and capacity.
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Path to the carrier file
    #[arg(short, long)]
    pub carrier: PathBuf,
}

impl CommandExecutor for InspectCommand {
    fn execute(&self, config: &Config) -> Result<()> {
        let (kind, _) = carrier_kind(&self.carrier)?;
        let bytes = fs::read(&self.carrier)
            .with_context(|| format!("failed to read from {}", self.carrier.display()))?;

        let engine = config.engine_builder().build();
        let info = engine
            .inspect(&bytes, kind)
            .with_context(|| format!("failed to open {}", self.carrier.display()))?;

        print!("{}", render(&info));
        Ok(())
    }
}

fn render(info: &CarrierInfo) -> String {
    let framing = match info.framing {
        Some(Framing::Exact) => "zero-width suffix",
        Some(Framing::Sealed) => "checksummed LSB frame",
        None => "document metadata",
    };
    let capacity = match info.capacity_bits {
        Some(bits) => format!("{bits} bits"),
        None => "unbounded".to_string(),
    };
    let max_frame = match info.max_frame_bytes {
        Some(bytes) => format!("{bytes} bytes"),
        None => "unbounded".to_string(),
    };

    format!(
        "Kind:      {}\nChannel:   {}\nCapacity:  {}\nMax frame: {}\n",
        info.kind, framing, capacity, max_frame
    )
}
