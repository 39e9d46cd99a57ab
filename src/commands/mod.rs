//! Command module - Strategy pattern for CLI commands.
//!
//! Each command is a separate module implementing the `CommandExecutor` trait.

mod decode;
mod encode;
mod inspect;

pub use decode::DecodeCommand;
pub use encode::EncodeCommand;
pub use inspect::InspectCommand;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use covertly::{CarrierKind, Config, Engine};

/// Trait for command execution - Strategy pattern.
///
/// Each command struct holds its parsed arguments and implements
/// this trait to define its execution logic.
pub trait CommandExecutor {
    /// Executes the command with its parsed arguments.
    fn execute(&self, config: &Config) -> Result<()>;
}

/// Lower-cased extension of `path`, without the dot.
pub(crate) fn file_extension(path: &Path) -> Result<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .with_context(|| format!("{} has no file extension", path.display()))
}

/// Resolves the carrier kind from the file extension.
pub(crate) fn carrier_kind(path: &Path) -> Result<(CarrierKind, String)> {
    let ext = file_extension(path)?;
    let kind = CarrierKind::from_extension(&ext)?;
    Ok((kind, ext))
}

/// `<dir>/<stem><suffix>.<ext>` next to the carrier.
pub(crate) fn default_output_path(
    carrier: &Path,
    kind: CarrierKind,
    input_ext: &str,
    suffix: &str,
) -> PathBuf {
    let stem = carrier
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = Engine::output_extension(kind, input_ext);
    carrier.with_file_name(format!("{stem}{suffix}.{ext}"))
}

/// Writes `bytes` to `path` via a tempfile in the same directory, so the
/// target is either the old file or the complete new one.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file =
        tempfile::NamedTempFile::new_in(dir).context("failed to create tempfile")?;
    temp_file
        .write_all(bytes)
        .context("failed to write to tempfile")?;
    temp_file.flush().context("failed to flush tempfile")?;
    temp_file
        .as_file()
        .sync_all()
        .context("failed to sync file prior to rename")?;

    temp_file
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write to {}", path.display()))?;
    Ok(())
}
