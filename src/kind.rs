//! Carrier kinds and the extension dispatch table.

use std::fmt;

use crate::error::StegoError;

/// The closed set of carriers the engine knows how to embed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierKind {
    /// Raster image, normalized to a lossless RGBA raster.
    Image,
    /// Plain UTF-8 text, zero-width suffix.
    Text,
    /// PDF document-information entry.
    Pdf,
    /// DOCX hidden run.
    Docx,
    /// Integer PCM audio.
    Audio,
    /// Raw frame sequence.
    Video,
}

impl CarrierKind {
    /// Every kind, in dispatch-table order.
    pub const ALL: [CarrierKind; 6] = [
        CarrierKind::Image,
        CarrierKind::Text,
        CarrierKind::Pdf,
        CarrierKind::Docx,
        CarrierKind::Audio,
        CarrierKind::Video,
    ];

    /// Maps a file extension (with or without the leading dot, any case) to a kind.
    pub fn from_extension(ext: &str) -> Result<Self, StegoError> {
        let normalized = ext.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "png" | "jpg" | "jpeg" => Ok(CarrierKind::Image),
            "txt" => Ok(CarrierKind::Text),
            "pdf" => Ok(CarrierKind::Pdf),
            "docx" => Ok(CarrierKind::Docx),
            "wav" | "mp3" => Ok(CarrierKind::Audio),
            "mp4" | "avi" | "mov" => Ok(CarrierKind::Video),
            _ => Err(StegoError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Extensions accepted for this kind.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            CarrierKind::Image => &["png", "jpg", "jpeg"],
            CarrierKind::Text => &["txt"],
            CarrierKind::Pdf => &["pdf"],
            CarrierKind::Docx => &["docx"],
            CarrierKind::Audio => &["wav", "mp3"],
            CarrierKind::Video => &["mp4", "avi", "mov"],
        }
    }
}

impl fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CarrierKind::Image => "image",
            CarrierKind::Text => "text",
            CarrierKind::Pdf => "pdf",
            CarrierKind::Docx => "docx",
            CarrierKind::Audio => "audio",
            CarrierKind::Video => "video",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_table() {
        assert_eq!(CarrierKind::from_extension("png").unwrap(), CarrierKind::Image);
        assert_eq!(CarrierKind::from_extension(".JPG").unwrap(), CarrierKind::Image);
        assert_eq!(CarrierKind::from_extension("txt").unwrap(), CarrierKind::Text);
        assert_eq!(CarrierKind::from_extension("pdf").unwrap(), CarrierKind::Pdf);
        assert_eq!(CarrierKind::from_extension("docx").unwrap(), CarrierKind::Docx);
        assert_eq!(CarrierKind::from_extension("mp3").unwrap(), CarrierKind::Audio);
        assert_eq!(CarrierKind::from_extension(".mov").unwrap(), CarrierKind::Video);
    }

    #[test]
    fn test_unknown_extension() {
        let result = CarrierKind::from_extension(".xyz");
        assert!(matches!(result, Err(StegoError::UnsupportedFormat(ext)) if ext == ".xyz"));
    }

    #[test]
    fn test_extensions_round_trip() {
        for kind in CarrierKind::ALL {
            for ext in kind.extensions() {
                assert_eq!(CarrierKind::from_extension(ext).unwrap(), kind);
            }
        }
    }
}
