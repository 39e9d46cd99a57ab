//! Error types for embedding and extraction.
//!
//! `StegoError` is the library-level taxonomy. A missing message or a password
//! mismatch is not an error: see [`crate::payload::Extraction`].

use thiserror::Error;

/// Errors that can occur while embedding or extracting a message.
#[derive(Error, Debug)]
pub enum StegoError {
    /// File extension is not in the carrier dispatch table.
    #[error("Unsupported carrier format: {0}")]
    UnsupportedFormat(String),

    /// The carrier could not be converted to its canonical form.
    #[error("Carrier normalization failed: {0}")]
    NormalizationFailure(String),

    /// The payload needs more slots than the carrier has.
    #[error("Carrier too small: need {needed} slots, have {available}")]
    CapacityExceeded { needed: usize, available: usize },

    /// Extracted bytes are not valid UTF-8 text.
    #[error("Extracted payload is not valid text")]
    Malformed,

    /// Password contains the frame separator and could never verify.
    #[error("Password must not contain ':'")]
    InvalidPassword,

    /// A codec capsule failed to re-serialize the carrier.
    #[error("Carrier write error: {0}")]
    Carrier(String),

    /// The operation was aborted through its cancel token.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures surfaced to the request layer.
///
/// Each variant carries a stable machine-readable code via [`Failure::code`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    #[error("unsupported file format")]
    UnsupportedFormat,

    #[error("failed to encode file")]
    EncodeFailed,

    #[error("failed to decode file")]
    DecodeFailed,
}

impl Failure {
    /// Returns the wire code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Failure::UnsupportedFormat => "unsupported_format",
            Failure::EncodeFailed => "encode_failed",
            Failure::DecodeFailed => "decode_failed",
        }
    }
}
