//! Payload framing: `(password, body)` to a flat bit stream and back.
//!
//! Wire format: the frame is `password ":" body` when a password is set,
//! otherwise the body verbatim. Each UTF-8 byte of the frame becomes 8 bits,
//! most-significant bit first. On decode the frame is split at the first `:`.
//!
//! Two details keep that split unambiguous:
//! - a password may not contain `:`, so the first colon is always the separator
//!   when a password is present;
//! - a password-less body containing `:` is written as `":" + body`, an
//!   explicitly empty stored password.
//!
//! LSB channels (image, audio, video) have no natural end, so they carry the
//! frame sealed:
//!
//! ```text
//! [2 bytes] magic "CV"
//! [4 bytes] frame length (big-endian u32)
//! [N bytes] frame
//! [4 bytes] CRC-32 of everything above
//! ```
//!
//! A missing magic or a bad checksum reads as "no message". Text carries
//! the bare frame bits.

use crate::error::StegoError;

/// Separator between password and body.
pub const SEPARATOR: char = ':';

/// Returned as the message when no embedded payload is detected.
pub const NOT_FOUND_SENTINEL: &str = "no hidden message found";

/// Returned as the message when a payload is found but the password does not match.
pub const WRONG_PASSWORD_SENTINEL: &str = "incorrect password";

/// Leading bytes of a sealed frame.
pub const SEAL_MAGIC: [u8; 2] = *b"CV";

/// Magic plus length.
pub const SEAL_HEADER_LEN: usize = SEAL_MAGIC.len() + 4;

/// Bytes a sealed frame adds around the frame itself.
pub const SEAL_OVERHEAD: usize = SEAL_HEADER_LEN + 4;

/// A parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub password: Option<String>,
    pub body: String,
}

/// The text actually embedded in a carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    /// Wraps already-extracted text as a frame.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of extracting and verifying a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Password verified; the hidden body.
    Message(String),
    /// No embedded payload detected.
    NotFound,
    /// A payload is present but the password does not match.
    WrongPassword,
}

impl Extraction {
    /// Collapses the outcome into the user-facing string, sentinels included.
    pub fn into_user_string(self) -> String {
        match self {
            Extraction::Message(body) => body,
            Extraction::NotFound => NOT_FOUND_SENTINEL.to_string(),
            Extraction::WrongPassword => WRONG_PASSWORD_SENTINEL.to_string(),
        }
    }
}

/// Builds the frame for `body` gated by `password` (empty means none).
pub fn serialize(password: &str, body: &str) -> Result<Frame, StegoError> {
    if password.contains(SEPARATOR) {
        return Err(StegoError::InvalidPassword);
    }

    if !password.is_empty() {
        return Ok(Frame(format!("{password}{SEPARATOR}{body}")));
    }

    if body.contains(SEPARATOR) {
        Ok(Frame(format!("{SEPARATOR}{body}")))
    } else {
        Ok(Frame(body.to_string()))
    }
}

/// Splits a frame at the first separator.
pub fn parse(frame: &Frame) -> Message {
    match frame.0.split_once(SEPARATOR) {
        Some((password, body)) => Message {
            password: Some(password.to_string()),
            body: body.to_string(),
        },
        None => Message {
            password: None,
            body: frame.0.clone(),
        },
    }
}

/// Checks the stored password against `password` and returns the body on a match.
///
/// An empty caller password only matches an absent or empty stored password.
pub fn verify(frame: &Frame, password: &str) -> Extraction {
    if frame.is_empty() {
        return Extraction::NotFound;
    }

    let message = parse(frame);
    let stored = message.password.as_deref().unwrap_or("");
    if stored != password {
        return Extraction::WrongPassword;
    }

    if message.body.is_empty() {
        Extraction::NotFound
    } else {
        Extraction::Message(message.body)
    }
}

/// Encodes the frame as bits, MSB first.
pub fn to_bits(frame: &Frame) -> Vec<bool> {
    bytes_to_bits(frame.as_bytes())
}

/// Rebuilds a frame from bits: partial trailing groups are dropped and
/// trailing NUL bytes trimmed before UTF-8 decoding.
pub fn from_bits(bits: &[bool]) -> Result<Frame, StegoError> {
    let mut bytes = bits_to_bytes(bits);
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    from_bytes(bytes)
}

/// Decodes raw frame bytes as UTF-8.
pub fn from_bytes(bytes: Vec<u8>) -> Result<Frame, StegoError> {
    String::from_utf8(bytes)
        .map(Frame)
        .map_err(|_| StegoError::Malformed)
}

/// Expands bytes to bits, most-significant bit first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
        .collect()
}

/// Packs bits into bytes, MSB first. A trailing group shorter than 8 bits is discarded.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
        .collect()
}

/// Whether `bytes` could be a frame written by [`serialize`]: UTF-8 with no
/// control characters other than whitespace.
pub fn is_plausible_frame(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(text) => !text.chars().any(|c| c.is_control() && !c.is_whitespace()),
        Err(_) => false,
    }
}

/// Wraps the frame in magic, length and checksum.
pub fn seal(frame: &Frame) -> Result<Vec<u8>, StegoError> {
    let len = u32::try_from(frame.len()).map_err(|_| StegoError::CapacityExceeded {
        needed: frame.len().saturating_add(SEAL_OVERHEAD).saturating_mul(8),
        available: u32::MAX as usize,
    })?;

    let mut sealed = Vec::with_capacity(frame.len() + SEAL_OVERHEAD);
    sealed.extend_from_slice(&SEAL_MAGIC);
    sealed.extend_from_slice(&len.to_be_bytes());
    sealed.extend_from_slice(frame.as_bytes());

    let crc = crc32fast::hash(&sealed);
    sealed.extend_from_slice(&crc.to_be_bytes());
    Ok(sealed)
}

/// Total sealed length announced by a header, or `None` without the magic.
pub fn sealed_len(header: &[u8]) -> Option<usize> {
    if header.len() < SEAL_HEADER_LEN || header[..SEAL_MAGIC.len()] != SEAL_MAGIC {
        return None;
    }

    let mut len = [0u8; 4];
    len.copy_from_slice(&header[SEAL_MAGIC.len()..SEAL_HEADER_LEN]);
    (u32::from_be_bytes(len) as usize).checked_add(SEAL_OVERHEAD)
}

/// Verifies a sealed frame and returns the frame inside.
///
/// `data` may run past the end of the frame.
pub fn unseal(data: &[u8]) -> Result<Frame, StegoError> {
    let total = sealed_len(data).ok_or(StegoError::Malformed)?;
    if data.len() < total {
        return Err(StegoError::Malformed);
    }

    let body = &data[..total - 4];
    let mut stored = [0u8; 4];
    stored.copy_from_slice(&data[total - 4..total]);
    if u32::from_be_bytes(stored) != crc32fast::hash(body) {
        return Err(StegoError::Malformed);
    }

    from_bytes(body[SEAL_HEADER_LEN..].to_vec())
}
