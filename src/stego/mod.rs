//! Carrier adapters.
//!
//! Bit-level carriers implement [`BitChannel`]:
//! - Image: LSB of the R, G, B channels of each pixel
//! - Text: zero-width code points appended after the content
//! - Audio: LSB of each integer PCM sample (WAV)
//! - Video: LSB of the blue channel of each pixel, frame by frame
//!
//! PDF and DOCX carry the frame as a string in document structure and
//! implement [`TextSlot`] instead.

pub mod audio;
pub mod docx;
pub mod image;
pub mod pdf;
pub mod text;
pub mod video;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::StegoError;
use crate::kind::CarrierKind;

pub use self::audio::AudioCarrier;
pub use self::docx::DocxCarrier;
pub use self::image::ImageCarrier;
pub use self::pdf::PdfCarrier;
pub use self::text::TextCarrier;
pub use self::video::{RawVideoCodec, VideoCarrier, VideoClip, VideoCodec, VideoFrame};

/// How a channel delimits the payload it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Every slot the channel exposes is payload (zero-width suffix).
    Exact,
    /// The frame is sealed with magic, length and CRC-32 (LSB channels).
    Sealed,
}

/// An ordered sequence of addressable binary slots.
///
/// `write_bits` followed by `read_bits` of the same length on the same
/// handle returns the written bits.
pub trait BitChannel {
    /// Number of bits the channel can hold.
    fn capacity(&self) -> usize;

    /// Writes `bits` into consecutive slots starting at the first one.
    fn write_bits(&mut self, bits: &[bool]) -> Result<(), StegoError>;

    /// Reads `count` bits, or every slot when `None`.
    fn read_bits(&self, count: Option<usize>) -> Result<Vec<bool>, StegoError>;

    /// How the payload is delimited in this channel.
    fn framing(&self) -> Framing {
        Framing::Sealed
    }
}

/// A normalized carrier that can be written back out as file bytes.
pub trait Carrier {
    fn kind(&self) -> CarrierKind;

    /// Re-serializes the carrier, embedded payload included.
    fn to_bytes(&self) -> Result<Vec<u8>, StegoError>;
}

/// A carrier that stores the frame as a single string.
pub trait TextSlot: Carrier {
    fn embed_text(&mut self, frame: &str) -> Result<(), StegoError>;

    /// The stored frame, or `None` when the carrier holds none.
    fn extract_text(&self) -> Result<Option<String>, StegoError>;
}

/// A bit-level carrier.
pub trait BitCarrier: BitChannel + Carrier {}

impl<T: BitChannel + Carrier> BitCarrier for T {}

/// Cooperative cancellation flag shared between a caller and a long-running
/// embed or extract.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once the token has been tripped.
    pub fn check(&self) -> Result<(), StegoError> {
        if self.is_cancelled() {
            Err(StegoError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Replaces the lowest bit of `value` with `bit`.
#[inline]
pub(crate) fn set_lsb_u8(value: u8, bit: bool) -> u8 {
    (value & 0xFE) | bit as u8
}
