//! LSB steganography for video.
//!
//! Bits go into the least significant bit of the blue channel of each pixel,
//! frame by frame, row-major within a frame. Container demuxing and frame
//! codecs live behind [`VideoCodec`]; the built-in [`RawVideoCodec`] reads and
//! writes an uncompressed BGR frame stream:
//!
//! ```text
//! "BGRV" | width u32 LE | height u32 LE | fps u32 LE | frame_count u32 LE | frames...
//! ```
//!
//! Each frame is `width * height * 3` bytes, blue first.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{set_lsb_u8, BitChannel, CancelToken, Carrier};
use crate::error::StegoError;
use crate::kind::CarrierKind;

/// Bytes per pixel in a decoded frame.
pub const BYTES_PER_PIXEL: usize = 3;

/// Offset of the blue channel within a BGR pixel.
const BLUE: usize = 0;

/// What to do when the payload needs more slots than the video has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Fail with `CapacityExceeded` before touching any frame.
    #[default]
    Reject,
    /// Shorten the message body to the longest prefix that fits.
    Truncate,
}

/// One decoded frame in BGR byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub bgr: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, bgr: Vec<u8>) -> Self {
        Self { width, height, bgr }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A decoded frame sequence plus what is needed to write it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoClip {
    pub fps: u32,
    pub frames: Vec<VideoFrame>,
}

/// Container codec capsule: bytes to frames and back.
pub trait VideoCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<VideoClip, StegoError>;

    fn encode(&self, clip: &VideoClip) -> Result<Vec<u8>, StegoError>;
}

/// Uncompressed BGR frame stream codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawVideoCodec;

impl RawVideoCodec {
    pub const MAGIC: &'static [u8; 4] = b"BGRV";
    const HEADER_LEN: usize = 20;
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

impl VideoCodec for RawVideoCodec {
    fn decode(&self, bytes: &[u8]) -> Result<VideoClip, StegoError> {
        if bytes.len() < Self::HEADER_LEN || &bytes[..4] != Self::MAGIC {
            return Err(StegoError::NormalizationFailure(
                "not a raw BGR video stream".to_string(),
            ));
        }

        let width = read_u32(bytes, 4);
        let height = read_u32(bytes, 8);
        let fps = read_u32(bytes, 12);
        let frame_count = read_u32(bytes, 16) as usize;

        let frame_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| StegoError::NormalizationFailure("frame size overflow".into()))?;
        let body = &bytes[Self::HEADER_LEN..];
        if frame_len.checked_mul(frame_count) != Some(body.len()) {
            return Err(StegoError::NormalizationFailure(format!(
                "expected {frame_count} frames of {frame_len} bytes, got {} bytes",
                body.len()
            )));
        }

        let frames = if frame_len == 0 {
            Vec::new()
        } else {
            body.chunks_exact(frame_len)
                .map(|chunk| VideoFrame::new(width, height, chunk.to_vec()))
                .collect()
        };

        Ok(VideoClip { fps, frames })
    }

    fn encode(&self, clip: &VideoClip) -> Result<Vec<u8>, StegoError> {
        let (width, height) = clip
            .frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0));

        let mut out = Vec::with_capacity(
            Self::HEADER_LEN + clip.frames.iter().map(|f| f.bgr.len()).sum::<usize>(),
        );
        out.extend_from_slice(Self::MAGIC);
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&clip.fps.to_le_bytes());
        out.extend_from_slice(&(clip.frames.len() as u32).to_le_bytes());

        for frame in &clip.frames {
            if frame.width != width || frame.height != height {
                return Err(StegoError::Carrier(
                    "raw stream frames must share one size".to_string(),
                ));
            }
            if frame.bgr.len() != frame.pixel_count() * BYTES_PER_PIXEL {
                return Err(StegoError::Carrier("frame buffer size mismatch".into()));
            }
            out.extend_from_slice(&frame.bgr);
        }

        Ok(out)
    }
}

/// Video carrier over a decoded clip.
pub struct VideoCarrier {
    clip: VideoClip,
    codec: Arc<dyn VideoCodec>,
    cancel: CancelToken,
}

impl VideoCarrier {
    pub fn new(clip: VideoClip, codec: Arc<dyn VideoCodec>) -> Self {
        Self {
            clip,
            codec,
            cancel: CancelToken::default(),
        }
    }

    /// Decodes `bytes` with `codec`.
    pub fn from_bytes(bytes: &[u8], codec: Arc<dyn VideoCodec>) -> Result<Self, StegoError> {
        let clip = codec.decode(bytes)?;
        Ok(Self::new(clip, codec))
    }

    /// Token checked between frames.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn clip(&self) -> &VideoClip {
        &self.clip
    }

    pub fn frame_count(&self) -> usize {
        self.clip.frames.len()
    }
}

impl BitChannel for VideoCarrier {
    /// One bit per pixel across all frames.
    fn capacity(&self) -> usize {
        self.clip.frames.iter().map(VideoFrame::pixel_count).sum()
    }

    fn write_bits(&mut self, bits: &[bool]) -> Result<(), StegoError> {
        let capacity = self.capacity();
        if bits.len() > capacity {
            return Err(StegoError::CapacityExceeded {
                needed: bits.len(),
                available: capacity,
            });
        }

        let mut remaining = bits;
        for (index, frame) in self.clip.frames.iter_mut().enumerate() {
            if remaining.is_empty() {
                break;
            }
            self.cancel.check()?;

            let pixels = frame.bgr.chunks_exact_mut(BYTES_PER_PIXEL);
            let used = pixels.len().min(remaining.len());
            for (pixel, &bit) in pixels.zip(&remaining[..used]) {
                pixel[BLUE] = set_lsb_u8(pixel[BLUE], bit);
            }
            remaining = &remaining[used..];
            debug!(frame = index, bits = used, "embedded into frame");
        }

        Ok(())
    }

    fn read_bits(&self, count: Option<usize>) -> Result<Vec<bool>, StegoError> {
        let count = count.unwrap_or_else(|| self.capacity());
        let mut bits = Vec::with_capacity(count.min(self.capacity()));

        for frame in &self.clip.frames {
            if bits.len() >= count {
                break;
            }
            self.cancel.check()?;

            let wanted = count - bits.len();
            bits.extend(
                frame
                    .bgr
                    .chunks_exact(BYTES_PER_PIXEL)
                    .take(wanted)
                    .map(|pixel| pixel[BLUE] & 1 == 1),
            );
        }

        Ok(bits)
    }
}

impl Carrier for VideoCarrier {
    fn kind(&self) -> CarrierKind {
        CarrierKind::Video
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StegoError> {
        self.codec.encode(&self.clip)
    }
}

/// Builds a clip with a deterministic gradient.
#[cfg(test)]
pub(crate) fn create_test_clip(width: u32, height: u32, frames: usize) -> VideoClip {
    let frames = (0..frames)
        .map(|f| {
            let bgr = (0..(width * height) as usize)
                .flat_map(|p| {
                    [
                        ((p * 7 + f * 13) % 256) as u8,
                        ((p * 3) % 256) as u8,
                        ((f * 29) % 256) as u8,
                    ]
                })
                .collect();
            VideoFrame::new(width, height, bgr)
        })
        .collect();
    VideoClip { fps: 24, frames }
}
