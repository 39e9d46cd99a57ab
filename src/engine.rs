//! The embedding engine.
//!
//! An [`Engine`] owns its normalizer and codec capsules; there is no global
//! registry. Each call works on its own copy of the carrier:
//!
//! ```text
//! bytes -> normalize -> adapter -> frame -> write bits -> re-serialize
//! bytes -> normalize -> adapter -> read bits -> frame -> verify password
//! ```
//!
//! `encode_file` / `decode_file` are the request-layer entry points: they take
//! a file extension, map every error to a [`Failure`], and return the
//! not-found / wrong-password outcomes as sentinel strings.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Failure, StegoError};
use crate::kind::CarrierKind;
use crate::normalize::{AudioTranscoder, DefaultNormalizer, NormalizedCarrier, Normalizer};
use crate::payload::{self, Frame, SEAL_HEADER_LEN, SEAL_OVERHEAD};
use crate::stego::video::OverflowPolicy;
use crate::stego::{
    BitCarrier, CancelToken, Framing, RawVideoCodec, TextSlot, VideoCarrier, VideoCodec,
};

pub use crate::payload::Extraction;

/// Capacity summary for a carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierInfo {
    pub kind: CarrierKind,
    /// `None` for string-slot carriers (PDF, DOCX).
    pub framing: Option<Framing>,
    /// `None` when unbounded.
    pub capacity_bits: Option<usize>,
    /// Largest frame in bytes that fits; `None` when unbounded.
    pub max_frame_bytes: Option<usize>,
}

enum Opened {
    Bits(Box<dyn BitCarrier>),
    Slot(Box<dyn TextSlot>),
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    normalizer: Option<Box<dyn Normalizer>>,
    video_codec: Arc<dyn VideoCodec>,
    transcoder: Option<Arc<dyn AudioTranscoder>>,
    overflow_policy: OverflowPolicy,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            normalizer: None,
            video_codec: Arc::new(RawVideoCodec),
            transcoder: None,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl EngineBuilder {
    /// Replaces the default normalizer entirely.
    pub fn normalizer(mut self, normalizer: Box<dyn Normalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Codec used to decode and re-encode video carriers.
    pub fn video_codec(mut self, codec: Arc<dyn VideoCodec>) -> Self {
        self.video_codec = codec;
        self
    }

    /// Transcoder for non-WAV audio. Ignored when a custom normalizer is set.
    pub fn audio_transcoder(mut self, transcoder: Arc<dyn AudioTranscoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn build(self) -> Engine {
        let normalizer = match self.normalizer {
            Some(normalizer) => normalizer,
            None => {
                let mut default = DefaultNormalizer::new(Arc::clone(&self.video_codec));
                if let Some(transcoder) = self.transcoder {
                    default = default.with_transcoder(transcoder);
                }
                Box::new(default)
            }
        };

        Engine {
            normalizer,
            video_codec: self.video_codec,
            overflow_policy: self.overflow_policy,
        }
    }
}

/// Multi-carrier embedding engine.
pub struct Engine {
    normalizer: Box<dyn Normalizer>,
    video_codec: Arc<dyn VideoCodec>,
    overflow_policy: OverflowPolicy,
}

impl Default for Engine {
    fn default() -> Self {
        EngineBuilder::default().build()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    /// Extension of the file `encode` produces for `kind`.
    pub fn output_extension(kind: CarrierKind, input_ext: &str) -> String {
        match kind {
            CarrierKind::Image => "png".to_string(),
            CarrierKind::Audio => "wav".to_string(),
            _ => input_ext.trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    fn open(
        &self,
        bytes: &[u8],
        kind: CarrierKind,
        cancel: &CancelToken,
    ) -> Result<Opened, StegoError> {
        let opened = match self.normalizer.normalize(bytes, kind)? {
            NormalizedCarrier::Image(image) => Opened::Bits(Box::new(image)),
            NormalizedCarrier::Text(text) => Opened::Bits(Box::new(text)),
            NormalizedCarrier::Audio(audio) => Opened::Bits(Box::new(audio)),
            NormalizedCarrier::Video(clip) => Opened::Bits(Box::new(
                VideoCarrier::new(clip, Arc::clone(&self.video_codec))
                    .with_cancel(cancel.clone()),
            )),
            NormalizedCarrier::Pdf(pdf) => Opened::Slot(Box::new(pdf)),
            NormalizedCarrier::Docx(docx) => Opened::Slot(Box::new(docx)),
        };
        Ok(opened)
    }

    /// Hides `body`, gated by `password` (empty for none), in the carrier.
    pub fn encode(
        &self,
        carrier: &[u8],
        kind: CarrierKind,
        body: &str,
        password: &str,
    ) -> Result<Vec<u8>, StegoError> {
        self.encode_with_cancel(carrier, kind, body, password, &CancelToken::default())
    }

    /// [`Engine::encode`] that can be aborted between video frames.
    pub fn encode_with_cancel(
        &self,
        carrier: &[u8],
        kind: CarrierKind,
        body: &str,
        password: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, StegoError> {
        let mut frame = payload::serialize(password, body)?;

        let output = match self.open(carrier, kind, cancel)? {
            Opened::Bits(mut channel) => {
                if kind == CarrierKind::Video && self.overflow_policy == OverflowPolicy::Truncate {
                    frame = truncate_to_fit(channel.capacity(), password, body)?;
                }
                embed_bits(channel.as_mut(), &frame)?;
                channel.to_bytes()?
            }
            Opened::Slot(mut slot) => {
                slot.embed_text(frame.as_str())?;
                slot.to_bytes()?
            }
        };

        info!(
            %kind,
            input_bytes = carrier.len(),
            output_bytes = output.len(),
            frame_bytes = frame.len(),
            "message embedded"
        );
        Ok(output)
    }

    /// Extracts and verifies the message hidden in the carrier.
    pub fn decode(
        &self,
        carrier: &[u8],
        kind: CarrierKind,
        password: &str,
    ) -> Result<Extraction, StegoError> {
        self.decode_with_cancel(carrier, kind, password, &CancelToken::default())
    }

    /// [`Engine::decode`] that can be aborted between video frames.
    pub fn decode_with_cancel(
        &self,
        carrier: &[u8],
        kind: CarrierKind,
        password: &str,
        cancel: &CancelToken,
    ) -> Result<Extraction, StegoError> {
        let extracted = match self.open(carrier, kind, cancel)? {
            Opened::Bits(channel) => extract_bits(channel.as_ref()),
            Opened::Slot(slot) => slot
                .extract_text()
                .map(|text| text.map(Frame::from_text)),
        };

        let frame = match extracted {
            Ok(Some(frame)) => frame,
            Ok(None) => Frame::from_text(""),
            Err(StegoError::Malformed) => {
                debug!(%kind, "no valid frame in carrier");
                Frame::from_text("")
            }
            Err(e) => return Err(e),
        };

        let outcome = payload::verify(&frame, password);
        info!(%kind, outcome = outcome_label(&outcome), "carrier decoded");
        Ok(outcome)
    }

    /// Reports how much the carrier can hold.
    pub fn inspect(&self, carrier: &[u8], kind: CarrierKind) -> Result<CarrierInfo, StegoError> {
        let info = match self.open(carrier, kind, &CancelToken::default())? {
            Opened::Bits(channel) => {
                let framing = channel.framing();
                let capacity = channel.capacity();
                let (capacity_bits, max_frame_bytes) = match framing {
                    Framing::Exact => (None, None),
                    Framing::Sealed => (
                        Some(capacity),
                        Some((capacity / 8).saturating_sub(SEAL_OVERHEAD)),
                    ),
                };
                CarrierInfo {
                    kind,
                    framing: Some(framing),
                    capacity_bits,
                    max_frame_bytes,
                }
            }
            Opened::Slot(_) => CarrierInfo {
                kind,
                framing: None,
                capacity_bits: None,
                max_frame_bytes: None,
            },
        };
        Ok(info)
    }

    /// Request-layer encode keyed by file extension.
    pub fn encode_file(
        &self,
        bytes: &[u8],
        extension: &str,
        message: &str,
        password: &str,
    ) -> Result<Vec<u8>, Failure> {
        let kind = CarrierKind::from_extension(extension).map_err(|e| {
            warn!(error = %e, "rejected carrier");
            Failure::UnsupportedFormat
        })?;

        self.encode(bytes, kind, message, password).map_err(|e| {
            warn!(%kind, error = %e, "encode failed");
            Failure::EncodeFailed
        })
    }

    /// Request-layer decode keyed by file extension.
    ///
    /// Not-found and wrong-password outcomes come back as `Ok` sentinel strings.
    pub fn decode_file(
        &self,
        bytes: &[u8],
        extension: &str,
        password: &str,
    ) -> Result<String, Failure> {
        let kind = CarrierKind::from_extension(extension).map_err(|e| {
            warn!(error = %e, "rejected carrier");
            Failure::UnsupportedFormat
        })?;

        self.decode(bytes, kind, password)
            .map(Extraction::into_user_string)
            .map_err(|e| {
                warn!(%kind, error = %e, "decode failed");
                Failure::DecodeFailed
            })
    }
}

fn outcome_label(outcome: &Extraction) -> &'static str {
    match outcome {
        Extraction::Message(_) => "message",
        Extraction::NotFound => "not_found",
        Extraction::WrongPassword => "wrong_password",
    }
}

/// Rebuilds the frame with the longest body prefix whose sealed form fits
/// `capacity` bits.
fn truncate_to_fit(capacity: usize, password: &str, body: &str) -> Result<Frame, StegoError> {
    let frame = payload::serialize(password, body)?;
    let max_frame = (capacity / 8).saturating_sub(SEAL_OVERHEAD);
    if frame.len() <= max_frame {
        return Ok(frame);
    }

    let prefix = frame.len() - body.len();
    let mut end = max_frame.saturating_sub(prefix).min(body.len());
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    if end == 0 {
        return Err(StegoError::CapacityExceeded {
            needed: (frame.len() + SEAL_OVERHEAD) * 8,
            available: capacity,
        });
    }

    warn!(
        kept_bytes = end,
        dropped_bytes = body.len() - end,
        "video too short, truncating message"
    );
    payload::serialize(password, &body[..end])
}

/// Lays the frame out for the channel's framing and writes it.
fn embed_bits(channel: &mut dyn BitCarrier, frame: &Frame) -> Result<(), StegoError> {
    let bits = match channel.framing() {
        Framing::Exact => payload::to_bits(frame),
        Framing::Sealed => payload::bytes_to_bits(&payload::seal(frame)?),
    };

    debug!(
        kind = %channel.kind(),
        bits = bits.len(),
        capacity = channel.capacity(),
        "writing payload"
    );

    let result = channel.write_bits(&bits);
    if let Err(StegoError::CapacityExceeded { needed, available }) = &result {
        warn!(kind = %channel.kind(), needed, available, "carrier too small");
    }
    result
}

/// Reads the frame back according to the channel's framing.
fn extract_bits(channel: &dyn BitCarrier) -> Result<Option<Frame>, StegoError> {
    let frame = match channel.framing() {
        Framing::Exact => payload::from_bits(&channel.read_bits(None)?)?,
        Framing::Sealed => {
            let capacity = channel.capacity();
            let header_bits = SEAL_HEADER_LEN * 8;
            if capacity < header_bits {
                return Ok(None);
            }

            let header = payload::bits_to_bytes(&channel.read_bits(Some(header_bits))?);
            let total_bits = match payload::sealed_len(&header) {
                Some(total) => total.checked_mul(8),
                None => {
                    debug!(kind = %channel.kind(), "no frame magic");
                    return Ok(None);
                }
            };
            match total_bits {
                Some(bits) if bits <= capacity => {
                    let sealed = payload::bits_to_bytes(&channel.read_bits(Some(bits))?);
                    payload::unseal(&sealed)?
                }
                _ => {
                    debug!(capacity, "sealed length exceeds capacity");
                    return Ok(None);
                }
            }
        }
    };

    Ok(Some(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stego::audio::create_test_audio;
    use crate::stego::video::create_test_clip;
    use crate::stego::{AudioCarrier, BitChannel, Carrier, ImageCarrier};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 9 % 256) as u8, (y * 5 % 256) as u8, ((x ^ y) % 256) as u8])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn raw_video(width: u32, height: u32, frames: usize) -> Vec<u8> {
        RawVideoCodec.encode(&create_test_clip(width, height, frames)).unwrap()
    }

    struct CountingNormalizer(Arc<AtomicUsize>);

    impl Normalizer for CountingNormalizer {
        fn normalize(
            &self,
            _bytes: &[u8],
            _kind: CarrierKind,
        ) -> Result<NormalizedCarrier, StegoError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(StegoError::NormalizationFailure("counting only".into()))
        }
    }

    #[test]
    fn test_image_roundtrip() {
        let engine = Engine::new();
        let encoded = engine
            .encode(&png_bytes(40, 40), CarrierKind::Image, "meet at noon", "pw")
            .unwrap();

        let decoded = engine.decode(&encoded, CarrierKind::Image, "pw").unwrap();
        assert_eq!(decoded, Extraction::Message("meet at noon".into()));
    }

    #[test]
    fn test_image_never_encoded() {
        let decoded = Engine::new()
            .decode(&png_bytes(10, 10), CarrierKind::Image, "")
            .unwrap();
        assert_eq!(decoded, Extraction::NotFound);

        // solid white: every LSB is one
        let img = ImageBuffer::from_pixel(4, 4, Rgb([255u8, 255, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let decoded = Engine::new().decode(&bytes, CarrierKind::Image, "").unwrap();
        assert_eq!(decoded, Extraction::NotFound);
    }

    #[test]
    fn test_image_length_beyond_capacity() {
        let mut image = ImageCarrier::from_bytes(&png_bytes(4, 4)).unwrap();
        let mut header = payload::SEAL_MAGIC.to_vec();
        header.extend_from_slice(&1000u32.to_be_bytes());
        image.write_bits(&payload::bytes_to_bits(&header)).unwrap();

        let decoded = Engine::new()
            .decode(&image.to_bytes().unwrap(), CarrierKind::Image, "")
            .unwrap();
        assert_eq!(decoded, Extraction::NotFound);
    }

    #[test]
    fn test_audio_roundtrip() {
        let engine = Engine::new();
        let wav = create_test_audio(4000, 16).to_wav_bytes().unwrap();
        let encoded = engine.encode(&wav, CarrierKind::Audio, "tone", "").unwrap();

        let decoded = engine.decode(&encoded, CarrierKind::Audio, "").unwrap();
        assert_eq!(decoded, Extraction::Message("tone".into()));
    }

    #[test]
    fn test_audio_exact_fit() {
        let engine = Engine::new();
        // "abcd" sealed is 14 bytes
        let wav = create_test_audio(112, 16).to_wav_bytes().unwrap();
        let encoded = engine.encode(&wav, CarrierKind::Audio, "abcd", "").unwrap();

        let decoded = engine.decode(&encoded, CarrierKind::Audio, "").unwrap();
        assert_eq!(decoded, Extraction::Message("abcd".into()));
    }

    #[test]
    fn test_audio_ramp_never_encoded() {
        // LSBs alternate 0101..., which is valid text ("UUUU") without a seal
        let samples: Vec<i16> = (0..4000).map(|i| i as i16).collect();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut wav = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut wav), spec).unwrap();
            for sample in samples {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }

        let decoded = Engine::new().decode(&wav, CarrierKind::Audio, "").unwrap();
        assert_eq!(decoded, Extraction::NotFound);
    }

    #[test]
    fn test_audio_corrupted_frame_not_found() {
        let engine = Engine::new();
        let wav = create_test_audio(400, 16).to_wav_bytes().unwrap();
        let encoded = engine.encode(&wav, CarrierKind::Audio, "fragile", "").unwrap();

        let mut audio = AudioCarrier::from_wav_bytes(&encoded).unwrap();
        let mut bits = audio.read_bits(None).unwrap();
        // first bit of the frame body, after magic and length
        bits[SEAL_HEADER_LEN * 8] ^= true;
        audio.write_bits(&bits).unwrap();

        let decoded = engine
            .decode(&audio.to_bytes().unwrap(), CarrierKind::Audio, "")
            .unwrap();
        assert_eq!(decoded, Extraction::NotFound);
    }

    #[test]
    fn test_audio_capacity_exceeded() {
        let engine = Engine::new();
        let wav = create_test_audio(16, 16).to_wav_bytes().unwrap();
        let result = engine.encode(&wav, CarrierKind::Audio, "too long", "");
        assert!(matches!(
            result,
            Err(StegoError::CapacityExceeded {
                needed: 144,
                available: 16
            })
        ));
    }

    #[test]
    fn test_video_roundtrip_and_cancel() {
        let engine = Engine::new();
        let video = raw_video(8, 8, 4);
        let encoded = engine
            .encode(&video, CarrierKind::Video, "frame secret", "k")
            .unwrap();
        assert_eq!(encoded.len(), video.len());

        let decoded = engine.decode(&encoded, CarrierKind::Video, "k").unwrap();
        assert_eq!(decoded, Extraction::Message("frame secret".into()));

        let token = CancelToken::new();
        token.cancel();
        let result = engine.decode_with_cancel(&encoded, CarrierKind::Video, "k", &token);
        assert!(matches!(result, Err(StegoError::Cancelled)));
    }

    #[test]
    fn test_video_never_encoded() {
        let decoded = Engine::new()
            .decode(&raw_video(8, 8, 2), CarrierKind::Video, "")
            .unwrap();
        assert_eq!(decoded, Extraction::NotFound);
    }

    #[test]
    fn test_video_truncate_policy() {
        let engine = Engine::builder()
            .overflow_policy(OverflowPolicy::Truncate)
            .build();
        // 4x4x8 = 128 slots: 16 bytes sealed, 6 bytes of frame
        let encoded = engine
            .encode(&raw_video(4, 4, 8), CarrierKind::Video, "xyz abcdefgh", "")
            .unwrap();
        let decoded = engine.decode(&encoded, CarrierKind::Video, "").unwrap();
        assert_eq!(decoded, Extraction::Message("xyz ab".into()));

        // the password is never cut
        let encoded = engine
            .encode(&raw_video(4, 4, 8), CarrierKind::Video, "xyz abcdefgh", "pw")
            .unwrap();
        let decoded = engine.decode(&encoded, CarrierKind::Video, "pw").unwrap();
        assert_eq!(decoded, Extraction::Message("xyz".into()));

        // a multibyte character is dropped whole
        let encoded = engine
            .encode(&raw_video(4, 4, 8), CarrierKind::Video, "abcdeé", "")
            .unwrap();
        let decoded = engine.decode(&encoded, CarrierKind::Video, "").unwrap();
        assert_eq!(decoded, Extraction::Message("abcde".into()));

        let too_small = engine.encode(&raw_video(2, 2, 2), CarrierKind::Video, "xyz", "");
        assert!(matches!(too_small, Err(StegoError::CapacityExceeded { .. })));

        let strict =
            Engine::new().encode(&raw_video(4, 4, 8), CarrierKind::Video, "xyz abcdefgh", "");
        assert!(matches!(strict, Err(StegoError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_pdf_and_docx_slots() {
        let engine = Engine::new();

        let pdf = crate::stego::pdf::create_test_pdf(None);
        let encoded = engine.encode(&pdf, CarrierKind::Pdf, "in pdf", "pw").unwrap();
        assert_eq!(
            engine.decode(&encoded, CarrierKind::Pdf, "pw").unwrap(),
            Extraction::Message("in pdf".into())
        );
        assert_eq!(
            engine.decode(&pdf, CarrierKind::Pdf, "").unwrap(),
            Extraction::NotFound
        );

        let docx = crate::stego::docx::create_test_docx("<w:p/>");
        let encoded = engine.encode(&docx, CarrierKind::Docx, "in docx", "").unwrap();
        assert_eq!(
            engine.decode(&encoded, CarrierKind::Docx, "other").unwrap(),
            Extraction::WrongPassword
        );
    }

    #[test]
    fn test_invalid_password_rejected() {
        let result = Engine::new().encode(b"text", CarrierKind::Text, "m", "a:b");
        assert!(matches!(result, Err(StegoError::InvalidPassword)));
    }

    #[test]
    fn test_inspect() {
        let engine = Engine::new();

        let image = engine.inspect(&png_bytes(10, 10), CarrierKind::Image).unwrap();
        assert_eq!(image.framing, Some(Framing::Sealed));
        assert_eq!(image.capacity_bits, Some(300));
        assert_eq!(image.max_frame_bytes, Some(27));

        let text = engine.inspect(b"hello", CarrierKind::Text).unwrap();
        assert_eq!(text.framing, Some(Framing::Exact));
        assert_eq!(text.capacity_bits, None);

        let video = engine.inspect(&raw_video(4, 4, 2), CarrierKind::Video).unwrap();
        assert_eq!(video.capacity_bits, Some(32));
        assert_eq!(video.max_frame_bytes, Some(0));
    }

    #[test]
    fn test_unsupported_extension_skips_normalizer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = Engine::builder()
            .normalizer(Box::new(CountingNormalizer(Arc::clone(&calls))))
            .build();

        assert_eq!(
            engine.encode_file(b"bytes", ".xyz", "m", ""),
            Err(Failure::UnsupportedFormat)
        );
        assert_eq!(
            engine.decode_file(b"bytes", "xyz", ""),
            Err(Failure::UnsupportedFormat)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(
            engine.encode_file(b"bytes", ".png", "m", ""),
            Err(Failure::EncodeFailed)
        );
        assert_eq!(
            engine.decode_file(b"bytes", ".png", ""),
            Err(Failure::DecodeFailed)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_output_extension() {
        assert_eq!(Engine::output_extension(CarrierKind::Image, "jpg"), "png");
        assert_eq!(Engine::output_extension(CarrierKind::Audio, ".mp3"), "wav");
        assert_eq!(Engine::output_extension(CarrierKind::Video, ".MOV"), "mov");
        assert_eq!(Engine::output_extension(CarrierKind::Text, "txt"), "txt");
    }
}
