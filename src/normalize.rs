//! Carrier normalization: raw upload bytes to an adapter-ready handle.
//!
//! Conversions the crate does not perform itself (MP3 to WAV, container
//! demuxing) are reached through [`AudioTranscoder`] and
//! [`VideoCodec`](crate::stego::VideoCodec).

use std::sync::Arc;

use tracing::debug;

use crate::error::StegoError;
use crate::kind::CarrierKind;
use crate::stego::{
    AudioCarrier, DocxCarrier, ImageCarrier, PdfCarrier, TextCarrier, VideoClip, VideoCodec,
};

/// A carrier in canonical form, ready to be wrapped by its adapter.
pub enum NormalizedCarrier {
    Image(ImageCarrier),
    Text(TextCarrier),
    Audio(AudioCarrier),
    Video(VideoClip),
    Pdf(PdfCarrier),
    Docx(DocxCarrier),
}

impl NormalizedCarrier {
    pub fn kind(&self) -> CarrierKind {
        match self {
            NormalizedCarrier::Image(_) => CarrierKind::Image,
            NormalizedCarrier::Text(_) => CarrierKind::Text,
            NormalizedCarrier::Audio(_) => CarrierKind::Audio,
            NormalizedCarrier::Video(_) => CarrierKind::Video,
            NormalizedCarrier::Pdf(_) => CarrierKind::Pdf,
            NormalizedCarrier::Docx(_) => CarrierKind::Docx,
        }
    }
}

/// Converts raw carrier bytes of a declared kind to canonical form.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, bytes: &[u8], kind: CarrierKind) -> Result<NormalizedCarrier, StegoError>;
}

/// Converts compressed audio (MP3 and friends) to WAV bytes.
pub trait AudioTranscoder: Send + Sync {
    fn to_wav(&self, bytes: &[u8]) -> Result<Vec<u8>, StegoError>;
}

/// Whether `bytes` start with a RIFF/WAVE header.
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Normalizer backed by the crate's own decoders.
pub struct DefaultNormalizer {
    video_codec: Arc<dyn VideoCodec>,
    transcoder: Option<Arc<dyn AudioTranscoder>>,
}

impl DefaultNormalizer {
    pub fn new(video_codec: Arc<dyn VideoCodec>) -> Self {
        Self {
            video_codec,
            transcoder: None,
        }
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn AudioTranscoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    fn normalize_audio(&self, bytes: &[u8]) -> Result<AudioCarrier, StegoError> {
        if is_wav(bytes) {
            return AudioCarrier::from_wav_bytes(bytes);
        }

        match &self.transcoder {
            Some(transcoder) => {
                debug!(input_bytes = bytes.len(), "transcoding audio to WAV");
                let wav = transcoder.to_wav(bytes)?;
                AudioCarrier::from_wav_bytes(&wav)
            }
            None => Err(StegoError::NormalizationFailure(
                "audio is not WAV and no transcoder is installed".to_string(),
            )),
        }
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, bytes: &[u8], kind: CarrierKind) -> Result<NormalizedCarrier, StegoError> {
        let normalized = match kind {
            CarrierKind::Image => NormalizedCarrier::Image(ImageCarrier::from_bytes(bytes)?),
            CarrierKind::Text => NormalizedCarrier::Text(TextCarrier::from_bytes(bytes)?),
            CarrierKind::Audio => NormalizedCarrier::Audio(self.normalize_audio(bytes)?),
            CarrierKind::Video => NormalizedCarrier::Video(self.video_codec.decode(bytes)?),
            CarrierKind::Pdf => NormalizedCarrier::Pdf(PdfCarrier::from_bytes(bytes)?),
            CarrierKind::Docx => NormalizedCarrier::Docx(DocxCarrier::from_bytes(bytes)?),
        };
        Ok(normalized)
    }
}
