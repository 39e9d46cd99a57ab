//! LSB steganography for audio files.
//!
//! Hides bits in the least significant bit of audio samples, one bit per
//! sample in interleaved sample order. Supports WAV files with integer PCM
//! of 8, 16, 24 or 32 bits; the output keeps the input's spec.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::{Cursor, Read};

use super::{BitChannel, Carrier};
use crate::error::StegoError;
use crate::kind::CarrierKind;

/// Audio carrier over decoded PCM samples.
pub struct AudioCarrier {
    /// Audio specification (sample rate, channels, etc.)
    spec: WavSpec,
    /// Samples widened to i32 regardless of bit depth.
    samples: Vec<i32>,
}

impl AudioCarrier {
    /// Creates a new AudioCarrier from WAV bytes.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, StegoError> {
        let reader = WavReader::new(Cursor::new(bytes))
            .map_err(|e| StegoError::NormalizationFailure(e.to_string()))?;

        Self::from_reader(reader)
    }

    /// Creates an AudioCarrier from a WavReader.
    fn from_reader<R: Read>(reader: WavReader<R>) -> Result<Self, StegoError> {
        let spec = reader.spec();

        if spec.sample_format != SampleFormat::Int {
            return Err(StegoError::NormalizationFailure(format!(
                "only integer PCM is supported, got {} bits {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        let samples: Vec<i32> = reader
            .into_samples::<i32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StegoError::NormalizationFailure(e.to_string()))?;

        Ok(Self { spec, samples })
    }

    /// Returns the audio as WAV bytes.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, StegoError> {
        let mut bytes = Vec::new();
        {
            let cursor = Cursor::new(&mut bytes);
            let mut writer = WavWriter::new(cursor, self.spec)
                .map_err(|e| StegoError::Carrier(e.to_string()))?;

            for sample in &self.samples {
                writer
                    .write_sample(*sample)
                    .map_err(|e| StegoError::Carrier(e.to_string()))?;
            }

            writer
                .finalize()
                .map_err(|e| StegoError::Carrier(e.to_string()))?;
        }
        Ok(bytes)
    }

    /// Returns the audio specification.
    pub fn spec(&self) -> &WavSpec {
        &self.spec
    }

    /// Returns the number of samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl BitChannel for AudioCarrier {
    /// One bit per sample.
    fn capacity(&self) -> usize {
        self.samples.len()
    }

    fn write_bits(&mut self, bits: &[bool]) -> Result<(), StegoError> {
        if bits.len() > self.samples.len() {
            return Err(StegoError::CapacityExceeded {
                needed: bits.len(),
                available: self.samples.len(),
            });
        }

        for (sample, &bit) in self.samples.iter_mut().zip(bits) {
            // Clear LSB and set new bit
            *sample = (*sample & !1) | bit as i32;
        }

        Ok(())
    }

    fn read_bits(&self, count: Option<usize>) -> Result<Vec<bool>, StegoError> {
        let count = count.unwrap_or(self.samples.len());
        Ok(self
            .samples
            .iter()
            .take(count)
            .map(|sample| sample & 1 == 1)
            .collect())
    }
}

impl Carrier for AudioCarrier {
    fn kind(&self) -> CarrierKind {
        CarrierKind::Audio
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StegoError> {
        self.to_wav_bytes()
    }
}

/// Creates a simple test audio carrier.
#[cfg(test)]
pub(crate) fn create_test_audio(sample_count: usize, bits_per_sample: u16) -> AudioCarrier {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample,
        sample_format: SampleFormat::Int,
    };
    let amplitude = ((1i64 << (bits_per_sample - 1)) / 2) as f64;

    // Generate a simple sine wave
    let samples: Vec<i32> = (0..sample_count)
        .map(|i| {
            let t = i as f64 / 44100.0;
            let freq = 440.0; // A4 note
            (f64::sin(2.0 * std::f64::consts::PI * freq * t) * amplitude) as i32
        })
        .collect();

    AudioCarrier { spec, samples }
}
