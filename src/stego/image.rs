//! LSB (Least Significant Bit) steganography for images.
//!
//! Hides bits in the least significant bit of the R, G and B channels of each
//! pixel, row-major, alpha untouched. Any raster the `image` crate can decode is
//! accepted; output is always PNG so the embedded bits survive.
//!
//! Format: [4 bytes big-endian length] + [frame bytes]

use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

use super::{set_lsb_u8, BitChannel, Carrier};
use crate::error::StegoError;
use crate::kind::CarrierKind;

/// Color channels used per pixel (alpha is left alone).
const CHANNELS_PER_PIXEL: usize = 3;

/// Image carrier over a lossless RGBA raster.
pub struct ImageCarrier {
    image: RgbaImage,
}

impl ImageCarrier {
    /// Decodes any supported raster (PNG, JPEG, BMP) into a carrier.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StegoError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| StegoError::NormalizationFailure(e.to_string()))?;
        Ok(Self::from_image(image))
    }

    /// Creates a carrier from an already-decoded image.
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgba8(),
        }
    }

    /// Returns (width, height) in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Returns the image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, StegoError> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| StegoError::Carrier(e.to_string()))?;
        Ok(bytes)
    }
}

impl BitChannel for ImageCarrier {
    fn capacity(&self) -> usize {
        let (width, height) = self.image.dimensions();
        (width as usize) * (height as usize) * CHANNELS_PER_PIXEL
    }

    fn write_bits(&mut self, bits: &[bool]) -> Result<(), StegoError> {
        let capacity = self.capacity();
        if bits.len() > capacity {
            return Err(StegoError::CapacityExceeded {
                needed: bits.len(),
                available: capacity,
            });
        }

        let slots = self
            .image
            .pixels_mut()
            .flat_map(|pixel| pixel.0.iter_mut().take(CHANNELS_PER_PIXEL));

        for (slot, &bit) in slots.zip(bits) {
            *slot = set_lsb_u8(*slot, bit);
        }

        Ok(())
    }

    fn read_bits(&self, count: Option<usize>) -> Result<Vec<bool>, StegoError> {
        let count = count.unwrap_or_else(|| self.capacity());
        Ok(self
            .image
            .pixels()
            .flat_map(|pixel| pixel.0[..CHANNELS_PER_PIXEL].iter())
            .take(count)
            .map(|&value| value & 1 == 1)
            .collect())
    }
}

impl Carrier for ImageCarrier {
    fn kind(&self) -> CarrierKind {
        CarrierKind::Image
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StegoError> {
        self.to_png_bytes()
    }
}
