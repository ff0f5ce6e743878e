//! JPEG tile encoder.
//!
//! Turns extracted tiles (ndarray pixel blocks in RGB or BGR layout) into
//! JPEG files for inspection or for feeding models that read images from
//! disk.
//!
//! # Design Decisions
//!
//! - **Layout-aware**: the encoder is told the channel order of the tile and
//!   always writes a correct RGB JPEG.
//!
//! - **No resizing**: tiles are written at their extracted size.
//!
//! - **Quality control**: JPEG quality is configurable, clamped to 1-100.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use ndarray::ArrayView3;

use crate::error::EncodeError;

use super::extractor::ChannelOrder;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// JPEG Encoder
// =============================================================================

/// JPEG encoder for extracted tiles.
///
/// # Example
///
/// ```ignore
/// use wsi_autotiler::tile::{ChannelOrder, JpegTileEncoder};
///
/// let encoder = JpegTileEncoder::new(85);
/// for i in 0..batch.len() {
///     let jpeg = encoder.encode(batch.tile(i), ChannelOrder::Bgr)?;
///     std::fs::write(format!("tile_{i}.jpg"), &jpeg)?;
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JpegTileEncoder {
    quality: u8,
}

impl Default for JpegTileEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl JpegTileEncoder {
    /// Create an encoder; `quality` is clamped to 1-100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: clamp_quality(quality),
        }
    }

    /// JPEG quality used for encoding.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a `[height, width, 3]` tile laid out in `order`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::InvalidShape`] if the array is not a 3-channel
    /// image, or [`EncodeError::Encode`] if JPEG encoding fails.
    pub fn encode(&self, tile: ArrayView3<'_, u8>, order: ChannelOrder) -> Result<Bytes, EncodeError> {
        let image = to_rgb_image(tile, order)?;

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
        encoder
            .encode_image(&image)
            .map_err(|e| EncodeError::Encode {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}

/// Convert a `[height, width, 3]` tile to an RGB image.
pub fn to_rgb_image(tile: ArrayView3<'_, u8>, order: ChannelOrder) -> Result<RgbImage, EncodeError> {
    let shape = tile.shape();
    if shape[2] != 3 || shape[0] > u32::MAX as usize || shape[1] > u32::MAX as usize {
        return Err(EncodeError::InvalidShape(shape.to_vec()));
    }
    let (height, width) = (shape[0] as u32, shape[1] as u32);

    Ok(RgbImage::from_fn(width, height, |x, y| {
        let (y, x) = (y as usize, x as usize);
        let (c0, c1, c2) = (tile[[y, x, 0]], tile[[y, x, 1]], tile[[y, x, 2]]);
        match order {
            ChannelOrder::Rgb => Rgb([c0, c1, c2]),
            ChannelOrder::Bgr => Rgb([c2, c1, c0]),
        }
    }))
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
