//! Blank tile detection.
//!
//! A pixel whose three channels are nearly equal is white, black or grey:
//! background glass, empty regions or scanner padding rather than stained
//! tissue. The blankness of a tile is the fraction of such pixels.

use image::RgbImage;

/// Channel standard deviation (0-255 scale) below which a pixel is blank-like.
pub const BLANK_STD_THRESHOLD: f64 = 3.0;

/// Fraction of pixels in `tile` whose channel standard deviation is below
/// [`BLANK_STD_THRESHOLD`].
///
/// Returns a value in `[0, 1]`. The result does not depend on channel order,
/// so it works the same for RGB and BGR tiles. An empty tile has blankness
/// `0.0`.
pub fn blankness(tile: &RgbImage) -> f64 {
    let total = tile.width() as u64 * tile.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let blank = tile
        .pixels()
        .filter(|p| channel_std(p.0) < BLANK_STD_THRESHOLD)
        .count();

    blank as f64 / total as f64
}

/// Population standard deviation of one pixel's channels.
#[inline]
fn channel_std(channels: [u8; 3]) -> f64 {
    let [a, b, c] = channels.map(f64::from);
    let mean = (a + b + c) / 3.0;
    let variance = ((a - mean).powi(2) + (b - mean).powi(2) + (c - mean).powi(2)) / 3.0;
    variance.sqrt()
}
