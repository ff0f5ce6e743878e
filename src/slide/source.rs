//! SlideSource trait for format-agnostic pixel access.
//!
//! The tile extractor only needs three things from a slide: its logical
//! dimensions at native resolution, its physical pixel size, and the ability
//! to read a rectangular RGB region. Anything that can provide those (a
//! decoded raster, a pyramidal TIFF reader, a remote tile service) can be
//! tiled.

use image::RgbImage;

use crate::error::SlideError;

/// Read access to a large image at its native resolution.
///
/// Coordinates are in the slide's logical pixel space: `(0, 0)` is the
/// top-left of the logical area and `(width(), height())` its bottom-right.
/// Implementations that support restricting to a sub-rectangle translate
/// logical coordinates to their underlying storage.
///
/// # Example
///
/// ```ignore
/// use wsi_autotiler::slide::SlideSource;
///
/// fn top_left<S: SlideSource>(slide: &S, edge: u32) -> Result<RgbImage, SlideError> {
///     slide.read_region(0, 0, edge.min(slide.width()), edge.min(slide.height()))
/// }
/// ```
pub trait SlideSource {
    /// Logical width in native pixels.
    fn width(&self) -> u32;

    /// Logical height in native pixels.
    fn height(&self) -> u32;

    /// Microns per pixel at native resolution.
    ///
    /// `None` when the slide carries no physical resolution metadata.
    fn mpp(&self) -> Option<f64>;

    /// Read the region with top-left `(x0, y0)` and bottom-right `(x1, y1)`
    /// (exclusive) as an RGB image of size `(x1 - x0) × (y1 - y0)`.
    ///
    /// # Errors
    ///
    /// Returns [`SlideError::RegionOutOfBounds`] if the region is inverted or
    /// extends past the logical dimensions, or an I/O/decode error from the
    /// underlying storage.
    fn read_region(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Result<RgbImage, SlideError>;

    /// Get `(width, height)` in native pixels.
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

impl<S: SlideSource + ?Sized> SlideSource for &S {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn mpp(&self) -> Option<f64> {
        (**self).mpp()
    }

    fn read_region(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Result<RgbImage, SlideError> {
        (**self).read_region(x0, y0, x1, y1)
    }
}

/// Check that a region lies inside `width × height` and is not inverted.
pub(crate) fn check_region(
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
    width: u32,
    height: u32,
) -> Result<(), SlideError> {
    if x0 > x1 || y0 > y1 || x1 > width || y1 > height {
        return Err(SlideError::RegionOutOfBounds {
            x0,
            y0,
            x1,
            y1,
            width,
            height,
        });
    }
    Ok(())
}
