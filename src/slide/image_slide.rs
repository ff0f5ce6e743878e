//! Image-backed slide implementation.
//!
//! `ImageSlide` holds a fully decoded RGB raster and serves region reads by
//! copying out of it. Decoder limits are lifted so that very large scans
//! (tens of thousands of pixels per side) can still be opened.

use std::path::{Path, PathBuf};

use image::{imageops, ImageReader, RgbImage};
use tracing::debug;

use crate::error::SlideError;

use super::source::{check_region, SlideSource};

/// A slide backed by an in-memory RGB raster.
///
/// The slide keeps a logical origin and logical dimensions. Both start as
/// the full image; [`ImageSlide::restrict`] narrows them to a sub-rectangle
/// so that tiling only covers that area.
#[derive(Debug, Clone)]
pub struct ImageSlide {
    path: PathBuf,
    name: String,
    extension: String,
    image: RgbImage,
    mpp: Option<f64>,
    origin: (u32, u32),
    width: u32,
    height: u32,
}

impl ImageSlide {
    /// Open and decode an image file as a slide.
    ///
    /// The format is guessed from the file contents. The slide has no MPP
    /// until one is set with [`ImageSlide::with_mpp`].
    ///
    /// # Errors
    ///
    /// Returns [`SlideError::Io`] if the file cannot be read and
    /// [`SlideError::Decode`] if it is not a supported image.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SlideError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let mut reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| SlideError::Io {
                path: path_str.clone(),
                message: e.to_string(),
            })?;
        reader.no_limits();

        let image = reader
            .decode()
            .map_err(|e| SlideError::Decode {
                path: path_str.clone(),
                message: e.to_string(),
            })?
            .to_rgb8();

        debug!(
            "Opened slide {} ({}x{})",
            path_str,
            image.width(),
            image.height()
        );

        Ok(Self::from_image(path, image))
    }

    /// Wrap an already decoded raster as a slide.
    pub fn from_image(path: impl Into<PathBuf>, image: RgbImage) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|s| format!(".{}", s.to_string_lossy()))
            .unwrap_or_default();
        let (width, height) = image.dimensions();

        Self {
            path,
            name,
            extension,
            image,
            mpp: None,
            origin: (0, 0),
            width,
            height,
        }
    }

    /// Set the native microns-per-pixel of the slide.
    ///
    /// A value of zero is treated the same as no MPP.
    pub fn with_mpp(mut self, mpp: f64) -> Self {
        self.mpp = if mpp > 0.0 { Some(mpp) } else { None };
        self
    }

    /// Path the slide was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem of the slide path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File extension including the leading dot, or empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Top-left of the logical area in full-image coordinates.
    pub fn origin(&self) -> (u32, u32) {
        self.origin
    }

    /// Dimensions of the full decoded image, ignoring any restriction.
    pub fn full_dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Only use a section of the slide from now on.
    ///
    /// Coordinates are `(top_left_x, top_left_y, bottom_right_x,
    /// bottom_right_y)` in full-image pixels. The logical origin moves to the
    /// top-left corner and the logical width/height shrink to the rectangle,
    /// so later region reads at `(0, 0)` start at `(x0, y0)` of the image.
    ///
    /// # Errors
    ///
    /// Returns [`SlideError::InvalidRestriction`] if the rectangle is empty
    /// or extends past the full image.
    pub fn restrict(&mut self, x0: u32, y0: u32, x1: u32, y1: u32) -> Result<(), SlideError> {
        let (full_width, full_height) = self.image.dimensions();
        let invalid = |reason: &str| SlideError::InvalidRestriction {
            x0,
            y0,
            x1,
            y1,
            reason: reason.to_string(),
        };

        if x0 >= x1 || y0 >= y1 {
            return Err(invalid("rectangle is empty"));
        }
        if x1 > full_width || y1 > full_height {
            return Err(invalid(&format!(
                "exceeds image size {}x{}",
                full_width, full_height
            )));
        }

        self.origin = (x0, y0);
        self.width = x1 - x0;
        self.height = y1 - y0;
        Ok(())
    }
}

impl SlideSource for ImageSlide {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn mpp(&self) -> Option<f64> {
        self.mpp
    }

    fn read_region(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Result<RgbImage, SlideError> {
        check_region(x0, y0, x1, y1, self.width, self.height)?;

        let (ox, oy) = self.origin;
        Ok(imageops::crop_imm(&self.image, ox + x0, oy + y0, x1 - x0, y1 - y0).to_image())
    }
}

// =============================================================================
// Tests
// =============================================================================
