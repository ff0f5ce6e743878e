//! Resampling geometry for resolution-aware tiling.
//!
//! Tiles are produced at a desired physical resolution regardless of the
//! slide's native one. If the slide is scanned at a finer resolution (smaller
//! MPP) a larger native cell is read and shrunk; if it is coarser, a smaller
//! cell is read and enlarged.
//!
//! ```text
//!   native slide (mpp 0.252)            output tiles (mpp 0.504)
//!  ┌──────────┬──────────┬──┐          ┌─────┬─────┐
//!  │  2048²   │  2048²   │▒▒│   ──▶    │1024²│1024²│
//!  ├──────────┼──────────┤▒▒│          ├─────┼─────┤
//!  │  2048²   │  2048²   │▒▒│          │1024²│1024²│
//!  ├──────────┴──────────┘▒▒│          └─────┴─────┘
//!  │▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒│   ▒ = trimmed remainder strip
//!  └────────────────────────┘
//! ```

use crate::error::TilingError;

/// Decimal places the slide MPP is rounded to before computing the factor.
///
/// Scanners report MPP with spurious precision (0.25198...), which would
/// otherwise produce off-by-one native cell sizes.
pub const MPP_ROUNDING_DECIMALS: i32 = 3;

/// Bounding box `(x0, y0, x1, y1)` of a tile in resampled whole-slide pixels.
pub type BoundingBox = [i64; 4];

/// Grid geometry for one (slide, tile size, desired MPP) combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGeometry {
    /// Output tile edge length in pixels
    pub tile_size: u32,

    /// Physical pixel size of output tiles
    pub desired_mpp: f64,

    /// `desired_mpp / slide_mpp`, or 1.0 when the slide has no MPP
    pub factor: f64,

    /// Edge length of one grid cell in native slide pixels
    pub modified_tile_size: u32,

    /// Slide width with the right remainder strip removed
    pub trimmed_width: u32,

    /// Slide height with the bottom remainder strip removed
    pub trimmed_height: u32,
}

impl TileGeometry {
    /// Compute the grid for a slide of `width × height` native pixels.
    ///
    /// # Errors
    ///
    /// - [`TilingError::InvalidTileSize`] if `tile_size` is zero
    /// - [`TilingError::InvalidMpp`] if `desired_mpp` is not positive, or the
    ///   slide MPP is negative or rounds to zero
    /// - [`TilingError::DegenerateGrid`] if the native cell would be empty
    pub fn new(
        width: u32,
        height: u32,
        slide_mpp: Option<f64>,
        tile_size: u32,
        desired_mpp: f64,
    ) -> Result<Self, TilingError> {
        if tile_size == 0 {
            return Err(TilingError::InvalidTileSize(tile_size));
        }

        let factor = resample_factor(slide_mpp, desired_mpp)?;
        let modified = (tile_size as f64 * factor).floor();
        if modified < 1.0 || modified > u32::MAX as f64 {
            return Err(TilingError::DegenerateGrid { tile_size, factor });
        }
        let modified_tile_size = modified as u32;

        Ok(Self {
            tile_size,
            desired_mpp,
            factor,
            modified_tile_size,
            trimmed_width: width - width % modified_tile_size,
            trimmed_height: height - height % modified_tile_size,
        })
    }

    /// Whether native cells must be resized to produce output tiles.
    pub fn needs_resample(&self) -> bool {
        self.factor != 1.0
    }

    /// Number of grid cells per row.
    pub fn columns(&self) -> u32 {
        self.trimmed_width / self.modified_tile_size
    }

    /// Number of grid rows.
    pub fn rows(&self) -> u32 {
        self.trimmed_height / self.modified_tile_size
    }

    /// Total number of grid cells.
    pub fn total_cells(&self) -> u64 {
        self.columns() as u64 * self.rows() as u64
    }

    /// Bounding box of the cell whose native top-left is `(x, y)`.
    ///
    /// Coordinates are scaled by `1 / factor` into the space of the slide
    /// as if it were fully resampled to the desired MPP, then floored.
    pub fn bounding_box(&self, x: u32, y: u32) -> BoundingBox {
        let r = 1.0 / self.factor;
        let step = self.modified_tile_size as f64;
        let (x, y) = (x as f64, y as f64);
        [
            (x * r).floor() as i64,
            (y * r).floor() as i64,
            ((x + step) * r).floor() as i64,
            ((y + step) * r).floor() as i64,
        ]
    }

    /// Iterate the native top-left corners of every grid cell, row-major.
    pub fn cells(&self) -> GridCells {
        GridCells {
            x: 0,
            y: 0,
            step: self.modified_tile_size,
            width: self.trimmed_width,
            height: self.trimmed_height,
        }
    }
}

/// Compute `desired_mpp / round(slide_mpp, 3)`.
///
/// A missing or zero slide MPP gives a factor of 1.0: tiles are cut at the
/// slide's native resolution.
pub fn resample_factor(slide_mpp: Option<f64>, desired_mpp: f64) -> Result<f64, TilingError> {
    if !desired_mpp.is_finite() || desired_mpp <= 0.0 {
        return Err(TilingError::InvalidMpp(desired_mpp));
    }

    match slide_mpp {
        None => Ok(1.0),
        Some(mpp) if mpp == 0.0 => Ok(1.0),
        Some(mpp) => {
            if !mpp.is_finite() || mpp < 0.0 {
                return Err(TilingError::InvalidMpp(mpp));
            }
            let rounded = round_to(mpp, MPP_ROUNDING_DECIMALS);
            if rounded == 0.0 {
                return Err(TilingError::InvalidMpp(mpp));
            }
            Ok(desired_mpp / rounded)
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Row-major iterator over grid cell corners.
///
/// `x` advances by one cell per step; at the trimmed width it wraps to zero
/// and `y` advances. Iteration ends when `y` reaches the trimmed height.
#[derive(Debug, Clone)]
pub struct GridCells {
    x: u32,
    y: u32,
    step: u32,
    width: u32,
    height: u32,
}

impl Iterator for GridCells {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.width == 0 || self.y >= self.height {
            return None;
        }

        let cell = (self.x, self.y);
        self.x += self.step;
        if self.x >= self.width {
            self.x = 0;
            self.y += self.step;
        }
        Some(cell)
    }
}

// =============================================================================
// Tests
// =============================================================================
