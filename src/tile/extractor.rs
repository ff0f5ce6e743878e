//! Tile extraction over a whole slide.
//!
//! The extractor walks the trimmed grid row by row, reads each native cell,
//! resamples it to the output tile size, drops cells that are mostly blank
//! and packs the rest into fixed-size batches ready for model inference.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       TileBatches::next()                    │
//! │  1. Next grid cell        4. Blankness filter                │
//! │  2. Read native region    5. Copy into batch buffer          │
//! │  3. Resample to tile_size 6. Emit a copy when buffer is full │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The batch buffer is allocated once and reused for every batch; each
//! emitted [`TileBatch`] owns a copy of it, so batches handed to consumers
//! are never overwritten by later cells.

use std::iter::FusedIterator;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{s, Array2, Array4, ArrayView1, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::TilingError;
use crate::slide::SlideSource;

use super::blank::blankness;
use super::geometry::{BoundingBox, GridCells, TileGeometry};

/// Default output tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 1024;

/// Default output MPP (20x magnification).
pub const DEFAULT_TILE_MPP: f64 = 0.5040;

/// Default number of tiles per batch.
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// Suggested minimum non-blank fraction for tissue detection.
///
/// [`TileOptions::default`] keeps every tile (0.0); callers that want to
/// skip background use this value.
pub const DEFAULT_MIN_NON_BLANK_AMT: f64 = 0.1;

// =============================================================================
// Options
// =============================================================================

/// Channel layout of emitted tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    /// Red, green, blue
    Rgb,

    /// Blue, green, red (the layout the classification models were trained on)
    #[default]
    Bgr,
}

/// Parameters for one pass over the slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileOptions {
    /// A tile must have at least this fraction of non-blank pixels (0.0-1.0)
    pub min_non_blank_amt: f64,

    /// Number of tiles per emitted batch
    pub batch_size: usize,

    /// Log progress after every completed grid row
    pub log_progress: bool,

    /// Channel layout of emitted tiles
    pub channel_order: ChannelOrder,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            min_non_blank_amt: 0.0,
            batch_size: DEFAULT_BATCH_SIZE,
            log_progress: true,
            channel_order: ChannelOrder::default(),
        }
    }
}

impl TileOptions {
    /// Set the minimum non-blank fraction.
    pub fn with_min_non_blank(mut self, amount: f64) -> Self {
        self.min_non_blank_amt = amount;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable per-row progress logging.
    pub fn with_progress(mut self, log_progress: bool) -> Self {
        self.log_progress = log_progress;
        self
    }

    /// Set the channel layout of emitted tiles.
    pub fn with_channel_order(mut self, channel_order: ChannelOrder) -> Self {
        self.channel_order = channel_order;
        self
    }

    /// Check the options before any tile is read.
    pub fn validate(&self) -> Result<(), TilingError> {
        if !(0.0..=1.0).contains(&self.min_non_blank_amt) {
            return Err(TilingError::InvalidMinNonBlank(self.min_non_blank_amt));
        }
        if self.batch_size < 1 {
            return Err(TilingError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }
}

// =============================================================================
// Tile Batch
// =============================================================================

/// A batch of accepted tiles and their bounding boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBatch {
    /// Pixels, shape `[k, tile_size, tile_size, 3]`
    pub tiles: Array4<u8>,

    /// Bounding boxes `(x0, y0, x1, y1)`, shape `[k, 4]`, in resampled
    /// whole-slide pixels
    pub coordinates: Array2<i64>,
}

impl TileBatch {
    /// Number of tiles in the batch.
    pub fn len(&self) -> usize {
        self.tiles.len_of(Axis(0))
    }

    /// Whether the batch holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixels of the `index`-th tile, shape `[tile_size, tile_size, 3]`.
    pub fn tile(&self, index: usize) -> ArrayView3<'_, u8> {
        self.tiles.index_axis(Axis(0), index)
    }

    /// Bounding box of the `index`-th tile.
    pub fn coordinate(&self, index: usize) -> BoundingBox {
        let row: ArrayView1<'_, i64> = self.coordinates.row(index);
        [row[0], row[1], row[2], row[3]]
    }
}

// =============================================================================
// Tile Extractor
// =============================================================================

/// Produces batches of fixed-size, physically normalized tiles from a slide.
///
/// Regardless of the slide's native MPP, tiles come out at `desired_mpp`
/// and `tile_size × tile_size` pixels. If the two MPPs match this is a raw
/// tile cutter.
///
/// # Example
///
/// ```ignore
/// use wsi_autotiler::slide::ImageSlide;
/// use wsi_autotiler::tile::{TileExtractor, TileOptions};
///
/// let slide = ImageSlide::open("slide.png")?.with_mpp(0.252);
/// let extractor = TileExtractor::new(&slide, 1024, 0.504)?;
///
/// let options = TileOptions::default().with_min_non_blank(0.1).with_batch_size(8);
/// for batch in extractor.iterate_tiles(options)? {
///     let batch = batch?;
///     println!("{} tiles, first at {:?}", batch.len(), batch.coordinate(0));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TileExtractor<S: SlideSource> {
    slide: S,
    geometry: TileGeometry,
}

impl<S: SlideSource> TileExtractor<S> {
    /// Create an extractor for `slide`.
    ///
    /// # Errors
    ///
    /// Fails if the tile size or MPP values cannot produce a usable grid.
    /// See [`TileGeometry::new`].
    pub fn new(slide: S, tile_size: u32, desired_mpp: f64) -> Result<Self, TilingError> {
        let geometry = TileGeometry::new(
            slide.width(),
            slide.height(),
            slide.mpp(),
            tile_size,
            desired_mpp,
        )?;

        debug!(
            "Tile grid: factor {:.4}, native cell {}px, {}x{} cells over {}x{}",
            geometry.factor,
            geometry.modified_tile_size,
            geometry.columns(),
            geometry.rows(),
            geometry.trimmed_width,
            geometry.trimmed_height
        );

        Ok(Self { slide, geometry })
    }

    /// Grid geometry computed for this slide.
    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    /// The slide being tiled.
    pub fn slide(&self) -> &S {
        &self.slide
    }

    /// Output tile edge length.
    pub fn tile_size(&self) -> u32 {
        self.geometry.tile_size
    }

    /// Number of grid columns after trimming.
    pub fn grid_columns(&self) -> u32 {
        self.geometry.columns()
    }

    /// Number of grid rows after trimming.
    pub fn grid_rows(&self) -> u32 {
        self.geometry.rows()
    }

    /// Number of grid cells visited by a full iteration.
    pub fn total_cells(&self) -> u64 {
        self.geometry.total_cells()
    }

    /// Iterate over all tiles of the slide in batches.
    ///
    /// Options are validated before any region is read. The returned
    /// iterator is lazy and single-use: it yields `ceil(accepted /
    /// batch_size)` batches, every one full except possibly the last, and
    /// nothing at all if every cell is filtered out. A region read error is
    /// yielded once and ends the iteration.
    ///
    /// # Errors
    ///
    /// - [`TilingError::InvalidMinNonBlank`] if `min_non_blank_amt` is outside `[0, 1]`
    /// - [`TilingError::InvalidBatchSize`] if `batch_size` is zero
    pub fn iterate_tiles(&self, options: TileOptions) -> Result<TileBatches<'_, S>, TilingError> {
        options.validate()?;

        let tile_size = self.geometry.tile_size as usize;
        Ok(TileBatches {
            slide: &self.slide,
            geometry: self.geometry,
            cells: self.geometry.cells(),
            options,
            max_blankness: 1.0 - options.min_non_blank_amt,
            tiles: Array4::zeros((options.batch_size, tile_size, tile_size, 3)),
            coordinates: Array2::zeros((options.batch_size, 4)),
            filled: 0,
            scanned: 0,
            started: Instant::now(),
            finished: false,
        })
    }
}

// =============================================================================
// Batch Iterator
// =============================================================================

/// Lazy, single-use iterator over the tile batches of a slide.
///
/// Created by [`TileExtractor::iterate_tiles`]. Dropping it early needs no
/// cleanup; no slide resources are held between region reads.
pub struct TileBatches<'a, S: SlideSource> {
    slide: &'a S,
    geometry: TileGeometry,
    cells: GridCells,
    options: TileOptions,
    max_blankness: f64,
    tiles: Array4<u8>,
    coordinates: Array2<i64>,
    filled: usize,
    scanned: u64,
    started: Instant,
    finished: bool,
}

impl<S: SlideSource> TileBatches<'_, S> {
    /// Number of grid cells visited so far.
    pub fn cells_scanned(&self) -> u64 {
        self.scanned
    }

    /// Read one native cell and bring it to `tile_size × tile_size`.
    fn read_tile(&self, x: u32, y: u32) -> Result<RgbImage, TilingError> {
        let step = self.geometry.modified_tile_size;
        let region = self.slide.read_region(x, y, x + step, y + step)?;

        if self.geometry.needs_resample() {
            let size = self.geometry.tile_size;
            Ok(imageops::resize(&region, size, size, FilterType::Triangle))
        } else {
            Ok(region)
        }
    }

    fn store(&mut self, tile: &RgbImage, bbox: BoundingBox) {
        let order = self.options.channel_order;
        let mut slot = self.tiles.index_axis_mut(Axis(0), self.filled);

        for (x, y, pixel) in tile.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let channels = match order {
                ChannelOrder::Rgb => [r, g, b],
                ChannelOrder::Bgr => [b, g, r],
            };
            for (c, value) in channels.into_iter().enumerate() {
                slot[[y as usize, x as usize, c]] = value;
            }
        }

        for (i, value) in bbox.into_iter().enumerate() {
            self.coordinates[[self.filled, i]] = value;
        }
        self.filled += 1;
    }

    /// Copy the first `count` buffered tiles out and reset the buffer.
    fn emit(&mut self, count: usize) -> TileBatch {
        self.filled = 0;
        TileBatch {
            tiles: self.tiles.slice(s![..count, .., .., ..]).to_owned(),
            coordinates: self.coordinates.slice(s![..count, ..]).to_owned(),
        }
    }

    fn log_row_progress(&self) {
        let columns = self.geometry.columns() as u64;
        let rows = self.geometry.rows() as u64;
        let rows_done = self.scanned / columns.max(1);

        info!(
            "{:.2}% ({}/{} tiles) in {:.2}s",
            rows_done as f64 / rows.max(1) as f64 * 100.0,
            rows_done * columns,
            self.geometry.total_cells(),
            self.started.elapsed().as_secs_f64()
        );
    }
}

impl<S: SlideSource> Iterator for TileBatches<'_, S> {
    type Item = Result<TileBatch, TilingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while let Some((x, y)) = self.cells.next() {
            self.scanned += 1;

            let tile = match self.read_tile(x, y) {
                Ok(tile) => tile,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            if blankness(&tile) <= self.max_blankness {
                let bbox = self.geometry.bounding_box(x, y);
                self.store(&tile, bbox);
            }

            if self.options.log_progress
                && x + self.geometry.modified_tile_size >= self.geometry.trimmed_width
            {
                self.log_row_progress();
            }

            if self.filled == self.options.batch_size {
                return Some(Ok(self.emit(self.options.batch_size)));
            }
        }

        self.finished = true;
        if self.filled > 0 {
            let leftover = self.filled;
            return Some(Ok(self.emit(leftover)));
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let remaining = self.geometry.total_cells().saturating_sub(self.scanned);
        let pending = remaining + self.filled as u64;
        let batch = self.options.batch_size as u64;
        let upper = pending.div_ceil(batch);
        (0, usize::try_from(upper).ok())
    }
}

impl<S: SlideSource> FusedIterator for TileBatches<'_, S> {}

// =============================================================================
// Tests
// =============================================================================
