//! Tile extraction layer.
//!
//! This module turns a slide into batches of fixed-size tiles at a fixed
//! physical resolution, skipping background, and optionally scores each
//! tile with an injected classifier.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              TileExtractor              │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ TileGeometry │  │ blankness()     │  │
//! │  │ (factor,     │  │ (channel std    │  │
//! │  │  trimming)   │  │  < 3 fraction)  │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  TileBatches    │    │  LesionBatches      │
//! │ (tiles, coords) │    │ (+ lesion_confs)    │
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileExtractor`]: Entry point; owns the slide and the grid geometry
//! - [`TileGeometry`]: Resample factor, native cell size, trimmed grid
//! - [`blankness`]: Fraction of near-uniform pixels in a tile
//! - [`TileBatches`]: Lazy iterator of [`TileBatch`] values
//! - [`LesionBatches`]: Lazy iterator of [`LesionBatch`] values using a [`Predictor`]
//! - [`JpegTileEncoder`]: Writes tiles out as JPEG
//!
//! # Example
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use wsi_autotiler::slide::ImageSlide;
//! use wsi_autotiler::tile::{TileExtractor, TileOptions};
//!
//! let image = RgbImage::from_pixel(2048, 2048, Rgb([200, 90, 160]));
//! let slide = ImageSlide::from_image("sample.png", image);
//!
//! let extractor = TileExtractor::new(&slide, 1024, 0.504).unwrap();
//! let options = TileOptions::default().with_progress(false);
//!
//! let coordinates: Vec<_> = extractor
//!     .iterate_tiles(options)
//!     .unwrap()
//!     .map(|batch| batch.unwrap())
//!     .flat_map(|batch| (0..batch.len()).map(move |i| batch.coordinate(i)))
//!     .collect();
//!
//! assert_eq!(coordinates[3], [1024, 1024, 2048, 2048]);
//! ```

mod blank;
mod encoder;
mod extractor;
mod geometry;
mod lesion;

pub use blank::{blankness, BLANK_STD_THRESHOLD};
pub use encoder::{
    clamp_quality, is_valid_quality, to_rgb_image, JpegTileEncoder, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use extractor::{
    ChannelOrder, TileBatch, TileBatches, TileExtractor, TileOptions, DEFAULT_BATCH_SIZE,
    DEFAULT_MIN_NON_BLANK_AMT, DEFAULT_TILE_MPP, DEFAULT_TILE_SIZE,
};
pub use geometry::{resample_factor, BoundingBox, GridCells, TileGeometry, MPP_ROUNDING_DECIMALS};
pub use lesion::{
    lesion_confidences, prepare_images, LesionBatch, LesionBatches, Predictor,
};
