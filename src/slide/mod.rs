//! Slide abstraction layer.
//!
//! This module provides the interface the tile extractor reads pixels
//! through, plus an image-backed implementation for slides that fit in a
//! single decoded raster.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              TileExtractor              │
//! └────────────────────┬────────────────────┘
//!                      │  read_region(x0, y0, x1, y1)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           SlideSource Trait             │
//! │  (dimensions, mpp, region reads)        │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               ImageSlide                │
//! │  (decoded raster + logical origin)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wsi_autotiler::slide::{ImageSlide, SlideSource};
//!
//! let mut slide = ImageSlide::open("slides/sample.png")?.with_mpp(0.252);
//!
//! // Only tile the upper-left quadrant
//! slide.restrict(0, 0, slide.width() / 2, slide.height() / 2)?;
//!
//! let region = slide.read_region(0, 0, 512, 512)?;
//! ```

mod image_slide;
mod source;

pub use image_slide::ImageSlide;
pub use source::SlideSource;
