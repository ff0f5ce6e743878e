//! # WSI Autotiler
//!
//! Resolution-aware tile extraction and class post-processing for Whole
//! Slide Images (WSI).
//!
//! Slides are scanned at different magnifications, while a classifier
//! expects tiles of one fixed size at one fixed physical resolution. This
//! library walks a slide in a grid of native cells sized so that, once
//! resampled, every tile has the requested microns per pixel. Background
//! tiles are dropped and the rest are emitted in fixed-size batches ready
//! for inference. Model output can then be cleaned up by removing classes
//! such as background or pen marker and renormalizing what is left.
//!
//! ## Features
//!
//! - **Resolution-aware tiling**: native cell size derived from slide and target MPP
//! - **Blank filtering**: tiles with too little tissue are skipped
//! - **Bounded memory**: one reused batch buffer, copied on emit
//! - **Lesion scoring**: optional per-tile lesion confidence from an injected predictor
//! - **Class removal**: fuzzy class-name matching with ratio-preserving renormalization
//! - **Profiles and artifacts**: built-in class profiles and S3 model resolution
//!
//! ## Architecture
//!
//! - [`slide`] - Slide abstraction and an image-backed implementation
//! - [`tile`] - Tile geometry, blank detection, batch extraction, JPEG output
//! - [`classes`] - Fuzzy class matching and class removal
//! - [`profile`] - Class profiles and autotiler selection
//! - [`artifact`] - Model artifact stores and resolution
//! - [`notify`] - Result notifications
//! - [`timing`] - Step timing in the logs
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_autotiler::{remove_class, ImageSlide, RemovalSpec, TileExtractor, TileOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let slide = ImageSlide::open("slide.png")?.with_mpp(0.252);
//!     let extractor = TileExtractor::new(&slide, 1024, 0.504)?;
//!
//!     for batch in extractor.iterate_tiles(TileOptions::default().with_min_non_blank(0.1))? {
//!         let batch = batch?;
//!         println!("{} tiles", batch.len());
//!     }
//!
//!     let spec = RemovalSpec::new(["blank"]);
//!     let result = remove_class(&[0.2, 0.6, 0.2], &["blank", "a", "b"], &spec)?;
//!     println!("{:?}", result.pred);
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod classes;
pub mod config;
pub mod error;
pub mod notify;
pub mod profile;
pub mod slide;
pub mod tile;
pub mod timing;

// Re-export commonly used types
pub use artifact::{
    create_s3_client, resolve_artifacts, ArtifactStore, LocalArtifactStore, ModelFormat,
    ResolvedArtifacts, S3ArtifactStore,
};
pub use classes::{
    best_match, partial_ratio, remove_class, ClassDistribution, ParallelColumn, Removal,
    RemovalSpec, MATCH_THRESHOLD,
};
pub use config::{Cli, Command, ProfilesConfig, RemoveClassesConfig, ResolveConfig, TileConfig};
pub use error::{
    ArtifactError, ClassError, EncodeError, InferenceError, NotifyError, ProfileError,
    SlideError, TilingError,
};
pub use notify::{send_notification, EmailMessage, LogNotifier, Notification, Notifier};
pub use profile::{builtin, AutotilerConfig, ClassProfile, Tissue};
pub use slide::{ImageSlide, SlideSource};
pub use tile::{
    blankness, prepare_images, ChannelOrder, JpegTileEncoder, LesionBatch, Predictor, TileBatch,
    TileExtractor, TileGeometry, TileOptions, DEFAULT_BATCH_SIZE, DEFAULT_TILE_MPP,
    DEFAULT_TILE_SIZE,
};
pub use timing::TimedStep;
