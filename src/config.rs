//! Command-line configuration for the autotiler.
//!
//! Every command is configured through clap arguments, most of which can
//! also be set with an `AUTOTILE_`-prefixed environment variable:
//!
//! - `AUTOTILE_PROFILE` - Built-in profile name (default: nine_class)
//! - `AUTOTILE_PROFILE_FILE` - JSON profile file, overrides the name
//! - `AUTOTILE_OUTPUT` - Tile output directory (default: tiles)
//! - `AUTOTILE_MIN_NON_BLANK` - Minimum non-blank fraction per tile (default: 0.1)
//! - `AUTOTILE_BATCH_SIZE` - Tiles per batch (default: 4)
//! - `AUTOTILE_JPEG_QUALITY` - JPEG quality of written tiles (default: 90)
//! - `AUTOTILE_THRESHOLD` - Class match threshold (default: 85)
//! - `AUTOTILE_S3_BUCKET` - Bucket holding model collections
//! - `AUTOTILE_S3_PREFIX` - Key prefix of the collections
//! - `AUTOTILE_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `AUTOTILE_S3_REGION` - AWS region (default: us-east-1)
//! - `AUTOTILE_CACHE_DIR` - Local directory for fetched artifacts (default: artifacts)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::classes::{DEFAULT_REMOVE, MATCH_THRESHOLD};
use crate::error::ProfileError;
use crate::profile::{builtin, ClassProfile};
use crate::tile::{
    is_valid_quality, DEFAULT_BATCH_SIZE, DEFAULT_JPEG_QUALITY, DEFAULT_MIN_NON_BLANK_AMT,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default built-in profile.
pub const DEFAULT_PROFILE: &str = "nine_class";

/// Default tile output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "tiles";

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default artifact cache directory.
pub const DEFAULT_CACHE_DIR: &str = "artifacts";

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Autotiler - resolution-aware tiling and class post-processing for
/// Whole Slide Images.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-autotiler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract non-blank tiles from a slide image and write them as JPEGs.
    Tile(TileConfig),

    /// Remove classes from a probability distribution read as JSON.
    RemoveClasses(RemoveClassesConfig),

    /// List built-in class profiles or show one in detail.
    Profiles(ProfilesConfig),

    /// Fetch a profile's model artifacts from S3.
    Resolve(ResolveConfig),
}

/// Which class profile to use.
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Built-in profile name.
    #[arg(long, default_value = DEFAULT_PROFILE, env = "AUTOTILE_PROFILE")]
    pub profile: String,

    /// JSON profile file; takes precedence over --profile.
    #[arg(long, env = "AUTOTILE_PROFILE_FILE")]
    pub profile_file: Option<PathBuf>,
}

impl ProfileArgs {
    /// Load the selected profile.
    pub fn load(&self) -> Result<ClassProfile, ProfileError> {
        match &self.profile_file {
            Some(path) => ClassProfile::from_json_file(path),
            None => builtin(&self.profile),
        }
    }
}

// =============================================================================
// Tile Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct TileConfig {
    /// Slide image to tile.
    pub slide: PathBuf,

    /// Directory tiles and the manifest are written to.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR, env = "AUTOTILE_OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Output tile edge in pixels (default: the profile's).
    #[arg(long)]
    pub tile_size: Option<u32>,

    /// Output microns per pixel (default: the profile's).
    #[arg(long)]
    pub mpp: Option<f64>,

    /// Microns per pixel of the slide image, if known.
    #[arg(long)]
    pub slide_mpp: Option<f64>,

    /// Minimum fraction of non-blank pixels for a tile to be kept.
    #[arg(long, default_value_t = DEFAULT_MIN_NON_BLANK_AMT, env = "AUTOTILE_MIN_NON_BLANK")]
    pub min_non_blank: f64,

    /// Tiles per batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, env = "AUTOTILE_BATCH_SIZE")]
    pub batch_size: usize,

    /// JPEG quality of written tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "AUTOTILE_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Only tile this region, as x0,y0,x1,y1 in slide pixels.
    #[arg(long, value_delimiter = ',')]
    pub region: Option<Vec<u32>>,

    /// Disable per-row progress logging.
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

impl TileConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_non_blank) {
            return Err("min_non_blank must be between 0.0 and 1.0".to_string());
        }

        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.tile_size == Some(0) {
            return Err("tile_size must be greater than 0".to_string());
        }

        for (name, value) in [("mpp", self.mpp), ("slide_mpp", self.slide_mpp)] {
            if let Some(v) = value {
                if !(v.is_finite() && v > 0.0) {
                    return Err(format!("{} must be a positive number", name));
                }
            }
        }

        if let Some(region) = &self.region {
            match region.as_slice() {
                [x0, y0, x1, y1] if x0 < x1 && y0 < y1 => {}
                [_, _, _, _] => {
                    return Err("region must satisfy x0 < x1 and y0 < y1".to_string());
                }
                _ => return Err("region must be x0,y0,x1,y1".to_string()),
            }
        }

        Ok(())
    }
}

// =============================================================================
// Remove-Classes Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct RemoveClassesConfig {
    /// JSON file with `classes`, `probabilities` and optional `parallel` columns.
    pub input: PathBuf,

    /// Class name patterns to remove, in order (comma-separated).
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_REMOVE.map(String::from))]
    pub remove: Vec<String>,

    /// Minimum match score (0-100) for a pattern to remove a class.
    #[arg(long, default_value_t = MATCH_THRESHOLD, env = "AUTOTILE_THRESHOLD")]
    pub threshold: u8,

    /// Keep the remaining probabilities as they are instead of renormalizing.
    #[arg(long, default_value_t = false)]
    pub no_redistribute: bool,
}

impl RemoveClassesConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.threshold > 100 {
            return Err("threshold must be between 0 and 100".to_string());
        }

        if self.remove.iter().all(|p| p.trim().is_empty()) {
            return Err("At least one class pattern is required. Set --remove".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Profiles Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ProfilesConfig {
    /// Built-in profile to show; lists all profiles when omitted.
    pub name: Option<String>,

    /// JSON profile file to show.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl ProfilesConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_some() && self.file.is_some() {
            return Err("Give either a profile name or --file, not both".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Resolve Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ResolveConfig {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// S3 bucket holding the model collections.
    #[arg(long, env = "AUTOTILE_S3_BUCKET")]
    pub s3_bucket: String,

    /// Key prefix of the collections within the bucket.
    #[arg(long, default_value = "", env = "AUTOTILE_S3_PREFIX")]
    pub s3_prefix: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    ///
    /// If not specified, uses the default AWS S3 endpoint.
    #[arg(long, env = "AUTOTILE_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "AUTOTILE_S3_REGION")]
    pub s3_region: String,

    /// Local directory fetched artifacts are written to.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "AUTOTILE_CACHE_DIR")]
    pub cache_dir: PathBuf,
}

impl ResolveConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.s3_bucket.is_empty() {
            return Err(
                "S3 bucket name is required. Set --s3-bucket or AUTOTILE_S3_BUCKET".to_string(),
            );
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
