//! WSI Autotiler - tiling and class post-processing for Whole Slide Images.
//!
//! This binary wires the library's commands to the command line.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_autotiler::{
    artifact::{create_s3_client, resolve_artifacts, S3ArtifactStore},
    classes::{ClassDistribution, ParallelColumn, RemovalSpec},
    config::{Cli, Command, ProfilesConfig, RemoveClassesConfig, ResolveConfig, TileConfig},
    profile::{builtin, ClassProfile, BUILTIN_PROFILES},
    slide::ImageSlide,
    tile::{BoundingBox, JpegTileEncoder, TileExtractor, TileOptions},
    timing::TimedStep,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Tile(config) => run_tile(config),
        Command::RemoveClasses(config) => run_remove_classes(config),
        Command::Profiles(config) => run_profiles(config),
        Command::Resolve(config) => run_resolve(config).await,
    }
}

/// Initialize the tracing subscriber.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_autotiler=debug"
    } else {
        "wsi_autotiler=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Tile Command
// =============================================================================

/// One written tile.
#[derive(Debug, Serialize)]
struct ManifestTile {
    file: String,
    batch: usize,
    bounding_box: BoundingBox,
}

/// Description of a tiling run, written next to the tiles.
#[derive(Debug, Serialize)]
struct Manifest {
    slide: String,
    tile_size: u32,
    mpp: f64,
    factor: f64,
    grid_columns: u32,
    grid_rows: u32,
    tiles: Vec<ManifestTile>,
}

fn run_tile(config: TileConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match tile_slide(&config) {
        Ok(manifest) => {
            info!(
                "Wrote {} tiles to {}",
                manifest.tiles.len(),
                config.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Tiling failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn tile_slide(config: &TileConfig) -> Result<Manifest, Box<dyn std::error::Error>> {
    let profile = config.profile.load()?;
    let tile_size = config.tile_size.unwrap_or(profile.tile_size);
    let mpp = config.mpp.unwrap_or(profile.mpp);

    let mut slide = ImageSlide::open(&config.slide)?;
    if let Some(slide_mpp) = config.slide_mpp {
        slide = slide.with_mpp(slide_mpp);
    }
    if let Some(&[x0, y0, x1, y1]) = config.region.as_deref() {
        slide.restrict(x0, y0, x1, y1)?;
    }

    let _step = TimedStep::new(format!("tile {}", slide.name()));
    let extractor = TileExtractor::new(&slide, tile_size, mpp)?;
    let options = TileOptions::default()
        .with_min_non_blank(config.min_non_blank)
        .with_batch_size(config.batch_size)
        .with_progress(!config.no_progress);
    let encoder = JpegTileEncoder::new(config.jpeg_quality);

    fs::create_dir_all(&config.output)?;

    let mut tiles = Vec::new();
    for (batch_index, batch) in extractor.iterate_tiles(options)?.enumerate() {
        let batch = batch?;
        for i in 0..batch.len() {
            let bounding_box = batch.coordinate(i);
            let file = format!(
                "{}_{}_{}.jpg",
                slide.name(),
                bounding_box[0],
                bounding_box[1]
            );
            let jpeg = encoder.encode(batch.tile(i), options.channel_order)?;
            fs::write(config.output.join(&file), &jpeg)?;

            tiles.push(ManifestTile {
                file,
                batch: batch_index,
                bounding_box,
            });
        }
    }

    let geometry = extractor.geometry();
    let manifest = Manifest {
        slide: config.slide.display().to_string(),
        tile_size,
        mpp,
        factor: geometry.factor,
        grid_columns: extractor.grid_columns(),
        grid_rows: extractor.grid_rows(),
        tiles,
    };
    fs::write(
        config.output.join("manifest.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    Ok(manifest)
}

// =============================================================================
// Remove-Classes Command
// =============================================================================

/// Input document of the remove-classes command.
#[derive(Debug, Deserialize)]
struct RemovalInput {
    #[serde(flatten)]
    distribution: ClassDistribution,

    #[serde(default)]
    parallel: BTreeMap<String, ParallelColumn>,
}

fn run_remove_classes(config: RemoveClassesConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let input = match read_removal_input(&config.input) {
        Ok(input) => input,
        Err(e) => {
            error!("Failed to read {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut spec = RemovalSpec::new(config.remove.iter().map(|p| p.trim().to_string()))
        .with_threshold(config.threshold)
        .with_redistribute(!config.no_redistribute);
    spec.parallel = input.parallel;

    match input.distribution.remove_classes(&spec) {
        Ok(removal) => print_json(&removal),
        Err(e) => {
            error!("Class removal failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_removal_input(path: &Path) -> Result<RemovalInput, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

// =============================================================================
// Profiles Command
// =============================================================================

/// A profile with its derived values.
#[derive(Debug, Serialize)]
struct ProfileView {
    identity: String,
    model_name: String,
    class_colors: Vec<String>,
    non_lesion_indices: Vec<usize>,
    #[serde(flatten)]
    profile: ClassProfile,
}

impl From<ClassProfile> for ProfileView {
    fn from(profile: ClassProfile) -> Self {
        Self {
            identity: profile.identity(),
            model_name: profile.model_name(),
            class_colors: profile.colormaps(),
            non_lesion_indices: profile.non_lesion_indices(),
            profile,
        }
    }
}

fn run_profiles(config: ProfilesConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let selected = match (&config.name, &config.file) {
        (Some(name), _) => Some(builtin(name)),
        (None, Some(path)) => Some(ClassProfile::from_json_file(path)),
        (None, None) => None,
    };

    match selected {
        Some(Ok(profile)) => print_json(&ProfileView::from(profile)),
        Some(Err(e)) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
        None => {
            for name in BUILTIN_PROFILES {
                match builtin(name) {
                    Ok(profile) => println!(
                        "{:<28} {:<36} {} classes",
                        name,
                        profile.identity(),
                        profile.classes.len()
                    ),
                    Err(e) => error!("{}", e),
                }
            }
            ExitCode::SUCCESS
        }
    }
}

// =============================================================================
// Resolve Command
// =============================================================================

async fn run_resolve(config: ResolveConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let profile = match config.profile.load() {
        Ok(profile) => profile,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  S3 bucket: {}", config.s3_bucket);
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.s3_region);
    info!("  Cache dir: {}", config.cache_dir.display());

    let client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
    let store = S3ArtifactStore::new(
        client,
        config.s3_bucket.clone(),
        config.s3_prefix.clone(),
        config.cache_dir.clone(),
    );

    let _step = TimedStep::new(format!("resolve artifacts of {}", profile.identity()));
    match resolve_artifacts(&store, &profile).await {
        Ok(resolved) => print_json(&resolved),
        Err(e) => {
            error!("Failed to resolve artifacts: {}", e);
            ExitCode::FAILURE
        }
    }
}
