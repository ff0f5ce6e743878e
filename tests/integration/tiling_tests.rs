//! Integration tests for tile extraction.
//!
//! These tests verify:
//! - Grid traversal order and bounding boxes at native resolution
//! - Batch sizing and empty output on blank slides
//! - Resampling from a higher-resolution slide
//! - Restricted slides and channel order of emitted pixels
//! - Lesion scoring through an injected predictor
//! - Writing tiles as JPEG

use image::ImageReader;
use ndarray::{Array2, ArrayView4};
use std::io::Cursor;

use wsi_autotiler::error::{InferenceError, TilingError};
use wsi_autotiler::profile::AutotilerConfig;
use wsi_autotiler::slide::{ImageSlide, SlideSource};
use wsi_autotiler::tile::{ChannelOrder, JpegTileEncoder, TileBatch, TileExtractor, TileOptions};

use super::test_utils::{
    left_tissue_image, png_slide, uniform_image, RecordingPredictor, GLASS, TISSUE,
};

fn quiet() -> TileOptions {
    TileOptions::default().with_progress(false)
}

fn collect<S: SlideSource>(extractor: &TileExtractor<S>, options: TileOptions) -> Vec<TileBatch> {
    extractor
        .iterate_tiles(options)
        .unwrap()
        .map(|batch| batch.unwrap())
        .collect()
}

fn all_coordinates(batches: &[TileBatch]) -> Vec<[i64; 4]> {
    batches
        .iter()
        .flat_map(|batch| (0..batch.len()).map(move |i| batch.coordinate(i)))
        .collect()
}

// =============================================================================
// Grid Traversal
// =============================================================================

#[test]
fn test_native_resolution_grid_order() {
    let dir = tempfile::tempdir().unwrap();
    let slide = png_slide(dir.path(), "native.png", &uniform_image(2048, 2048, TISSUE), 0.504);

    let extractor = TileExtractor::new(&slide, 1024, 0.504).unwrap();
    assert_eq!(extractor.geometry().factor, 1.0);

    let batches = collect(&extractor, quiet().with_min_non_blank(0.0));
    assert_eq!(batches.len(), 1);
    assert_eq!(
        all_coordinates(&batches),
        vec![
            [0, 0, 1024, 1024],
            [1024, 0, 2048, 1024],
            [0, 1024, 1024, 2048],
            [1024, 1024, 2048, 2048],
        ]
    );
    assert_eq!(batches[0].tiles.shape(), &[4, 1024, 1024, 3]);
}

#[test]
fn test_batches_are_full_except_last() {
    let dir = tempfile::tempdir().unwrap();
    let slide = png_slide(dir.path(), "native.png", &uniform_image(2048, 2048, TISSUE), 0.504);
    let extractor = TileExtractor::new(&slide, 1024, 0.504).unwrap();

    let batches = collect(&extractor, quiet().with_batch_size(3));
    let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![3, 1]);
    assert_eq!(all_coordinates(&batches)[3], [1024, 1024, 2048, 2048]);
}

#[test]
fn test_uniform_slide_with_full_tissue_requirement() {
    let slide = ImageSlide::from_image("glass.png", uniform_image(2048, 2048, GLASS));
    let extractor = TileExtractor::new(&slide, 1024, 0.504).unwrap();

    let mut batches = extractor
        .iterate_tiles(quiet().with_min_non_blank(1.0))
        .unwrap();
    assert!(batches.next().is_none());
    assert_eq!(batches.cells_scanned(), 4);
}

#[test]
fn test_blank_cells_are_skipped() {
    let slide = ImageSlide::from_image("half.png", left_tissue_image(2048, 1024, 1024));
    let extractor = TileExtractor::new(&slide, 512, 0.504).unwrap();
    assert_eq!(extractor.total_cells(), 8);

    let batches = collect(&extractor, quiet().with_min_non_blank(0.5));
    assert_eq!(
        all_coordinates(&batches),
        vec![
            [0, 0, 512, 512],
            [512, 0, 1024, 512],
            [0, 512, 512, 1024],
            [512, 512, 1024, 1024],
        ]
    );

    // With no minimum every cell is kept
    let batches = collect(&extractor, quiet());
    assert_eq!(all_coordinates(&batches).len(), 8);
}

// =============================================================================
// Resampling
// =============================================================================

#[test]
fn test_high_resolution_slide_is_downsampled() {
    let dir = tempfile::tempdir().unwrap();
    // 40x scan: twice the pixels per micron of the 20x target
    let slide = png_slide(dir.path(), "40x.png", &uniform_image(1300, 1100, TISSUE), 0.252);

    let extractor = TileExtractor::new(&slide, 256, 0.504).unwrap();
    let geometry = extractor.geometry();
    assert_eq!(geometry.factor, 2.0);
    assert_eq!(geometry.modified_tile_size, 512);
    assert_eq!((geometry.trimmed_width, geometry.trimmed_height), (1024, 1024));

    let batches = collect(&extractor, quiet());
    let coordinates = all_coordinates(&batches);
    assert_eq!(coordinates.len(), 4);
    assert_eq!(coordinates[1], [256, 0, 512, 256]);
    assert_eq!(coordinates[3], [256, 256, 512, 512]);

    for batch in &batches {
        assert_eq!(&batch.tiles.shape()[1..], &[256, 256, 3]);
    }
}

#[test]
fn test_slide_without_mpp_is_cut_natively() {
    let slide = ImageSlide::from_image("plain.png", uniform_image(600, 600, TISSUE));
    let extractor = TileExtractor::new(&slide, 300, 0.504).unwrap();
    assert!(!extractor.geometry().needs_resample());
    assert_eq!(extractor.grid_columns(), 2);
    assert_eq!(extractor.grid_rows(), 2);
}

// =============================================================================
// Restriction and Pixels
// =============================================================================

#[test]
fn test_restricted_slide() {
    let image = left_tissue_image(2048, 2048, 1024);

    let mut glass_only = ImageSlide::from_image("slide.png", image.clone());
    glass_only.restrict(1024, 0, 2048, 1024).unwrap();
    let extractor = TileExtractor::new(&glass_only, 512, 0.504).unwrap();
    assert!(collect(&extractor, quiet().with_min_non_blank(0.5)).is_empty());

    let mut tissue_only = ImageSlide::from_image("slide.png", image);
    tissue_only.restrict(0, 1024, 1024, 2048).unwrap();
    let extractor = TileExtractor::new(&tissue_only, 512, 0.504).unwrap();
    let coordinates = all_coordinates(&collect(&extractor, quiet().with_min_non_blank(0.5)));
    // Coordinates are relative to the restricted origin
    assert_eq!(coordinates.len(), 4);
    assert_eq!(coordinates[0], [0, 0, 512, 512]);
}

#[test]
fn test_channel_order_of_emitted_tiles() {
    let slide = ImageSlide::from_image("tissue.png", uniform_image(256, 256, TISSUE));
    let extractor = TileExtractor::new(&slide, 256, 0.504).unwrap();

    let bgr = collect(&extractor, quiet());
    assert_eq!(bgr[0].tiles[[0, 10, 10, 0]], TISSUE[2]);
    assert_eq!(bgr[0].tiles[[0, 10, 10, 2]], TISSUE[0]);

    let rgb = collect(&extractor, quiet().with_channel_order(ChannelOrder::Rgb));
    assert_eq!(rgb[0].tiles[[0, 10, 10, 0]], TISSUE[0]);
}

#[test]
fn test_invalid_options_fail_before_reading() {
    let slide = ImageSlide::from_image("tissue.png", uniform_image(256, 256, TISSUE));
    let extractor = TileExtractor::new(&slide, 256, 0.504).unwrap();

    assert!(matches!(
        extractor.iterate_tiles(quiet().with_min_non_blank(2.0)),
        Err(TilingError::InvalidMinNonBlank(_))
    ));
    assert!(matches!(
        extractor.iterate_tiles(quiet().with_batch_size(0)),
        Err(TilingError::InvalidBatchSize(0))
    ));
}

// =============================================================================
// Lesion Scoring
// =============================================================================

#[test]
fn test_lesion_confidence_with_autotiler_profile() {
    let autotiler = AutotilerConfig::for_mode("brain").unwrap();
    let slide = ImageSlide::from_image("tissue.png", uniform_image(1024, 1024, TISSUE));
    let extractor = TileExtractor::new(&slide, 512, autotiler.profile.mpp).unwrap();

    // l_lesion is the fourth class
    let predictor =
        RecordingPredictor::new(vec![0.1, 0.1, 0.1, 0.4, 0.1, 0.05, 0.05, 0.05, 0.05]);
    let batches: Vec<_> = extractor
        .iterate_tiles_with_lesion_conf(
            predictor.clone(),
            &autotiler.non_lesion_indices(),
            quiet().with_batch_size(3),
        )
        .unwrap()
        .map(|batch| batch.unwrap())
        .collect();

    assert_eq!(predictor.batch_sizes(), vec![3, 1]);
    assert!(predictor.max_pixel() <= 1.0);
    assert!(predictor.max_pixel() > 0.5);

    let confs: Vec<f32> = batches
        .iter()
        .flat_map(|b| b.lesion_confs.iter().copied())
        .collect();
    assert_eq!(confs.len(), 4);
    for conf in confs {
        assert!((conf - 0.4).abs() < 1e-5, "lesion conf {}", conf);
    }
    assert_eq!(batches[1].coordinates.row(0).to_vec(), vec![512, 512, 1024, 1024]);
}

#[test]
fn test_predictor_row_mismatch_ends_iteration() {
    let slide = ImageSlide::from_image("tissue.png", uniform_image(1024, 1024, TISSUE));
    let extractor = TileExtractor::new(&slide, 512, 0.504).unwrap();

    let predictor = |_: ArrayView4<'_, f32>| -> Result<Array2<f32>, InferenceError> {
        Ok(Array2::zeros((1, 2)))
    };
    let mut batches = extractor
        .iterate_tiles_with_lesion_conf(predictor, &[0], quiet().with_batch_size(2))
        .unwrap();

    assert!(matches!(
        batches.next(),
        Some(Err(TilingError::PredictionShape {
            expected: 2,
            actual: 1
        }))
    ));
    assert!(batches.next().is_none());
}

// =============================================================================
// JPEG Output
// =============================================================================

#[test]
fn test_tiles_encode_to_jpeg() {
    let slide = ImageSlide::from_image("tissue.png", uniform_image(512, 512, TISSUE));
    let extractor = TileExtractor::new(&slide, 256, 0.504).unwrap();
    let options = quiet();
    let batches = collect(&extractor, options);

    let encoder = JpegTileEncoder::new(95);
    let jpeg = encoder
        .encode(batches[0].tile(0), options.channel_order)
        .unwrap();

    let decoded = ImageReader::with_format(Cursor::new(&jpeg[..]), image::ImageFormat::Jpeg)
        .decode()
        .unwrap()
        .to_rgb8();
    assert_eq!(decoded.dimensions(), (256, 256));

    let pixel = decoded.get_pixel(128, 128);
    assert!((pixel[0] as i32 - TISSUE[0] as i32).abs() < 10, "{:?}", pixel);
    assert!((pixel[2] as i32 - TISSUE[2] as i32).abs() < 10, "{:?}", pixel);
}
