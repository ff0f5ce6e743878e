//! Test utilities for integration tests.
//!
//! Synthetic slides, a predictor that records its calls, and in-memory
//! implementations of the artifact store and notifier.

use async_trait::async_trait;
use bytes::Bytes;
use image::{Rgb, RgbImage};
use ndarray::{Array2, ArrayView4, Axis};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use wsi_autotiler::artifact::ArtifactStore;
use wsi_autotiler::error::{ArtifactError, InferenceError, NotifyError};
use wsi_autotiler::notify::{EmailMessage, Notifier};
use wsi_autotiler::slide::ImageSlide;
use wsi_autotiler::tile::Predictor;

// =============================================================================
// Synthetic Slides
// =============================================================================

/// Stained-tissue color: channels far apart, never blank.
pub const TISSUE: Rgb<u8> = Rgb([190, 70, 150]);

/// Background glass: equal channels, always blank.
pub const GLASS: Rgb<u8> = Rgb([245, 245, 245]);

/// Image of a single color.
pub fn uniform_image(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width, height, color)
}

/// Tissue on the left `tissue_width` columns, glass elsewhere.
pub fn left_tissue_image(width: u32, height: u32, tissue_width: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| if x < tissue_width { TISSUE } else { GLASS })
}

/// Write `image` as a PNG under `dir` and return its path.
pub fn write_png(dir: &Path, name: &str, image: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

/// Slide decoded from a PNG on disk, with the given MPP.
pub fn png_slide(dir: &Path, name: &str, image: &RgbImage, mpp: f64) -> ImageSlide {
    let path = write_png(dir, name, image);
    ImageSlide::open(path).unwrap().with_mpp(mpp)
}

// =============================================================================
// Recording Predictor
// =============================================================================

/// Predictor returning the same probability row for every tile.
///
/// Batch sizes and the pixel range of each call are recorded.
#[derive(Clone)]
pub struct RecordingPredictor {
    row: Vec<f32>,
    calls: Arc<Mutex<Vec<usize>>>,
    max_pixel: Arc<Mutex<f32>>,
}

impl RecordingPredictor {
    pub fn new(row: Vec<f32>) -> Self {
        Self {
            row,
            calls: Arc::new(Mutex::new(Vec::new())),
            max_pixel: Arc::new(Mutex::new(0.0)),
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_pixel(&self) -> f32 {
        *self.max_pixel.lock().unwrap()
    }
}

impl Predictor for RecordingPredictor {
    fn predict(&mut self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, InferenceError> {
        let n = batch.len_of(Axis(0));
        self.calls.lock().unwrap().push(n);

        let max = batch.iter().copied().fold(0.0f32, f32::max);
        let mut seen = self.max_pixel.lock().unwrap();
        *seen = seen.max(max);

        let row = self.row.clone();
        Ok(Array2::from_shape_fn((n, row.len()), |(_, j)| row[j]))
    }
}

// =============================================================================
// In-Memory Artifact Store
// =============================================================================

/// Artifact store holding objects in memory.
///
/// Fetched objects are written to a temporary directory, and fetches are
/// counted.
pub struct MemoryArtifactStore {
    objects: HashMap<String, Bytes>,
    dir: TempDir,
    fetch_count: AtomicUsize,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            dir: tempfile::tempdir().unwrap(),
            fetch_count: AtomicUsize::new(0),
        }
    }

    pub fn with_object(mut self, key: &str, data: impl Into<Bytes>) -> Self {
        self.objects.insert(key.to_string(), data.into());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn exists(&self, key: &str) -> Result<bool, ArtifactError> {
        Ok(self.objects.contains_key(key))
    }

    async fn fetch(&self, key: &str) -> Result<PathBuf, ArtifactError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let data = self
            .objects
            .get(key)
            .ok_or_else(|| ArtifactError::NotFound(self.locate(key)))?;

        let path = self.dir.path().join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, data).unwrap();
        Ok(path)
    }

    fn locate(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}

// =============================================================================
// Recording Notifier
// =============================================================================

/// Notifier that keeps delivered messages, or rejects everything.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    reject: bool,
}

impl RecordingNotifier {
    pub fn rejecting() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if self.reject {
            return Err(NotifyError::Delivery {
                recipient: message.to.clone(),
                message: "rejected".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
