//! Lesion confidence scoring on top of tile extraction.
//!
//! Each batch is run through an injected classifier; the lesion confidence of
//! a tile is the probability mass the classifier did *not* assign to any of
//! the designated non-lesion classes (blank, white matter, blood, ...).

use std::iter::FusedIterator;

use ndarray::{Array1, Array2, Array4, ArrayView4, Axis};

use crate::error::{InferenceError, TilingError};
use crate::slide::SlideSource;

use super::extractor::{TileBatch, TileBatches, TileExtractor, TileOptions};

/// Batch inference capability.
///
/// Takes tiles of shape `[n, h, w, 3]` with values in `[0, 1]` and returns
/// a probability matrix of shape `[n, num_classes]` whose rows sum to ~1.
///
/// Closures with the matching signature implement this trait.
pub trait Predictor {
    fn predict(&mut self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, InferenceError>;
}

impl<F> Predictor for F
where
    F: FnMut(ArrayView4<'_, f32>) -> Result<Array2<f32>, InferenceError>,
{
    fn predict(&mut self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, InferenceError> {
        self(batch)
    }
}

/// Scale 8-bit tiles into `[0, 1]` for model input.
pub fn prepare_images(tiles: &Array4<u8>) -> Array4<f32> {
    tiles.mapv(|v| f32::from(v) / 255.0)
}

/// `1 - Σ_j P[i, j]` over `non_lesion_indices` for every row `i`.
///
/// # Panics
///
/// Panics if an index is not a valid column of `probabilities`.
pub fn lesion_confidences(probabilities: &Array2<f32>, non_lesion_indices: &[usize]) -> Array1<f32> {
    probabilities.map_axis(Axis(1), |row| {
        1.0 - non_lesion_indices.iter().map(|&j| row[j]).sum::<f32>()
    })
}

/// A tile batch with a lesion confidence per tile.
#[derive(Debug, Clone, PartialEq)]
pub struct LesionBatch {
    /// Pixels, shape `[k, tile_size, tile_size, 3]`
    pub tiles: Array4<u8>,

    /// Bounding boxes, shape `[k, 4]`
    pub coordinates: Array2<i64>,

    /// Lesion confidence per tile, shape `[k]`
    pub lesion_confs: Array1<f32>,
}

impl LesionBatch {
    /// Number of tiles in the batch.
    pub fn len(&self) -> usize {
        self.lesion_confs.len()
    }

    /// Whether the batch holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: SlideSource> TileExtractor<S> {
    /// Iterate over tile batches, scoring each tile with `predictor`.
    ///
    /// Batching, ordering and filtering are exactly those of
    /// [`TileExtractor::iterate_tiles`]. `non_lesion_indices` must be valid
    /// column indices of the predictor's output.
    ///
    /// # Errors
    ///
    /// Fails with the same argument errors as `iterate_tiles`. During
    /// iteration, predictor failures and row-count mismatches are yielded as
    /// errors and end the iteration.
    pub fn iterate_tiles_with_lesion_conf<P: Predictor>(
        &self,
        predictor: P,
        non_lesion_indices: &[usize],
        options: TileOptions,
    ) -> Result<LesionBatches<'_, S, P>, TilingError> {
        Ok(LesionBatches {
            batches: self.iterate_tiles(options)?,
            predictor,
            non_lesion_indices: non_lesion_indices.to_vec(),
            finished: false,
        })
    }
}

/// Iterator over lesion-scored batches.
///
/// Created by [`TileExtractor::iterate_tiles_with_lesion_conf`].
pub struct LesionBatches<'a, S: SlideSource, P: Predictor> {
    batches: TileBatches<'a, S>,
    predictor: P,
    non_lesion_indices: Vec<usize>,
    finished: bool,
}

impl<S: SlideSource, P: Predictor> LesionBatches<'_, S, P> {
    fn score(&mut self, batch: TileBatch) -> Result<LesionBatch, TilingError> {
        let prepared = prepare_images(&batch.tiles);
        let probabilities = self.predictor.predict(prepared.view())?;

        let rows = probabilities.len_of(Axis(0));
        if rows != batch.len() {
            return Err(TilingError::PredictionShape {
                expected: batch.len(),
                actual: rows,
            });
        }

        Ok(LesionBatch {
            lesion_confs: lesion_confidences(&probabilities, &self.non_lesion_indices),
            tiles: batch.tiles,
            coordinates: batch.coordinates,
        })
    }
}

impl<S: SlideSource, P: Predictor> Iterator for LesionBatches<'_, S, P> {
    type Item = Result<LesionBatch, TilingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = match self.batches.next()? {
            Ok(batch) => self.score(batch),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

impl<S: SlideSource, P: Predictor> FusedIterator for LesionBatches<'_, S, P> {}

// =============================================================================
// Tests
// =============================================================================
