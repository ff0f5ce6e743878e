//! Locating a profile's model artifacts.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use super::store::ArtifactStore;
use crate::error::ArtifactError;
use crate::profile::ClassProfile;

/// Feature vectors saved from the model's pooling layer.
pub const FEATURE_DATA_FILE: &str = "GAP_output_data_pre_scale.npy";

/// Labels of [`FEATURE_DATA_FILE`] rows.
pub const FEATURE_LABELS_FILE: &str = "data_labels.npy";

/// Suffix appended to the model name for the test-set confusion matrix.
pub const CONFUSION_MATRIX_SUFFIX: &str = "_test_confusion_matrix.jpg";

/// How the model weights are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Single `.h5` file, usable as is
    H5,
    /// `.zip` archive the caller has to extract
    Zip,
}

impl ModelFormat {
    pub fn for_profile(profile: &ClassProfile) -> Self {
        if profile.deprecated_model_type {
            Self::H5
        } else {
            Self::Zip
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::H5 => ".h5",
            Self::Zip => ".zip",
        }
    }
}

/// Local paths of a profile's artifacts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedArtifacts {
    /// Collection the artifacts live in, the profile identity
    pub collection: String,

    /// Model name without extension; the expected entry inside a zip archive
    pub model_name: String,

    pub model_path: PathBuf,
    pub model_format: ModelFormat,
    pub confusion_matrix: Option<PathBuf>,
    pub feature_data: Option<PathBuf>,
    pub feature_labels: Option<PathBuf>,
}

impl ResolvedArtifacts {
    /// The model is an archive that still needs extracting.
    pub fn is_archived(&self) -> bool {
        self.model_format == ModelFormat::Zip
    }

    /// Whether both feature-vector files were found.
    pub fn has_feature_vectors(&self) -> bool {
        self.feature_data.is_some() && self.feature_labels.is_some()
    }
}

/// Fetch the model of `profile` and whichever optional artifacts exist.
///
/// The model must exist. The confusion matrix is fetched when present. The
/// feature data and labels are fetched only when both are present.
pub async fn resolve_artifacts<A>(
    store: &A,
    profile: &ClassProfile,
) -> Result<ResolvedArtifacts, ArtifactError>
where
    A: ArtifactStore + ?Sized,
{
    let collection = profile.identity();
    let model_name = profile.model_name();
    let model_format = ModelFormat::for_profile(profile);
    let key = |file: &str| format!("{}/{}", collection, file);

    let model_key = key(&format!("{}{}", model_name, model_format.extension()));
    let model_path = store.fetch(&model_key).await?;
    info!("Model {} resolved to {}", store.locate(&model_key), model_path.display());

    let confusion_key = key(&format!("{}{}", model_name, CONFUSION_MATRIX_SUFFIX));
    let confusion_matrix = if store.exists(&confusion_key).await? {
        Some(store.fetch(&confusion_key).await?)
    } else {
        debug!("No confusion matrix at {}", store.locate(&confusion_key));
        None
    };

    let data_key = key(FEATURE_DATA_FILE);
    let labels_key = key(FEATURE_LABELS_FILE);
    let (feature_data, feature_labels) =
        if store.exists(&data_key).await? && store.exists(&labels_key).await? {
            (
                Some(store.fetch(&data_key).await?),
                Some(store.fetch(&labels_key).await?),
            )
        } else {
            debug!("No feature vectors in collection {}", collection);
            (None, None)
        };

    Ok(ResolvedArtifacts {
        collection,
        model_name,
        model_path,
        model_format,
        confusion_matrix,
        feature_data,
        feature_labels,
    })
}
