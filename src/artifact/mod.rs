//! Model artifact resolution.
//!
//! Trained models and their companion files live in one collection per
//! profile, named after the profile identity:
//!
//! ```text
//! {identity}/
//! ├── {identity}_{model_type}.h5 | .zip    (required)
//! ├── {identity}_{model_type}_test_confusion_matrix.jpg
//! ├── GAP_output_data_pre_scale.npy
//! └── data_labels.npy
//! ```
//!
//! [`resolve_artifacts`] fetches them through any [`ArtifactStore`]:
//! [`S3ArtifactStore`] for S3 or S3-compatible storage, or
//! [`LocalArtifactStore`] for a directory.

mod resolve;
mod s3_store;
mod store;

pub use resolve::{
    resolve_artifacts, ModelFormat, ResolvedArtifacts, CONFUSION_MATRIX_SUFFIX, FEATURE_DATA_FILE,
    FEATURE_LABELS_FILE,
};
pub use s3_store::{create_s3_client, S3ArtifactStore};
pub use store::{ArtifactStore, LocalArtifactStore};
