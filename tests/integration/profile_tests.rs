//! Integration tests for profiles, artifact resolution and notifications.
//!
//! These tests verify:
//! - Profiles loaded from JSON drive tile extraction
//! - Artifact naming for h5 and zip models, optional companions
//! - Notification composition and delivery through a notifier

use std::io::Write;

use wsi_autotiler::artifact::{resolve_artifacts, ArtifactStore, ModelFormat};
use wsi_autotiler::error::{ArtifactError, NotifyError, ProfileError};
use wsi_autotiler::notify::{send_notification, Notification, ResultLink};
use wsi_autotiler::profile::{builtin, clinical_trials_ov, nine_class, ClassProfile, Tissue};
use wsi_autotiler::slide::ImageSlide;
use wsi_autotiler::tile::{TileExtractor, TileOptions};

use super::test_utils::{left_tissue_image, MemoryArtifactStore, RecordingNotifier};

// =============================================================================
// Profiles
// =============================================================================

const CUSTOM_PROFILE: &str = r#"{
    "tissue": "ovarian",
    "folder_name": "small_test",
    "mpp": 0.504,
    "tile_size": 256,
    "lesion_color": "brown",
    "non_lesion_colormaps": [
        { "class": "Blank", "color": "white" },
        { "class": "Stroma", "color": "grey" }
    ],
    "classes": ["Blank", "Carcinoma", "Stroma"]
}"#;

#[test]
fn test_json_profile_drives_extraction() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CUSTOM_PROFILE.as_bytes()).unwrap();
    let profile = ClassProfile::from_json_file(file.path()).unwrap();

    assert_eq!(profile.tissue, Tissue::Ovarian);
    assert_eq!(profile.identity(), "ovarian_small_test");
    assert_eq!(profile.non_lesion_indices(), vec![0, 2]);
    assert_eq!(profile.colormaps(), vec!["white", "brown", "grey"]);

    let slide = ImageSlide::from_image("slide.png", left_tissue_image(1024, 512, 512));
    let extractor = TileExtractor::new(&slide, profile.tile_size, profile.mpp).unwrap();
    let tiles: usize = extractor
        .iterate_tiles(TileOptions::default().with_progress(false).with_min_non_blank(0.5))
        .unwrap()
        .map(|batch| batch.unwrap().len())
        .sum();
    // Left half of an 4x2 grid
    assert_eq!(tiles, 4);
}

#[test]
fn test_json_profile_with_unknown_class_is_rejected() {
    let json = CUSTOM_PROFILE.replace("\"Stroma\", \"color\"", "\"Dura\", \"color\"");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    match ClassProfile::from_json_file(file.path()) {
        Err(ProfileError::MissingClasses(missing)) => assert_eq!(missing, vec!["Dura"]),
        other => panic!("expected MissingClasses, got {:?}", other),
    }
}

#[test]
fn test_builtin_round_trips_through_json() {
    let profile = builtin("clinical_trials_ov").unwrap();
    let json = serde_json::to_string(&profile).unwrap();
    let parsed: ClassProfile = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, profile);
    assert_eq!(parsed.non_lesion_classes(), profile.non_lesion_classes());
}

// =============================================================================
// Artifacts
// =============================================================================

#[tokio::test]
async fn test_resolve_h5_model_with_confusion_matrix() {
    let store = MemoryArtifactStore::new()
        .with_object("brain_9_classes/brain_9_classes_VGG19.h5", "weights")
        .with_object(
            "brain_9_classes/brain_9_classes_VGG19_test_confusion_matrix.jpg",
            "jpeg",
        );

    let resolved = resolve_artifacts(&store, &nine_class()).await.unwrap();

    assert_eq!(resolved.collection, "brain_9_classes");
    assert_eq!(resolved.model_format, ModelFormat::H5);
    assert_eq!(std::fs::read(&resolved.model_path).unwrap(), b"weights");
    assert!(resolved.confusion_matrix.is_some());
    assert!(!resolved.has_feature_vectors());
    assert_eq!(store.fetch_count(), 2);
}

#[tokio::test]
async fn test_resolve_zip_model_with_feature_vectors() {
    let mut profile = clinical_trials_ov();
    profile.deprecated_model_type = false;

    let store = MemoryArtifactStore::new()
        .with_object(
            "ovarian_clinical_trials_ov_3/ovarian_clinical_trials_ov_3_VGG19.zip",
            "archive",
        )
        .with_object(
            "ovarian_clinical_trials_ov_3/GAP_output_data_pre_scale.npy",
            "data",
        )
        .with_object("ovarian_clinical_trials_ov_3/data_labels.npy", "labels");

    let resolved = resolve_artifacts(&store, &profile).await.unwrap();
    assert!(resolved.is_archived());
    assert!(resolved.confusion_matrix.is_none());
    assert!(resolved.has_feature_vectors());
    assert_eq!(store.fetch_count(), 3);
}

#[tokio::test]
async fn test_resolve_through_trait_object() {
    let store: Box<dyn ArtifactStore> = Box::new(MemoryArtifactStore::new());
    let err = resolve_artifacts(store.as_ref(), &nine_class())
        .await
        .unwrap_err();
    match err {
        ArtifactError::NotFound(location) => {
            assert_eq!(
                location,
                "memory://brain_9_classes/brain_9_classes_VGG19.h5"
            );
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_success_notification_delivered() {
    let notifier = RecordingNotifier::default();
    let notification = Notification::success(
        "doc@example.com",
        vec![ResultLink::new("report.pdf", "https://results/report.pdf")],
    )
    .with_display_user(true);

    send_notification(&notifier, &notification).await.unwrap();

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Your results are ready!");
    assert!(sent[0]
        .html_body
        .contains("<p><a href='https://results/report.pdf'>report.pdf</a></p>"));
    assert!(sent[0].html_body.ends_with("<p>Submitted by: doc@example.com</p>"));
}

#[tokio::test]
async fn test_failed_delivery_is_reported() {
    let notifier = RecordingNotifier::rejecting();
    let notification = Notification::failure("doc@example.com", ["slide.svs"]);

    let err = send_notification(&notifier, &notification).await.unwrap_err();
    match err {
        NotifyError::Delivery { recipient, .. } => assert_eq!(recipient, "doc@example.com"),
    }
}
