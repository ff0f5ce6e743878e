//! Integration tests for class removal.
//!
//! These tests verify:
//! - Renormalization after removal keeps ratios and sums to one
//! - Patterns consume classes one at a time against the shrinking list
//! - Weak matches are skipped and reported
//! - Removal on real profiles keeps parallel columns aligned

use wsi_autotiler::classes::{
    remove_class, ClassDistribution, ParallelColumn, RemovalSpec, DISTRIBUTION_TOLERANCE,
};
use wsi_autotiler::error::ClassError;
use wsi_autotiler::profile::{forty_two_class_custom, AutotilerConfig};

fn assert_sums_to_one(pred: &[f64]) {
    let sum: f64 = pred.iter().sum();
    assert!((sum - 1.0).abs() < DISTRIBUTION_TOLERANCE, "sum {}", sum);
}

#[test]
fn test_blank_removed_and_renormalized() {
    let spec = RemovalSpec::new(["blank"]);
    let result = remove_class(&[0.2, 0.6, 0.2], &["blank", "a", "b"], &spec).unwrap();

    assert_eq!(result.classes, vec!["a", "b"]);
    assert!((result.pred[0] - 0.75).abs() < 1e-9);
    assert!((result.pred[1] - 0.25).abs() < 1e-9);
    assert_sums_to_one(&result.pred);
}

#[test]
fn test_repeated_pattern_consumes_next_closest_class() {
    // The second "blank" no longer finds "blank" and settles for "a",
    // which is a substring of the pattern
    let spec = RemovalSpec::new(["blank", "blank"]);
    let result = remove_class(&[0.2, 0.6, 0.2], &["blank", "a", "b"], &spec).unwrap();

    assert_eq!(result.classes, vec!["b"]);
    assert_eq!(result.removed[1].class, "a");
    assert_eq!(result.removed[1].score, 100);
    assert_sums_to_one(&result.pred);
}

#[test]
fn test_removed_count_matches_shrinkage() {
    let classes = ["Blank", "Tumor", "Necrosis", "Marker"];
    let spec = RemovalSpec::new(["blank", "zzz", "marker"]);
    let result = remove_class(&[0.1, 0.5, 0.3, 0.1], &classes, &spec).unwrap();

    assert_eq!(result.removed.len(), 2);
    assert_eq!(result.unresolved.len(), 1);
    assert_eq!(result.classes.len(), classes.len() - result.removed.len());
    assert_eq!(result.classes, vec!["Tumor", "Necrosis"]);
    assert!((result.pred[0] - 0.625).abs() < 1e-9);
}

#[test]
fn test_unresolved_pattern_leaves_input_identical() {
    let pred = [0.25, 0.25, 0.5];
    let classes = ["tumor", "dura", "stroma"];
    let spec = RemovalSpec::new(["xyz"]);
    let result = remove_class(&pred, &classes, &spec).unwrap();

    assert_eq!(result.pred, pred.to_vec());
    assert_eq!(result.classes, classes.to_vec());
    assert_eq!(result.unresolved[0].pattern, "xyz");
}

#[test]
fn test_ovarian_autotiler_removal_keeps_colors_aligned() {
    let autotiler = AutotilerConfig::for_mode("ovarian").unwrap();
    let profile = &autotiler.profile;
    let n = profile.classes.len();

    let spec = autotiler
        .removal_spec(["Blank", "Marker"])
        .with_parallel("colors", profile.colormaps());
    let pred = vec![1.0 / n as f64; n];
    let result = remove_class(&pred, &profile.classes, &spec).unwrap();

    assert_eq!(result.classes.len(), n - 2);
    assert!(!result.classes.iter().any(|c| c == "Blank" || c == "Marker"));
    assert_sums_to_one(&result.pred);

    let ParallelColumn::Text(colors) = &result.parallel["colors"] else {
        panic!("colors should stay text");
    };
    assert_eq!(colors.len(), n - 2);
    assert!(!colors.iter().any(|c| c == "white"));
    let lesion = result
        .classes
        .iter()
        .position(|c| c == "Ovarian Serous Adenocarcinoma")
        .unwrap();
    assert_eq!(colors[lesion], "brown");
}

#[test]
fn test_distribution_on_large_profile() {
    let profile = forty_two_class_custom();
    let n = profile.classes.len();
    let mut probabilities = vec![0.0; n];
    let blank = profile.classes.iter().position(|c| c == "Blank").unwrap();
    let dura = profile.classes.iter().position(|c| c == "Dura").unwrap();
    probabilities[blank] = 0.5;
    probabilities[dura] = 0.5;

    let dist = ClassDistribution::new(profile.classes.clone(), probabilities).unwrap();
    assert!(dist.is_valid());

    let result = dist.remove_classes(&RemovalSpec::new(["Blank"])).unwrap();
    assert_eq!(result.classes.len(), n - 1);
    let dura = result.classes.iter().position(|c| c == "Dura").unwrap();
    assert_eq!(result.pred[dura], 1.0);
}

#[test]
fn test_removing_everything_with_redistribution_fails() {
    let spec = RemovalSpec::new(["blank", "marker"]);
    let err = remove_class(&[0.5, 0.5], &["blank", "marker"], &spec).unwrap_err();
    assert!(matches!(err, ClassError::NoClassesRemain { ref removed } if removed == "marker"));
}
