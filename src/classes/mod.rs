//! Class post-processing.
//!
//! Model output carries classes that are not interesting for a diagnosis
//! (background, pen marker). This module removes them by approximate name
//! and renormalizes what is left.
//!
//! - [`best_match`] / [`partial_ratio`]: fuzzy label lookup on a 0-100 scale
//! - [`remove_class`]: sequential removal with ratio-preserving renormalization
//! - [`ClassDistribution`]: labelled probabilities with validity checks
//!
//! # Example
//!
//! ```
//! use wsi_autotiler::classes::{remove_class, RemovalSpec};
//!
//! let spec = RemovalSpec::new(["blank"]);
//! let result = remove_class(&[0.2, 0.6, 0.2], &["blank", "a", "b"], &spec).unwrap();
//!
//! assert_eq!(result.classes, vec!["a", "b"]);
//! assert!((result.pred[0] - 0.75).abs() < 1e-9);
//! ```

mod matcher;
mod removal;

pub use matcher::{best_match, normalize, partial_ratio, ratio, Match, MATCH_THRESHOLD};
pub use removal::{
    remove_class, ClassDistribution, ParallelColumn, Removal, RemovalSpec, RemovedClass,
    UnresolvedPattern, DEFAULT_REMOVE, DISTRIBUTION_TOLERANCE,
};
