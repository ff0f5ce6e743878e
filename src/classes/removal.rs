//! Class removal with ratio-preserving renormalization.
//!
//! [`remove_class`] deletes classes named by approximate patterns from a
//! probability vector, its label list and any number of index-aligned
//! parallel columns. Patterns are consumed one at a time, each against the
//! list as left by the previous one, so two patterns can remove two
//! different classes that both match.

use std::collections::{BTreeMap, HashSet};

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ClassError;

use super::matcher::{best_match, MATCH_THRESHOLD};

/// Patterns removed when none are given.
pub const DEFAULT_REMOVE: [&str; 2] = ["blank", "marker"];

/// Allowed deviation of a distribution's sum from 1.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

// =============================================================================
// Parallel Columns
// =============================================================================

/// A caller-supplied sequence indexed like the class list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParallelColumn {
    Integer(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ParallelColumn {
    pub fn len(&self) -> usize {
        match self {
            Self::Integer(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&mut self, index: usize) {
        match self {
            Self::Integer(v) => {
                v.remove(index);
            }
            Self::Float(v) => {
                v.remove(index);
            }
            Self::Text(v) => {
                v.remove(index);
            }
        }
    }
}

impl From<Vec<i64>> for ParallelColumn {
    fn from(v: Vec<i64>) -> Self {
        Self::Integer(v)
    }
}

impl From<Vec<f64>> for ParallelColumn {
    fn from(v: Vec<f64>) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<String>> for ParallelColumn {
    fn from(v: Vec<String>) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<&str>> for ParallelColumn {
    fn from(v: Vec<&str>) -> Self {
        Self::Text(v.into_iter().map(String::from).collect())
    }
}

// =============================================================================
// Removal Spec
// =============================================================================

/// What to remove and how.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalSpec {
    /// Name patterns, applied in order
    pub remove: Vec<String>,

    /// Minimum match score (0-100) for a pattern to remove a class
    pub threshold: u8,

    /// Renormalize after each removal
    pub redistribute: bool,

    /// Columns kept index-aligned with the class list
    pub parallel: BTreeMap<String, ParallelColumn>,
}

impl Default for RemovalSpec {
    fn default() -> Self {
        Self {
            remove: DEFAULT_REMOVE.iter().map(|s| s.to_string()).collect(),
            threshold: MATCH_THRESHOLD,
            redistribute: true,
            parallel: BTreeMap::new(),
        }
    }
}

impl RemovalSpec {
    /// Remove `patterns` with the default threshold and redistribution.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remove: patterns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_redistribute(mut self, redistribute: bool) -> Self {
        self.redistribute = redistribute;
        self
    }

    /// Attach a parallel column under `name`.
    pub fn with_parallel(mut self, name: impl Into<String>, column: impl Into<ParallelColumn>) -> Self {
        self.parallel.insert(name.into(), column.into());
        self
    }
}

// =============================================================================
// Result
// =============================================================================

/// A class deleted by one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedClass {
    pub pattern: String,
    pub class: String,
    /// Position in the class list at the time of removal
    pub index: usize,
    pub score: u8,
}

/// A pattern that matched nothing well enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedPattern {
    pub pattern: String,
    pub best_match: Option<String>,
    pub score: u8,
}

/// Output of [`remove_class`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Removal {
    pub pred: Vec<f64>,
    pub classes: Vec<String>,
    pub parallel: BTreeMap<String, ParallelColumn>,
    pub removed: Vec<RemovedClass>,
    pub unresolved: Vec<UnresolvedPattern>,
}

// =============================================================================
// Removal
// =============================================================================

/// Remove the classes named by `spec.remove` from `pred` and `classes`.
///
/// Each pattern is matched against the current class list. A match scoring
/// at least `spec.threshold` removes that index from the predictions, the
/// labels and every parallel column; with `spec.redistribute` the remaining
/// predictions are then divided by their sum, which keeps their ratios. A
/// weaker match leaves everything untouched, is logged and is reported in
/// [`Removal::unresolved`].
///
/// # Errors
///
/// - [`ClassError::LengthMismatch`] if `pred` or a parallel column is not
///   one entry per class
/// - [`ClassError::DuplicateClass`] if a label repeats
/// - [`ClassError::NoClassesRemain`] if renormalization is requested after
///   the last class is removed
/// - [`ClassError::ZeroProbabilityMass`] if the surviving predictions sum
///   to zero or less
pub fn remove_class<S: AsRef<str>>(
    pred: &[f64],
    classes: &[S],
    spec: &RemovalSpec,
) -> Result<Removal, ClassError> {
    check_alignment(pred, classes, &spec.parallel)?;

    let mut pred = pred.to_vec();
    let mut classes: Vec<String> = classes.iter().map(|c| c.as_ref().to_string()).collect();
    let mut parallel = spec.parallel.clone();
    let mut removed = Vec::new();
    let mut unresolved = Vec::new();

    for pattern in &spec.remove {
        let found = best_match(pattern, &classes);
        let score = found.as_ref().map_or(0, |m| m.score);

        let m = match found {
            Some(m) if score >= spec.threshold => m,
            other => {
                warn!(
                    "Failed to remove {}. Seems to not be present in given class list",
                    pattern
                );
                unresolved.push(UnresolvedPattern {
                    pattern: pattern.clone(),
                    best_match: other.map(|m| m.choice),
                    score,
                });
                continue;
            }
        };

        debug!("Removing class {} (pattern {}, score {})", m.choice, pattern, m.score);
        let class = classes.remove(m.index);
        pred.remove(m.index);
        for column in parallel.values_mut() {
            column.remove(m.index);
        }

        if spec.redistribute {
            renormalize(&mut pred, pattern)?;
        }

        removed.push(RemovedClass {
            pattern: pattern.clone(),
            class,
            index: m.index,
            score: m.score,
        });
    }

    Ok(Removal {
        pred,
        classes,
        parallel,
        removed,
        unresolved,
    })
}

fn check_alignment<S: AsRef<str>>(
    pred: &[f64],
    classes: &[S],
    parallel: &BTreeMap<String, ParallelColumn>,
) -> Result<(), ClassError> {
    let expected = classes.len();
    if pred.len() != expected {
        return Err(ClassError::LengthMismatch {
            name: "pred".to_string(),
            expected,
            actual: pred.len(),
        });
    }
    for (name, column) in parallel {
        if column.len() != expected {
            return Err(ClassError::LengthMismatch {
                name: name.clone(),
                expected,
                actual: column.len(),
            });
        }
    }

    let mut seen = HashSet::with_capacity(expected);
    for class in classes {
        if !seen.insert(class.as_ref()) {
            return Err(ClassError::DuplicateClass(class.as_ref().to_string()));
        }
    }
    Ok(())
}

fn renormalize(pred: &mut [f64], removed: &str) -> Result<(), ClassError> {
    if pred.is_empty() {
        return Err(ClassError::NoClassesRemain {
            removed: removed.to_string(),
        });
    }

    let sum: f64 = pred.iter().sum();
    if !(sum > 0.0 && sum.is_finite()) {
        return Err(ClassError::ZeroProbabilityMass {
            removed: removed.to_string(),
            sum,
        });
    }

    for p in pred.iter_mut() {
        *p /= sum;
    }
    Ok(())
}

// =============================================================================
// Class Distribution
// =============================================================================

/// A labelled probability distribution, e.g. one row of model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDistribution {
    pub classes: Vec<String>,
    pub probabilities: Vec<f64>,
}

impl ClassDistribution {
    /// Pair labels with probabilities.
    ///
    /// # Errors
    ///
    /// Fails if the lengths differ or a label repeats.
    pub fn new<S: Into<String>>(
        classes: impl IntoIterator<Item = S>,
        probabilities: Vec<f64>,
    ) -> Result<Self, ClassError> {
        let classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        check_alignment(&probabilities, &classes, &BTreeMap::new())?;
        Ok(Self {
            classes,
            probabilities,
        })
    }

    /// Build from one row of a prediction matrix.
    pub fn from_prediction_row<S: Into<String>>(
        classes: impl IntoIterator<Item = S>,
        row: ArrayView1<'_, f32>,
    ) -> Result<Self, ClassError> {
        Self::new(classes, row.iter().map(|&p| f64::from(p)).collect())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Non-negative and summing to 1 within [`DISTRIBUTION_TOLERANCE`].
    pub fn is_valid(&self) -> bool {
        let sum: f64 = self.probabilities.iter().sum();
        self.probabilities.iter().all(|&p| p >= 0.0)
            && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE
    }

    /// Probability of `class`, if present.
    pub fn probability(&self, class: &str) -> Option<f64> {
        self.classes
            .iter()
            .position(|c| c == class)
            .map(|i| self.probabilities[i])
    }

    /// Apply [`remove_class`] to this distribution.
    pub fn remove_classes(&self, spec: &RemovalSpec) -> Result<Removal, ClassError> {
        remove_class(&self.probabilities, &self.classes, spec)
    }
}

// =============================================================================
// Tests
// =============================================================================
