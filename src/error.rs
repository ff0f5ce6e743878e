use thiserror::Error;

/// Errors that can occur when opening or reading a slide
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// The slide file could not be read from disk
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    /// The slide file could not be decoded into pixels
    #[error("Failed to decode slide {path}: {message}")]
    Decode { path: String, message: String },

    /// Requested region falls outside the slide's logical bounds
    #[error(
        "Region ({x0}, {y0}, {x1}, {y1}) out of bounds for slide of size {width}x{height}"
    )]
    RegionOutOfBounds {
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
        width: u32,
        height: u32,
    },

    /// Restriction rectangle is empty or exceeds the current bounds
    #[error("Invalid restriction ({x0}, {y0}, {x1}, {y1}): {reason}")]
    InvalidRestriction {
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
        reason: String,
    },
}

/// Error returned by an injected inference capability
#[derive(Debug, Clone, Error)]
#[error("Inference failed: {message}")]
pub struct InferenceError {
    pub message: String,
}

impl InferenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur while extracting tiles from a slide
#[derive(Debug, Clone, Error)]
pub enum TilingError {
    /// Minimum non-blank fraction is not a percentage
    #[error("Minimum non-blank amount must be a percentage between 0.0 and 1.0, got {0}")]
    InvalidMinNonBlank(f64),

    /// Batch size of zero
    #[error("Batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),

    /// Output tile edge of zero
    #[error("Tile size must be at least 1 pixel, got {0}")]
    InvalidTileSize(u32),

    /// Desired or slide MPP cannot be used to compute a resample factor
    #[error("Invalid microns-per-pixel value: {0}")]
    InvalidMpp(f64),

    /// Resample factor shrinks the native grid cell to nothing
    #[error("Tile size {tile_size} with resample factor {factor} gives an empty grid cell")]
    DegenerateGrid { tile_size: u32, factor: f64 },

    /// Error reading a region from the slide
    #[error("Slide error: {0}")]
    Slide(#[from] SlideError),

    /// Error from the injected predictor
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Predictor returned a matrix whose row count does not match the batch
    #[error("Prediction has {actual} rows, expected one per tile ({expected})")]
    PredictionShape { expected: usize, actual: usize },
}

/// Errors raised while removing classes from a distribution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassError {
    /// A sequence is not index-aligned with the class list
    #[error("{name} has length {actual}, expected {expected} (one per class)")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Class labels must be unique
    #[error("Duplicate class label: {0}")]
    DuplicateClass(String),

    /// Renormalization requested after every class was removed
    #[error("No classes remain after removing {removed}; cannot renormalize")]
    NoClassesRemain { removed: String },

    /// Surviving classes carry no probability mass to renormalize
    #[error("Remaining probabilities sum to {sum} after removing {removed}; cannot renormalize")]
    ZeroProbabilityMass { removed: String, sum: f64 },
}

/// Errors related to class profile configuration
#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    /// Autotiler mode has no associated profile
    #[error("Mode {0} unknown")]
    UnknownMode(String),

    /// No built-in profile with this name
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    /// Non-lesion colormap mentions classes the profile does not have
    #[error("{0:?} not present in classes")]
    MissingClasses(Vec<String>),

    /// Explicit colormaps must be index-aligned with classes
    #[error("Profile has {colormaps} colormaps for {classes} classes")]
    ColormapLength { colormaps: usize, classes: usize },

    /// Profile file could not be read
    #[error("Failed to read profile {path}: {message}")]
    Read { path: String, message: String },

    /// Profile file is not valid JSON for a profile
    #[error("Failed to parse profile {path}: {message}")]
    Parse { path: String, message: String },
}

/// Errors from remote or local artifact storage
#[derive(Debug, Clone, Error)]
pub enum ArtifactError {
    /// Artifact does not exist in the store
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Error writing or reading the local copy
    #[error("I/O error for {path}: {message}")]
    Io { path: String, message: String },
}

/// Errors delivering a notification
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// The notification channel rejected or failed to send the message
    #[error("Failed to deliver notification to {recipient}: {message}")]
    Delivery { recipient: String, message: String },
}

/// Errors writing tiles out as images
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    /// Array is not `[height, width, 3]`
    #[error("Expected a [height, width, 3] tile, got shape {0:?}")]
    InvalidShape(Vec<usize>),

    /// JPEG encoder failed
    #[error("Encode error: {message}")]
    Encode { message: String },
}
