use std::fmt::Display;
use std::path::PathBuf;

use crate::io::FormatKind;
use crate::models::ModelKind;

/// Errors raised while fitting a transformation model to coordinate pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Fewer samples than the model kind needs.
    InsufficientData {
        model: ModelKind,
        required: usize,
        available: usize,
    },
    /// The samples do not span the observed axis (e.g. all x values coincide).
    DegenerateInput {
        model: ModelKind,
        context: String,
    },
    /// Requested parameters are structurally inconsistent with the data.
    InvalidParams {
        model: ModelKind,
        msg: String,
    },
}

impl Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientData {
                model,
                required,
                available,
            } => write!(
                f,
                "Insufficient data to fit a {} model: need at least {} samples, got {}",
                model, required, available
            ),
            Self::DegenerateInput { model, context } => {
                write!(f, "Degenerate input for {} model: {}", model, context)
            }
            Self::InvalidParams { model, msg } => {
                write!(f, "Invalid parameters for {} model: {}", model, msg)
            }
        }
    }
}

impl std::error::Error for FitError {}

/// Errors raised when using (applying, inverting) a transformation.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformationError {
    Fit(FitError),
    /// The description has no fitted model yet.
    NoModel,
    /// The model rejects extrapolation and `x` is outside the fitted range.
    OutOfRange { x: f64, min: f64, max: f64 },
    NotInvertible { model: ModelKind, reason: String },
}

impl Display for TransformationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fit(e) => write!(f, "{}", e),
            Self::NoModel => write!(f, "The transformation has no fitted model"),
            Self::OutOfRange { x, min, max } => write!(
                f,
                "Value {} is outside of the fitted range [{}, {}] and extrapolation is disabled",
                x, min, max
            ),
            Self::NotInvertible { model, reason } => {
                write!(f, "Unable to invert {} model: {}", model, reason)
            }
        }
    }
}

impl std::error::Error for TransformationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FitError> for TransformationError {
    fn from(x: FitError) -> Self {
        Self::Fit(x)
    }
}

/// Errors raised by the persistence layer.
#[derive(Debug)]
pub enum StoreError {
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    Parse {
        msg: String,
        path: PathBuf,
    },
    UnsupportedFormat {
        path: PathBuf,
        expected: Option<FormatKind>,
    },
    /// A persisted transformation could not be rebuilt into a model.
    InvalidTransformation {
        source: FitError,
        path: PathBuf,
    },
}

impl StoreError {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::UnsupportedFormat { path, .. }
            | Self::InvalidTransformation { path, .. } => path,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { source, path } => {
                write!(f, "Error accessing file {}: {}", path.display(), source)
            }
            Self::Parse { msg, path } => {
                write!(f, "Error parsing file {}: {}", path.display(), msg)
            }
            Self::UnsupportedFormat { path, expected } => match expected {
                Some(kind) => write!(
                    f,
                    "Unsupported file format for {} (expected a {} file)",
                    path.display(),
                    kind
                ),
                None => write!(f, "Unsupported file format for {}", path.display()),
            },
            Self::InvalidTransformation { source, path } => write!(
                f,
                "Invalid transformation in {}: {}",
                path.display(),
                source
            ),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidTransformation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Problems with the shape of the batch arguments, detected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MismatchedCounts {
        first: &'static str,
        first_len: usize,
        second: &'static str,
        second_len: usize,
    },
    NoOutputRequested,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MismatchedCounts {
                first,
                first_len,
                second,
                second_len,
            } => write!(
                f,
                "The number of '{}' files ({}) has to be equal to the number of '{}' files ({})",
                first, first_len, second, second_len
            ),
            Self::NoOutputRequested => write!(
                f,
                "Either data output ('out') or transformation output ('trafo_out') files have to be provided"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// The reason a single batch job failed.
#[derive(Debug)]
pub enum JobError {
    Store(StoreError),
    Transformation(TransformationError),
}

impl Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{}", e),
            Self::Transformation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Transformation(e) => Some(e),
        }
    }
}

impl From<StoreError> for JobError {
    fn from(x: StoreError) -> Self {
        Self::Store(x)
    }
}

impl From<TransformationError> for JobError {
    fn from(x: TransformationError) -> Self {
        Self::Transformation(x)
    }
}

impl From<FitError> for JobError {
    fn from(x: FitError) -> Self {
        Self::Transformation(TransformationError::Fit(x))
    }
}

#[derive(Debug)]
pub enum BatchError {
    Validation(ValidationError),
    /// Job `index` failed while working on `path`; earlier outputs are kept.
    Job {
        index: usize,
        path: PathBuf,
        source: JobError,
    },
}

impl Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "{}", e),
            Self::Job {
                index,
                path,
                source,
            } => write!(
                f,
                "Job {} ({}) failed: {}",
                index,
                path.display(),
                source
            ),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Job { source, .. } => Some(source),
        }
    }
}

impl From<ValidationError> for BatchError {
    fn from(x: ValidationError) -> Self {
        Self::Validation(x)
    }
}
