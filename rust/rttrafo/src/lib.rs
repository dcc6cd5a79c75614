//! Apply retention time transformations to LC-MS record collections.
//!
//! A [`TransformationDescription`] pairs observed and reference retention
//! times and owns an optional fitted [`TransformationModel`]. The
//! [`transformer`] walks every retention time carried by one of the
//! [`maps`] shapes and replaces it with the model's output, and [`batch`]
//! drives many such jobs from parallel lists of file paths.

pub mod batch;
pub mod description;
pub mod errors;
pub mod io;
pub mod maps;
mod math;
pub mod models;
pub mod transformer;

pub use batch::{
    BatchConfig,
    BatchPaths,
    BatchSummary,
    JobSummary,
    run_batch,
};
pub use description::TransformationDescription;
pub use errors::{
    BatchError,
    FitError,
    JobError,
    StoreError,
    TransformationError,
    ValidationError,
};
pub use io::{
    CollectionStore,
    FileStore,
    FormatKind,
    TransformationStore,
    classify,
};
pub use maps::RecordCollection;
pub use models::{
    CoordinatePair,
    ModelConfig,
    ModelKind,
    ModelParams,
    TransformationModel,
};
