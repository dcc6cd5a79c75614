//! Runs one transformation job per entry of `trafo_in`.
//!
//! Each job loads its transformation, optionally refits and inverts it,
//! optionally writes it back out, and optionally applies it to the matching
//! data file. Jobs share nothing but the [`BatchConfig`].
//!
//! The batch is fail-fast and not transactional: the first failing job ends
//! the batch and files written by earlier jobs stay on disk.

use std::collections::BTreeMap;
use std::path::{
    Path,
    PathBuf,
};
use std::time::{
    Duration,
    Instant,
};

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
};

use crate::errors::{
    BatchError,
    JobError,
    ValidationError,
};
use crate::io::{
    CollectionStore,
    FormatKind,
    TransformationStore,
};
use crate::maps::{
    DataProcessing,
    DataProcessingHistory,
};
use crate::models::{
    ModelConfig,
    ModelKind,
};
use crate::transformer::transform_collection;

/// The four parallel file lists of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPaths {
    pub ins: Vec<PathBuf>,
    pub outs: Vec<PathBuf>,
    pub trafo_ins: Vec<PathBuf>,
    pub trafo_outs: Vec<PathBuf>,
}

fn mismatch(
    first: &'static str,
    first_len: usize,
    second: &'static str,
    second_len: usize,
) -> ValidationError {
    ValidationError::MismatchedCounts {
        first,
        first_len,
        second,
        second_len,
    }
}

impl BatchPaths {
    /// Checks the list lengths against each other and returns the number of
    /// jobs (`trafo_ins.len()`).
    pub fn validate(&self) -> Result<usize, ValidationError> {
        let (ins, outs) = (self.ins.len(), self.outs.len());
        let (trafo_ins, trafo_outs) = (self.trafo_ins.len(), self.trafo_outs.len());

        if ins != 0 && ins != trafo_ins {
            return Err(mismatch("in", ins, "trafo_in", trafo_ins));
        }
        if outs == 0 && trafo_outs == 0 {
            return Err(ValidationError::NoOutputRequested);
        }
        if outs != 0 && outs != ins {
            return Err(mismatch("out", outs, "in", ins));
        }
        if trafo_outs != 0 && trafo_outs != trafo_ins {
            return Err(mismatch("trafo_out", trafo_outs, "trafo_in", trafo_ins));
        }
        // Transformed data would have nowhere to go.
        if ins != 0 && outs == 0 {
            return Err(mismatch("out", outs, "in", ins));
        }
        Ok(trafo_ins)
    }
}

/// Settings shared by every job of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Model to refit before applying. `none` keeps the loaded model.
    pub model: ModelConfig,
    pub invert: bool,
    /// Run of a consensus map the transformation belongs to. Defaults to the
    /// job index.
    pub consensus_map_index: Option<u32>,
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub index: usize,
    pub trafo_in: PathBuf,
    pub trafo_out: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub model: Option<ModelKind>,
    pub format: Option<FormatKind>,
    pub transformed_rts: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub jobs: Vec<JobSummary>,
}

impl BatchSummary {
    pub fn total_transformed(&self) -> usize {
        self.jobs.iter().map(|j| j.transformed_rts).sum()
    }
}

fn job_error<E: Into<JobError>>(index: usize, path: &Path) -> impl FnOnce(E) -> BatchError + '_ {
    move |e| BatchError::Job {
        index,
        path: path.to_path_buf(),
        source: e.into(),
    }
}

fn provenance_parameters(config: &BatchConfig, trafo_in: &Path) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("trafo_in".to_string(), trafo_in.display().to_string());
    params.insert("model_type".to_string(), config.model.kind.to_string());
    params.insert("invert".to_string(), config.invert.to_string());
    params
}

fn run_job<S>(
    index: usize,
    paths: &BatchPaths,
    config: &BatchConfig,
    store: &S,
) -> Result<JobSummary, BatchError>
where
    S: TransformationStore + CollectionStore + ?Sized,
{
    let start = Instant::now();
    let trafo_in = &paths.trafo_ins[index];
    let mut trafo = store
        .load_transformation(trafo_in)
        .map_err(job_error(index, trafo_in))?;

    if config.model.kind != ModelKind::None {
        trafo
            .fit_model(config.model.kind, &config.model.params)
            .map_err(job_error(index, trafo_in))?;
    }
    if config.invert {
        trafo.invert().map_err(job_error(index, trafo_in))?;
    }
    debug!(
        "Job {}: {} pairs, model {:?}, observed range {:?}",
        index,
        trafo.sample_count(),
        trafo.model_kind(),
        trafo.observed_range()
    );

    let trafo_out = paths.trafo_outs.get(index);
    if let Some(trafo_out) = trafo_out {
        store
            .store_transformation(trafo_out, &trafo)
            .map_err(job_error(index, trafo_out))?;
    }

    let mut format = None;
    let mut transformed_rts = 0;
    let input = paths.ins.get(index);
    let output = paths.outs.get(index);
    if let (Some(input), Some(output)) = (input, output) {
        let mut collection = store
            .load_collection(input)
            .map_err(job_error(index, input))?;
        let map_index = config.consensus_map_index.unwrap_or(index as u32);
        transformed_rts = transform_collection(&mut collection, &trafo, map_index)
            .map_err(job_error(index, input))?;
        if let Some(history) = collection.history_mut() {
            history.add_data_processing(DataProcessing::alignment(provenance_parameters(
                config, trafo_in,
            )));
        }
        format = Some(collection.format_kind());
        store
            .store_collection(output, &collection)
            .map_err(job_error(index, output))?;
    }

    let elapsed = start.elapsed();
    info!(
        "Job {} finished in {:?} ({} retention times transformed)",
        index, elapsed, transformed_rts
    );
    Ok(JobSummary {
        index,
        trafo_in: trafo_in.clone(),
        trafo_out: trafo_out.cloned(),
        input: input.cloned(),
        output: output.cloned(),
        model: trafo.model_kind(),
        format,
        transformed_rts,
        elapsed,
    })
}

/// Validates `paths`, then runs every job, reporting progress per job.
///
/// Nothing is read or written if validation fails.
pub fn run_batch<S>(
    paths: &BatchPaths,
    config: &BatchConfig,
    store: &S,
    progress: &ProgressBar,
) -> Result<BatchSummary, BatchError>
where
    S: TransformationStore + CollectionStore + Sync + ?Sized,
{
    let n_jobs = paths.validate()?;
    info!(
        "Applying {} transformation(s) (model: {}, invert: {})",
        n_jobs, config.model.kind, config.invert
    );
    progress.set_length(n_jobs as u64);

    let jobs = if config.parallel {
        (0..n_jobs)
            .into_par_iter()
            .map(|i| {
                let out = run_job(i, paths, config, store);
                progress.inc(1);
                out
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        let mut jobs = Vec::with_capacity(n_jobs);
        for i in 0..n_jobs {
            jobs.push(run_job(i, paths, config, store)?);
            progress.inc(1);
        }
        jobs
    };

    Ok(BatchSummary { jobs })
}
