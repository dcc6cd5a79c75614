use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use std::time::Instant;
use tracing::info;

use rttrafo::{
    BatchConfig,
    BatchPaths,
    BatchSummary,
    FileStore,
    run_batch,
};

use crate::errors::CliError;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})";

fn progress_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(0).with_style(style)
}

pub fn main_loop(paths: &BatchPaths, config: &BatchConfig) -> Result<BatchSummary, CliError> {
    let start = Instant::now();
    let progress = progress_bar();
    let summary = run_batch(paths, config, &FileStore, &progress)
        .map_err(|e| CliError::from_batch(e, paths));
    progress.finish_and_clear();
    let summary = summary?;

    for job in summary.jobs.iter() {
        let model = job.model.map(|m| m.as_str()).unwrap_or("unfitted");
        match (&job.input, &job.output, job.format) {
            (Some(input), Some(output), Some(format)) => info!(
                "{} -> {}: {} {} retention times ({} model, {:?})",
                input.display(),
                output.display(),
                job.transformed_rts,
                format,
                model,
                job.elapsed
            ),
            _ => info!(
                "{}: {} model ({:?})",
                job.trafo_in.display(),
                model,
                job.elapsed
            ),
        }
    }
    info!(
        "Transformed {} retention times in {} job(s), took {:?}",
        summary.total_transformed(),
        summary.jobs.len(),
        start.elapsed()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::exit_codes;
    use std::path::PathBuf;

    const LINEAR_TRAFO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TrafoXML version="1.0">
  <Transformation name="linear">
    <Param type="float" name="slope" value="2.0"/>
    <Param type="float" name="intercept" value="1.0"/>
    <Pairs count="2">
      <Pair from="0.0" to="1.0"/>
      <Pair from="10.0" to="21.0"/>
    </Pairs>
  </Transformation>
</TrafoXML>
"#;

    #[test]
    fn transforms_feature_map_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let trafo_in = dir.path().join("run.trafoXML");
        let input = dir.path().join("run.features.json");
        let output = dir.path().join("run_aligned.features.json");
        std::fs::write(&trafo_in, LINEAR_TRAFO).unwrap();
        std::fs::write(
            &input,
            r#"{"features": [{"id": 1, "rt": 5.0, "mz": 500.0, "intensity": 10.0, "charge": 2}]}"#,
        )
        .unwrap();

        let paths = BatchPaths {
            ins: vec![input],
            outs: vec![output.clone()],
            trafo_ins: vec![trafo_in],
            trafo_outs: vec![],
        };
        let summary = main_loop(&paths, &BatchConfig::default()).unwrap();
        assert_eq!(summary.total_transformed(), 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(written["features"][0]["rt"], serde_json::json!(11.0));
    }

    #[test]
    fn missing_transformation_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BatchPaths {
            trafo_ins: vec![dir.path().join("missing.trafoXML")],
            trafo_outs: vec![dir.path().join("out.trafo.json")],
            ..Default::default()
        };
        let err = main_loop(&paths, &BatchConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::INPUT_FILE_ERROR);
    }

    #[test]
    fn nothing_to_write_is_illegal_parameters() {
        let paths = BatchPaths {
            trafo_ins: vec![PathBuf::from("a.trafoXML")],
            ..Default::default()
        };
        let err = main_loop(&paths, &BatchConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::ILLEGAL_PARAMETERS);
    }
}
