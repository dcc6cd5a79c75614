use serde::{
    Deserialize,
    Serialize,
};
use std::path::Path;
use tracing::info;

use rttrafo::{
    BatchConfig,
    BatchPaths,
};

use crate::cli::Cli;
use crate::errors::CliError;

/// Contents of the `--config` file.
///
/// Everything is optional; the file lists are usually given on the command
/// line instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub files: BatchPaths,
    #[serde(flatten)]
    pub batch: BatchConfig,
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self, CliError> {
        let file = std::fs::File::open(path).map_err(|e| CliError::Io {
            source: e.to_string(),
            path: Some(path.to_string_lossy().to_string()),
        })?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| CliError::ParseError { msg: e.to_string() })
    }

    /// Builds the configuration from the optional config file, then applies
    /// the command line on top of it.
    pub fn with_cli_args(args: &Cli) -> Result<Self, CliError> {
        let mut config = match &args.config {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_path(path)?
            }
            None => Self::default(),
        };
        config.apply_cli_args(args);
        Ok(config)
    }

    fn apply_cli_args(&mut self, args: &Cli) {
        let files = &mut self.files;
        if !args.ins.is_empty() {
            files.ins = args.ins.clone();
        }
        if !args.outs.is_empty() {
            files.outs = args.outs.clone();
        }
        if !args.trafo_ins.is_empty() {
            files.trafo_ins = args.trafo_ins.clone();
        }
        if !args.trafo_outs.is_empty() {
            files.trafo_outs = args.trafo_outs.clone();
        }

        let batch = &mut self.batch;
        if args.invert {
            batch.invert = true;
        }
        if args.parallel {
            batch.parallel = true;
        }
        if let Some(index) = args.consensus_map_index {
            batch.consensus_map_index = Some(index);
        }

        let model = &mut batch.model;
        if let Some(kind) = args.model_type {
            model.kind = kind;
        }
        if args.symmetric_regression {
            model.params.linear.symmetric_regression = true;
        }
        let b_spline = &mut model.params.b_spline;
        if let Some(n) = args.num_breakpoints {
            b_spline.num_breakpoints = n;
        }
        if let Some(positions) = args.break_positions {
            b_spline.break_positions = positions;
        }
        if let Some(smoothing) = args.smoothing {
            b_spline.smoothing = smoothing;
        }
        if let Some(extrapolate) = args.extrapolate {
            b_spline.extrapolate = extrapolate;
        }
        let interpolated = &mut model.params.interpolated;
        if let Some(kind) = args.interpolation_type {
            interpolated.interpolation_type = kind;
        }
        if let Some(extrapolation) = args.extrapolation_type {
            interpolated.extrapolation_type = extrapolation;
        }
    }
}

const LINEAR_TEMPLATE: &str = r#"{
  "model": {
    "type": "linear",
    "linear": {
      "symmetric_regression": false
    }
  },
  "invert": false,
  "parallel": false
}
"#;

const BSPLINE_TEMPLATE: &str = r#"{
  "model": {
    "type": "b_spline",
    "b_spline": {
      "num_breakpoints": 5,
      "break_positions": "uniform",
      "smoothing": 1.0,
      "extrapolate": "linear"
    }
  },
  "invert": false,
  "parallel": false
}
"#;

const INTERPOLATED_TEMPLATE: &str = r#"{
  "files": {
    "trafo_ins": ["run1.trafoXML", "run2.trafoXML"],
    "ins": ["run1.features.json", "run2.features.json"],
    "outs": ["run1_aligned.features.json", "run2_aligned.features.json"]
  },
  "model": {
    "type": "interpolated",
    "interpolated": {
      "interpolation_type": "cspline",
      "extrapolation_type": "global_linear"
    }
  },
  "invert": false,
  "parallel": true
}
"#;

pub const TEMPLATES: [(&str, &str); 3] = [
    ("linear_config.json", LINEAR_TEMPLATE),
    ("b_spline_config.json", BSPLINE_TEMPLATE),
    ("interpolated_config.json", INTERPOLATED_TEMPLATE),
];

pub fn main_write_template(output_dir: &Path) -> Result<(), CliError> {
    let io_err = |e: std::io::Error, path: &Path| CliError::Io {
        source: e.to_string(),
        path: Some(path.to_string_lossy().to_string()),
    };
    std::fs::create_dir_all(output_dir).map_err(|e| io_err(e, output_dir))?;
    for (name, contents) in TEMPLATES {
        let path = output_dir.join(name);
        std::fs::write(&path, contents).map_err(|e| io_err(e, &path))?;
        info!("Wrote config template to {}", path.display());
    }
    Ok(())
}
