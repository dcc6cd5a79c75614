use rttrafo::{
    BatchError,
    BatchPaths,
    JobError,
};

/// Exit codes, in line with the rest of the alignment tools.
pub mod exit_codes {
    pub const INPUT_FILE_ERROR: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const OUTPUT_FILE_ERROR: u8 = 5;
    pub const ILLEGAL_PARAMETERS: u8 = 6;
    pub const TRANSFORMATION_ERROR: u8 = 12;
}

#[derive(Debug)]
pub enum CliError {
    ParseError {
        msg: String,
    },
    Io {
        source: String,
        path: Option<String>,
    },
    /// The file lists do not line up.
    IllegalParameters {
        source: String,
    },
    InputFile {
        source: String,
    },
    OutputFile {
        source: String,
    },
    Transformation {
        source: String,
    },
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::ParseError { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } | CliError::InputFile { .. } => exit_codes::INPUT_FILE_ERROR,
            CliError::IllegalParameters { .. } => exit_codes::ILLEGAL_PARAMETERS,
            CliError::OutputFile { .. } => exit_codes::OUTPUT_FILE_ERROR,
            CliError::Transformation { .. } => exit_codes::TRANSFORMATION_ERROR,
        }
    }

    /// Classifies a batch failure; a store error on one of the output lists
    /// is an output error, anything else on a file is an input error.
    pub fn from_batch(err: BatchError, paths: &BatchPaths) -> Self {
        let source = err.to_string();
        match err {
            BatchError::Validation(_) => CliError::IllegalParameters { source },
            BatchError::Job {
                source: JobError::Transformation(_),
                ..
            } => CliError::Transformation { source },
            BatchError::Job {
                path,
                source: JobError::Store(_),
                ..
            } => {
                if paths.outs.contains(&path) || paths.trafo_outs.contains(&path) {
                    CliError::OutputFile { source }
                } else {
                    CliError::InputFile { source }
                }
            }
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::ParseError { msg } => write!(f, "Error parsing config: {}", msg),
            CliError::Io { source, path } => {
                if let Some(path) = path {
                    write!(f, "Error accessing file {}: {}", path, source)
                } else {
                    write!(f, "Error accessing file: {}", source)
                }
            }
            CliError::IllegalParameters { source } => write!(f, "Illegal parameters: {}", source),
            CliError::InputFile { source } => write!(f, "Error reading input: {}", source),
            CliError::OutputFile { source } => write!(f, "Error writing output: {}", source),
            CliError::Transformation { source } => {
                write!(f, "Error applying transformation: {}", source)
            }
        }
    }
}

impl std::error::Error for CliError {}
