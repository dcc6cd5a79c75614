use clap::Parser;
use rttrafo::ModelKind;
use rttrafo::models::{
    BreakPositions,
    Extrapolation,
    InterpolationType,
};
use std::path::PathBuf;

/// Applies retention time transformations to experiments, feature maps,
/// consensus maps and identification files.
///
/// The i-th entry of `--trafo_in` is applied to the i-th entry of `--in`
/// and the result is written to the i-th entry of `--out`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file (command line flags take precedence)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input files to transform (.experiment.json, .features.json,
    /// .consensus.json or .ids.json)
    #[arg(long = "in", num_args = 1..)]
    pub ins: Vec<PathBuf>,

    /// Output files, one per input file
    #[arg(long = "out", num_args = 1..)]
    pub outs: Vec<PathBuf>,

    /// Transformations to apply (.trafoXML or .trafo.json)
    #[arg(long = "trafo_in", num_args = 1..)]
    pub trafo_ins: Vec<PathBuf>,

    /// Where to write the (refitted/inverted) transformations
    #[arg(long = "trafo_out", num_args = 1..)]
    pub trafo_outs: Vec<PathBuf>,

    /// Invert the transformations before applying them
    #[arg(long)]
    pub invert: bool,

    /// Refit the transformations with this model before applying them
    #[arg(long, value_enum)]
    pub model_type: Option<ModelKind>,

    /// [linear] Use symmetric regression
    #[arg(long)]
    pub symmetric_regression: bool,

    /// [b_spline] Number of breakpoints of the spline
    #[arg(long)]
    pub num_breakpoints: Option<usize>,

    /// [b_spline] Placement of the breakpoints
    #[arg(long, value_enum)]
    pub break_positions: Option<BreakPositions>,

    /// [b_spline] Smoothing strength
    #[arg(long)]
    pub smoothing: Option<f64>,

    /// [b_spline] Behaviour outside the fitted range
    #[arg(long, value_enum)]
    pub extrapolate: Option<Extrapolation>,

    /// [interpolated] Interpolation between the samples
    #[arg(long, value_enum)]
    pub interpolation_type: Option<InterpolationType>,

    /// [interpolated] Behaviour outside the fitted range
    #[arg(long, value_enum)]
    pub extrapolation_type: Option<Extrapolation>,

    /// Consensus map run the transformations belong to (defaults to the
    /// position of each transformation in `--trafo_in`)
    #[arg(long)]
    pub consensus_map_index: Option<u32>,

    /// Run the jobs in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Write configuration templates to this directory and exit
    #[arg(long)]
    pub write_template: Option<PathBuf>,
}
