//! Retention time transformation models.
//!
//! A model is a one dimensional mapping from an observed RT to a reference RT.
//! All variants share the same contract:
//!
//! - `fit` from `(observed, reference)` pairs plus variant parameters
//! - `evaluate` at a scalar
//! - `invert` into a model of the same kind
//!
//! Inversion is exact for `none` and `linear`. For `b_spline` and `interpolated`
//! the inverse is re-fit on the swapped training pairs, so composing a model with
//! its inverse only approximately recovers the input.

mod bspline;
mod extrapolation;
mod interpolated;
mod linear;

pub use bspline::{
    BSplineModel,
    BSplineParams,
    BreakPositions,
};
pub use extrapolation::{
    Boundary,
    Extrapolation,
};
pub use interpolated::{
    InterpolatedModel,
    InterpolatedParams,
    InterpolationType,
};
pub use linear::{
    LinearModel,
    LinearParams,
};

use serde::{
    Deserialize,
    Serialize,
};
use std::fmt::Display;

use crate::errors::{
    FitError,
    TransformationError,
};

/// A single `(observed, reference)` retention time pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordinatePair {
    pub observed: f64,
    pub reference: f64,
}

impl CoordinatePair {
    pub fn new(observed: f64, reference: f64) -> Self {
        Self {
            observed,
            reference,
        }
    }

    /// Same pair with the roles of the two axes exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            observed: self.reference,
            reference: self.observed,
        }
    }
}

impl From<(f64, f64)> for CoordinatePair {
    fn from(val: (f64, f64)) -> Self {
        Self::new(val.0, val.1)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ModelKind {
    /// Identity, leaves retention times untouched.
    #[default]
    #[serde(rename = "none")]
    #[cfg_attr(feature = "clap", value(name = "none"))]
    None,
    #[serde(rename = "linear")]
    #[cfg_attr(feature = "clap", value(name = "linear"))]
    Linear,
    /// Smoothing spline.
    #[serde(rename = "b_spline")]
    #[cfg_attr(feature = "clap", value(name = "b_spline"))]
    BSpline,
    #[serde(rename = "interpolated")]
    #[cfg_attr(feature = "clap", value(name = "interpolated"))]
    Interpolated,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Linear => "linear",
            Self::BSpline => "b_spline",
            Self::Interpolated => "interpolated",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" | "identity" => Some(Self::None),
            "linear" => Some(Self::Linear),
            "b_spline" => Some(Self::BSpline),
            "interpolated" => Some(Self::Interpolated),
            _ => None,
        }
    }
}

impl Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters for every fittable variant. Only the section matching the
/// requested [`ModelKind`] is read during a fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub linear: LinearParams,
    pub b_spline: BSplineParams,
    pub interpolated: InterpolatedParams,
}

/// The `model` section of the configuration: which kind to fit, and how.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    #[serde(rename = "type")]
    pub kind: ModelKind,
    #[serde(flatten)]
    pub params: ModelParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransformationModel {
    #[serde(rename = "none")]
    Identity,
    #[serde(rename = "linear")]
    Linear(LinearModel),
    #[serde(rename = "b_spline")]
    BSpline(BSplineModel),
    #[serde(rename = "interpolated")]
    Interpolated(InterpolatedModel),
}

impl TransformationModel {
    /// Fits a model of the requested kind to the samples.
    ///
    /// Samples do not need to be sorted.
    pub fn fit(
        kind: ModelKind,
        samples: &[CoordinatePair],
        params: &ModelParams,
    ) -> Result<Self, FitError> {
        match kind {
            ModelKind::None => Ok(Self::Identity),
            ModelKind::Linear => Ok(Self::Linear(LinearModel::fit(samples, &params.linear)?)),
            ModelKind::BSpline => Ok(Self::BSpline(BSplineModel::fit(
                samples,
                &params.b_spline,
            )?)),
            ModelKind::Interpolated => Ok(Self::Interpolated(InterpolatedModel::fit(
                samples,
                &params.interpolated,
            )?)),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Identity => ModelKind::None,
            Self::Linear(_) => ModelKind::Linear,
            Self::BSpline(_) => ModelKind::BSpline,
            Self::Interpolated(_) => ModelKind::Interpolated,
        }
    }

    pub fn evaluate(&self, x: f64) -> Result<f64, TransformationError> {
        match self {
            Self::Identity => Ok(x),
            Self::Linear(m) => Ok(m.evaluate(x)),
            Self::BSpline(m) => m.evaluate(x),
            Self::Interpolated(m) => m.evaluate(x),
        }
    }

    /// Functional inverse of the model.
    ///
    /// Exact for `none` and `linear`; an approximation (re-fit on swapped axes)
    /// for `b_spline` and `interpolated`.
    pub fn invert(&self) -> Result<Self, TransformationError> {
        match self {
            Self::Identity => Ok(Self::Identity),
            Self::Linear(m) => Ok(Self::Linear(m.invert()?)),
            Self::BSpline(m) => Ok(Self::BSpline(m.invert()?)),
            Self::Interpolated(m) => Ok(Self::Interpolated(m.invert()?)),
        }
    }

    /// Parameters the model was fitted with, as flat `(name, value)` pairs.
    pub fn param_entries(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Identity => Vec::new(),
            Self::Linear(m) => {
                let (slope, intercept) = m.effective_coefficients();
                vec![
                    ("slope", slope.to_string()),
                    ("intercept", intercept.to_string()),
                    (
                        "symmetric_regression",
                        m.params.symmetric_regression.to_string(),
                    ),
                ]
            }
            Self::BSpline(m) => vec![
                ("num_breakpoints", m.params.num_breakpoints.to_string()),
                ("break_positions", m.params.break_positions.as_str().to_string()),
                ("smoothing", m.params.smoothing.to_string()),
                ("extrapolate", m.params.extrapolate.as_str().to_string()),
            ],
            Self::Interpolated(m) => vec![
                (
                    "interpolation_type",
                    m.params.interpolation_type.as_str().to_string(),
                ),
                (
                    "extrapolation_type",
                    m.params.extrapolation_type.as_str().to_string(),
                ),
            ],
        }
    }
}

pub(crate) fn ensure_finite(samples: &[CoordinatePair], model: ModelKind) -> Result<(), FitError> {
    match samples
        .iter()
        .find(|p| !p.observed.is_finite() || !p.reference.is_finite())
    {
        Some(p) => Err(FitError::InvalidParams {
            model,
            msg: format!(
                "non-finite sample ({}, {}) in transformation data",
                p.observed, p.reference
            ),
        }),
        None => Ok(()),
    }
}

pub(crate) fn sorted_by_observed(samples: &[CoordinatePair]) -> Vec<CoordinatePair> {
    let mut out = samples.to_vec();
    out.sort_by(|a, b| {
        a.observed
            .total_cmp(&b.observed)
            .then_with(|| a.reference.total_cmp(&b.reference))
    });
    out
}

pub(crate) fn all_observed_equal(samples: &[CoordinatePair]) -> bool {
    match samples.first() {
        Some(first) => samples.iter().all(|p| p.observed == first.observed),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(v: &[(f64, f64)]) -> Vec<CoordinatePair> {
        v.iter().copied().map(CoordinatePair::from).collect()
    }

    #[test]
    fn identity_ignores_samples_and_returns_input() {
        let m = TransformationModel::fit(ModelKind::None, &[], &ModelParams::default()).unwrap();
        assert_eq!(m, TransformationModel::Identity);
        let x = 1234.567_891_f64;
        assert_eq!(m.evaluate(x).unwrap().to_bits(), x.to_bits());
        assert_eq!(m.invert().unwrap(), TransformationModel::Identity);
    }

    #[test]
    fn fit_dispatches_on_kind() {
        let samples = pairs(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0), (4.0, 9.0), (5.0, 11.0), (6.0, 13.0)]);
        let params = ModelParams::default();
        for kind in [
            ModelKind::None,
            ModelKind::Linear,
            ModelKind::BSpline,
            ModelKind::Interpolated,
        ] {
            let m = TransformationModel::fit(kind, &samples, &params).unwrap();
            assert_eq!(m.kind(), kind);
        }
    }

    #[test]
    fn model_serializes_with_type_tag() {
        let m = TransformationModel::fit(
            ModelKind::Linear,
            &pairs(&[(1.0, 2.0), (2.0, 4.0)]),
            &ModelParams::default(),
        )
        .unwrap();
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "linear");
        let back: TransformationModel = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);

        let json = serde_json::to_string(&TransformationModel::Identity).unwrap();
        assert_eq!(json, r#"{"type":"none"}"#);
    }

    #[test]
    fn model_config_defaults_missing_sections() {
        let conf: ModelConfig =
            serde_json::from_str(r#"{"type": "b_spline", "b_spline": {"num_breakpoints": 8}}"#)
                .unwrap();
        assert_eq!(conf.kind, ModelKind::BSpline);
        assert_eq!(conf.params.b_spline.num_breakpoints, 8);
        assert_eq!(
            conf.params.b_spline.smoothing,
            BSplineParams::default().smoothing
        );
        assert_eq!(conf.params.linear, LinearParams::default());
    }

    #[test]
    fn non_finite_samples_are_rejected() {
        let samples = pairs(&[(0.0, 0.0), (f64::NAN, 1.0), (2.0, 2.0)]);
        let err = TransformationModel::fit(ModelKind::Linear, &samples, &ModelParams::default())
            .unwrap_err();
        assert!(matches!(err, FitError::InvalidParams { .. }));
    }

    #[test]
    fn model_kind_names_round_trip() {
        for kind in [
            ModelKind::None,
            ModelKind::Linear,
            ModelKind::BSpline,
            ModelKind::Interpolated,
        ] {
            assert_eq!(ModelKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ModelKind::from_name("lowess"), None);
    }
}
