use serde::{
    Deserialize,
    Serialize,
};

use super::{
    CoordinatePair,
    ModelKind,
    all_observed_equal,
    ensure_finite,
};
use crate::errors::{
    FitError,
    TransformationError,
};
use crate::math::least_squares_line;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    /// Regress `y - x` on `y + x` instead of `y` on `x`, so neither axis is
    /// treated as error free.
    pub symmetric_regression: bool,
}

/// `y = slope * x + intercept`.
///
/// Inversion flips `inverted` instead of recomputing the coefficients, which
/// keeps a double inversion bit-exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub slope: f64,
    pub intercept: f64,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub params: LinearParams,
}

impl LinearModel {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self {
            slope,
            intercept,
            inverted: false,
            params: LinearParams::default(),
        }
    }

    pub fn fit(samples: &[CoordinatePair], params: &LinearParams) -> Result<Self, FitError> {
        if samples.len() < 2 {
            return Err(FitError::InsufficientData {
                model: ModelKind::Linear,
                required: 2,
                available: samples.len(),
            });
        }
        ensure_finite(samples, ModelKind::Linear)?;
        if all_observed_equal(samples) {
            return Err(FitError::DegenerateInput {
                model: ModelKind::Linear,
                context: "all observed retention times are identical".to_string(),
            });
        }

        let (slope, intercept) = if params.symmetric_regression {
            let sums: Vec<f64> = samples.iter().map(|p| p.reference + p.observed).collect();
            let diffs: Vec<f64> = samples.iter().map(|p| p.reference - p.observed).collect();
            let (m, b) =
                least_squares_line(&sums, &diffs).ok_or_else(|| FitError::DegenerateInput {
                    model: ModelKind::Linear,
                    context: "observed + reference sums have no spread".to_string(),
                })?;
            let denom = 1.0 - m;
            if denom.abs() < f64::EPSILON {
                return Err(FitError::DegenerateInput {
                    model: ModelKind::Linear,
                    context: "symmetric regression produced a vertical line".to_string(),
                });
            }
            ((1.0 + m) / denom, b / denom)
        } else {
            let xs: Vec<f64> = samples.iter().map(|p| p.observed).collect();
            let ys: Vec<f64> = samples.iter().map(|p| p.reference).collect();
            least_squares_line(&xs, &ys).ok_or_else(|| FitError::DegenerateInput {
                model: ModelKind::Linear,
                context: "observed retention times have no spread".to_string(),
            })?
        };

        Ok(Self {
            slope,
            intercept,
            inverted: false,
            params: params.clone(),
        })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        if self.inverted {
            (x - self.intercept) / self.slope
        } else {
            self.slope * x + self.intercept
        }
    }

    pub fn invert(&self) -> Result<Self, TransformationError> {
        if self.slope == 0.0 || !self.slope.is_finite() {
            return Err(TransformationError::NotInvertible {
                model: ModelKind::Linear,
                reason: format!("slope is {}", self.slope),
            });
        }
        Ok(Self {
            inverted: !self.inverted,
            ..self.clone()
        })
    }

    /// Slope and intercept of the mapping as actually applied.
    pub fn effective_coefficients(&self) -> (f64, f64) {
        if self.inverted {
            (1.0 / self.slope, -self.intercept / self.slope)
        } else {
            (self.slope, self.intercept)
        }
    }
}
