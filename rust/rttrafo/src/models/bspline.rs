//! Smoothing spline model.
//!
//! Cubic B-spline on a clamped knot vector built from `num_breakpoints`
//! breakpoints spanning the observed range. Coefficients minimize
//!
//! ```text
//! Σ (y_i - s(x_i))^2 + smoothing * Σ (Δ²c_j)^2
//! ```
//!
//! where `Δ²` is the second divided difference of the coefficients over the
//! Greville abscissae, scaled by the local spacing. Coefficients of a straight
//! line are linear in the Greville abscissae, so noiseless linear data is
//! reproduced exactly regardless of the smoothing strength.

use nalgebra::{
    DMatrix,
    DVector,
};
use serde::{
    Deserialize,
    Serialize,
};

use super::{
    Boundary,
    CoordinatePair,
    Extrapolation,
    ModelKind,
    all_observed_equal,
    ensure_finite,
    sorted_by_observed,
};
use crate::errors::{
    FitError,
    TransformationError,
};
use crate::math::{
    least_squares_line,
    solve_least_squares,
};

const DEGREE: usize = 3;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum BreakPositions {
    /// Evenly spaced over the observed range.
    #[default]
    Uniform,
    /// At quantiles of the observed values.
    Quantiles,
}

impl BreakPositions {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Quantiles => "quantiles",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uniform" => Some(Self::Uniform),
            "quantiles" => Some(Self::Quantiles),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BSplineParams {
    pub num_breakpoints: usize,
    pub break_positions: BreakPositions,
    /// Strength of the second difference penalty on the coefficients.
    pub smoothing: f64,
    pub extrapolate: Extrapolation,
}

impl Default for BSplineParams {
    fn default() -> Self {
        Self {
            num_breakpoints: 5,
            break_positions: BreakPositions::Uniform,
            smoothing: 1.0,
            extrapolate: Extrapolation::Linear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BSplineModelFields")]
pub struct BSplineModel {
    pub params: BSplineParams,
    knots: Vec<f64>,
    coefficients: Vec<f64>,
    boundary: Boundary,
    /// Training pairs, sorted by observed value. Needed for inversion.
    samples: Vec<CoordinatePair>,
}

impl BSplineModel {
    pub fn fit(samples: &[CoordinatePair], params: &BSplineParams) -> Result<Self, FitError> {
        let num_breakpoints = params.num_breakpoints;
        if num_breakpoints < 2 {
            return Err(FitError::InvalidParams {
                model: ModelKind::BSpline,
                msg: format!("num_breakpoints must be at least 2, got {}", num_breakpoints),
            });
        }
        if !params.smoothing.is_finite() || params.smoothing < 0.0 {
            return Err(FitError::InvalidParams {
                model: ModelKind::BSpline,
                msg: format!(
                    "smoothing must be finite and non-negative, got {}",
                    params.smoothing
                ),
            });
        }
        if num_breakpoints > samples.len() {
            return Err(FitError::InvalidParams {
                model: ModelKind::BSpline,
                msg: format!(
                    "num_breakpoints ({}) exceeds the number of samples ({})",
                    num_breakpoints,
                    samples.len()
                ),
            });
        }
        if samples.len() < num_breakpoints + 1 {
            return Err(FitError::InsufficientData {
                model: ModelKind::BSpline,
                required: num_breakpoints + 1,
                available: samples.len(),
            });
        }
        ensure_finite(samples, ModelKind::BSpline)?;
        if all_observed_equal(samples) {
            return Err(FitError::DegenerateInput {
                model: ModelKind::BSpline,
                context: "all observed retention times are identical".to_string(),
            });
        }

        let sorted = sorted_by_observed(samples);
        let xs: Vec<f64> = sorted.iter().map(|p| p.observed).collect();
        let ys: Vec<f64> = sorted.iter().map(|p| p.reference).collect();

        let breakpoints = match params.break_positions {
            BreakPositions::Uniform => uniform_breakpoints(&xs, num_breakpoints),
            BreakPositions::Quantiles => quantile_breakpoints(&xs, num_breakpoints),
        };
        if breakpoints.len() < 2 {
            return Err(FitError::DegenerateInput {
                model: ModelKind::BSpline,
                context: "breakpoints collapse to a single position".to_string(),
            });
        }

        let knots = clamped_knots(&breakpoints);
        let n_coef = breakpoints.len() + DEGREE - 1;
        let n_penalty = n_coef - 2;
        let penalty_weight = params.smoothing.sqrt();
        let greville = greville_abscissae(&knots, n_coef);

        let mut design = DMatrix::<f64>::zeros(xs.len() + n_penalty, n_coef);
        let mut target = DVector::<f64>::zeros(xs.len() + n_penalty);
        for (row, (&x, &y)) in xs.iter().zip(ys.iter()).enumerate() {
            let span = find_span(&knots, n_coef, x);
            let basis = basis_functions(&knots, span, x);
            for (r, b) in basis.iter().enumerate() {
                design[(row, span - DEGREE + r)] = *b;
            }
            target[row] = y;
        }
        for j in 0..n_penalty {
            let row = xs.len() + j;
            let h1 = greville[j + 1] - greville[j];
            let h2 = greville[j + 2] - greville[j + 1];
            let scale = penalty_weight * 0.5 * (h1 + h2);
            design[(row, j)] = scale / h1;
            design[(row, j + 1)] = -scale * (1.0 / h1 + 1.0 / h2);
            design[(row, j + 2)] = scale / h2;
        }

        let coefficients = solve_least_squares(&design, &target)
            .ok_or_else(|| FitError::DegenerateInput {
                model: ModelKind::BSpline,
                context: "spline system is too ill-conditioned to solve".to_string(),
            })?
            .iter()
            .copied()
            .collect::<Vec<f64>>();

        let (global_slope, global_intercept) =
            least_squares_line(&xs, &ys).ok_or_else(|| FitError::DegenerateInput {
                model: ModelKind::BSpline,
                context: "observed retention times have no spread".to_string(),
            })?;

        let min_x = xs[0];
        let max_x = xs[xs.len() - 1];
        let (left_slope, right_slope) = end_derivatives(&knots, &coefficients);
        let boundary = Boundary {
            min_x,
            max_x,
            left_value: spline_value(&knots, &coefficients, min_x),
            left_slope,
            right_value: spline_value(&knots, &coefficients, max_x),
            right_slope,
            global_slope,
            global_intercept,
        };

        Ok(Self {
            params: params.clone(),
            knots,
            coefficients,
            boundary,
            samples: sorted,
        })
    }

    pub fn evaluate(&self, x: f64) -> Result<f64, TransformationError> {
        match self.boundary.extrapolate(self.params.extrapolate, x)? {
            Some(y) => Ok(y),
            None => Ok(spline_value(&self.knots, &self.coefficients, x)),
        }
    }

    /// Approximate inverse: the same spline re-fit with the axes swapped.
    ///
    /// The fitted curve has to be strictly monotonic over the training
    /// abscissae, otherwise the swapped pairs are not a function and the
    /// inversion is rejected with `NotInvertible`.
    pub fn invert(&self) -> Result<Self, TransformationError> {
        let mut xs: Vec<f64> = self.samples.iter().map(|p| p.observed).collect();
        xs.dedup();
        let values: Vec<f64> = xs
            .iter()
            .map(|&x| spline_value(&self.knots, &self.coefficients, x))
            .collect();
        let increasing = values.windows(2).all(|w| w[0] < w[1]);
        let decreasing = values.windows(2).all(|w| w[0] > w[1]);
        if !increasing && !decreasing {
            return Err(TransformationError::NotInvertible {
                model: ModelKind::BSpline,
                reason: "fitted spline is not strictly monotonic over the samples".to_string(),
            });
        }
        let swapped: Vec<CoordinatePair> = self.samples.iter().map(|p| p.swapped()).collect();
        Ok(Self::fit(&swapped, &self.params)?)
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.knots[DEGREE..self.knots.len() - DEGREE]
    }
}

/// Serialized form of [`BSplineModel`], checked before use.
#[derive(Deserialize)]
struct BSplineModelFields {
    params: BSplineParams,
    knots: Vec<f64>,
    coefficients: Vec<f64>,
    boundary: Boundary,
    samples: Vec<CoordinatePair>,
}

impl TryFrom<BSplineModelFields> for BSplineModel {
    type Error = String;

    fn try_from(f: BSplineModelFields) -> Result<Self, Self::Error> {
        let n_coef = f.coefficients.len();
        if n_coef < DEGREE + 1 {
            return Err(format!(
                "b_spline model needs at least {} coefficients, got {}",
                DEGREE + 1,
                n_coef
            ));
        }
        if f.knots.len() != n_coef + DEGREE + 1 {
            return Err(format!(
                "b_spline model has {} knots for {} coefficients, expected {}",
                f.knots.len(),
                n_coef,
                n_coef + DEGREE + 1
            ));
        }
        if !f.knots.windows(2).all(|w| w[0] <= w[1]) {
            return Err("b_spline knots are not sorted".to_string());
        }
        if !f.knots.iter().chain(f.coefficients.iter()).all(|v| v.is_finite()) {
            return Err("b_spline model has non-finite knots or coefficients".to_string());
        }
        Ok(Self {
            params: f.params,
            knots: f.knots,
            coefficients: f.coefficients,
            boundary: f.boundary,
            samples: f.samples,
        })
    }
}

fn uniform_breakpoints(sorted_xs: &[f64], n: usize) -> Vec<f64> {
    let min = sorted_xs[0];
    let max = sorted_xs[sorted_xs.len() - 1];
    let step = (max - min) / (n - 1) as f64;
    let mut out: Vec<f64> = (0..n).map(|i| min + step * i as f64).collect();
    // Avoid accumulated rounding at the right end.
    out[n - 1] = max;
    out
}

fn quantile_breakpoints(sorted_xs: &[f64], n: usize) -> Vec<f64> {
    let last = (sorted_xs.len() - 1) as f64;
    let mut out: Vec<f64> = (0..n)
        .map(|i| {
            let pos = last * i as f64 / (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted_xs[lo] + (sorted_xs[hi] - sorted_xs[lo]) * frac
        })
        .collect();
    out.dedup();
    out
}

fn clamped_knots(breakpoints: &[f64]) -> Vec<f64> {
    let first = breakpoints[0];
    let last = breakpoints[breakpoints.len() - 1];
    let mut knots = Vec::with_capacity(breakpoints.len() + 2 * DEGREE);
    knots.extend(std::iter::repeat_n(first, DEGREE));
    knots.extend_from_slice(breakpoints);
    knots.extend(std::iter::repeat_n(last, DEGREE));
    knots
}

/// Knot averages `(t_{j+1} + t_{j+2} + t_{j+3}) / 3`, strictly increasing for
/// distinct breakpoints.
fn greville_abscissae(knots: &[f64], n_coef: usize) -> Vec<f64> {
    (0..n_coef)
        .map(|j| knots[j + 1..=j + DEGREE].iter().sum::<f64>() / DEGREE as f64)
        .collect()
}

/// First derivative of the spline at both ends of a clamped knot vector.
fn end_derivatives(knots: &[f64], coefficients: &[f64]) -> (f64, f64) {
    let m = coefficients.len();
    let degree = DEGREE as f64;
    let left = degree * (coefficients[1] - coefficients[0]) / (knots[DEGREE + 1] - knots[1]);
    let right = degree * (coefficients[m - 1] - coefficients[m - 2])
        / (knots[m + DEGREE - 1] - knots[m - 1]);
    (left, right)
}

/// Index `i` of the knot span `[knots[i], knots[i + 1])` containing `x`,
/// clamped to the valid spans of a basis with `n_coef` functions.
fn find_span(knots: &[f64], n_coef: usize, x: f64) -> usize {
    knots
        .partition_point(|&k| k <= x)
        .saturating_sub(1)
        .clamp(DEGREE, n_coef - 1)
}

/// Non-zero cubic basis functions `N_{span-3..=span}` at `x` (Cox-de Boor).
fn basis_functions(knots: &[f64], span: usize, x: f64) -> [f64; DEGREE + 1] {
    let mut n = [0.0; DEGREE + 1];
    let mut left = [0.0; DEGREE + 1];
    let mut right = [0.0; DEGREE + 1];
    n[0] = 1.0;
    for j in 1..=DEGREE {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom == 0.0 { 0.0 } else { n[r] / denom };
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}

fn spline_value(knots: &[f64], coefficients: &[f64], x: f64) -> f64 {
    let span = find_span(knots, coefficients.len(), x);
    basis_functions(knots, span, x)
        .iter()
        .enumerate()
        .map(|(r, b)| b * coefficients[span - DEGREE + r])
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_samples(n: usize, slope: f64, intercept: f64) -> Vec<CoordinatePair> {
        (0..n)
            .map(|i| {
                let x = i as f64 * 2.0;
                CoordinatePair::new(x, slope * x + intercept)
            })
            .collect()
    }

    #[test]
    fn basis_is_a_partition_of_unity() {
        let knots = clamped_knots(&[0.0, 1.0, 2.5, 4.0]);
        let n_coef = 4 + DEGREE - 1;
        for x in [0.0, 0.3, 1.0, 1.7, 2.5, 3.99, 4.0] {
            let span = find_span(&knots, n_coef, x);
            let sum: f64 = basis_functions(&knots, span, x).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "sum at {} was {}", x, sum);
        }
    }

    #[test]
    fn reproduces_linear_data() {
        let samples = line_samples(50, 1.1, 30.0);
        let m = BSplineModel::fit(&samples, &BSplineParams::default()).unwrap();
        for p in &samples {
            let y = m.evaluate(p.observed).unwrap();
            assert!((y - p.reference).abs() < 1e-6, "{} vs {}", y, p.reference);
        }
        // Linear extension past the range keeps the slope.
        let y = m.evaluate(200.0).unwrap();
        assert!((y - (1.1 * 200.0 + 30.0)).abs() < 1e-4);
    }

    #[test]
    fn smooths_a_curve() {
        let samples: Vec<CoordinatePair> = (0..=100)
            .map(|i| {
                let x = i as f64;
                CoordinatePair::new(x, x + 0.01 * x * x)
            })
            .collect();
        let params = BSplineParams {
            num_breakpoints: 8,
            smoothing: 0.01,
            ..Default::default()
        };
        let m = BSplineModel::fit(&samples, &params).unwrap();
        for x in [5.0, 33.3, 50.0, 87.1] {
            let expected = x + 0.01 * x * x;
            assert!((m.evaluate(x).unwrap() - expected).abs() < 0.1);
        }
    }

    #[test]
    fn inverse_is_approximate_within_bounds() {
        let samples: Vec<CoordinatePair> = (0..=100)
            .map(|i| {
                let x = i as f64;
                CoordinatePair::new(x, x + 0.01 * x * x)
            })
            .collect();
        let params = BSplineParams {
            num_breakpoints: 8,
            smoothing: 0.01,
            ..Default::default()
        };
        let m = BSplineModel::fit(&samples, &params).unwrap();
        let inv = m.invert().unwrap();
        for x in [2.0, 25.0, 50.0, 75.0, 98.0] {
            let back = inv.evaluate(m.evaluate(x).unwrap()).unwrap();
            assert!((back - x).abs() < 0.5, "{} -> {}", x, back);
        }
    }

    #[test]
    fn non_monotonic_curve_is_not_invertible() {
        let samples: Vec<CoordinatePair> = (0..=40)
            .map(|i| {
                let x = i as f64;
                CoordinatePair::new(x, (x - 20.0) * (x - 20.0))
            })
            .collect();
        let m = BSplineModel::fit(&samples, &BSplineParams::default()).unwrap();
        assert!(matches!(
            m.invert(),
            Err(TransformationError::NotInvertible {
                model: ModelKind::BSpline,
                ..
            })
        ));
    }

    #[test]
    fn malformed_model_fails_to_deserialize() {
        let m =
            BSplineModel::fit(&line_samples(20, 2.0, 1.0), &BSplineParams::default()).unwrap();
        let mut value = serde_json::to_value(&m).unwrap();
        let back: BSplineModel = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back, m);

        value["coefficients"] = serde_json::json!([1.0, 2.0]);
        assert!(serde_json::from_value::<BSplineModel>(value.clone()).is_err());

        value["coefficients"] = serde_json::to_value(&m.coefficients).unwrap();
        value["knots"] = serde_json::json!([0.0, 1.0]);
        assert!(serde_json::from_value::<BSplineModel>(value).is_err());
    }

    #[test]
    fn quantile_breakpoints_follow_the_data() {
        let mut samples = line_samples(30, 1.0, 0.0);
        samples.extend((0..30).map(|i| CoordinatePair::new(100.0 + i as f64, 100.0 + i as f64)));
        let params = BSplineParams {
            num_breakpoints: 3,
            break_positions: BreakPositions::Quantiles,
            ..Default::default()
        };
        let m = BSplineModel::fit(&samples, &params).unwrap();
        let bps = m.breakpoints();
        assert_eq!(bps.len(), 3);
        assert_eq!(bps[0], 0.0);
        assert_eq!(bps[2], 129.0);
        assert!(bps[1] > 58.0 && bps[1] < 100.0);
    }

    #[test]
    fn constant_and_reject_extrapolation() {
        let samples = line_samples(20, 2.0, 0.0);
        let constant = BSplineModel::fit(
            &samples,
            &BSplineParams {
                extrapolate: Extrapolation::Constant,
                ..Default::default()
            },
        )
        .unwrap();
        let right = constant.evaluate(38.0).unwrap();
        assert_eq!(constant.evaluate(1000.0).unwrap(), right);

        let reject = BSplineModel::fit(
            &samples,
            &BSplineParams {
                extrapolate: Extrapolation::Reject,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(
            reject.evaluate(-1.0),
            Err(TransformationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn too_many_breakpoints_is_invalid() {
        let samples = line_samples(4, 1.0, 0.0);
        let err = BSplineModel::fit(
            &samples,
            &BSplineParams {
                num_breakpoints: 5,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, FitError::InvalidParams { .. }));
    }

    #[test]
    fn needs_one_more_sample_than_breakpoints() {
        let samples = line_samples(5, 1.0, 0.0);
        let err = BSplineModel::fit(&samples, &BSplineParams::default()).unwrap_err();
        assert_eq!(
            err,
            FitError::InsufficientData {
                model: ModelKind::BSpline,
                required: 6,
                available: 5
            }
        );
    }

    #[test]
    fn coinciding_observed_values_are_degenerate() {
        let samples: Vec<CoordinatePair> =
            (0..10).map(|i| CoordinatePair::new(3.0, i as f64)).collect();
        let err = BSplineModel::fit(&samples, &BSplineParams::default()).unwrap_err();
        assert!(matches!(err, FitError::DegenerateInput { .. }));
    }
}
