use serde::{
    Deserialize,
    Serialize,
};

use super::{
    Boundary,
    CoordinatePair,
    Extrapolation,
    ModelKind,
    ensure_finite,
    sorted_by_observed,
};
use crate::errors::{
    FitError,
    TransformationError,
};
use crate::math::least_squares_line;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum InterpolationType {
    /// Straight segments between neighbouring samples.
    #[default]
    Linear,
    /// Natural cubic spline through every sample.
    Cspline,
}

impl InterpolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Cspline => "cspline",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Self::Linear),
            "cspline" => Some(Self::Cspline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolatedParams {
    pub interpolation_type: InterpolationType,
    pub extrapolation_type: Extrapolation,
}

/// Passes exactly through the (deduplicated) training samples.
///
/// Samples sharing an observed value are merged into one node holding the
/// mean of their reference values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InterpolatedModelFields")]
pub struct InterpolatedModel {
    pub params: InterpolatedParams,
    /// Training pairs, sorted by observed value. Needed for inversion.
    samples: Vec<CoordinatePair>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Spline second derivatives at each node, all zero for linear interpolation.
    second_derivatives: Vec<f64>,
    boundary: Boundary,
}

impl InterpolatedModel {
    pub fn fit(
        samples: &[CoordinatePair],
        params: &InterpolatedParams,
    ) -> Result<Self, FitError> {
        if samples.len() < 2 {
            return Err(FitError::InsufficientData {
                model: ModelKind::Interpolated,
                required: 2,
                available: samples.len(),
            });
        }
        ensure_finite(samples, ModelKind::Interpolated)?;

        let sorted = sorted_by_observed(samples);
        let (xs, ys) = merge_duplicates(&sorted);
        if xs.len() < 2 {
            return Err(FitError::DegenerateInput {
                model: ModelKind::Interpolated,
                context: "fewer than two distinct observed retention times".to_string(),
            });
        }

        let second_derivatives = match params.interpolation_type {
            InterpolationType::Linear => vec![0.0; xs.len()],
            InterpolationType::Cspline => natural_spline_second_derivatives(&xs, &ys),
        };

        let n = xs.len();
        let h_left = xs[1] - xs[0];
        let h_right = xs[n - 1] - xs[n - 2];
        let m = &second_derivatives;
        let left_slope =
            (ys[1] - ys[0]) / h_left - h_left * (2.0 * m[0] + m[1]) / 6.0;
        let right_slope =
            (ys[n - 1] - ys[n - 2]) / h_right + h_right * (m[n - 2] + 2.0 * m[n - 1]) / 6.0;

        let (global_slope, global_intercept) =
            least_squares_line(&xs, &ys).ok_or_else(|| FitError::DegenerateInput {
                model: ModelKind::Interpolated,
                context: "observed retention times have no spread".to_string(),
            })?;

        let boundary = Boundary {
            min_x: xs[0],
            max_x: xs[n - 1],
            left_value: ys[0],
            left_slope,
            right_value: ys[n - 1],
            right_slope,
            global_slope,
            global_intercept,
        };

        Ok(Self {
            params: params.clone(),
            samples: sorted,
            xs,
            ys,
            second_derivatives,
            boundary,
        })
    }

    pub fn evaluate(&self, x: f64) -> Result<f64, TransformationError> {
        if let Some(y) = self.boundary.extrapolate(self.params.extrapolation_type, x)? {
            return Ok(y);
        }
        let n = self.xs.len();
        let i = self
            .xs
            .partition_point(|&v| v <= x)
            .saturating_sub(1)
            .min(n - 2);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let h = x1 - x0;
        let a = (x1 - x) / h;
        let b = (x - x0) / h;
        let linear = a * y0 + b * y1;
        let out = match self.params.interpolation_type {
            InterpolationType::Linear => linear,
            InterpolationType::Cspline => {
                let (m0, m1) = (self.second_derivatives[i], self.second_derivatives[i + 1]);
                linear + ((a * a * a - a) * m0 + (b * b * b - b) * m1) * h * h / 6.0
            }
        };
        Ok(out)
    }

    /// Interpolates the swapped training pairs.
    ///
    /// Only a strictly monotonic node table has a functional inverse; anything
    /// else is rejected with `NotInvertible`. The inverse is fitted on the raw
    /// pairs rather than the merged nodes, so refitting the swapped pairs of a
    /// stored description reproduces it.
    pub fn invert(&self) -> Result<Self, TransformationError> {
        let increasing = self.ys.windows(2).all(|w| w[0] < w[1]);
        let decreasing = self.ys.windows(2).all(|w| w[0] > w[1]);
        if !increasing && !decreasing {
            return Err(TransformationError::NotInvertible {
                model: ModelKind::Interpolated,
                reason: "reference values are not strictly monotonic".to_string(),
            });
        }
        let swapped: Vec<CoordinatePair> = self.samples.iter().map(|p| p.swapped()).collect();
        Ok(Self::fit(&swapped, &self.params)?)
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Interpolation nodes after merging duplicates.
    pub fn nodes(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }
}

/// Serialized form of [`InterpolatedModel`], checked before use.
#[derive(Deserialize)]
struct InterpolatedModelFields {
    params: InterpolatedParams,
    samples: Vec<CoordinatePair>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    second_derivatives: Vec<f64>,
    boundary: Boundary,
}

impl TryFrom<InterpolatedModelFields> for InterpolatedModel {
    type Error = String;

    fn try_from(f: InterpolatedModelFields) -> Result<Self, Self::Error> {
        let n = f.xs.len();
        if n < 2 {
            return Err(format!("interpolated model needs at least 2 nodes, got {}", n));
        }
        if f.ys.len() != n || f.second_derivatives.len() != n {
            return Err(format!(
                "interpolated model has {} xs, {} ys and {} second derivatives",
                n,
                f.ys.len(),
                f.second_derivatives.len()
            ));
        }
        if !f.xs.windows(2).all(|w| w[0] < w[1]) {
            return Err("interpolated model nodes are not strictly increasing".to_string());
        }
        let all_finite = f
            .xs
            .iter()
            .chain(f.ys.iter())
            .chain(f.second_derivatives.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("interpolated model has non-finite nodes".to_string());
        }
        Ok(Self {
            params: f.params,
            samples: f.samples,
            xs: f.xs,
            ys: f.ys,
            second_derivatives: f.second_derivatives,
            boundary: f.boundary,
        })
    }
}

fn merge_duplicates(sorted: &[CoordinatePair]) -> (Vec<f64>, Vec<f64>) {
    let mut xs: Vec<f64> = Vec::with_capacity(sorted.len());
    let mut ys: Vec<f64> = Vec::with_capacity(sorted.len());
    let mut counts: Vec<usize> = Vec::with_capacity(sorted.len());
    for p in sorted {
        match xs.last() {
            Some(&last) if last == p.observed => {
                let i = ys.len() - 1;
                ys[i] += p.reference;
                counts[i] += 1;
            }
            _ => {
                xs.push(p.observed);
                ys.push(p.reference);
                counts.push(1);
            }
        }
    }
    for (y, c) in ys.iter_mut().zip(counts) {
        *y /= c as f64;
    }
    (xs, ys)
}

/// Second derivatives of the natural cubic spline through `(xs, ys)`.
///
/// Tridiagonal system solved with the Thomas algorithm; both ends are zero.
fn natural_spline_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    let inner = n - 2;
    let mut diag = vec![0.0; inner];
    let mut upper = vec![0.0; inner];
    let mut rhs = vec![0.0; inner];
    for k in 0..inner {
        let i = k + 1;
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        diag[k] = 2.0 * (h0 + h1);
        upper[k] = h1;
        rhs[k] = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
    }
    // Forward sweep; the sub-diagonal entry of row k is h_{k} = upper[k - 1].
    for k in 1..inner {
        let w = upper[k - 1] / diag[k - 1];
        diag[k] -= w * upper[k - 1];
        rhs[k] -= w * rhs[k - 1];
    }
    m[inner] = rhs[inner - 1] / diag[inner - 1];
    for k in (0..inner - 1).rev() {
        m[k + 1] = (rhs[k] - upper[k] * m[k + 2]) / diag[k];
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(v: &[(f64, f64)]) -> Vec<CoordinatePair> {
        v.iter().copied().map(CoordinatePair::from).collect()
    }

    fn cspline() -> InterpolatedParams {
        InterpolatedParams {
            interpolation_type: InterpolationType::Cspline,
            ..Default::default()
        }
    }

    #[test]
    fn linear_interpolation_between_nodes() {
        let m = InterpolatedModel::fit(
            &pairs(&[(10.0, 20.0), (0.0, 0.0), (20.0, 25.0)]),
            &InterpolatedParams::default(),
        )
        .unwrap();
        assert_eq!(m.evaluate(0.0).unwrap(), 0.0);
        assert_eq!(m.evaluate(5.0).unwrap(), 10.0);
        assert_eq!(m.evaluate(10.0).unwrap(), 20.0);
        assert_eq!(m.evaluate(15.0).unwrap(), 22.5);
        assert_eq!(m.evaluate(20.0).unwrap(), 25.0);
        // Continues along the last segment.
        assert_eq!(m.evaluate(30.0).unwrap(), 30.0);
        assert_eq!(m.evaluate(-5.0).unwrap(), -10.0);
    }

    #[test]
    fn duplicate_observed_values_are_averaged() {
        let m = InterpolatedModel::fit(
            &pairs(&[(1.0, 2.0), (2.0, 5.0), (1.0, 4.0)]),
            &InterpolatedParams::default(),
        )
        .unwrap();
        let nodes: Vec<(f64, f64)> = m.nodes().collect();
        assert_eq!(nodes, vec![(1.0, 3.0), (2.0, 5.0)]);
        assert_eq!(m.evaluate(1.0).unwrap(), 3.0);
    }

    #[test]
    fn cspline_passes_through_nodes() {
        let samples: Vec<CoordinatePair> = (0..12)
            .map(|i| {
                let x = i as f64 * 1.5;
                CoordinatePair::new(x, (x / 3.0).sin() * 10.0 + x)
            })
            .collect();
        let m = InterpolatedModel::fit(&samples, &cspline()).unwrap();
        for p in &samples {
            let y = m.evaluate(p.observed).unwrap();
            assert!((y - p.reference).abs() < 1e-9, "{} vs {}", y, p.reference);
        }
    }

    #[test]
    fn cspline_reproduces_linear_data() {
        let samples: Vec<CoordinatePair> = (0..6)
            .map(|i| CoordinatePair::new(i as f64 * 3.0, 0.5 * i as f64 * 3.0 + 7.0))
            .collect();
        let m = InterpolatedModel::fit(&samples, &cspline()).unwrap();
        for x in [0.0, 1.3, 7.5, 14.9, 20.0] {
            let expected = 0.5 * x + 7.0;
            assert!((m.evaluate(x).unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn natural_spline_has_zero_end_curvature() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 1.0, 0.0, 1.0];
        let m = natural_spline_second_derivatives(&xs, &ys);
        assert_eq!(m[0], 0.0);
        assert_eq!(m[3], 0.0);
        // 4 M1 + M2 = -12, M1 + 4 M2 = 12
        assert!((m[1] + 4.0).abs() < 1e-12);
        assert!((m[2] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_of_monotonic_table_undoes_the_mapping() {
        let m = InterpolatedModel::fit(
            &pairs(&[(0.0, 5.0), (10.0, 12.0), (20.0, 30.0), (30.0, 31.0)]),
            &InterpolatedParams::default(),
        )
        .unwrap();
        let inv = m.invert().unwrap();
        for x in [0.0, 3.3, 10.0, 19.0, 27.5, 30.0] {
            let back = inv.evaluate(m.evaluate(x).unwrap()).unwrap();
            assert!((back - x).abs() < 1e-9, "{} -> {}", x, back);
        }
    }

    #[test]
    fn inverse_is_fitted_on_the_swapped_samples() {
        let samples = pairs(&[(1.0, 2.0), (1.0, 4.0), (2.0, 5.0), (3.0, 9.0)]);
        let m = InterpolatedModel::fit(&samples, &InterpolatedParams::default()).unwrap();
        let inv = m.invert().unwrap();
        let swapped: Vec<CoordinatePair> = samples.iter().map(|p| p.swapped()).collect();
        let refit = InterpolatedModel::fit(&swapped, &InterpolatedParams::default()).unwrap();
        assert_eq!(inv, refit);
        assert_eq!(inv.evaluate(4.0).unwrap(), 1.0);
    }

    #[test]
    fn malformed_model_fails_to_deserialize() {
        let m = InterpolatedModel::fit(
            &pairs(&[(0.0, 0.0), (1.0, 1.0), (2.0, 4.0)]),
            &InterpolatedParams::default(),
        )
        .unwrap();
        let mut value = serde_json::to_value(&m).unwrap();
        let back: InterpolatedModel = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back, m);

        value["xs"] = serde_json::json!([1.0]);
        value["ys"] = serde_json::json!([1.0]);
        value["second_derivatives"] = serde_json::json!([0.0]);
        assert!(serde_json::from_value::<InterpolatedModel>(value.clone()).is_err());

        value["xs"] = serde_json::json!([1.0, 1.0, 2.0]);
        value["ys"] = serde_json::json!([1.0, 2.0, 3.0]);
        value["second_derivatives"] = serde_json::json!([0.0, 0.0]);
        assert!(serde_json::from_value::<InterpolatedModel>(value).is_err());
    }

    #[test]
    fn non_monotonic_table_is_not_invertible() {
        let m = InterpolatedModel::fit(
            &pairs(&[(0.0, 0.0), (1.0, 2.0), (2.0, 1.0)]),
            &InterpolatedParams::default(),
        )
        .unwrap();
        assert!(matches!(
            m.invert(),
            Err(TransformationError::NotInvertible {
                model: ModelKind::Interpolated,
                ..
            })
        ));
    }

    #[test]
    fn needs_two_distinct_samples() {
        let err = InterpolatedModel::fit(&pairs(&[(1.0, 1.0)]), &InterpolatedParams::default())
            .unwrap_err();
        assert_eq!(
            err,
            FitError::InsufficientData {
                model: ModelKind::Interpolated,
                required: 2,
                available: 1
            }
        );

        let err = InterpolatedModel::fit(
            &pairs(&[(1.0, 1.0), (1.0, 2.0)]),
            &InterpolatedParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FitError::DegenerateInput { .. }));
    }

    #[test]
    fn reject_outside_range() {
        let m = InterpolatedModel::fit(
            &pairs(&[(0.0, 0.0), (1.0, 1.0)]),
            &InterpolatedParams {
                extrapolation_type: Extrapolation::Reject,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(m.evaluate(0.5).unwrap(), 0.5);
        assert_eq!(
            m.evaluate(2.0).unwrap_err(),
            TransformationError::OutOfRange {
                x: 2.0,
                min: 0.0,
                max: 1.0
            }
        );
    }
}
