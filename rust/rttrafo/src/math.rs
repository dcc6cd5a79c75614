//! Small numerical helpers shared by the models.

use nalgebra::{
    DMatrix,
    DVector,
};

/// Ordinary least squares line through `(x, y)`.
///
/// Returns `(slope, intercept)`, or `None` when `x` has no spread.
pub(crate) fn least_squares_line(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    assert_eq!(xs.len(), ys.len(), "x and y must have the same length");
    if xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if sxx <= 0.0 || !sxx.is_finite() {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

/// Least squares solve through SVD.
///
/// Tall and rank deficient systems are fine (minimum norm solution).
/// Returns `None` if no finite solution can be found.
pub(crate) fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_through_two_points_is_exact() {
        let (slope, intercept) = least_squares_line(&[1.0, 2.0], &[2.0, 4.0]).unwrap();
        assert_eq!(slope, 2.0);
        assert_eq!(intercept, 0.0);
    }

    #[test]
    fn line_without_spread_is_none() {
        assert!(least_squares_line(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(least_squares_line(&[3.0], &[1.0]).is_none());
    }

    #[test]
    fn least_squares_solves_simple_system() {
        // y = 2 + 3x on x = [0, 1, 2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }
}
