//! Ordinary least squares solver.
//!
//! Once the search has fixed a term subset we solve
//!
//! ```text
//! minimize Σ (y_k - φ_kᵀ θ)²
//! ```
//!
//! over the full (cut) data history.
//!
//! Implementation choices:
//! - We use SVD so tall design matrices are handled directly.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - The numerical rank is estimated with the usual `eps · max(n, p) · σ_max`
//!   cutoff. A rank below the column count is an error, never a minimum-norm
//!   solution.

use nalgebra::{DMatrix, DVector};

use crate::error::{ArboError, Result};

/// Numerical rank of `x` under the `eps · max(n, p) · σ_max` cutoff.
pub fn numerical_rank(x: &DMatrix<f64>) -> usize {
    let (n, p) = x.shape();
    if n == 0 || p == 0 {
        return 0;
    }
    let sv = x.clone().singular_values();
    let max_sv = sv.max();
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return 0;
    }
    let tol = f64::EPSILON * (n.max(p) as f64) * max_sv;
    sv.iter().filter(|&&s| s > tol).count()
}

/// Solve a least squares problem using SVD.
///
/// Fails with a numerical error on rank-deficient or non-finite systems.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>> {
    let (n, p) = x.shape();
    if y.len() != n {
        return Err(ArboError::config(format!(
            "Design matrix has {n} rows but target has {} samples.",
            y.len()
        )));
    }
    if p == 0 {
        return Err(ArboError::config("Design matrix has no columns."));
    }
    if n < p {
        return Err(ArboError::numerical(format!(
            "Underdetermined system: {n} samples for {p} coefficients."
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(ArboError::numerical("Non-finite value in least squares inputs."));
    }

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return Err(ArboError::numerical("Design matrix is identically zero."));
    }

    let tol = f64::EPSILON * (n.max(p) as f64) * max_sv;
    let rank = svd.singular_values.iter().filter(|&&s| s > tol).count();
    if rank < p {
        return Err(ArboError::numerical(format!(
            "Rank-deficient design matrix: rank {rank} < {p} columns."
        )));
    }

    let theta = svd.solve(y, tol).map_err(|e| ArboError::numerical(e))?;
    if theta.iter().any(|v| !v.is_finite()) {
        return Err(ArboError::numerical("Least squares produced non-finite coefficients."));
    }
    Ok(theta)
}

/// Residual sum of squares `‖y - Xθ‖²`.
pub fn sum_squared_residuals(x: &DMatrix<f64>, y: &DVector<f64>, theta: &DVector<f64>) -> f64 {
    (y - x * theta).norm_squared()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
        assert!(sum_squared_residuals(&x, &y, &beta) < 1e-20);
    }

    #[test]
    fn rank_deficient_matrix_is_a_numerical_error() {
        // Second column is exactly twice the first.
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0, 4.0, 8.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);

        let err = solve_least_squares(&x, &y).unwrap_err();
        assert!(err.is_numerical(), "{err}");
        assert_eq!(numerical_rank(&x), 1);
    }

    #[test]
    fn underdetermined_system_is_rejected() {
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0]);
        assert!(solve_least_squares(&x, &y).unwrap_err().is_numerical());
    }
}
