//! Structure-identification helpers that run before (or after) a full search.
//!
//! - ERR of a fixed, ordered term list (`compute_err`)
//! - expansion order and maximum lag estimation on centered data
//! - conversion of linear models to IIR filter coefficients

pub mod estimators;
pub mod iir;

pub use estimators::*;
pub use iir::*;

use nalgebra::{DMatrix, DVector};

use crate::error::{ArboError, Result};
use crate::math::ortho::err;
use crate::math::OrthoBasis;

/// Relative squared norm below which an orthogonalized column counts as collinear.
const COLLINEAR_TOL: f64 = 1e-10;

/// Error reduction ratio of each column of `columns`, imposed in order.
///
/// Once the running sum reaches 1 the remaining entries are left at 0, as are
/// columns collinear with the ones before them.
pub fn compute_err(y: &DVector<f64>, columns: &DMatrix<f64>) -> Result<Vec<f64>> {
    if columns.nrows() != y.len() {
        return Err(ArboError::config(format!(
            "Target has {} samples but the term matrix has {} rows.",
            y.len(),
            columns.nrows()
        )));
    }
    let y_energy = y.norm_squared();
    if !(y_energy.is_finite() && y_energy > 0.0) {
        return Err(ArboError::numerical("Target output is identically zero or non-finite."));
    }

    let mut out = vec![0.0; columns.ncols()];
    let mut basis = OrthoBasis::new();
    let mut total = 0.0;
    for (j, slot) in out.iter_mut().enumerate() {
        if total >= 1.0 {
            break;
        }
        let column = columns.column(j).into_owned();
        let omega = basis.orthogonalize(&column);
        if omega.norm_squared() <= COLLINEAR_TOL * column.norm_squared() {
            continue;
        }
        *slot = err(omega.as_slice(), y.as_slice(), y_energy);
        total += *slot;
        basis.push(omega);
    }
    Ok(out)
}

/// Subtract each column's mean in place.
pub(crate) fn center_columns(m: &mut DMatrix<f64>) {
    for mut col in m.column_iter_mut() {
        let mean = col.mean();
        col.add_scalar_mut(-mean);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn err_of_orthogonal_columns_sums_to_one() {
        let y = DVector::from_vec(vec![3.0, 4.0, 0.0]);
        let cols = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let e = compute_err(&y, &cols).unwrap();
        assert!((e[0] - 9.0 / 25.0).abs() < 1e-12);
        assert!((e[1] - 16.0 / 25.0).abs() < 1e-12);
    }

    #[test]
    fn err_stops_once_fully_explained() {
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let cols = DMatrix::from_row_slice(3, 2, &[1.0, 5.0, 2.0, -1.0, 3.0, 0.5]);
        let e = compute_err(&y, &cols).unwrap();
        assert!((e[0] - 1.0).abs() < 1e-12);
        assert_eq!(e[1], 0.0);
    }

    #[test]
    fn err_rejects_zero_target() {
        let y = DVector::zeros(3);
        let cols = DMatrix::from_element(3, 1, 1.0);
        assert!(compute_err(&y, &cols).unwrap_err().is_numerical());
    }
}
