//! Modified Gram-Schmidt helpers and error reduction ratios.
//!
//! For an orthogonal regressor `ω` the error reduction ratio is the fraction of
//! the output energy it explains:
//!
//! ```text
//! ERR = (ωᵀy)² / (ωᵀω · yᵀy)
//! ```

use nalgebra::DVector;

/// Remove the component along `psi` from `w` in place.
///
/// `psi_norm2` is `‖psi‖²`; zero-norm directions are ignored.
pub fn project_out(w: &mut [f64], psi: &[f64], psi_norm2: f64) {
    if psi_norm2 <= 0.0 {
        return;
    }
    let coef = dot(psi, w) / psi_norm2;
    if coef == 0.0 {
        return;
    }
    for (wi, pi) in w.iter_mut().zip(psi.iter()) {
        *wi -= coef * pi;
    }
}

/// Error reduction ratio of an already orthogonalized regressor.
pub fn err(omega: &[f64], y: &[f64], y_energy: f64) -> f64 {
    let n2 = dot(omega, omega);
    if n2 <= 0.0 || y_energy <= 0.0 {
        return 0.0;
    }
    let g = dot(omega, y);
    g * g / (n2 * y_energy)
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Incrementally built orthogonal basis.
#[derive(Debug, Clone, Default)]
pub struct OrthoBasis {
    columns: Vec<DVector<f64>>,
    norms2: Vec<f64>,
}

impl OrthoBasis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Orthogonalize `v` against the basis (twice, for numerical stability).
    pub fn orthogonalize(&self, v: &DVector<f64>) -> DVector<f64> {
        let mut w = v.clone();
        for _ in 0..2 {
            for (psi, &n2) in self.columns.iter().zip(self.norms2.iter()) {
                project_out(w.as_mut_slice(), psi.as_slice(), n2);
            }
        }
        w
    }

    /// Append an already orthogonalized column; returns its squared norm.
    pub fn push(&mut self, omega: DVector<f64>) -> f64 {
        let n2 = omega.norm_squared();
        self.columns.push(omega);
        self.norms2.push(n2);
        n2
    }
}
