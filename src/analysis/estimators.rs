//! Expansion order and maximum lag estimation.
//!
//! Both estimators work on centered data without a constant term: a purely
//! linear (or polynomial) dictionary is built, every term is imposed, and the
//! summed ERR is read as the explained fraction of the output variance.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::{center_columns, compute_err};
use crate::dictionary::build_dictionary;
use crate::domain::{Dataset, DictionaryConfig};
use crate::error::{ArboError, Result};

/// Result of [`estimate_expansion_order`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEstimate {
    /// Smallest order reaching the threshold, or the largest order tried.
    pub order: u32,
    pub reached: bool,
    /// Explained variance per order; index 0 is the constant model (0).
    pub explained: Vec<f64>,
}

/// Explained-variance grid of [`estimate_max_lags`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagGrid {
    /// `grid[y_lag][x_lag]`.
    pub grid: Vec<Vec<f64>>,
    pub threshold: f64,
    /// `(input_lags, output_lags)` with the smallest sum above the threshold.
    pub min_xy: Option<(usize, usize)>,
    /// Smallest input lag above the threshold, then smallest output lag.
    pub min_x: Option<(usize, usize)>,
    /// Smallest output lag above the threshold, then smallest input lag.
    pub min_y: Option<(usize, usize)>,
}

fn check_threshold(threshold: f64) -> Result<()> {
    if !(threshold.is_finite() && threshold > 0.0 && threshold <= 1.0) {
        return Err(ArboError::config(format!("Invalid variance threshold {threshold} (must be in (0, 1]).")));
    }
    Ok(())
}

/// Summed ERR of every monomial up to `degree`, on centered data.
pub fn explained_variance(
    dataset: &Dataset,
    output: usize,
    input_lags: usize,
    output_lags: usize,
    degree: u32,
) -> Result<f64> {
    let config = DictionaryConfig {
        input_lags,
        output_lags,
        degree,
        include_constant: false,
        ..DictionaryConfig::default()
    };
    let dictionary = build_dictionary(dataset, &config)?;
    let mut matrix = dictionary.evaluate(dataset)?;
    center_columns(&mut matrix);
    let mut y = dictionary.target(dataset, output)?;
    let mean = y.mean();
    y.add_scalar_mut(-mean);

    let err = compute_err(&y, &matrix)?;
    Ok(err.iter().sum::<f64>().min(1.0))
}

/// Smallest polynomial degree whose full expansion explains `threshold` of the variance.
pub fn estimate_expansion_order(
    dataset: &Dataset,
    output: usize,
    lags: (usize, usize),
    max_order: u32,
    threshold: f64,
) -> Result<OrderEstimate> {
    check_threshold(threshold)?;
    if max_order == 0 {
        return Err(ArboError::config("max_order must be >= 1."));
    }

    let mut explained = vec![0.0];
    let mut order = 0;
    for degree in 1..=max_order {
        let v = explained_variance(dataset, output, lags.0, lags.1, degree)?;
        debug!(degree, explained = v, "expansion order candidate");
        explained.push(v);
        order = degree;
        if v >= threshold {
            break;
        }
    }

    let reached = explained.last().is_some_and(|&v| v >= threshold);
    if reached {
        info!(order, explained = explained[order as usize], "expansion order selected");
    } else {
        warn!(max_order, threshold, "variance threshold not met; increase max_order or the lags");
    }

    Ok(OrderEstimate {
        order,
        reached,
        explained,
    })
}

/// Explained variance over every `(output lag, input lag)` pair up to `max_lags`.
///
/// `max_lags` is `(input_lags, output_lags)`. A cell whose upper and left
/// neighbours are both fully explained is filled with 1 without evaluation.
pub fn estimate_max_lags(
    dataset: &Dataset,
    output: usize,
    degree: u32,
    max_lags: (usize, usize),
    threshold: f64,
) -> Result<LagGrid> {
    check_threshold(threshold)?;
    if degree == 0 {
        return Err(ArboError::config("Expansion degree must be >= 1."));
    }
    let (max_x, max_y) = max_lags;

    let mut grid = vec![vec![0.0; max_x + 1]; max_y + 1];
    for na in 0..=max_y {
        for nb in 0..=max_x {
            let saturated = na > 0 && nb > 0 && grid[na - 1][nb] == 1.0 && grid[na][nb - 1] == 1.0;
            grid[na][nb] = if saturated {
                1.0
            } else {
                explained_variance(dataset, output, nb, na, degree)?
            };
        }
    }

    let mut min_xy: Option<(usize, usize)> = None;
    for (na, row) in grid.iter().enumerate() {
        for (nb, &v) in row.iter().enumerate() {
            if v > threshold && min_xy.is_none_or(|(bx, by)| nb + na < bx + by) {
                min_xy = Some((nb, na));
            }
        }
    }

    let min_y = grid
        .iter()
        .enumerate()
        .find_map(|(na, row)| row.iter().position(|&v| v > threshold).map(|nb| (nb, na)));
    let min_x = (0..=max_x).find_map(|nb| (0..=max_y).find(|&na| grid[na][nb] > threshold).map(|na| (nb, na)));

    if min_xy.is_none() {
        warn!(?max_lags, threshold, "maximum lags do not reach the variance threshold");
    }

    Ok(LagGrid {
        grid,
        threshold,
        min_xy,
        min_x,
        min_y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{simulate_siso, uniform_noise};

    fn quadratic_system() -> Dataset {
        // y[k] = 0.5 x[k-1] + 0.4 x[k-2]^2
        let x = uniform_noise(300, -1.0, 1.0, 11).unwrap();
        simulate_siso(x, 2, |k, x, _| 0.5 * x[k - 1] + 0.4 * x[k - 2] * x[k - 2]).unwrap()
    }

    #[test]
    fn order_estimator_finds_quadratic() {
        let ds = quadratic_system();
        let est = estimate_expansion_order(&ds, 0, (2, 0), 4, 0.999).unwrap();
        assert!(est.reached);
        assert_eq!(est.order, 2);
        assert_eq!(est.explained[0], 0.0);
        assert!(est.explained[1] < 0.999);
        assert_eq!(est.explained.len(), 3);
    }

    #[test]
    fn lag_grid_recommends_two_input_lags() {
        let ds = quadratic_system();
        let lags = estimate_max_lags(&ds, 0, 2, (3, 1), 0.999).unwrap();
        assert_eq!(lags.grid.len(), 2);
        assert_eq!(lags.grid[0].len(), 4);
        assert_eq!(lags.min_xy, Some((2, 0)));
        assert_eq!(lags.min_y, Some((2, 0)));
        assert_eq!(lags.min_x.map(|(x, _)| x), Some(2));
    }

    #[test]
    fn rejects_bad_threshold() {
        let ds = quadratic_system();
        assert!(estimate_expansion_order(&ds, 0, (2, 0), 3, 1.5).unwrap_err().is_configuration());
    }
}
