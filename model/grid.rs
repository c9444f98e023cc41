//! Autoregressive correlation-grid construction.
//!
//! When the user leaves one or both `rho` axes unspecified, the fitting
//! engine searches over a grid of candidate correlation pairs. This module
//! expands a partially-specified pair into that grid; the realized pairs
//! are range-checked by the spatial validator.

use ndarray::Array2;

/// Candidate correlations tried along an unspecified axis.
pub const RHO_SEARCH: [f64; 4] = [-0.8, -0.2, 0.2, 0.8];

/// Expands a partially-specified `(rho_x, rho_y)` pair into a grid of
/// fully-specified pairs, one per row. A `None` axis ranges over
/// [`RHO_SEARCH`]; a fully-specified pair yields a single row.
pub fn build_rho_grid(rho_x: Option<f64>, rho_y: Option<f64>) -> Array2<f64> {
    let xs: Vec<f64> = match rho_x {
        Some(x) => vec![x],
        None => RHO_SEARCH.to_vec(),
    };
    let ys: Vec<f64> = match rho_y {
        Some(y) => vec![y],
        None => RHO_SEARCH.to_vec(),
    };

    let mut grid = Array2::zeros((xs.len() * ys.len(), 2));
    for (i, &x) in xs.iter().enumerate() {
        for (j, &y) in ys.iter().enumerate() {
            let row = i * ys.len() + j;
            grid[[row, 0]] = x;
            grid[[row, 1]] = y;
        }
    }
    grid
}
