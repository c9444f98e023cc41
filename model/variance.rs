//! Initial-variance validation and the default-variance strategy.
//!
//! `validate_variance` is the single gate every initial covariance or
//! precision estimate passes through: square, expected dimension,
//! symmetric, strictly positive definite. The SPD test admits no
//! tolerance; an eigenvalue of exactly zero is rejected.
//!
//! When a user omits `var.ini`, the injected [`VarianceStrategy`] produces
//! a default from the observed response. The strategy output is re-checked
//! through the same gate: a strategy producing an invalid matrix is a
//! fatal configuration error, not a silent fallback.

use crate::error::{SpecError, VarianceDefect};
use crate::types::SpecValue;
use ndarray::{Array2, ArrayView2};
use ndarray::linalg::kron;
use ndarray_linalg::{Eigh, UPLO};
use std::fmt;

/// Off-diagonal correlation used when defaulting a multi-dimensional
/// initial covariance.
pub const DEFAULT_CORRELATION: f64 = 0.1;
/// Decimal places kept in defaulted initial variances.
pub const DEFAULT_DIGITS: u32 = 2;

/// Relative tolerance for the symmetry check. Positive definiteness itself
/// is strict.
const SYMMETRY_TOL: f64 = 1e-8;

/// Validates a candidate initial-variance value against the expected
/// `dimension` (a pair of equal row/column counts derived from effect
/// dimension times response width). Pure; `label` and `context` only feed
/// diagnostics.
pub fn validate_variance(
    value: &SpecValue,
    dimension: (usize, usize),
    label: &str,
    context: &str,
) -> Result<Array2<f64>, SpecError> {
    let matrix = value.as_matrix().ok_or_else(|| SpecError::TypeMismatch {
        name: label.to_string(),
        context: context.to_string(),
        expected: "a numeric matrix".to_string(),
        found: value.kind().to_string(),
    })?;
    validate_variance_matrix(matrix, dimension, label, context)?;
    Ok(matrix.clone())
}

/// The matrix-level checks behind [`validate_variance`], also applied to
/// strategy output.
pub fn validate_variance_matrix(
    matrix: &Array2<f64>,
    dimension: (usize, usize),
    label: &str,
    context: &str,
) -> Result<(), SpecError> {
    debug_assert_eq!(dimension.0, dimension.1);
    let (rows, cols) = matrix.dim();

    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(SpecError::TypeMismatch {
            name: label.to_string(),
            context: context.to_string(),
            expected: "a finite numeric matrix".to_string(),
            found: "non-finite entries".to_string(),
        });
    }
    if rows != cols {
        return Err(SpecError::InvalidVariance {
            name: label.to_string(),
            context: context.to_string(),
            defect: VarianceDefect::NotSquare { rows, cols },
        });
    }
    if rows * cols != dimension.0 * dimension.1 {
        return Err(SpecError::NonConformantDimensions {
            name: label.to_string(),
            context: context.to_string(),
            expected_rows: dimension.0,
            expected_cols: dimension.1,
            found_rows: rows,
            found_cols: cols,
        });
    }

    let scale = matrix.iter().fold(1.0f64, |acc, v| acc.max(v.abs()));
    for i in 0..rows {
        for j in (i + 1)..cols {
            if (matrix[[i, j]] - matrix[[j, i]]).abs() > SYMMETRY_TOL * scale {
                return Err(SpecError::InvalidVariance {
                    name: label.to_string(),
                    context: context.to_string(),
                    defect: VarianceDefect::NotSymmetric,
                });
            }
        }
    }

    let (eigenvalues, _) = matrix.eigh(UPLO::Lower)?;
    let min_eigenvalue = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if !(min_eigenvalue > 0.0) {
        return Err(SpecError::InvalidVariance {
            name: label.to_string(),
            context: context.to_string(),
            defect: VarianceDefect::NotPositiveDefinite { min_eigenvalue },
        });
    }
    Ok(())
}

/// Pluggable producer of default initial covariance matrices. Injected
/// into every validator call; this crate never consults a global.
pub trait VarianceStrategy: fmt::Debug {
    /// Produces a `(dim * t) x (dim * t)` matrix from the `n x t` response,
    /// with `correlation` tying the `dim` effect blocks together and each
    /// entry rounded to `digits` decimals.
    fn default_variance(
        &self,
        response: ArrayView2<f64>,
        dim: usize,
        correlation: f64,
        digits: u32,
    ) -> Array2<f64>;
}

/// Default strategy: half the empirical covariance of the response columns,
/// Kronecker-combined with a `dim x dim` equicorrelation matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmpiricalVariance;

impl VarianceStrategy for EmpiricalVariance {
    fn default_variance(
        &self,
        response: ArrayView2<f64>,
        dim: usize,
        correlation: f64,
        digits: u32,
    ) -> Array2<f64> {
        let half = empirical_covariance(response).mapv(|v| v / 2.0);
        let equi = Array2::from_shape_fn(
            (dim, dim),
            |(i, j)| if i == j { 1.0 } else { correlation },
        );
        kron(&equi, &half).mapv(|v| round_to(v, digits))
    }
}

fn empirical_covariance(x: ArrayView2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let t = x.ncols();
    let denom = (n.saturating_sub(1)).max(1) as f64;
    let means: Vec<f64> = (0..t).map(|j| x.column(j).sum() / n.max(1) as f64).collect();
    Array2::from_shape_fn((t, t), |(i, j)| {
        let mut acc = 0.0;
        for r in 0..n {
            acc += (x[[r, i]] - means[i]) * (x[[r, j]] - means[j]);
        }
        acc / denom
    })
}

pub(crate) fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Shared `var.ini` resolution: validate the user value against
/// `[dim * t, dim * t]`, or default it through the strategy and re-check.
/// Returns the matrix and the defaulted flag.
pub(crate) fn resolve_var_ini(
    value: Option<&SpecValue>,
    response: ArrayView2<f64>,
    dim: usize,
    strategy: &dyn VarianceStrategy,
    context: &str,
) -> Result<(Array2<f64>, bool), SpecError> {
    let t = response.ncols();
    let expected = (dim * t, dim * t);
    match value {
        Some(v) => Ok((validate_variance(v, expected, "var.ini", context)?, false)),
        None => {
            let matrix =
                strategy.default_variance(response, dim, DEFAULT_CORRELATION, DEFAULT_DIGITS);
            validate_variance_matrix(&matrix, expected, "var.ini", context).map_err(|source| {
                SpecError::BrokenStrategy {
                    context: context.to_string(),
                    source: Box::new(source),
                }
            })?;
            log::warn!(
                "No initial variance given for the {context}; defaulting to a {}x{} matrix",
                expected.0,
                expected.1
            );
            Ok((matrix, true))
        }
    }
}
