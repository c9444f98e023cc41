//! Validation-error taxonomy for model-component specifications.
//!
//! Every failure surfaced by this crate is fatal, synchronous, and
//! non-retryable: a validator either returns a fully normalized component
//! descriptor or one of these errors. Messages name the offending argument
//! and the component context so the caller can report them verbatim.

use std::fmt;
use thiserror::Error;

/// A comprehensive error type for all component validation failures.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("The required argument '{name}' was not given for the {context}.")]
    MissingArgument { name: String, context: String },

    #[error(
        "The argument '{name}' for the {context} has the wrong type or shape: expected {expected}, found {found}."
    )]
    TypeMismatch {
        name: String,
        context: String,
        expected: String,
        found: String,
    },

    #[error(
        "Non-conformant dimensions for '{name}' in the {context}: expected {expected_rows}x{expected_cols}, found {found_rows}x{found_cols}."
    )]
    NonConformantDimensions {
        name: String,
        context: String,
        expected_rows: usize,
        expected_cols: usize,
        found_rows: usize,
        found_cols: usize,
    },

    #[error("Invalid initial variance '{name}' for the {context}: {defect}.")]
    InvalidVariance {
        name: String,
        context: String,
        defect: VarianceDefect,
    },

    #[error(
        "The id codes [{missing}] in the {context} do not match any individual in the pedigree."
    )]
    UnresolvedReference { context: String, missing: String },

    #[error("Inconsistent initial variances in the {context}: specify either all or none.")]
    InconsistentDefaulting { context: String },

    #[error("Unrecognized argument '{name}' in the {context}.")]
    UnrecognizedField { name: String, context: String },

    #[error("The argument '{name}' for the {context} is out of range: {detail}.")]
    OutOfRange {
        name: String,
        context: String,
        detail: String,
    },

    #[error(
        "The configured default-variance strategy produced an invalid matrix for the {context}: {source}"
    )]
    BrokenStrategy {
        context: String,
        #[source]
        source: Box<SpecError>,
    },

    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Symmetric eigendecomposition failed: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),
}

/// The specific way a candidate initial-variance matrix failed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum VarianceDefect {
    NotSquare { rows: usize, cols: usize },
    NotSymmetric,
    NotPositiveDefinite { min_eigenvalue: f64 },
}

impl fmt::Display for VarianceDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarianceDefect::NotSquare { rows, cols } => {
                write!(f, "the matrix is not square ({rows}x{cols})")
            }
            VarianceDefect::NotSymmetric => write!(f, "the matrix is not symmetric"),
            VarianceDefect::NotPositiveDefinite { min_eigenvalue } => write!(
                f,
                "the matrix is not positive definite (smallest eigenvalue {min_eigenvalue:.6})"
            ),
        }
    }
}
