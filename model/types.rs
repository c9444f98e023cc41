//! Value model shared by all component validators.
//!
//! `SpecValue` is the raw, loosely-typed side: anything a user may hand in
//! for a component argument before validation. Wrapping every user-facing
//! field in `Option<SpecValue>` keeps "argument not supplied" distinct from
//! "argument supplied with the wrong type". `ParamValue` is the validated
//! side: the only values a normalized descriptor may carry.

use crate::pedigree::Pedigree;
use ndarray::Array2;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// A raw user-supplied value for a single component argument.
#[derive(Debug, Clone)]
pub enum SpecValue {
    Matrix(Array2<f64>),
    Numeric(Vec<f64>),
    Scalar(f64),
    Logical(bool),
    Name(String),
    Frame(DataFrame),
    Factor(Factor),
    Pedigree(Pedigree),
    Record(Vec<(String, SpecValue)>),
}

impl SpecValue {
    /// Human-readable kind, used in `TypeMismatch` diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SpecValue::Matrix(_) => "matrix",
            SpecValue::Numeric(_) => "numeric vector",
            SpecValue::Scalar(_) => "scalar",
            SpecValue::Logical(_) => "logical",
            SpecValue::Name(_) => "name",
            SpecValue::Frame(_) => "data frame",
            SpecValue::Factor(_) => "factor",
            SpecValue::Pedigree(_) => "pedigree",
            SpecValue::Record(_) => "named record",
        }
    }

    pub fn as_matrix(&self) -> Option<&Array2<f64>> {
        match self {
            SpecValue::Matrix(m) => Some(m),
            _ => None,
        }
    }
}

/// A validated value carried by a normalized component descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Matrix(Array2<f64>),
    Coordinates(CoordinateTable),
    Scalar(f64),
    Logical(bool),
    Name(String),
    Ids(Vec<i64>),
    Factor(Factor),
    Pedigree(Pedigree),
    RhoGrid(Array2<f64>),
    Record(Vec<(String, ParamValue)>),
}

impl ParamValue {
    pub fn as_matrix(&self) -> Option<&Array2<f64>> {
        match self {
            ParamValue::Matrix(m) => Some(m),
            _ => None,
        }
    }
}

/// A canonical two-column numeric coordinate table, row-aligned with the
/// observations.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTable(pub Array2<f64>);

impl CoordinateTable {
    /// The inner array must have exactly two columns; `normalize_coordinates`
    /// is the only production constructor.
    pub fn new(values: Array2<f64>) -> Self {
        debug_assert_eq!(values.ncols(), 2);
        Self(values)
    }

    pub fn n_rows(&self) -> usize {
        self.0.nrows()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.0
    }
}

impl Deref for CoordinateTable {
    type Target = Array2<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A categorical variable: integer codes plus an ordered level list.
///
/// Levels may include categories never observed in `codes`; a factor built
/// by the user keeps those declared levels through validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    codes: Vec<i64>,
    levels: Vec<i64>,
}

impl Factor {
    /// Builds a factor from explicit codes and levels. Every code must be a
    /// declared level; unobserved levels are allowed.
    pub fn new(codes: Vec<i64>, levels: Vec<i64>) -> Option<Self> {
        if codes.iter().all(|c| levels.contains(c)) {
            Some(Self { codes, levels })
        } else {
            None
        }
    }

    /// Builds a factor whose levels are the sorted distinct observed codes.
    pub fn from_codes(codes: Vec<i64>) -> Self {
        let mut levels = codes.clone();
        levels.sort_unstable();
        levels.dedup();
        Self { codes, levels }
    }

    pub fn codes(&self) -> &[i64] {
        &self.codes
    }

    pub fn levels(&self) -> &[i64] {
        &self.levels
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }
}
