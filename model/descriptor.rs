//! Normalized component descriptors.
//!
//! A descriptor is the validated contract handed to the fitting engine: an
//! ordered parameter map plus a flag recording whether the initial variance
//! was user-specified or defaulted. Descriptors are only built through
//! `DescriptorBuilder` and are immutable once frozen.

use crate::types::ParamValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully validated, immutable component descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    params: Vec<(String, ParamValue)>,
    var_ini_default: bool,
}

impl ComponentDescriptor {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ParamValue)> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// True when the initial variance was produced by the default-variance
    /// strategy rather than supplied by the user.
    pub fn var_ini_default(&self) -> bool {
        self.var_ini_default
    }
}

impl fmt::Display for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.params {
            match value {
                ParamValue::Matrix(m) => {
                    writeln!(f, "{name}: {}x{} matrix", m.nrows(), m.ncols())?
                }
                ParamValue::Coordinates(c) => writeln!(f, "{name}: {} coordinate rows", c.n_rows())?,
                ParamValue::Scalar(x) => writeln!(f, "{name}: {x}")?,
                ParamValue::Logical(b) => writeln!(f, "{name}: {b}")?,
                ParamValue::Name(s) => writeln!(f, "{name}: {s}")?,
                ParamValue::Ids(ids) => writeln!(f, "{name}: {} id codes", ids.len())?,
                ParamValue::Factor(fac) => {
                    writeln!(f, "{name}: factor with {} levels", fac.n_levels())?
                }
                ParamValue::Pedigree(p) => writeln!(f, "{name}: pedigree of {} records", p.len())?,
                ParamValue::RhoGrid(g) => writeln!(f, "{name}: {} correlation pairs", g.nrows())?,
                ParamValue::Record(fields) => writeln!(f, "{name}: record of {}", fields.len())?,
            }
        }
        writeln!(
            f,
            "var.ini {}",
            if self.var_ini_default {
                "(defaulted)"
            } else {
                "(user-specified)"
            }
        )
    }
}

/// Mutable draft of a descriptor, filled field-by-field during validation.
#[derive(Debug, Default)]
pub struct DescriptorBuilder {
    params: Vec<(String, ParamValue)>,
    var_ini_default: bool,
}

impl DescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        let name = name.into();
        debug_assert!(
            !self.params.iter().any(|(n, _)| *n == name),
            "duplicate descriptor parameter '{name}'"
        );
        self.params.push((name, value));
        self
    }

    pub fn var_ini_default(mut self, defaulted: bool) -> Self {
        self.var_ini_default = defaulted;
        self
    }

    pub fn freeze(self) -> ComponentDescriptor {
        ComponentDescriptor {
            params: self.params,
            var_ini_default: self.var_ini_default,
        }
    }
}
