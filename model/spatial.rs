//! Spatial-effect components.
//!
//! Covers tensor-product splines, separable autoregressive (AR) surfaces,
//! and block effects. Every spatial component carries normalized
//! coordinates; the AR variant additionally carries the realized grid of
//! correlation pairs and the blocks variant a factor over block ids.

use crate::coordinates::normalize_coordinates;
use crate::data;
use crate::descriptor::{ComponentDescriptor, DescriptorBuilder};
use crate::error::SpecError;
use crate::grid::build_rho_grid;
use crate::types::{Factor, ParamValue, SpecValue};
use crate::variance::{VarianceStrategy, resolve_var_ini};
use ndarray::{Array2, ArrayView2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

const CONTEXT: &str = "spatial component";

/// Variant selector for a spatial component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialModel {
    Splines,
    Ar,
    Blocks,
}

impl SpatialModel {
    pub fn as_str(self) -> &'static str {
        match self {
            SpatialModel::Splines => "splines",
            SpatialModel::Ar => "AR",
            SpatialModel::Blocks => "blocks",
        }
    }
}

/// Raw user specification of a spatial component.
#[derive(Debug, Clone, Default)]
pub struct SpatialSpec {
    pub model: Option<SpatialModel>,
    pub coordinates: Option<SpecValue>,
    pub id: Option<SpecValue>,
    pub n_knots: Option<SpecValue>,
    pub rho: Option<SpecValue>,
    pub var_ini: Option<SpecValue>,
}

/// Validates a spatial component against the response and the dataset.
pub fn validate_spatial(
    spec: &SpatialSpec,
    response: ArrayView2<f64>,
    data: &DataFrame,
    strategy: &dyn VarianceStrategy,
) -> Result<ComponentDescriptor, SpecError> {
    let model = spec.model.ok_or_else(|| SpecError::MissingArgument {
        name: "model".to_string(),
        context: CONTEXT.to_string(),
    })?;

    let coordinates_value =
        spec.coordinates
            .as_ref()
            .ok_or_else(|| SpecError::MissingArgument {
                name: "coordinates".to_string(),
                context: CONTEXT.to_string(),
            })?;
    let coordinates = normalize_coordinates(coordinates_value, CONTEXT)?;

    let mut builder = DescriptorBuilder::new()
        .push("model", ParamValue::Name(model.as_str().to_string()))
        .push("coordinates", ParamValue::Coordinates(coordinates));

    match model {
        SpatialModel::Splines => {
            if let Some(value) = &spec.n_knots {
                builder = builder.push("n.knots", ParamValue::Ids(knot_counts(value)?));
            }
        }
        SpatialModel::Ar => {
            builder = builder.push("rho", ParamValue::RhoGrid(rho_grid(spec.rho.as_ref())?));
        }
        SpatialModel::Blocks => {
            let id_value = spec.id.as_ref().ok_or_else(|| SpecError::MissingArgument {
                name: "id".to_string(),
                context: CONTEXT.to_string(),
            })?;
            builder = builder.push("id", ParamValue::Factor(block_factor(id_value, data)?));
        }
    }

    let (var_ini, defaulted) =
        resolve_var_ini(spec.var_ini.as_ref(), response, 1, strategy, CONTEXT)?;

    Ok(builder
        .push("var.ini", ParamValue::Matrix(var_ini))
        .var_ini_default(defaulted)
        .freeze())
}

/// `n.knots` must be a length-2 vector of whole positive numbers.
fn knot_counts(value: &SpecValue) -> Result<Vec<i64>, SpecError> {
    let mismatch = |found: String| SpecError::TypeMismatch {
        name: "n.knots".to_string(),
        context: CONTEXT.to_string(),
        expected: "a length-2 integer vector".to_string(),
        found,
    };
    match value {
        SpecValue::Numeric(v) if v.len() == 2 => v
            .iter()
            .map(|&x| {
                if x.is_finite() && x.fract() == 0.0 && x > 0.0 {
                    Ok(x as i64)
                } else {
                    Err(mismatch(format!("non-integer entry {x}")))
                }
            })
            .collect(),
        SpecValue::Numeric(v) => Err(mismatch(format!("numeric vector of length {}", v.len()))),
        other => Err(mismatch(other.kind().to_string())),
    }
}

/// Realizes the grid of AR correlation pairs: an omitted or partially
/// missing pair expands over the search values, then every realized pair
/// is range-checked.
fn rho_grid(value: Option<&SpecValue>) -> Result<Array2<f64>, SpecError> {
    let grid = match value {
        None => build_rho_grid(None, None),
        Some(SpecValue::Numeric(v)) if v.len() == 2 => {
            let axis = |x: f64| if x.is_nan() { None } else { Some(x) };
            build_rho_grid(axis(v[0]), axis(v[1]))
        }
        Some(SpecValue::Numeric(v)) => {
            return Err(SpecError::TypeMismatch {
                name: "rho".to_string(),
                context: CONTEXT.to_string(),
                expected: "a pair of AR correlation parameters".to_string(),
                found: format!("numeric vector of length {}", v.len()),
            });
        }
        Some(SpecValue::Matrix(m)) => {
            if m.ncols() != 2 {
                return Err(SpecError::TypeMismatch {
                    name: "rho".to_string(),
                    context: CONTEXT.to_string(),
                    expected: "a two-column grid of AR correlation pairs".to_string(),
                    found: format!("{} columns", m.ncols()),
                });
            }
            m.clone()
        }
        Some(other) => {
            return Err(SpecError::TypeMismatch {
                name: "rho".to_string(),
                context: CONTEXT.to_string(),
                expected: "a pair or grid of AR correlation parameters".to_string(),
                found: other.kind().to_string(),
            });
        }
    };

    for row in grid.rows() {
        for &rho in row.iter() {
            // The boundary is not admitted.
            if !(rho.is_finite() && rho > -1.0 && rho < 1.0) {
                return Err(SpecError::OutOfRange {
                    name: "rho".to_string(),
                    context: CONTEXT.to_string(),
                    detail: format!(
                        "AR correlations must lie strictly between -1 and 1, found {rho}"
                    ),
                });
            }
        }
    }
    Ok(grid)
}

/// Resolves the block `id` to a factor, keeping declared unobserved levels
/// when the user already supplies a factor.
fn block_factor(value: &SpecValue, data: &DataFrame) -> Result<Factor, SpecError> {
    match value {
        SpecValue::Factor(f) => Ok(f.clone()),
        other => Ok(Factor::from_codes(data::id_codes(
            other, data, "id", CONTEXT,
        )?)),
    }
}
