//! Genetic-effect components.
//!
//! Covers the additive animal model (effect dimension 1) and the
//! competition model (effect dimension 2, with coordinates, a decay
//! parameter, and an optional permanent environmental effect). The
//! pedigree is coerced and recoded into the internal dense code space, and
//! every individual referenced by `id` must resolve to a pedigree label.

use crate::coordinates::normalize_coordinates;
use crate::data;
use crate::descriptor::{ComponentDescriptor, DescriptorBuilder};
use crate::error::SpecError;
use crate::pedigree::Pedigree;
use crate::types::{ParamValue, SpecValue};
use crate::variance::{VarianceStrategy, resolve_var_ini, validate_variance};
use ahash::AHashSet;
use itertools::Itertools;
use ndarray::{Array2, ArrayView2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

const CONTEXT: &str = "genetic component";
const PEC_CONTEXT: &str = "permanent environmental effect of the competition genetic component";

/// Variant selector for a genetic component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneticModel {
    /// Additive animal model: one breeding value per individual.
    AddAnimal,
    /// Competition model: direct and competition effects per individual.
    Competition,
}

impl GeneticModel {
    /// Number of correlated effects per individual.
    pub fn effect_dim(self) -> usize {
        match self {
            GeneticModel::AddAnimal => 1,
            GeneticModel::Competition => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GeneticModel::AddAnimal => "add_animal",
            GeneticModel::Competition => "competition",
        }
    }
}

/// Raw user specification of a genetic component.
#[derive(Debug, Clone, Default)]
pub struct GeneticSpec {
    pub model: Option<GeneticModel>,
    pub pedigree: Option<SpecValue>,
    pub id: Option<SpecValue>,
    pub var_ini: Option<SpecValue>,
    pub coordinates: Option<SpecValue>,
    pub pec: Option<SpecValue>,
    pub competition_decay: Option<SpecValue>,
}

/// Validates a genetic component against the response and the dataset.
/// `data` and `response` are consulted for lookups only and never appear
/// in the returned descriptor.
pub fn validate_genetic(
    spec: &GeneticSpec,
    response: ArrayView2<f64>,
    data: &DataFrame,
    strategy: &dyn VarianceStrategy,
) -> Result<ComponentDescriptor, SpecError> {
    let model = spec.model.ok_or_else(|| SpecError::MissingArgument {
        name: "model".to_string(),
        context: CONTEXT.to_string(),
    })?;

    let pedigree = match &spec.pedigree {
        None => {
            return Err(SpecError::MissingArgument {
                name: "pedigree".to_string(),
                context: CONTEXT.to_string(),
            });
        }
        Some(SpecValue::Pedigree(p)) => p.clone().normalized(),
        Some(SpecValue::Frame(df)) => Pedigree::from_frame(df, CONTEXT)?.normalized(),
        Some(other) => {
            return Err(SpecError::TypeMismatch {
                name: "pedigree".to_string(),
                context: CONTEXT.to_string(),
                expected: "a pedigree or a three-column individual/sire/dam table".to_string(),
                found: other.kind().to_string(),
            });
        }
    };

    let id_value = spec.id.as_ref().ok_or_else(|| SpecError::MissingArgument {
        name: "id".to_string(),
        context: CONTEXT.to_string(),
    })?;
    let ids = data::id_codes(id_value, data, "id", CONTEXT)?;
    let internal = resolve_against_pedigree(&ids, &pedigree)?;

    let (var_ini, defaulted) = resolve_var_ini(
        spec.var_ini.as_ref(),
        response,
        model.effect_dim(),
        strategy,
        CONTEXT,
    )?;

    let mut builder = DescriptorBuilder::new()
        .push("model", ParamValue::Name(model.as_str().to_string()))
        .push("pedigree", ParamValue::Pedigree(pedigree))
        .push("id", ParamValue::Ids(internal));

    if model == GeneticModel::Competition {
        let coordinates_value =
            spec.coordinates
                .as_ref()
                .ok_or_else(|| SpecError::MissingArgument {
                    name: "coordinates".to_string(),
                    context: CONTEXT.to_string(),
                })?;
        let coordinates = normalize_coordinates(coordinates_value, CONTEXT)?;
        let decay = competition_decay(spec.competition_decay.as_ref())?;
        let pec = normalize_pec(spec.pec.as_ref(), response, strategy, defaulted)?;

        builder = builder
            .push("coordinates", ParamValue::Coordinates(coordinates))
            .push("competition.decay", ParamValue::Scalar(decay))
            .push("pec", ParamValue::Record(pec));
    }

    Ok(builder
        .push("var.ini", ParamValue::Matrix(var_ini))
        .var_ini_default(defaulted)
        .freeze())
}

/// Maps external id codes through the pedigree map and checks membership
/// in the pedigree labels, reporting every unresolved individual at once.
fn resolve_against_pedigree(ids: &[i64], pedigree: &Pedigree) -> Result<Vec<i64>, SpecError> {
    let labels = pedigree.labels();
    let mut internal = Vec::with_capacity(ids.len());
    let mut unresolved: Vec<i64> = Vec::new();
    let mut seen: AHashSet<i64> = AHashSet::new();
    for &code in ids {
        match pedigree.map_code(code) {
            Some(mapped) if labels.contains(&mapped) => internal.push(mapped),
            _ => {
                if seen.insert(code) {
                    unresolved.push(code);
                }
            }
        }
    }
    if !unresolved.is_empty() {
        return Err(SpecError::UnresolvedReference {
            context: CONTEXT.to_string(),
            missing: unresolved.iter().join(", "),
        });
    }
    Ok(internal)
}

fn competition_decay(value: Option<&SpecValue>) -> Result<f64, SpecError> {
    let out_of_range = |found: f64| SpecError::OutOfRange {
        name: "competition.decay".to_string(),
        context: CONTEXT.to_string(),
        detail: format!("the decay must be strictly positive, found {found}"),
    };
    match value {
        None => Err(SpecError::MissingArgument {
            name: "competition.decay".to_string(),
            context: CONTEXT.to_string(),
        }),
        Some(SpecValue::Scalar(x)) => {
            if x.is_finite() && *x > 0.0 {
                Ok(*x)
            } else {
                Err(out_of_range(*x))
            }
        }
        Some(SpecValue::Numeric(v)) if v.len() == 1 => {
            if v[0].is_finite() && v[0] > 0.0 {
                Ok(v[0])
            } else {
                Err(out_of_range(v[0]))
            }
        }
        Some(other) => Err(SpecError::TypeMismatch {
            name: "competition.decay".to_string(),
            context: CONTEXT.to_string(),
            expected: "a positive number".to_string(),
            found: other.kind().to_string(),
        }),
    }
}

/// Normalizes the `pec` shorthand into a `{present, var.ini}` record.
///
/// The defaulting rule is asymmetric on purpose: `pec$var.ini` may be
/// defaulted only when the parent component's own `var.ini` was defaulted.
/// A user-specified parent variance with a present PEC demands an explicit
/// `pec$var.ini`.
fn normalize_pec(
    value: Option<&SpecValue>,
    response: ArrayView2<f64>,
    strategy: &dyn VarianceStrategy,
    parent_defaulted: bool,
) -> Result<Vec<(String, ParamValue)>, SpecError> {
    let (present, var_ini) = parse_pec_shorthand(value)?;

    if !present {
        return Ok(vec![("present".to_string(), ParamValue::Logical(false))]);
    }

    let t = response.ncols();
    let matrix = match var_ini {
        Some(v) => validate_variance(&v, (t, t), "pec$var.ini", PEC_CONTEXT)?,
        None if parent_defaulted => {
            let (m, _) = resolve_var_ini(None, response, 1, strategy, PEC_CONTEXT)?;
            m
        }
        None => {
            return Err(SpecError::MissingArgument {
                name: "pec$var.ini".to_string(),
                context: format!(
                    "{PEC_CONTEXT} ('var.ini' was given explicitly, so the PEC variance must also be given)"
                ),
            });
        }
    };

    Ok(vec![
        ("present".to_string(), ParamValue::Logical(true)),
        ("var.ini".to_string(), ParamValue::Matrix(matrix)),
    ])
}

/// Accepts the logical/scalar/numeric/matrix/record shorthands for `pec`.
fn parse_pec_shorthand(
    value: Option<&SpecValue>,
) -> Result<(bool, Option<SpecValue>), SpecError> {
    match value {
        None => Ok((false, None)),
        Some(SpecValue::Logical(b)) => Ok((*b, None)),
        Some(SpecValue::Scalar(x)) => Ok((
            true,
            Some(SpecValue::Matrix(Array2::from_elem((1, 1), *x))),
        )),
        Some(SpecValue::Numeric(v)) if v.len() == 1 => Ok((
            true,
            Some(SpecValue::Matrix(Array2::from_elem((1, 1), v[0]))),
        )),
        Some(SpecValue::Matrix(m)) => Ok((true, Some(SpecValue::Matrix(m.clone())))),
        Some(SpecValue::Record(fields)) => {
            let mut present: Option<bool> = None;
            let mut var_ini: Option<SpecValue> = None;
            for (key, field) in fields {
                match key.as_str() {
                    "present" => match field {
                        SpecValue::Logical(b) => present = Some(*b),
                        other => {
                            return Err(SpecError::TypeMismatch {
                                name: "pec$present".to_string(),
                                context: PEC_CONTEXT.to_string(),
                                expected: "a logical".to_string(),
                                found: other.kind().to_string(),
                            });
                        }
                    },
                    "var.ini" => var_ini = Some(field.clone()),
                    _ => {
                        return Err(SpecError::UnrecognizedField {
                            name: format!("pec${key}"),
                            context: PEC_CONTEXT.to_string(),
                        });
                    }
                }
            }
            Ok((present.unwrap_or(true), var_ini))
        }
        Some(other) => Err(SpecError::TypeMismatch {
            name: "pec".to_string(),
            context: PEC_CONTEXT.to_string(),
            expected: "a logical, a variance value, or a {present, var.ini} record".to_string(),
            found: other.kind().to_string(),
        }),
    }
}
