//! Generic random-effect components.
//!
//! A generic component pairs an incidence matrix with exactly one of a
//! covariance or a precision structure, plus an initial variance. Sets of
//! generic components are validated together so the all-or-none policy on
//! defaulted initial variances can be enforced across the whole set.

use crate::descriptor::{ComponentDescriptor, DescriptorBuilder};
use crate::error::SpecError;
use crate::types::{ParamValue, SpecValue};
use crate::variance::{VarianceStrategy, resolve_var_ini};
use itertools::Itertools;
use ndarray::ArrayView2;

/// Raw user specification of a single generic component.
#[derive(Debug, Clone, Default)]
pub struct GenericSpec {
    pub incidence: Option<SpecValue>,
    pub covariance: Option<SpecValue>,
    pub precision: Option<SpecValue>,
    pub var_ini: Option<SpecValue>,
}

impl GenericSpec {
    /// Parses a named record into a spec, rejecting unrecognized keys.
    fn from_record(
        fields: &[(String, SpecValue)],
        context: &str,
    ) -> Result<Self, SpecError> {
        let mut spec = GenericSpec::default();
        for (key, value) in fields {
            let slot = match key.as_str() {
                "incidence" => &mut spec.incidence,
                "covariance" => &mut spec.covariance,
                "precision" => &mut spec.precision,
                "var.ini" => &mut spec.var_ini,
                _ => {
                    return Err(SpecError::UnrecognizedField {
                        name: key.clone(),
                        context: context.to_string(),
                    });
                }
            };
            *slot = Some(value.clone());
        }
        Ok(spec)
    }
}

/// Validates a single generic component against the response.
pub fn validate_generic(
    name: &str,
    spec: &GenericSpec,
    response: ArrayView2<f64>,
    strategy: &dyn VarianceStrategy,
) -> Result<ComponentDescriptor, SpecError> {
    let context = format!("generic component '{name}'");

    let incidence_value = spec.incidence.as_ref().ok_or_else(|| {
        SpecError::MissingArgument {
            name: "incidence".to_string(),
            context: context.clone(),
        }
    })?;
    let incidence = incidence_value
        .as_matrix()
        .ok_or_else(|| SpecError::TypeMismatch {
            name: "incidence".to_string(),
            context: context.clone(),
            expected: "a matrix".to_string(),
            found: incidence_value.kind().to_string(),
        })?;

    // Exactly one of covariance/precision.
    let (structure_key, structure_value) = match (&spec.covariance, &spec.precision) {
        (Some(cov), None) => ("covariance", cov),
        (None, Some(prec)) => ("precision", prec),
        (None, None) => {
            return Err(SpecError::MissingArgument {
                name: "covariance/precision".to_string(),
                context: context.clone(),
            });
        }
        (Some(_), Some(_)) => {
            return Err(SpecError::UnrecognizedField {
                name: "precision".to_string(),
                context: format!("{context} ('covariance' was also given; specify exactly one)"),
            });
        }
    };
    let structure = structure_value
        .as_matrix()
        .ok_or_else(|| SpecError::TypeMismatch {
            name: structure_key.to_string(),
            context: context.clone(),
            expected: "a matrix".to_string(),
            found: structure_value.kind().to_string(),
        })?;

    if incidence.ncols() != structure.nrows() {
        return Err(SpecError::NonConformantDimensions {
            name: structure_key.to_string(),
            context: context.clone(),
            expected_rows: incidence.ncols(),
            expected_cols: incidence.ncols(),
            found_rows: structure.nrows(),
            found_cols: structure.ncols(),
        });
    }

    let (var_ini, defaulted) =
        resolve_var_ini(spec.var_ini.as_ref(), response, 1, strategy, &context)?;

    Ok(DescriptorBuilder::new()
        .push("incidence", ParamValue::Matrix(incidence.clone()))
        .push(structure_key, ParamValue::Matrix(structure.clone()))
        .push("var.ini", ParamValue::Matrix(var_ini))
        .var_ini_default(defaulted)
        .freeze())
}

/// A validated collection of generic components with one aggregate
/// default-variance flag; per-component flags are subsumed by it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericSet {
    components: Vec<(String, ComponentDescriptor)>,
    var_ini_default: bool,
}

impl GenericSet {
    pub fn get(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.components
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ComponentDescriptor)> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn var_ini_default(&self) -> bool {
        self.var_ini_default
    }
}

/// Validates a named collection of raw generic-component records,
/// enforcing the all-or-none default-variance policy across the set.
pub fn validate_generic_set(
    set: &[(String, SpecValue)],
    response: ArrayView2<f64>,
    strategy: &dyn VarianceStrategy,
) -> Result<GenericSet, SpecError> {
    let context = "generic component set";

    if set.iter().any(|(name, _)| name.is_empty()) {
        return Err(SpecError::MissingArgument {
            name: "name".to_string(),
            context: format!("{context} (every component must be named)"),
        });
    }
    if let Some(dup) = set.iter().map(|(name, _)| name).duplicates().next() {
        return Err(SpecError::UnrecognizedField {
            name: dup.clone(),
            context: format!("{context} (duplicate component name)"),
        });
    }

    let mut components = Vec::with_capacity(set.len());
    let mut flags = Vec::with_capacity(set.len());
    for (name, value) in set {
        let element_context = format!("generic component '{name}'");
        let fields = match value {
            SpecValue::Record(fields) => fields,
            other => {
                return Err(SpecError::TypeMismatch {
                    name: name.clone(),
                    context: context.to_string(),
                    expected: "a named record of component arguments".to_string(),
                    found: other.kind().to_string(),
                });
            }
        };
        let spec = GenericSpec::from_record(fields, &element_context)?;
        let descriptor = validate_generic(name, &spec, response, strategy)?;
        flags.push(descriptor.var_ini_default());
        components.push((name.clone(), descriptor));
    }

    let defaulted = flags.first().copied().unwrap_or(false);
    if flags.iter().any(|&f| f != defaulted) {
        return Err(SpecError::InconsistentDefaulting {
            context: context.to_string(),
        });
    }

    Ok(GenericSet {
        components,
        var_ini_default: defaulted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variance::EmpiricalVariance;
    use ndarray::{Array2, array};

    fn response() -> Array2<f64> {
        array![[1.0], [2.0], [3.0], [4.0]]
    }

    fn incidence() -> Array2<f64> {
        array![[1.0, 0.0], [0.0, 1.0], [1.0, 0.0], [0.0, 1.0]]
    }

    fn structure() -> Array2<f64> {
        array![[1.0, 0.2], [0.2, 1.0]]
    }

    fn spec_with_covariance() -> GenericSpec {
        GenericSpec {
            incidence: Some(SpecValue::Matrix(incidence())),
            covariance: Some(SpecValue::Matrix(structure())),
            precision: None,
            var_ini: None,
        }
    }

    #[test]
    fn covariance_component_defaults_var_ini() {
        let r = response();
        let d = validate_generic("plot", &spec_with_covariance(), r.view(), &EmpiricalVariance)
            .unwrap();
        assert!(d.var_ini_default());
        let names: Vec<&str> = d.param_names().collect();
        assert_eq!(names, vec!["incidence", "covariance", "var.ini"]);
        let var_ini = d.get("var.ini").unwrap().as_matrix().unwrap();
        assert_eq!(var_ini.shape(), &[1, 1]);
    }

    #[test]
    fn precision_component_is_accepted() {
        let r = response();
        let spec = GenericSpec {
            incidence: Some(SpecValue::Matrix(incidence())),
            covariance: None,
            precision: Some(SpecValue::Matrix(structure())),
            var_ini: Some(SpecValue::Matrix(array![[2.0]])),
        };
        let d = validate_generic("plot", &spec, r.view(), &EmpiricalVariance).unwrap();
        assert!(!d.var_ini_default());
        assert!(d.get("precision").is_some());
        assert!(d.get("covariance").is_none());
    }

    #[test]
    fn missing_incidence_is_fatal() {
        let r = response();
        let spec = GenericSpec {
            covariance: Some(SpecValue::Matrix(structure())),
            ..GenericSpec::default()
        };
        let err = validate_generic("plot", &spec, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(err, SpecError::MissingArgument { .. }));
    }

    #[test]
    fn neither_structure_is_fatal() {
        let r = response();
        let spec = GenericSpec {
            incidence: Some(SpecValue::Matrix(incidence())),
            ..GenericSpec::default()
        };
        let err = validate_generic("plot", &spec, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(
            err,
            SpecError::MissingArgument { ref name, .. } if name == "covariance/precision"
        ));
    }

    #[test]
    fn both_structures_are_fatal() {
        let r = response();
        let spec = GenericSpec {
            incidence: Some(SpecValue::Matrix(incidence())),
            covariance: Some(SpecValue::Matrix(structure())),
            precision: Some(SpecValue::Matrix(structure())),
            var_ini: None,
        };
        let err = validate_generic("plot", &spec, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(err, SpecError::UnrecognizedField { .. }));
    }

    #[test]
    fn non_matrix_structure_is_a_type_mismatch() {
        let r = response();
        let spec = GenericSpec {
            incidence: Some(SpecValue::Matrix(incidence())),
            covariance: Some(SpecValue::Scalar(1.0)),
            ..GenericSpec::default()
        };
        let err = validate_generic("plot", &spec, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(err, SpecError::TypeMismatch { .. }));
    }

    #[test]
    fn non_conformant_structure_is_rejected() {
        let r = response();
        let spec = GenericSpec {
            incidence: Some(SpecValue::Matrix(incidence())),
            covariance: Some(SpecValue::Matrix(array![[1.0]])),
            ..GenericSpec::default()
        };
        let err = validate_generic("plot", &spec, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(err, SpecError::NonConformantDimensions { .. }));
    }

    #[test]
    fn revalidating_a_normalized_component_is_idempotent() {
        let r = response();
        let first = validate_generic(
            "plot",
            &GenericSpec {
                incidence: Some(SpecValue::Matrix(incidence())),
                covariance: Some(SpecValue::Matrix(structure())),
                precision: None,
                var_ini: Some(SpecValue::Matrix(array![[2.0]])),
            },
            r.view(),
            &EmpiricalVariance,
        )
        .unwrap();

        let again = validate_generic(
            "plot",
            &GenericSpec {
                incidence: Some(SpecValue::Matrix(
                    first.get("incidence").unwrap().as_matrix().unwrap().clone(),
                )),
                covariance: Some(SpecValue::Matrix(
                    first.get("covariance").unwrap().as_matrix().unwrap().clone(),
                )),
                precision: None,
                var_ini: Some(SpecValue::Matrix(
                    first.get("var.ini").unwrap().as_matrix().unwrap().clone(),
                )),
            },
            r.view(),
            &EmpiricalVariance,
        )
        .unwrap();

        assert_eq!(first, again);
    }

    fn record(var_ini: Option<f64>) -> SpecValue {
        let mut fields = vec![
            (
                "incidence".to_string(),
                SpecValue::Matrix(incidence()),
            ),
            (
                "covariance".to_string(),
                SpecValue::Matrix(structure()),
            ),
        ];
        if let Some(v) = var_ini {
            fields.push(("var.ini".to_string(), SpecValue::Matrix(array![[v]])));
        }
        SpecValue::Record(fields)
    }

    #[test]
    fn uniformly_defaulted_set_succeeds() {
        let r = response();
        let set = vec![("a".to_string(), record(None)), ("b".to_string(), record(None))];
        let out = validate_generic_set(&set, r.view(), &EmpiricalVariance).unwrap();
        assert!(out.var_ini_default());
        assert_eq!(out.len(), 2);
        assert!(out.get("a").is_some());
    }

    #[test]
    fn uniformly_explicit_set_succeeds() {
        let r = response();
        let set = vec![
            ("a".to_string(), record(Some(1.0))),
            ("b".to_string(), record(Some(2.0))),
        ];
        let out = validate_generic_set(&set, r.view(), &EmpiricalVariance).unwrap();
        assert!(!out.var_ini_default());
    }

    #[test]
    fn mixed_defaulting_is_rejected() {
        let r = response();
        let set = vec![
            ("a".to_string(), record(Some(1.0))),
            ("b".to_string(), record(None)),
        ];
        let err = validate_generic_set(&set, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(err, SpecError::InconsistentDefaulting { .. }));
    }

    #[test]
    fn empty_name_is_rejected() {
        let r = response();
        let set = vec![("".to_string(), record(None))];
        let err = validate_generic_set(&set, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(err, SpecError::MissingArgument { .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let r = response();
        let set = vec![
            ("a".to_string(), record(None)),
            ("a".to_string(), record(None)),
        ];
        let err = validate_generic_set(&set, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(err, SpecError::UnrecognizedField { .. }));
    }

    #[test]
    fn non_record_element_is_rejected() {
        let r = response();
        let set = vec![("a".to_string(), SpecValue::Matrix(incidence()))];
        let err = validate_generic_set(&set, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(err, SpecError::TypeMismatch { .. }));
    }

    #[test]
    fn unrecognized_element_field_is_rejected() {
        let r = response();
        let set = vec![(
            "a".to_string(),
            SpecValue::Record(vec![(
                "covariancee".to_string(),
                SpecValue::Matrix(structure()),
            )]),
        )];
        let err = validate_generic_set(&set, r.view(), &EmpiricalVariance).unwrap_err();
        assert!(matches!(err, SpecError::UnrecognizedField { .. }));
    }
}
