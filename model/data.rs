//! Column lookup and coercion against the user's dataset.
//!
//! Validators never keep the dataset; it is consulted only to resolve
//! `id` arguments given by name and to coerce tabular inputs (pedigree
//! frames, coordinate frames) into numeric arrays.

use crate::error::SpecError;
use crate::types::SpecValue;
use ndarray::{Array2, ShapeBuilder};
use polars::prelude::*;

/// Extracts a column as `f64`, failing on missing values or a dtype that
/// cannot be cast to numeric.
pub(crate) fn extract_numeric_column(
    df: &DataFrame,
    name: &str,
    context: &str,
) -> Result<Vec<f64>, SpecError> {
    let series = df.column(name)?;
    if series.null_count() > 0 {
        return Err(SpecError::TypeMismatch {
            name: name.to_string(),
            context: context.to_string(),
            expected: "a complete numeric column".to_string(),
            found: "missing values".to_string(),
        });
    }

    let casted = series
        .cast(&DataType::Float64)
        .map_err(|_| SpecError::TypeMismatch {
            name: name.to_string(),
            context: context.to_string(),
            expected: "f64 (numeric)".to_string(),
            found: format!("{:?}", series.dtype()),
        })?;
    if casted.null_count() > 0 {
        return Err(SpecError::TypeMismatch {
            name: name.to_string(),
            context: context.to_string(),
            expected: "f64 (numeric)".to_string(),
            found: format!("{:?}", series.dtype()),
        });
    }

    Ok(casted.f64()?.rechunk().into_no_null_iter().collect())
}

/// Extracts a column as integer codes. The column is read as numeric and
/// each value checked to be a whole number; a fractional entry fails
/// rather than being truncated by a lossy cast.
pub(crate) fn extract_integer_column(
    df: &DataFrame,
    name: &str,
    context: &str,
) -> Result<Vec<i64>, SpecError> {
    let values = extract_numeric_column(df, name, context)?;
    values
        .iter()
        .map(|&v| integer_code(v, name, context))
        .collect()
}

fn integer_code(value: f64, name: &str, context: &str) -> Result<i64, SpecError> {
    if value.is_finite() && value.fract() == 0.0 {
        Ok(value as i64)
    } else {
        Err(SpecError::TypeMismatch {
            name: name.to_string(),
            context: context.to_string(),
            expected: "integer codes".to_string(),
            found: format!("non-integer value {value}"),
        })
    }
}

/// Coerces every column of a frame to `f64` and assembles the result as a
/// column-major array.
pub(crate) fn numeric_frame(df: &DataFrame, context: &str) -> Result<Array2<f64>, SpecError> {
    let height = df.height();
    let width = df.width();
    let mut buffer = Vec::with_capacity(height * width);
    for column in df.get_columns() {
        let mut values = extract_numeric_column(df, column.name().as_str(), context)?;
        buffer.append(&mut values);
    }
    Ok(Array2::from_shape_vec((height, width).f(), buffer)
        .expect("column buffers have consistent length"))
}

/// Resolves an `id` argument to integer codes: a name reads the column of
/// that name from `data`, a numeric vector of whole numbers is used
/// directly.
pub(crate) fn id_codes(
    value: &SpecValue,
    data: &DataFrame,
    name: &str,
    context: &str,
) -> Result<Vec<i64>, SpecError> {
    match value {
        SpecValue::Name(column) => extract_integer_column(data, column, context),
        SpecValue::Numeric(values) => values
            .iter()
            .map(|&v| integer_code(v, name, context))
            .collect(),
        other => Err(SpecError::TypeMismatch {
            name: name.to_string(),
            context: context.to_string(),
            expected: "a column name or a vector of integer id codes".to_string(),
            found: other.kind().to_string(),
        }),
    }
}
