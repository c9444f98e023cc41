//! Coordinate normalization.
//!
//! Spatial and competition components locate observations on a plane; the
//! user may hand the coordinates in as a data frame, a numeric matrix, or
//! (for a single observation) a flat pair. Everything is funnelled into
//! the canonical two-column [`CoordinateTable`].

use crate::data::numeric_frame;
use crate::error::SpecError;
use crate::types::{CoordinateTable, SpecValue};
use ndarray::Array2;

/// Coerces `value` into a two-column numeric coordinate table.
pub fn normalize_coordinates(
    value: &SpecValue,
    context: &str,
) -> Result<CoordinateTable, SpecError> {
    let two_columns = |found_cols: usize| SpecError::TypeMismatch {
        name: "coordinates".to_string(),
        context: context.to_string(),
        expected: "a table with exactly two numeric columns".to_string(),
        found: format!("{found_cols} columns"),
    };

    match value {
        SpecValue::Frame(df) => {
            let array = numeric_frame(df, context)?;
            if array.ncols() != 2 {
                return Err(two_columns(array.ncols()));
            }
            Ok(CoordinateTable::new(array))
        }
        SpecValue::Matrix(m) => {
            if m.ncols() != 2 {
                return Err(two_columns(m.ncols()));
            }
            Ok(CoordinateTable::new(m.clone()))
        }
        // A single observation degenerates to a flat pair; re-wrap it as a
        // one-row table instead of losing the two-column shape.
        SpecValue::Numeric(values) if values.len() == 2 => Ok(CoordinateTable::new(
            Array2::from_shape_vec((1, 2), values.clone())
                .expect("a pair always reshapes to 1x2"),
        )),
        SpecValue::Numeric(values) => Err(SpecError::TypeMismatch {
            name: "coordinates".to_string(),
            context: context.to_string(),
            expected: "a table with exactly two numeric columns".to_string(),
            found: format!("numeric vector of length {}", values.len()),
        }),
        other => Err(SpecError::TypeMismatch {
            name: "coordinates".to_string(),
            context: context.to_string(),
            expected: "a coercible tabular structure".to_string(),
            found: other.kind().to_string(),
        }),
    }
}
