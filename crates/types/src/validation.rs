//! Input validation helpers.

use crate::{LongboardError, error::Result};

/// Return the trimmed value of `value`, or a validation error naming `field`
/// when it is missing or blank.
///
/// # Errors
///
/// Returns [`LongboardError::Validation`] when `value` has no text.
pub fn require_text<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LongboardError::Validation(format!("{field} is required"))),
    }
}
