pub mod coach;
pub mod compatibility;
pub mod documents;
pub mod handlers;
pub mod practice;
pub mod prompts;
pub mod questions;

use crate::errors::AppError;

/// Rejects blank request fields before any model call is made.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
