//! Request validation errors shared by every entry point.

use thiserror::Error;

/// A request was rejected before any work was done.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was missing or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A message identifier could not be parsed.
    #[error("Invalid message id: {0}")]
    InvalidMessageId(String),
}

/// Reject blank values for a required field.
///
/// # Errors
///
/// Returns [`ValidationError::MissingField`] if `value` is empty or only whitespace.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(
            require("domain", "   "),
            Err(ValidationError::MissingField("domain"))
        );
        assert_eq!(require("domain", ""), Err(ValidationError::MissingField("domain")));
        assert!(require("domain", "example.com").is_ok());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ValidationError::MissingField("title").to_string(),
            "Missing required field: title"
        );
    }
}
