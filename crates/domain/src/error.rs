//! Domain error types.

use thiserror::Error;

/// Rejection of an export request before any job row exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportValidationError {
    /// Malformed request: bad filter shape, no data type, inconsistent dates.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller's role may not export the requested data types.
    #[error("Permission denied: {0}")]
    Permission(String),
}

impl ExportValidationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission(message.into())
    }

    /// Message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) | Self::Permission(msg) => msg,
        }
    }
}

impl From<validator::ValidationErrors> for ExportValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();

        if messages.is_empty() {
            Self::Validation("Invalid request".to_string())
        } else {
            Self::Validation(messages.join("; "))
        }
    }
}

impl From<validator::ValidationError> for ExportValidationError {
    fn from(error: validator::ValidationError) -> Self {
        Self::Validation(
            error
                .message
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string()),
        )
    }
}
