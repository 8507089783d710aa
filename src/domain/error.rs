//! Custom error handler for domain (core).

pub type Result<T> = std::result::Result<T, DomainError>;

/// Enum representing custom domain errors.
///
/// Messages are user facing: they end up verbatim in the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid email address")]
    InvalidEmailFormat,
    #[error("Password must be atleast {min_length} characters long")]
    WeakPassword { min_length: usize },
    #[error("{message}")]
    ValidationFailed { field: String, message: String },
    #[error("Invalid role! Role is unknown.")]
    UnknownRole,
    #[error("stored password hash is not in PHC format")]
    InvalidCredentials,
}

impl DomainError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}
