//! Application-level errors.

use crate::domain::error::DomainError;
use crate::domain::otp::OtpRejection;

pub type Result<T> = std::result::Result<T, ApplicationError>;

const INTERNAL_MESSAGE: &str = "Something went wrong! Please try again later.";

/// Errors that can occur in the application layer.
///
/// Every kind carries a fixed status code, see [`ApplicationError::status`].
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Otp(#[from] OtpRejection),

    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Internal {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ApplicationError {
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: INTERNAL_MESSAGE.to_owned(),
            source: Some(Box::new(err)),
        }
    }

    /// Internal error whose message is shown to the caller.
    pub fn internal_message(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Domain(_) | Self::Otp(_) | Self::BadRequest(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal { .. } => 500,
        }
    }
}

pub trait ToInternal<T> {
    fn catch(self) -> Result<T>;
}

impl<T, E> ToInternal<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn catch(self) -> Result<T> {
        self.map_err(ApplicationError::internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApplicationError::BadRequest(String::new()).status(), 400);
        assert_eq!(ApplicationError::from(OtpRejection::Expired).status(), 400);
        assert_eq!(ApplicationError::from(DomainError::InvalidEmailFormat).status(), 400);
        assert_eq!(ApplicationError::NotFound(String::new()).status(), 404);
        assert_eq!(ApplicationError::Conflict(String::new()).status(), 409);
        assert_eq!(ApplicationError::internal_message("x").status(), 500);
    }

    #[test]
    fn test_catch_hides_source_message() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk on fire"));
        let err = res.catch().unwrap_err();

        assert_eq!(err.to_string(), INTERNAL_MESSAGE);
        assert_eq!(err.status(), 500);
    }
}
