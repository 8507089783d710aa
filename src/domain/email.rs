//! Email logic management.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::domain::error::{DomainError, Result};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$").unwrap());

/// Value object of a valid email address.
///
/// Addresses are compared case-insensitively, so they are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Maximum accepted length.
    pub const MAX_LENGTH: usize = 50;

    /// Converts a string into a valid [`EmailAddress`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the string is not shaped like `local@domain.tld` or
    /// exceeds [`EmailAddress::MAX_LENGTH`].
    pub fn parse(email: impl AsRef<str>) -> Result<Self> {
        let email = email.as_ref().trim();

        if email.len() > Self::MAX_LENGTH || !Self::is_email(email) {
            return Err(DomainError::InvalidEmailFormat);
        }

        Ok(Self(email.to_lowercase()))
    }

    /// Whether `value` looks like an email address.
    pub fn is_email(value: &str) -> bool {
        EMAIL_RE.is_match(value)
    }

    /// Returns the same string as a string slice `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercases() {
        let email = EmailAddress::parse("  Jane.Doe@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "jane.doe@example.com");
    }

    #[test]
    fn test_rejects_malformed() {
        for raw in ["", "plain", "a@b", "a@b.c", "a b@x.com", "@x.com"] {
            assert_eq!(
                EmailAddress::parse(raw),
                Err(DomainError::InvalidEmailFormat),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_too_long() {
        let raw = format!("{}@example.com", "a".repeat(45));
        assert!(EmailAddress::parse(raw).is_err());
    }
}
