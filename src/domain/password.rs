//! Password logic.

use std::sync::LazyLock;

use regex_lite::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::domain::error::{DomainError, Result};

static PHC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$([a-z0-9-]{1,32})(?:\$v=(\d+))?(?:\$([^$]+))?\$([^$]+)\$([^$]+)$")
        .unwrap()
});

const SPECIAL_CHARACTERS: &str = "@$!%*?&";

/// Value object of a clear password.
///
/// Memory is wiped when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    /// Maximum password length.
    pub const MAX_LENGTH: usize = 20;
    /// Minimum password length.
    pub const MIN_LENGTH: usize = 8;

    /// Create a new [`Password`].
    ///
    /// A password needs at least one lowercase letter, one uppercase letter,
    /// one digit and one of `@$!%*?&`, and nothing outside those classes.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();

        if value.len() < Self::MIN_LENGTH {
            return Err(DomainError::WeakPassword {
                min_length: Self::MIN_LENGTH,
            });
        }

        if value.len() > Self::MAX_LENGTH {
            return Err(DomainError::invalid(
                "password",
                format!("Password must not exceed {} characters", Self::MAX_LENGTH),
            ));
        }

        let allowed = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || SPECIAL_CHARACTERS.contains(c));
        let complete = value.chars().any(|c| c.is_ascii_lowercase())
            && value.chars().any(|c| c.is_ascii_uppercase())
            && value.chars().any(|c| c.is_ascii_digit())
            && value.chars().any(|c| SPECIAL_CHARACTERS.contains(c));

        if !allowed || !complete {
            return Err(DomainError::invalid(
                "password",
                "Password must contain atleast 1 uppercase, 1 lowercase, 1 digit and 1 special character",
            ));
        }

        Ok(Self(value))
    }

    /// Returns the same string as a string slice `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// A hashed password stored on a profile.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Converts a [`String`] into a valid [`PasswordHash`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the string is not in PHC format.
    pub fn parse(phc_string: impl Into<String>) -> Result<Self> {
        let pwd = phc_string.into();
        if !PHC_RE.is_match(&pwd) {
            return Err(DomainError::InvalidCredentials);
        }

        Ok(Self(pwd))
    }

    /// Returns the same string as a string slice `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash([REDACTED])")
    }
}
