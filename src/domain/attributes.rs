//! Validated profile attributes.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::domain::error::{DomainError, Result};

static FULL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z ]{3,20}$").unwrap());
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.]{3,20}$").unwrap());
static CONTACT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{10}$").unwrap());

macro_rules! attribute {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            /// Returns the same string as a string slice `&str`.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

attribute!(
    /// Display name, 3 to 20 letters or spaces.
    FullName
);
attribute!(
    /// Public handle of a buyer.
    Username
);
attribute!(
    /// Ten digit phone number.
    Contact
);
attribute!(
    /// Free text biography.
    Bio
);

impl FullName {
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        if !FULL_NAME_RE.is_match(value) {
            return Err(DomainError::invalid(
                "fullName",
                "Name must be 3 to 20 characters long and contain only alphabets and spaces",
            ));
        }
        Ok(Self(value.to_owned()))
    }
}

impl Username {
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        if !Self::is_username(value) {
            return Err(DomainError::invalid(
                "username",
                "Username must be 3 to 20 characters long and must not contain special characters",
            ));
        }
        Ok(Self(value.to_owned()))
    }

    pub fn is_username(value: &str) -> bool {
        USERNAME_RE.is_match(value)
    }
}

impl Contact {
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        if !Self::is_contact(value) {
            return Err(DomainError::invalid(
                "contact",
                "Contact must be 10 digits long",
            ));
        }
        Ok(Self(value.to_owned()))
    }

    pub fn is_contact(value: &str) -> bool {
        CONTACT_RE.is_match(value)
    }
}

impl Bio {
    pub const MAX_LENGTH: usize = 500;

    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        if value.chars().count() > Self::MAX_LENGTH {
            return Err(DomainError::invalid(
                "bio",
                format!("Bio must not exceed {} characters", Self::MAX_LENGTH),
            ));
        }
        Ok(Self(value.to_owned()))
    }
}
