//! Cryptographic ports.

use crate::application::error::Result;
use crate::domain::password::{Password, PasswordHash};

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &Password) -> Result<PasswordHash>;

    /// `Ok(false)` means the password does not match; `Err` is reserved for
    /// hashes that cannot be read at all.
    fn verify(&self, password: &Password, hash: &PasswordHash) -> Result<bool>;
}

/// Source of one-time passcodes.
pub trait CodeGenerator: Send + Sync {
    /// A fresh zero-padded numeric code of [`crate::domain::otp::OTP_LENGTH`] digits.
    fn generate(&self) -> String;
}
