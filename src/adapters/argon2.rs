//! Argon2id password hasher implementation.

use argon2::password_hash::{
    Error as HashError, PasswordHash, PasswordHasher as Argon2PasswordHasherTrait,
    PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::application::error::{Result, ToInternal};
use crate::application::ports::PasswordHasher;
use crate::domain::password::{Password, PasswordHash as DomainPasswordHash};

const OUTPUT_LENGTH: usize = 32;

/// Argon2id password hasher adapter.
pub struct Argon2PasswordHasher {
    params: Params,
}

impl Argon2PasswordHasher {
    /// Create a new Argon2 hasher with custom parameters.
    pub fn new(memory_cost: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_cost, iterations, parallelism, Some(OUTPUT_LENGTH)).catch()?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &Password) -> Result<DomainPasswordHash> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt).catch()?;

        Ok(DomainPasswordHash::parse(hash.to_string())?)
    }

    fn verify(&self, password: &Password, hash: &DomainPasswordHash) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash.as_str()).catch()?;

        match self.argon2().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(err) => Err(err).catch(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2PasswordHasher {
        Argon2PasswordHasher::new(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = hasher();
        let password = Password::new("Abcd123!@").unwrap();
        let hash = hasher.hash(&password).unwrap();

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify(&password, &hash).unwrap());
        assert!(!hasher.verify(&Password::new("Other123!@").unwrap(), &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher();
        let password = Password::new("Abcd123!@").unwrap();
        assert_ne!(hasher.hash(&password).unwrap(), hasher.hash(&password).unwrap());
    }

    #[test]
    fn test_invalid_params() {
        assert!(Argon2PasswordHasher::new(1, 0, 0).is_err());
    }
}
