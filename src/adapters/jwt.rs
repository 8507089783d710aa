//! JWT signing and verification using HS256.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::application::error::{ApplicationError, Result, ToInternal};
use crate::application::ports::{AccessClaims, TokenIssuer};

const DEFAULT_ISSUER: &str = "tessera";
const MIN_SECRET_LENGTH: usize = 32;

/// HMAC-signed bearer tokens.
pub struct JwtIssuer {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtIssuer {
    /// Create a new [`JwtIssuer`].
    pub fn new(secret: &str) -> Result<Self> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ApplicationError::internal_message(format!(
                "JWT secret must be at least {MIN_SECRET_LENGTH} bytes long"
            )));
        }

        Ok(Self {
            issuer: DEFAULT_ISSUER.to_owned(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Set `iss` field on JWT.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    iss: String,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    claims: AccessClaims,
}

impl TokenIssuer for JwtIssuer {
    fn sign(&self, claims: &AccessClaims, ttl: TimeDelta) -> Result<String> {
        let now = Utc::now();
        let jwt = JwtClaims {
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            claims: claims.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &jwt, &self.encoding_key).catch()
    }

    fn verify(&self, token: &str) -> Result<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<JwtClaims>(token, &self.decoding_key, &validation).catch()?;
        Ok(data.claims.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TokenPurpose;
    use crate::domain::role::Role;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn claims() -> AccessClaims {
        AccessClaims {
            sub: "profile".into(),
            identity_id: "identity".into(),
            email: "a@x.com".into(),
            role: Role::Seller,
            username: None,
            contact: Some("9999999999".into()),
            purpose: TokenPurpose::Login,
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let issuer = JwtIssuer::new(SECRET).unwrap();
        let token = issuer.sign(&claims(), TimeDelta::hours(1)).unwrap();

        assert_eq!(issuer.verify(&token).unwrap(), claims());
    }

    #[test]
    fn test_expired_token_is_refused() {
        let issuer = JwtIssuer::new(SECRET).unwrap();
        let token = issuer.sign(&claims(), TimeDelta::hours(-1)).unwrap();

        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_foreign_secret_is_refused() {
        let token = JwtIssuer::new(SECRET)
            .unwrap()
            .sign(&claims(), TimeDelta::hours(1))
            .unwrap();
        let other = JwtIssuer::new("fedcba9876543210fedcba9876543210").unwrap();

        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_short_secret() {
        assert!(JwtIssuer::new("short").is_err());
    }
}
