//! Bearer token port.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::application::error::Result;
use crate::domain::role::Role;

/// What a token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Issued at registration, before the email is verified.
    Signup,
    Login,
}

/// Claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Profile id.
    pub sub: String,
    pub identity_id: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub purpose: TokenPurpose,
}

impl AccessClaims {
    /// Whether `id` designates the caller, as a profile or identity id.
    pub fn owns(&self, id: &str) -> bool {
        self.sub == id || self.identity_id == id
    }
}

pub trait TokenIssuer: Send + Sync {
    fn sign(&self, claims: &AccessClaims, ttl: TimeDelta) -> Result<String>;

    fn verify(&self, token: &str) -> Result<AccessClaims>;
}
