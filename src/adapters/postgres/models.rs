//! Database models for PostgreSQL.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;

use crate::application::ports::StoreError;
use crate::domain::attributes::{Bio, Contact, FullName, Username};
use crate::domain::email::EmailAddress;
use crate::domain::identity::Identity;
use crate::domain::otp::OneTimeCode;
use crate::domain::password::PasswordHash;
use crate::domain::profile::{Profile, SellerModeration};
use crate::domain::role::Role;

/// Identity row.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRecord {
    pub id: String,
    pub email: String,
    pub role: String,
    pub is_verified: bool,
    pub verification_code: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub reset_code: Option<String>,
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub is_permanently_banned: bool,
    pub ban_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile row, shared by every role.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRecord {
    pub id: String,
    pub identity_id: String,
    pub role: String,
    pub full_name: String,
    pub contact: String,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub terms: bool,
    pub moderation: Option<Json<SellerModeration>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn code(code: Option<String>, expires_at: Option<DateTime<Utc>>) -> Option<OneTimeCode> {
    code.zip(expires_at)
        .map(|(code, expires_at)| OneTimeCode::new(code, expires_at))
}

fn split(code: Option<&OneTimeCode>) -> (Option<String>, Option<DateTime<Utc>>) {
    match code {
        Some(code) => (Some(code.code().to_owned()), Some(code.expires_at())),
        None => (None, None),
    }
}

impl IdentityRecord {
    /// Convert to [`Identity`].
    pub fn try_into_domain(self) -> Result<Identity, StoreError> {
        Ok(Identity {
            email: EmailAddress::parse(&self.email).map_err(StoreError::backend)?,
            role: Role::from_str(&self.role).map_err(StoreError::backend)?,
            is_verified: self.is_verified,
            verification: code(self.verification_code, self.verification_expires_at),
            reset: code(self.reset_code, self.reset_expires_at),
            is_permanently_banned: self.is_permanently_banned,
            ban_reason: self.ban_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
            id: self.id,
        })
    }
}

impl From<&Identity> for IdentityRecord {
    fn from(identity: &Identity) -> Self {
        let (verification_code, verification_expires_at) = split(identity.verification.as_ref());
        let (reset_code, reset_expires_at) = split(identity.reset.as_ref());

        Self {
            id: identity.id.clone(),
            email: identity.email.to_string(),
            role: identity.role.to_string(),
            is_verified: identity.is_verified,
            verification_code,
            verification_expires_at,
            reset_code,
            reset_expires_at,
            is_permanently_banned: identity.is_permanently_banned,
            ban_reason: identity.ban_reason.clone(),
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

impl ProfileRecord {
    /// Convert to [`Profile`].
    pub fn try_into_domain(self) -> Result<Profile, StoreError> {
        Ok(Profile {
            role: Role::from_str(&self.role).map_err(StoreError::backend)?,
            full_name: FullName::parse(&self.full_name).map_err(StoreError::backend)?,
            contact: Contact::parse(&self.contact).map_err(StoreError::backend)?,
            username: self
                .username
                .map(Username::parse)
                .transpose()
                .map_err(StoreError::backend)?,
            password_hash: self
                .password_hash
                .map(PasswordHash::parse)
                .transpose()
                .map_err(StoreError::backend)?,
            bio: self
                .bio
                .map(Bio::parse)
                .transpose()
                .map_err(StoreError::backend)?,
            profile_picture_url: self.profile_picture_url,
            terms: self.terms,
            moderation: self.moderation.map(|Json(moderation)| moderation),
            created_at: self.created_at,
            updated_at: self.updated_at,
            identity_id: self.identity_id,
            id: self.id,
        })
    }
}

impl From<&Profile> for ProfileRecord {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            identity_id: profile.identity_id.clone(),
            role: profile.role.to_string(),
            full_name: profile.full_name.to_string(),
            contact: profile.contact.to_string(),
            username: profile.username.as_ref().map(ToString::to_string),
            password_hash: profile.password_hash.as_ref().map(|h| h.as_str().to_owned()),
            bio: profile.bio.as_ref().map(ToString::to_string),
            profile_picture_url: profile.profile_picture_url.clone(),
            terms: profile.terms,
            moderation: profile.moderation.clone().map(Json),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}
