//! Data transfer objects exchanged with the use cases.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::error::ApplicationError;
use crate::domain::identity::Identity;
use crate::domain::profile::{Profile, SellerModeration};
use crate::domain::role::Role;

/// Registration attempt. Role-specific fields are optional here and checked
/// by the role policy.
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub contact: String,
    pub username: Option<String>,
    pub terms: bool,
}

pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
    pub role: Role,
}

pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// Partial profile edit. `None` leaves a field untouched.
#[derive(Debug, Default)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
}

/// Identity part of a [`ProfileView`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseUserView {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    pub is_permanently_banned: bool,
}

/// Profile joined with its identity, without any secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub base_user_id: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub contact: String,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation: Option<SellerModeration>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub base_user: BaseUserView,
}

impl ProfileView {
    pub fn new(identity: &Identity, profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            base_user_id: identity.id.clone(),
            full_name: profile.full_name.to_string(),
            username: profile.username.as_ref().map(ToString::to_string),
            contact: profile.contact.to_string(),
            bio: profile.bio.as_ref().map(ToString::to_string),
            profile_picture_url: profile.profile_picture_url.clone(),
            terms: (profile.role == Role::Buyer).then_some(profile.terms),
            moderation: profile.moderation.clone(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
            base_user: BaseUserView {
                id: identity.id.clone(),
                email: identity.email.to_string(),
                role: identity.role,
                is_verified: identity.is_verified,
                is_permanently_banned: identity.is_permanently_banned,
            },
        }
    }
}

/// Uniform result of every account operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ProfileView>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::with_status(200, message)
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self::with_status(201, message)
    }

    fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status,
            token: None,
            user: None,
        }
    }

    /// Failed outcome, rendered with `status`.
    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::with_status(status, message)
        }
    }

    pub fn token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn user(mut self, user: ProfileView) -> Self {
        self.user = Some(user);
        self
    }
}

impl From<&ApplicationError> for Envelope {
    fn from(err: &ApplicationError) -> Self {
        Self::failure(err.status(), err.to_string())
    }
}
