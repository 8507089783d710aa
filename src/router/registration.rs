use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::application::dto::{Envelope, RegisterRequest};
use crate::application::error::ApplicationError;
use crate::domain::role::Role;
use crate::error::Result;
use crate::router::{RoleState, Valid, reply};

#[derive(Serialize, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct SignUpBody {
    #[zeroize(skip)]
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[zeroize(skip)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[zeroize(skip)]
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
    #[zeroize(skip)]
    #[validate(length(min = 1, message = "Contact is required"))]
    pub contact: String,
    #[zeroize(skip)]
    #[serde(default)]
    pub username: Option<String>,
    #[zeroize(skip)]
    #[serde(default)]
    pub terms: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyBody {
    /// Email, or username for buyers.
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub identifier: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct EmailBody {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

/// Handler to create an unverified account.
pub async fn sign_up(
    State(state): State<RoleState>,
    Valid(mut body): Valid<SignUpBody>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let role = body.role.parse::<Role>().map_err(ApplicationError::from)?;

    let envelope = state
        .accounts
        .registration
        .register(RegisterRequest {
            full_name: std::mem::take(&mut body.full_name),
            email: std::mem::take(&mut body.email),
            password: std::mem::take(&mut body.password),
            role,
            contact: std::mem::take(&mut body.contact),
            username: body.username.take(),
            terms: body.terms,
        })
        .await?;

    Ok(reply(envelope))
}

/// Handler to check whether the role's handle (buyer username, seller or
/// admin contact) is taken.
pub async fn availability(
    State(state): State<RoleState>,
    Path(value): Path<String>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state.accounts.registration.check_availability(&value).await?;
    Ok(reply(envelope))
}

/// Handler to confirm an email with its passcode.
pub async fn verify(
    State(state): State<RoleState>,
    Valid(body): Valid<VerifyBody>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state
        .accounts
        .registration
        .verify(&body.identifier, &body.otp)
        .await?;
    Ok(reply(envelope))
}

/// Handler to send a fresh verification passcode.
pub async fn resend(
    State(state): State<RoleState>,
    Valid(body): Valid<EmailBody>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state.accounts.registration.resend(&body.email).await?;
    Ok(reply(envelope))
}
