use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::application::dto::{Envelope, ResetPasswordRequest};
use crate::error::Result;
use crate::router::registration::EmailBody;
use crate::router::{RoleState, Valid, reply};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyBody {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

#[derive(Serialize, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ResetBody {
    #[zeroize(skip)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Handler to send a password reset passcode.
pub async fn forgot(
    State(state): State<RoleState>,
    Valid(body): Valid<EmailBody>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state.accounts.reset.request(&body.email).await?;
    Ok(reply(envelope))
}

/// Handler to check a reset passcode without consuming it.
pub async fn verify(
    State(state): State<RoleState>,
    Valid(body): Valid<VerifyBody>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state.accounts.reset.verify(&body.email, &body.otp).await?;
    Ok(reply(envelope))
}

/// Handler to replace the password.
pub async fn reset(
    State(state): State<RoleState>,
    Valid(mut body): Valid<ResetBody>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state
        .accounts
        .reset
        .reset(ResetPasswordRequest {
            email: std::mem::take(&mut body.email),
            otp: std::mem::take(&mut body.otp),
            new_password: std::mem::take(&mut body.new_password),
        })
        .await?;

    Ok(reply(envelope))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::domain::role::Role;
    use crate::tests::{TestApp, body_json};

    #[tokio::test]
    async fn test_reset_flow() {
        let app = TestApp::new();
        app.register(Role::Buyer, true).await;

        let body = json!({ "email": "jane@example.com" }).to_string();
        let response = app
            .request(Method::PUT, "/api/buyers/forgot-password", None, body)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let code = app.notifier.sent().last().unwrap().code.clone();
        let body = json!({ "email": "jane@example.com", "otp": code }).to_string();
        let response = app
            .request(Method::PUT, "/api/buyers/verify-account/reset-password", None, body)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json!({
            "email": "jane@example.com",
            "otp": code,
            "newPassword": "Newpass1!",
        })
        .to_string();
        let response = app
            .request(Method::PUT, "/api/buyers/reset-password", None, body.clone())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        // The code is gone once used.
        let response = app
            .request(Method::PUT, "/api/buyers/reset-password", None, body)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json!({
            "username": "jane",
            "password": "Newpass1!",
            "role": "buyer",
        })
        .to_string();
        let response = app
            .request(Method::POST, "/api/buyers/login", None, body)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reset_short_otp() {
        let app = TestApp::new();
        let body = json!({
            "email": "jane@example.com",
            "otp": "12",
            "newPassword": "Newpass1!",
        })
        .to_string();

        let response = app
            .request(Method::PUT, "/api/sellers/reset-password", None, body)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = body_json(response).await;
        assert_eq!(body["message"], "OTP must be 6 digits");
    }
}
