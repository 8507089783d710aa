use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::application::dto::{Envelope, LoginRequest};
use crate::application::error::ApplicationError;
use crate::domain::role::Role;
use crate::error::Result;
use crate::router::{RoleState, Valid, reply};

#[derive(Serialize, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct Body {
    /// Email, username or phone number depending on the role.
    #[zeroize(skip)]
    #[serde(alias = "email", alias = "username", alias = "contact")]
    #[validate(length(min = 1, message = "Identifier and password are required!"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Identifier and password are required!"))]
    pub password: String,
    #[zeroize(skip)]
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

/// Handler to log in.
pub async fn login(
    State(state): State<RoleState>,
    Valid(mut body): Valid<Body>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let role = body.role.parse::<Role>().map_err(ApplicationError::from)?;

    let envelope = state
        .accounts
        .login
        .login(LoginRequest {
            identifier: std::mem::take(&mut body.identifier),
            password: std::mem::take(&mut body.password),
            role,
        })
        .await?;

    Ok(reply(envelope))
}

/// Handler to log out.
pub async fn logout(State(state): State<RoleState>) -> (StatusCode, Json<Envelope>) {
    reply(state.accounts.login.logout())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::domain::role::Role;
    use crate::tests::{TestApp, body_json};

    #[tokio::test]
    async fn test_login_handler() {
        let app = TestApp::new();
        app.register(Role::Seller, true).await;

        let body = json!({
            "contact": "9999999999",
            "password": "Abcd123!@",
            "role": "seller",
        })
        .to_string();
        let response = app
            .request(Method::POST, "/api/sellers/login", None, body)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = body_json(response).await;
        assert_eq!(body["message"], "Logged in as seller successfully.");
        assert!(body["token"].is_string());
        assert!(body["user"]["moderation"].is_object());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let app = TestApp::new();
        app.register(Role::Admin, true).await;

        let body = json!({
            "email": "jane@example.com",
            "password": "Wrong123!@",
            "role": "admin",
        })
        .to_string();
        let response = app
            .request(Method::POST, "/api/admins/login", None, body)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = body_json(response).await;
        assert_eq!(body["message"], "Invalid password! Please enter correct password.");
    }

    #[tokio::test]
    async fn test_logout_requires_token() {
        let app = TestApp::new();

        let response = app
            .request(Method::GET, "/api/buyers/logout", None, String::new())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .request(Method::GET, "/api/buyers/logout", Some("not-a-jwt"), String::new())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let (token, _) = app.register(Role::Buyer, true).await;
        let response = app
            .request(Method::GET, "/api/buyers/logout", Some(&token), String::new())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_token_of_another_role_is_refused() {
        let app = TestApp::new();
        let (token, _) = app.register(Role::Seller, true).await;

        let response = app
            .request(Method::GET, "/api/admins/logout", Some(&token), String::new())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .request(Method::GET, "/api/sellers/logout", Some(&token), String::new())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
