use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::dto::{Envelope, UpdateProfileRequest};
use crate::application::error::ApplicationError;
use crate::application::ports::{AccessClaims, ImageUpload};
use crate::error::Result;
use crate::router::{RoleState, Valid, reply};

/// Multipart field carrying the picture.
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    #[validate(length(min = 1, message = "Full name must not be empty"))]
    pub full_name: Option<String>,
    #[validate(length(min = 1, message = "Email must not be empty"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Contact must not be empty"))]
    pub contact: Option<String>,
    #[validate(length(min = 1, message = "Username must not be empty"))]
    pub username: Option<String>,
    pub bio: Option<String>,
}

impl From<UpdateBody> for UpdateProfileRequest {
    fn from(body: UpdateBody) -> Self {
        Self {
            full_name: body.full_name,
            email: body.email,
            contact: body.contact,
            username: body.username,
            bio: body.bio,
        }
    }
}

pub async fn by_id(
    State(state): State<RoleState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state.accounts.profiles.get_by_id(&id).await?;
    Ok(reply(envelope))
}

pub async fn by_email(
    State(state): State<RoleState>,
    Path(email): Path<String>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state.accounts.profiles.get_by_email(&email).await?;
    Ok(reply(envelope))
}

/// Handler to get the caller's own account.
pub async fn current(
    State(state): State<RoleState>,
    Extension(claims): Extension<AccessClaims>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state.accounts.profiles.get_current(&claims, &id).await?;
    Ok(reply(envelope))
}

/// Handler to edit the caller's own account.
pub async fn update(
    State(state): State<RoleState>,
    Extension(claims): Extension<AccessClaims>,
    Path(id): Path<String>,
    Valid(body): Valid<UpdateBody>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state
        .accounts
        .profiles
        .update(&claims, &id, body.into())
        .await?;
    Ok(reply(envelope))
}

/// Handler to replace the profile picture.
pub async fn picture(
    State(state): State<RoleState>,
    Extension(claims): Extension<AccessClaims>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Envelope>)> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or(IMAGE_FIELD).to_owned();
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = field.bytes().await?;
        upload = Some(ImageUpload {
            bytes: bytes.to_vec(),
            filename,
            content_type,
        });
        break;
    }

    let Some(upload) = upload else {
        return Err(ApplicationError::BadRequest("Please upload an image!".into()).into());
    };

    let envelope = state
        .accounts
        .profiles
        .upload_picture(&claims, &id, upload)
        .await?;
    Ok(reply(envelope))
}

/// Handler to delete the caller's account.
pub async fn delete(
    State(state): State<RoleState>,
    Extension(claims): Extension<AccessClaims>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let envelope = state.accounts.profiles.delete(&claims, &id).await?;
    Ok(reply(envelope))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode, header};
    use serde_json::{Value, json};

    use crate::domain::role::Role;
    use crate::tests::{TestApp, body_json};

    const BOUNDARY: &str = "tessera-boundary";

    fn multipart_body(field: &str, content_type: &str) -> Vec<u8> {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"me.png\"\r\n\
             Content-Type: {content_type}\r\n\r\n\
             fake-png-bytes\r\n\
             --{BOUNDARY}--\r\n"
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_get_profiles() {
        let app = TestApp::new();
        let (token, profile_id) = app.register(Role::Buyer, true).await;

        let path = format!("/api/buyers/id/{profile_id}");
        let response = app.request(Method::GET, &path, Some(&token), String::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = body_json(response).await;
        assert_eq!(body["user"]["id"], profile_id.as_str());

        let response = app
            .request(
                Method::GET,
                "/api/buyers/email/jane@example.com",
                Some(&token),
                String::new(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .request(Method::GET, "/api/buyers/id/missing", Some(&token), String::new())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // A buyer token is refused by seller routes.
        let path = format!("/api/sellers/id/{profile_id}");
        let response = app.request(Method::GET, &path, Some(&token), String::new()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let path = format!("/api/buyers/me/{profile_id}");
        let response = app.request(Method::GET, &path, Some(&token), String::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_foreign_account_is_forbidden() {
        let app = TestApp::new();
        let (token, _) = app.register(Role::Buyer, true).await;

        let response = app
            .request(Method::GET, "/api/buyers/me/someone-else", Some(&token), String::new())
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .request(Method::DELETE, "/api/buyers/me/someone-else", Some(&token), String::new())
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_update_handler() {
        let app = TestApp::new();
        let (token, profile_id) = app.register(Role::Seller, true).await;

        let path = format!("/api/sellers/me/{profile_id}");
        let body = json!({ "fullName": "Janet Doe", "bio": "Handmade pottery" }).to_string();
        let response = app.request(Method::PATCH, &path, Some(&token), body).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = body_json(response).await;
        assert_eq!(body["user"]["fullName"], "Janet Doe");
        assert_eq!(body["user"]["bio"], "Handmade pottery");

        let body = json!({ "username": "janet" }).to_string();
        let response = app.request(Method::PATCH, &path, Some(&token), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_picture_upload() {
        let app = TestApp::new();
        let (token, profile_id) = app.register(Role::Buyer, true).await;
        let path = format!("/api/buyers/me/{profile_id}/picture");
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");

        let response = app
            .send(
                Method::PUT,
                &path,
                Some(&token),
                &content_type,
                multipart_body("image", "text/plain"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(
                Method::PUT,
                &path,
                Some(&token),
                &content_type,
                multipart_body("avatar", "image/png"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(
                Method::PUT,
                &path,
                Some(&token),
                &content_type,
                multipart_body("image", "image/png"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_TYPE).is_some());

        let body: Value = body_json(response).await;
        assert_eq!(
            body["user"]["profilePictureUrl"],
            "https://images.test/buyers/profile-pictures/me.png"
        );
        assert_eq!(app.images.uploads(), vec!["buyers/profile-pictures/me.png"]);
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let app = TestApp::new();
        let (token, profile_id) = app.register(Role::Admin, true).await;

        let path = format!("/api/admins/me/{profile_id}");
        let response = app
            .request(Method::DELETE, &path, Some(&token), String::new())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.store.identity_count().await, 0);

        // The token outlives the account but no longer authenticates.
        let response = app.request(Method::GET, &path, Some(&token), String::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = app
            .request(Method::GET, "/api/admins/logout", Some(&token), String::new())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: Value = body_json(response).await;
        assert_eq!(body["message"], "Base user with this id not found!");
    }
}
