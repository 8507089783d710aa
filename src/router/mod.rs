//! HTTP API of every role.

mod login;
mod password;
mod profile;
mod registration;
pub mod status;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, FromRequest, Request, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::ServerError;
use crate::application::dto::Envelope;
use crate::application::ports::TokenIssuer;
use crate::application::usecases::Accounts;
use crate::domain::role::Role;

const BEARER: &str = "Bearer ";
/// Profile pictures up to 10 MiB.
const PICTURE_LIMIT: usize = 10 * 1024 * 1024;

/// State of the routes of one role.
#[derive(Clone)]
pub struct RoleState {
    pub role: Role,
    pub accounts: Accounts,
    pub tokens: Arc<dyn TokenIssuer>,
}

/// JSON body checked with [`validator`].
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Renders an envelope with its own status code.
fn reply(envelope: Envelope) -> (StatusCode, Json<Envelope>) {
    let status = StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::OK);
    (status, Json(envelope))
}

/// Custom middleware for authentification.
///
/// The token must be issued for this role and its account must still exist.
async fn auth(
    State(state): State<RoleState>,
    mut req: Request,
    next: middleware::Next,
) -> Result<Response, ServerError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER))
        .ok_or(ServerError::Unauthorized)?;

    let claims = state
        .tokens
        .verify(token.trim())
        .map_err(|_| ServerError::Unauthorized)?;
    if claims.role != state.role {
        return Err(ServerError::Unauthorized);
    }
    state.accounts.profiles.authenticate(&claims).await?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Routes of one role, meant to be nested under `/api/<role>s`.
pub fn router<S>(state: RoleState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let protected = Router::new()
        // `GET /logout` ends the session.
        .route("/logout", get(login::logout))
        .route("/id/{id}", get(profile::by_id))
        .route("/email/{email}", get(profile::by_email))
        // `GET|PATCH|DELETE /me/{id}` manage the caller's account.
        .route(
            "/me/{id}",
            get(profile::current)
                .patch(profile::update)
                .delete(profile::delete),
        )
        .route(
            "/me/{id}/picture",
            put(profile::picture).layer(DefaultBodyLimit::max(PICTURE_LIMIT)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/sign-up", post(registration::sign_up))
        .route("/availability/{value}", get(registration::availability))
        .route(
            "/verify-account/registration",
            put(registration::verify),
        )
        .route(
            "/send-verification-email-registration",
            put(registration::resend),
        )
        .route("/login", post(login::login))
        .route("/forgot-password", put(password::forgot))
        .route("/verify-account/reset-password", put(password::verify))
        .route("/reset-password", put(password::reset))
        .merge(protected)
        .with_state(state)
}
