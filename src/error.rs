//! Error handler for Tessera.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use validator::ValidationErrors;

use crate::application::dto::Envelope;
use crate::application::error::ApplicationError;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("error parsing form data")]
    Multipart(#[from] MultipartError),

    #[error("invalid 'Authorization' header")]
    Unauthorized,
}

/// Message of the first failing field, by field name.
fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| match &issue.message {
                Some(message) => message.to_string(),
                None => format!("Invalid {field}"),
            })
        })
        .next()
        .unwrap_or_else(|| "Invalid request".to_owned())
}

fn render(status: StatusCode, envelope: Envelope) -> Response {
    (status, Json(envelope)).into_response()
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        if let ApplicationError::Internal { message, source } = &self {
            tracing::error!(error = ?source, %message, "server returned 500 status");
        }

        let status = StatusCode::from_u16(self.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        render(status, Envelope::from(&self))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let bad_request = |message: String| {
            render(
                StatusCode::BAD_REQUEST,
                Envelope::failure(StatusCode::BAD_REQUEST.as_u16(), message),
            )
        };

        match self {
            ServerError::Application(err) => err.into_response(),
            ServerError::Validation(errors) => bad_request(first_message(&errors)),
            ServerError::Axum(rejection) => bad_request(rejection.body_text()),
            ServerError::Multipart(err) => bad_request(err.body_text()),
            ServerError::Unauthorized => render(
                StatusCode::UNAUTHORIZED,
                Envelope::failure(
                    StatusCode::UNAUTHORIZED.as_u16(),
                    "Unauthorized! Please login again.",
                ),
            ),
        }
    }
}
