//! Public instance status and Prometheus scrape endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::AppState;
use crate::config::Configuration;
use crate::domain::role::Role;

/// Structured configuration.
#[derive(Serialize)]
pub struct Status {
    name: String,
    url: String,
    version: String,
    roles: Vec<Role>,
}

/// Public server status (configuration).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Status> {
    Json(Status {
        name: if config.name.is_empty() {
            env!("CARGO_CRATE_NAME").into()
        } else {
            config.name.clone()
        },
        url: config.url.clone(),
        version: config.version().to_owned(),
        roles: vec![Role::Buyer, Role::Seller, Role::Admin],
    })
}

/// Renders collected metrics, when Prometheus is enabled.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
