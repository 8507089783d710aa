//! Tessera manages buyer, seller and admin accounts with email passcodes.

#![forbid(unsafe_code)]
pub mod adapters;
pub mod application;
pub mod config;
mod database;
pub mod domain;
pub mod error;
mod router;
pub mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware};
use error::ServerError;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};

use crate::adapters::argon2::Argon2PasswordHasher;
use crate::adapters::clock::SystemClock;
use crate::adapters::image::{CloudinaryImageStore, LocalImageStore};
use crate::adapters::jwt::JwtIssuer;
use crate::adapters::mail::{LogNotifier, SmtpNotifier};
use crate::adapters::memory::MemoryStore;
use crate::adapters::postgres::PgStore;
use crate::adapters::random::OsRngCodes;
use crate::application::policy::policy_for;
use crate::application::ports::{
    AccountStore, Clock, CodeGenerator, ImageStore, Notifier, PasswordHasher, TokenIssuer,
};
use crate::application::usecases::{AccountContext, Accounts};
use crate::config::{Configuration, Images};
use crate::domain::role::Role;
use crate::router::RoleState;

/// Directory of pictures when no image host is configured.
const DEFAULT_UPLOADS: &str = "uploads";

/// Adapters shared by every role.
pub struct Services {
    pub store: Arc<dyn AccountStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub notifier: Arc<dyn Notifier>,
    pub images: Arc<dyn ImageStore>,
    pub codes: Arc<dyn CodeGenerator>,
    pub clock: Arc<dyn Clock>,
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub buyers: Accounts,
    pub sellers: Accounts,
    pub admins: Accounts,
    pub metrics: Option<PrometheusHandle>,
    /// Local picture directory served under `/uploads`.
    pub uploads: Option<PathBuf>,
}

impl AppState {
    pub fn new(config: Arc<Configuration>, services: Services) -> Self {
        let settings = config.settings();
        let accounts = |role: Role| {
            Accounts::new(AccountContext {
                policy: policy_for(role),
                store: Arc::clone(&services.store),
                hasher: Arc::clone(&services.hasher),
                tokens: Arc::clone(&services.tokens),
                notifier: Arc::clone(&services.notifier),
                images: Arc::clone(&services.images),
                codes: Arc::clone(&services.codes),
                clock: Arc::clone(&services.clock),
                settings: settings.clone(),
            })
        };

        Self {
            buyers: accounts(Role::Buyer),
            sellers: accounts(Role::Seller),
            admins: accounts(Role::Admin),
            tokens: Arc::clone(&services.tokens),
            config,
            metrics: None,
            uploads: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn with_uploads(mut self, directory: impl Into<PathBuf>) -> Self {
        self.uploads = Some(directory.into());
        self
    }

    fn role(&self, role: Role, accounts: &Accounts) -> RoleState {
        RoleState {
            role,
            accounts: accounts.clone(),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    let mut router = Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        .route("/metrics", get(router::status::metrics))
        .nest("/api/buyers", router::router(state.role(Role::Buyer, &state.buyers)))
        .nest("/api/sellers", router::router(state.role(Role::Seller, &state.sellers)))
        .nest("/api/admins", router::router(state.role(Role::Admin, &state.admins)));

    if let Some(directory) = &state.uploads {
        router = router.nest_service("/uploads", ServeDir::new(directory));
    }

    router
        .with_state(state)
        .route_layer(middleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file. let it in memory.
    let config = Configuration::default().read()?;

    let store: Arc<dyn AccountStore> = match &config.postgres {
        Some(postgres) => Arc::new(PgStore::new(database::connect(postgres).await?)),
        None => {
            tracing::warn!("missing `postgres` entry on `config.yaml` file, accounts are kept in memory");
            Arc::new(MemoryStore::default())
        },
    };

    let argon2 = config.argon2.clone().unwrap_or_default();
    let hasher = Argon2PasswordHasher::new(argon2.memory_cost, argon2.iterations, argon2.parallelism)?;

    // handle jwt.
    let Some(secret) = config.jwt_secret() else {
        return Err("missing `token.jwt_secret` entry on `config.yaml` file or `JWT_SECRET` variable".into());
    };
    let mut tokens = JwtIssuer::new(&secret)?;
    if let Some(issuer) = config.token.as_ref().and_then(|token| token.issuer.as_ref()) {
        tokens = tokens.with_issuer(issuer);
    }

    // handle mail sender.
    let notifier: Arc<dyn Notifier> = match &config.mail {
        Some(mail) => Arc::new(SmtpNotifier::new(mail, config.accounts.otp_ttl_minutes)?),
        None => {
            tracing::warn!("missing `mail` entry on `config.yaml` file, passcodes are only logged");
            Arc::new(LogNotifier)
        },
    };

    let (images, uploads): (Arc<dyn ImageStore>, Option<PathBuf>) = match &config.images {
        Some(Images::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
        }) => (Arc::new(CloudinaryImageStore::new(cloud_name, api_key, api_secret)), None),
        Some(Images::Local {
            directory,
            public_url,
        }) => (
            Arc::new(LocalImageStore::new(directory.clone(), public_url)),
            Some(directory.clone()),
        ),
        None => {
            let public_url = format!("{}/{DEFAULT_UPLOADS}", config.url.trim_end_matches('/'));
            (
                Arc::new(LocalImageStore::new(DEFAULT_UPLOADS, &public_url)),
                Some(PathBuf::from(DEFAULT_UPLOADS)),
            )
        },
    };

    let mut state = AppState::new(
        Arc::clone(&config),
        Services {
            store,
            hasher: Arc::new(hasher),
            tokens: Arc::new(tokens),
            notifier,
            images,
            codes: Arc::new(OsRngCodes),
            clock: Arc::new(SystemClock),
        },
    );

    if let Some(uploads) = uploads {
        state = state.with_uploads(uploads);
    }
    if config.telemetry.prometheus {
        state = state.with_metrics(telemetry::setup_metrics_recorder()?);
    }

    Ok(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::Response;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::util::ServiceExt;

    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::image::RecordingImageStore;
    use crate::adapters::mail::RecordingNotifier;
    use crate::adapters::random::FixedCodes;

    const SECRET: &str = "http-secret-http-secret-http-secret";

    /// Whole application over in-memory adapters.
    pub struct TestApp {
        pub router: Router,
        pub store: Arc<MemoryStore>,
        pub notifier: Arc<RecordingNotifier>,
        pub images: Arc<RecordingImageStore>,
    }

    impl TestApp {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::default());
            let notifier = Arc::new(RecordingNotifier::default());
            let images = Arc::new(RecordingImageStore::default());

            let state = AppState::new(
                Arc::new(Configuration::default()),
                Services {
                    store: store.clone(),
                    hasher: Arc::new(Argon2PasswordHasher::new(1024, 1, 1).unwrap()),
                    tokens: Arc::new(JwtIssuer::new(SECRET).unwrap()),
                    notifier: notifier.clone(),
                    images: images.clone(),
                    codes: Arc::new(FixedCodes::new("424242")),
                    clock: Arc::new(ManualClock::new(chrono::Utc::now())),
                },
            );

            Self {
                router: app(state),
                store,
                notifier,
                images,
            }
        }

        /// MUST NEVER be used in production.
        pub async fn send(
            &self,
            method: Method,
            path: &str,
            token: Option<&str>,
            content_type: &str,
            body: impl Into<Body>,
        ) -> Response<Body> {
            let mut request = Request::builder()
                .method(method)
                .uri(path)
                .header(header::CONTENT_TYPE, content_type);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }

            self.router
                .clone()
                .oneshot(request.body(body.into()).unwrap())
                .await
                .unwrap()
        }

        pub async fn request(
            &self,
            method: Method,
            path: &str,
            token: Option<&str>,
            body: String,
        ) -> Response<Body> {
            self.send(method, path, token, "application/json", body).await
        }

        /// Signs up `jane@example.com` for `role`, optionally verifying it.
        /// Returns the signup token and the profile id.
        pub async fn register(&self, role: Role, verify: bool) -> (String, String) {
            let prefix = format!("/api/{role}s");
            let body = json!({
                "fullName": "Jane Doe",
                "email": "jane@example.com",
                "password": "Abcd123!@",
                "role": role.as_str(),
                "contact": "9999999999",
                "username": "jane",
                "terms": true,
            })
            .to_string();

            let response = self
                .request(Method::POST, &format!("{prefix}/sign-up"), None, body)
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            let envelope = body_json(response).await;

            if verify {
                let code = self.notifier.sent().last().unwrap().code.clone();
                let body = json!({ "email": "jane@example.com", "otp": code }).to_string();
                let response = self
                    .request(
                        Method::PUT,
                        &format!("{prefix}/verify-account/registration"),
                        None,
                        body,
                    )
                    .await;
                assert_eq!(response.status(), StatusCode::OK);
            }

            (
                envelope["token"].as_str().unwrap().to_owned(),
                envelope["user"]["id"].as_str().unwrap().to_owned(),
            )
        }
    }

    pub async fn body_json(response: Response<Body>) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = TestApp::new();
        let response = app
            .request(Method::GET, "/api/moderators/login", None, String::new())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_roles_share_one_identity_store() {
        let app = TestApp::new();
        app.register(Role::Seller, true).await;

        // The verified seller owns the email for every role.
        let body = json!({
            "fullName": "Jane Doe",
            "email": "jane@example.com",
            "password": "Abcd123!@",
            "role": "admin",
            "contact": "8888888888",
        })
        .to_string();
        let response = app
            .request(Method::POST, "/api/admins/sign-up", None, body)
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(app.store.identity_count().await, 1);
    }
}
