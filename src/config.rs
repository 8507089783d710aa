//! Configuration manager for Tessera.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;
use crate::application::usecases::AccountSettings;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";
const JWT_SECRET_ENV: &str = "JWT_SECRET";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    #[serde(default)]
    pub name: String,
    /// Public URL of current instance.
    #[serde(default)]
    pub url: String,
    /// Socket address to bind.
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Account lifecycle tunables.
    #[serde(default)]
    pub accounts: Accounts,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
    /// Related to passcode emails.
    #[serde(skip_serializing)]
    pub mail: Option<Mail>,
    /// Where profile pictures go, written `images: { local: {...} }`.
    #[serde(
        default,
        skip_serializing,
        with = "serde_yaml::with::singleton_map_recursive"
    )]
    pub images: Option<Images>,
    #[serde(default)]
    pub telemetry: Telemetry,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_owned()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: String::default(),
            url: String::default(),
            address: default_address(),
            version: String::default(),
            path: PathBuf::default(),
            accounts: Accounts::default(),
            token: None,
            postgres: None,
            argon2: None,
            mail: None,
            images: None,
            telemetry: Telemetry::default(),
        }
    }
}

/// Account lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Accounts {
    /// Lifetime of a passcode.
    pub otp_ttl_minutes: i64,
    /// Lifetime of the token returned at registration.
    pub signup_token_ttl_years: i64,
    /// Lifetime of the token returned at login.
    pub login_token_ttl_hours: i64,
    /// Refuse logins until the email is verified.
    pub require_verified_login: bool,
}

impl Default for Accounts {
    fn default() -> Self {
        Self {
            otp_ttl_minutes: 10,
            signup_token_ttl_years: 1,
            login_token_ttl_hours: 24,
            require_verified_login: false,
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
        }
    }
}

/// SMTP configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mail {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Port 465 uses implicit TLS, any other port STARTTLS.
    #[serde(default)]
    pub tls: bool,
    pub from_address: String,
    pub from_name: String,
}

/// Image hosting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Images {
    Cloudinary {
        cloud_name: String,
        api_key: String,
        api_secret: String,
    },
    Local {
        directory: PathBuf,
        public_url: String,
    },
}

/// Json Web Token configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// HMAC secret, `JWT_SECRET` takes precedence.
    pub jwt_secret: Option<String>,
    /// Update token issuer.
    /// Default is `tessera`.
    pub issuer: Option<String>,
}

/// Telemetry exporters.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    /// Export spans over OTLP.
    pub otlp: bool,
    /// Serve Prometheus metrics on `/metrics`.
    pub prometheus: bool,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return Ok(Arc::new(self.error(err)));
                        },
                    };

                // set app version.
                config.version = VERSION.to_owned();

                if !config.url.is_empty() {
                    config.url = self.normalize_url(&config.url)?;
                }

                Ok(Arc::new(config))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or malformed");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }

    /// Secret used to sign tokens, environment first.
    pub fn jwt_secret(&self) -> Option<String> {
        std::env::var(JWT_SECRET_ENV).ok().or_else(|| {
            self.token
                .as_ref()
                .and_then(|token| token.jwt_secret.clone())
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Use case tunables derived from `accounts`.
    pub fn settings(&self) -> AccountSettings {
        AccountSettings {
            otp_ttl: TimeDelta::minutes(self.accounts.otp_ttl_minutes),
            signup_token_ttl: TimeDelta::days(self.accounts.signup_token_ttl_years * 365),
            login_token_ttl: TimeDelta::hours(self.accounts.login_token_ttl_hours),
            require_verified_login: self.accounts.require_verified_login,
        }
    }
}
