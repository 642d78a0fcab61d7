use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Startup configuration errors. Any of these aborts the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),

    #[error("FIREBASE_CONFIG_JSON is not valid JSON: {0}")]
    InvalidCredentials(#[from] serde_json::Error),

    #[error("could not read credentials file {path}: {source}")]
    CredentialsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("service account credential is missing field '{0}'")]
    IncompleteCredentials(&'static str),

    #[error("invalid database URL '{0}'")]
    InvalidDatabaseUrl(String),

    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub firebase: FirebaseConfig,
    pub http: HttpClientConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub credentials: ServiceAccount,
    pub database_url: Url,
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Applied to every outbound call to Firebase
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

/// Google service account key, as downloaded from the Firebase console
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccount {
    /// Parse and check the fields the Firebase clients rely on
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let account: ServiceAccount = serde_json::from_str(raw)?;

        if account.project_id.trim().is_empty() {
            return Err(ConfigError::IncompleteCredentials("project_id"));
        }
        if account.client_email.trim().is_empty() {
            return Err(ConfigError::IncompleteCredentials("client_email"));
        }
        if account.private_key.trim().is_empty() {
            return Err(ConfigError::IncompleteCredentials("private_key"));
        }

        Ok(account)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credentials = match (var("FIREBASE_CONFIG_JSON"), var("FIREBASE_CONFIG_PATH")) {
            (Some(raw), _) => ServiceAccount::from_json(&raw)?,
            (None, Some(path)) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::CredentialsFile { path, source })?;
                ServiceAccount::from_json(&raw)?
            }
            (None, None) => return Err(ConfigError::Missing("FIREBASE_CONFIG_JSON")),
        };

        let raw_url = var("FIREBASE_DB_URL").ok_or(ConfigError::Missing("FIREBASE_DB_URL"))?;
        let database_url = parse_database_url(&raw_url)?;

        let port = match var("PORT") {
            Some(v) => v.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match var("HTTP_TIMEOUT_SECS") {
            Some(v) => v.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS",
                value: v,
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            server: ServerConfig {
                host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
            },
            firebase: FirebaseConfig {
                credentials,
                database_url,
            },
            http: HttpClientConfig {
                timeout: Duration::from_secs(timeout_secs),
                connect_timeout: Duration::from_secs(10),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Normalize so that `Url::join` keeps any path prefix of the database URL
fn parse_database_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    let url = Url::parse(&with_slash)
        .map_err(|_| ConfigError::InvalidDatabaseUrl(trimmed.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::InvalidDatabaseUrl(trimmed.to_string())),
    }
}
