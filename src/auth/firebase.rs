use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AuthError, IdentityVerifier, ServiceAccountTokenSource};
use crate::types::Identity;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const KEY_CACHE_SECS: i64 = 3600;
/// Minimum age of the cached key set before an unknown key id triggers a refetch
const KEY_REFETCH_SECS: i64 = 60;

/// Base URLs of the Google services used for authentication
#[derive(Debug, Clone)]
pub struct AuthEndpoints {
    pub identity_toolkit: String,
    pub signing_keys: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            identity_toolkit: IDENTITY_TOOLKIT_URL.to_string(),
            signing_keys: SECURE_TOKEN_JWKS_URL.to_string(),
        }
    }
}

/// Firebase Authentication: accounts through Identity Toolkit, ID tokens
/// verified locally against Google's published signing keys.
pub struct FirebaseAuth {
    client: reqwest::Client,
    tokens: Arc<ServiceAccountTokenSource>,
    endpoints: AuthEndpoints,
    keys: RwLock<Option<CachedKeys>>,
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: DateTime<Utc>,
}

/// Claims of a Firebase ID token
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

impl FirebaseAuth {
    pub fn new(client: reqwest::Client, tokens: Arc<ServiceAccountTokenSource>) -> Self {
        Self::with_endpoints(client, tokens, AuthEndpoints::default())
    }

    pub fn with_endpoints(
        client: reqwest::Client,
        tokens: Arc<ServiceAccountTokenSource>,
        endpoints: AuthEndpoints,
    ) -> Self {
        Self {
            client,
            tokens,
            endpoints,
            keys: RwLock::new(None),
        }
    }

    fn project_id(&self) -> &str {
        self.tokens.project_id()
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id()]);
        validation.set_issuer(&[issuer(self.project_id())]);
        validation
    }

    /// Public key for `kid`.
    ///
    /// The key set is refetched when older than an hour, or when `kid` is unknown
    /// and the set is older than a minute. Unknown ids never refetch more often.
    async fn signing_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        {
            let keys = self.keys.read().await;
            if let Some(cached) = keys.as_ref() {
                let age = Utc::now() - cached.fetched_at;
                if age < Duration::seconds(KEY_CACHE_SECS) {
                    if let Some(jwk) = cached.set.find(kid) {
                        return Ok(jwk.clone());
                    }
                    if age < Duration::seconds(KEY_REFETCH_SECS) {
                        return Err(unknown_key(kid));
                    }
                }
            }
        }

        let set: JwkSet = self
            .client
            .get(&self.endpoints.signing_keys)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::debug!("Fetched {} token signing keys", set.keys.len());

        let found = set.find(kid).cloned();
        *self.keys.write().await = Some(CachedKeys {
            set,
            fetched_at: Utc::now(),
        });

        found.ok_or_else(|| unknown_key(kid))
    }
}

fn unknown_key(kid: &str) -> AuthError {
    AuthError::InvalidToken(format!("unknown key id '{}'", kid))
}

fn issuer(project_id: &str) -> String {
    format!("https://securetoken.google.com/{}", project_id)
}

/// Identity Toolkit error messages look like `EMAIL_EXISTS` or `WEAK_PASSWORD : ...`
fn is_duplicate_email(message: &str) -> bool {
    message.starts_with("EMAIL_EXISTS") || message.starts_with("DUPLICATE_EMAIL")
}

#[async_trait]
impl IdentityVerifier for FirebaseAuth {
    async fn create_identity(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/projects/{}/accounts",
            self.endpoints.identity_toolkit,
            self.project_id()
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: SignUpResponse = response.json().await?;
            return Ok(body.local_id);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();

        if is_duplicate_email(&message) {
            return Err(AuthError::EmailInUse);
        }

        Err(AuthError::Remote {
            status: status.as_u16(),
            message,
        })
    }

    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing key id".to_string()))?;

        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let data = decode::<IdTokenClaims>(token, &key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }

        Ok(Identity {
            uid: data.claims.sub,
            email: data.claims.email,
            claims: data.claims.extra,
        })
    }
}
