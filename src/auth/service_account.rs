use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::AuthError;
use crate::config::ServiceAccount;

/// OAuth2 scopes needed for the Realtime Database and Identity Toolkit REST APIs
pub const SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform \
https://www.googleapis.com/auth/firebase.database \
https://www.googleapis.com/auth/identitytoolkit \
https://www.googleapis.com/auth/userinfo.email";

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// Claims of the self-signed assertion exchanged for an access token
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    pub fn new(account: &ServiceAccount, now: DateTime<Utc>) -> Self {
        Self {
            iss: account.client_email.clone(),
            scope: SCOPES.to_string(),
            aud: account.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Access tokens for the service account, refreshed shortly before expiry
pub struct ServiceAccountTokenSource {
    client: reqwest::Client,
    account: ServiceAccount,
    key: EncodingKey,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    /// Fails when the private key is not a PEM encoded RSA key
    pub fn new(client: reqwest::Client, account: ServiceAccount) -> Result<Self, AuthError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| AuthError::Credentials(format!("invalid private key: {}", e)))?;

        Ok(Self {
            client,
            account,
            key,
            cached: RwLock::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    pub async fn access_token(&self) -> Result<String, AuthError> {
        // Fast path: try read lock
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now() {
                    return Ok(token.value.clone());
                }
            }
        }

        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *self.cached.write().await = Some(fresh);

        Ok(value)
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = AssertionClaims::new(&self.account, now);
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| AuthError::Credentials(format!("could not sign assertion: {}", e)))
    }

    async fn fetch(&self) -> Result<CachedToken, AuthError> {
        let now = Utc::now();
        let assertion = self.sign_assertion(now)?;

        let response = self
            .client
            .post(&self.account.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!("Token exchange for {} failed: {}", self.account.client_email, message);
            return Err(AuthError::Credentials(format!(
                "token endpoint responded with status {}: {}",
                status.as_u16(),
                message
            )));
        }

        let body: TokenResponse = response.json().await?;
        tracing::debug!("Obtained access token valid for {}s", body.expires_in);

        Ok(CachedToken {
            value: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        })
    }
}
