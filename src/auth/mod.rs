pub mod firebase;
pub mod memory;
pub mod service_account;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Identity;

pub use firebase::{AuthEndpoints, FirebaseAuth};
pub use memory::MemoryIdentityVerifier;
pub use service_account::ServiceAccountTokenSource;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already in use")]
    EmailInUse,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("service account credentials rejected: {0}")]
    Credentials(String),

    #[error("identity service responded with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Managed identity service: account creation and bearer token verification
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Create an email/password identity and return its subject id
    async fn create_identity(&self, email: &str, password: &str) -> Result<String, AuthError>;

    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError>;
}
