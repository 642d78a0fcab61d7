use std::sync::Arc;

use crate::auth::{AuthError, FirebaseAuth, IdentityVerifier, ServiceAccountTokenSource};
use crate::config::AppConfig;
use crate::database::{DocumentStore, RealtimeDatabase};

/// External collaborators shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityVerifier>) -> Self {
        Self { store, identity }
    }

    /// Firebase-backed clients sharing one HTTP client and one service account token
    pub fn firebase(config: &AppConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(config.http.timeout)
            .connect_timeout(config.http.connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens = Arc::new(ServiceAccountTokenSource::new(
            client.clone(),
            config.firebase.credentials.clone(),
        )?);

        let store = RealtimeDatabase::new(
            client.clone(),
            config.firebase.database_url.clone(),
            tokens.clone(),
        );
        let identity = FirebaseAuth::new(client, tokens);

        Ok(Self::new(Arc::new(store), Arc::new(identity)))
    }
}
