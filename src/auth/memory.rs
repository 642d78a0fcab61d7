use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthError, IdentityVerifier};
use crate::types::Identity;

/// In-process identity service: an email registry plus explicitly issued tokens
#[derive(Default)]
pub struct MemoryIdentityVerifier {
    // lowercased email -> uid
    accounts: RwLock<HashMap<String, String>>,
    tokens: RwLock<HashMap<String, Identity>>,
}

impl MemoryIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token that verifies as `identity`
    pub async fn issue_token(&self, identity: Identity) -> String {
        let token = format!("memory-{}", Uuid::new_v4().simple());
        self.tokens.write().await.insert(token.clone(), identity);
        token
    }

    /// Issue a token for a previously created account
    pub async fn token_for_email(&self, email: &str) -> Option<String> {
        let uid = self.accounts.read().await.get(&email.to_lowercase()).cloned()?;
        Some(self.issue_token(Identity::new(uid, Some(email.to_string()))).await)
    }
}

#[async_trait]
impl IdentityVerifier for MemoryIdentityVerifier {
    async fn create_identity(&self, email: &str, _password: &str) -> Result<String, AuthError> {
        let mut accounts = self.accounts.write().await;
        let key = email.to_lowercase();

        if accounts.contains_key(&key) {
            return Err(AuthError::EmailInUse);
        }

        let uid = Uuid::new_v4().simple().to_string();
        accounts.insert(key, uid.clone());
        Ok(uid)
    }

    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }
}
