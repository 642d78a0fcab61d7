//! Shared types used across the codebase

use serde_json::{Map, Value};

/// Verified caller identity, attached to requests by the auth middleware
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Subject id issued by the identity service
    pub uid: String,
    pub email: Option<String>,
    /// Remaining token claims, untouched
    pub claims: Map<String, Value>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
            claims: Map::new(),
        }
    }
}
