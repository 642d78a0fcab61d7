pub mod firebase;
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use firebase::RealtimeDatabase;
pub use memory::MemoryStore;

/// Errors from a DocumentStore backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("database responded with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected database response: {0}")]
    Decode(String),

    #[error("database authorization failed: {0}")]
    Credentials(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Hierarchical JSON tree addressed by slash-separated paths.
///
/// The empty path (or `/`) addresses the root of the tree.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the subtree at `path`; `None` when nothing is stored there
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace whatever is stored at `path`
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Shallow merge of `fields` into the node at `path`. `null` fields are removed.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Append `value` under `path` with a store-generated key and return that key
    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError>;
}

/// Non-empty path segments, ignoring leading, trailing and doubled slashes
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Whether `key` can name a single child node.
///
/// Realtime Database keys cannot contain `.`, `$`, `#`, `[`, `]`, `/` or ASCII
/// control characters, and are limited to 768 bytes.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 768
        && !key
            .chars()
            .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_ascii_control())
}

const PUSH_CHARS: &[u8] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generate a 20 character push key: 8 characters of millisecond timestamp
/// followed by 12 random characters, so keys sort by creation time.
pub fn generate_push_key() -> String {
    let mut now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut key = [0u8; 20];

    for slot in key[..8].iter_mut().rev() {
        *slot = PUSH_CHARS[(now % 64) as usize];
        now /= 64;
    }

    let random = uuid::Uuid::new_v4();
    for (slot, byte) in key[8..].iter_mut().zip(random.as_bytes().iter()) {
        *slot = PUSH_CHARS[(*byte % 64) as usize];
    }

    key.iter().map(|b| *b as char).collect()
}
