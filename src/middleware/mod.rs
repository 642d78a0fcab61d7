pub mod auth;

pub use auth::{authenticate, extract_token, require_identity};
