// handlers/protected/mod.rs - Handlers behind middleware::require_identity
//
// Every handler here can rely on an `Identity` in request extensions.
pub mod users;
