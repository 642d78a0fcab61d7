// handlers/mod.rs - Route handlers grouped by security tier
//
// Public (no auth) → Protected (bearer token verified by the identity service)
pub mod public;
pub mod protected;
pub mod utils;
