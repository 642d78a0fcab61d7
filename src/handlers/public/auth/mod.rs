// handlers/public/auth/mod.rs - Account creation
//
// Sign-in itself happens against Firebase Authentication directly; this API
// only creates accounts and their profile records.
pub mod register;

pub use register::register;
