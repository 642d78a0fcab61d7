// handlers/public/mod.rs - Public handlers (no authentication required)
pub mod auth;
pub mod database;
pub mod ecopontos;
pub mod health;
pub mod sugestoes;
