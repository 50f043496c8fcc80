//! PostgreSQL persistence for tournament plannings, their matches and pools.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
