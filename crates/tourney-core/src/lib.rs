//! Turns generated tournament planning documents into persisted plannings,
//! matches and pools.

pub mod generator;
pub mod planning;
pub mod store;
