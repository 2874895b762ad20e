//! PostgreSQL repositories

pub mod http_source;
pub mod usage;
