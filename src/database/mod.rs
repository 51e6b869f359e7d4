pub mod manager;
pub mod models;
pub mod postgres;

pub use manager::{connect, health_check, run_migrations};
