//! # Database
//!
//! PostgreSQL connection pooling and embedded schema migrations. Order persistence
//! itself lives in [`crate::repository::postgres`].

pub mod connection;
pub mod migrations;

pub use connection::DatabaseConnection;
pub use migrations::{run_migrations, MIGRATOR};
