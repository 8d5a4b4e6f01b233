//! Mentor Database: SurrealDB connection management, schema migrations
//! and implementations of the `mentor-core` traits.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repositories, the course engine and the message outbox
//!   ([`repository`])
//! - Listing filter composition ([`query`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod query;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::run_migrations;
