//! Mentor Core: domain models, error taxonomy, and the collaborator
//! traits shared by every other crate.
//!
//! Nothing in here talks to a store; persistence, the course engine and
//! message delivery are reached through the traits in [`repository`].

pub mod error;
pub mod lifecycle;
pub mod models;
pub mod multi_value;
pub mod repository;
