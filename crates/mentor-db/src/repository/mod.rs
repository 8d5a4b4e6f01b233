//! SurrealDB repository implementations.

mod course;
mod entity;
mod message;
mod profile;
mod role;
mod session;
mod training;

pub use course::SurrealCourseEngine;
pub use entity::SurrealEntityRepository;
pub use message::{OutboxMessage, SurrealNotifier};
pub use profile::SurrealProfileRepository;
pub use role::SurrealRoleRepository;
pub use session::SurrealSessionRepository;
pub use training::SurrealTrainingRepository;
