//! Domain models for the Mentor catalog.

pub mod collection;
pub mod course;
pub mod entity;
pub mod listing;
pub mod profile;
pub mod role;
pub mod session;
pub mod training;
