//! Mentor services: entity tree, catalog listings, training management,
//! session lifecycle, role assignment and profile notifications.

pub mod access;
pub mod catalog;
pub mod config;
pub mod entity;
pub mod notice;
pub mod profile;
pub mod role;
pub mod session;
pub mod training;

pub use access::{AccessPolicy, RoleAccess, ensure_default_roles};
pub use catalog::CatalogService;
pub use config::MentorConfig;
pub use entity::EntityService;
pub use notice::{Notice, NoticeLevel, Notices};
pub use profile::ProfileService;
pub use role::{ReferentRule, RoleService};
pub use session::{RefreshReport, SessionLifecycle};
pub use training::TrainingService;
