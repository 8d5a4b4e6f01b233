//! User profile domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::multi_value::MultiValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    /// Shortname of the user's main entity.
    pub main_entity: Option<String>,
    /// Shortnames of the user's secondary entities.
    pub secondary_entities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub main_entity: Option<String>,
    pub secondary_entities: Option<MultiValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProfile {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    /// `Some(None)` clears the main entity.
    pub main_entity: Option<Option<String>>,
    pub secondary_entities: Option<MultiValue>,
}
