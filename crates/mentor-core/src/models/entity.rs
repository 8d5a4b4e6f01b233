//! Entity domain model.
//!
//! Entities form a strict tree of organizational units. An entity without
//! a parent is a *main entity*; trainings and sessions are owned by
//! entities and listed per subtree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::multi_value::MultiValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub name: String,
    /// Unique across all entities.
    pub shortname: String,
    /// `None` for a main entity.
    pub parent_id: Option<Uuid>,
    /// Region codes attached to the entity.
    pub regions: Vec<String>,
    /// Identifiers in the external HR/training registry (SIRH).
    pub sirh: Vec<String>,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    pub fn is_main_entity(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntity {
    pub name: String,
    pub shortname: String,
    pub parent_id: Option<Uuid>,
    pub regions: Option<MultiValue>,
    pub sirh: Option<MultiValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateEntity {
    pub name: Option<String>,
    pub shortname: Option<String>,
    pub regions: Option<MultiValue>,
    pub sirh: Option<MultiValue>,
    pub hidden: Option<bool>,
}
