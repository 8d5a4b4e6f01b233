//! Training domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::multi_value::MultiValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Draft,
    Template,
    ElaborationCompleted,
    Archived,
}

impl TrainingStatus {
    pub const ALL: [TrainingStatus; 4] = [
        Self::Draft,
        Self::Template,
        Self::ElaborationCompleted,
        Self::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Template => "template",
            Self::ElaborationCompleted => "elaboration_completed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reusable course template owned by one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Training {
    pub id: Uuid,
    pub entity_id: Uuid,
    /// Display name of the owning entity, resolved at read time.
    pub entity_name: String,
    pub name: String,
    pub shortname: String,
    pub status: TrainingStatus,
    /// Canonical comma-joined collection tags.
    pub collection: String,
    /// Canonical comma-joined skill references.
    pub skills: String,
    pub idsirh: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTraining {
    pub entity_id: Uuid,
    pub name: String,
    pub shortname: String,
    pub status: TrainingStatus,
    pub collection: Option<MultiValue>,
    pub skills: Option<MultiValue>,
    pub idsirh: Option<String>,
}

/// Storage-level creation input with multi-values already normalized.
#[derive(Debug, Clone)]
pub struct NewTraining {
    pub entity_id: Uuid,
    pub name: String,
    pub shortname: String,
    pub status: TrainingStatus,
    pub collection: String,
    pub skills: String,
    pub idsirh: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTraining {
    pub name: Option<String>,
    pub shortname: Option<String>,
    pub status: Option<TrainingStatus>,
    pub collection: Option<MultiValue>,
    pub skills: Option<MultiValue>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub idsirh: Option<Option<String>>,
}

/// Storage-level update with multi-values already normalized.
#[derive(Debug, Clone, Default)]
pub struct TrainingChanges {
    pub name: Option<String>,
    pub shortname: Option<String>,
    pub status: Option<TrainingStatus>,
    pub collection: Option<String>,
    pub skills: Option<String>,
    pub idsirh: Option<Option<String>>,
}
