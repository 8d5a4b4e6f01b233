//! Session domain model.
//!
//! A session is one scheduled run of a training, backed by its own course
//! in the course engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InPreparation,
    OpenedRegistration,
    InProgress,
    Completed,
    Archived,
    Reported,
    Cancelled,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 7] = [
        Self::InPreparation,
        Self::OpenedRegistration,
        Self::InProgress,
        Self::Completed,
        Self::Archived,
        Self::Reported,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InPreparation => "in_preparation",
            Self::OpenedRegistration => "opened_registration",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Archived => "archived",
            Self::Reported => "reported",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Human-readable label, also matched by free-text catalog search.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InPreparation => "In preparation",
            Self::OpenedRegistration => "Open for registration",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
            Self::Archived => "Archived",
            Self::Reported => "Postponed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Statuses whose label contains `term`, case-insensitively.
    pub fn matching_label(term: &str) -> Vec<SessionStatus> {
        let term = term.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|status| status.label().to_lowercase().contains(&term))
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived | Self::Cancelled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration terms of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationTerms {
    /// Learners enrol themselves (`inscriptionlibre`).
    OpenEnrolment,
    /// Enrolment is handled by managers.
    Managed,
    /// Any other configured value, kept verbatim.
    Other(String),
}

impl RegistrationTerms {
    pub const OPEN_ENROLMENT: &'static str = "inscriptionlibre";

    pub fn as_str(&self) -> &str {
        match self {
            Self::OpenEnrolment => Self::OPEN_ENROLMENT,
            Self::Managed => "inscriptionaccompagnee",
            Self::Other(raw) => raw,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            Self::OPEN_ENROLMENT => Self::OpenEnrolment,
            "inscriptionaccompagnee" => Self::Managed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_open_enrolment(&self) -> bool {
        matches!(self, Self::OpenEnrolment)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub training_id: Uuid,
    pub training_name: String,
    pub entity_id: Uuid,
    pub entity_name: String,
    /// Collection tags inherited from the training.
    pub collection: String,
    pub course_id: Uuid,
    pub name: String,
    pub shortname: String,
    pub session_number: u32,
    pub status: SessionStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub terms: RegistrationTerms,
    pub max_participants: Option<u32>,
    /// Bumped on every status write; guards concurrent transitions.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    pub training_id: Uuid,
    /// Owning entity; the training's entity when `None`.
    pub entity_id: Option<Uuid>,
    /// Session name; the training name when `None`.
    pub name: Option<String>,
    pub shortname: String,
    pub terms: RegistrationTerms,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_participants: Option<u32>,
}

/// Storage-level creation input, fully resolved.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub training_id: Uuid,
    pub entity_id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub shortname: String,
    pub session_number: u32,
    pub terms: RegistrationTerms,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_participants: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateSession {
    pub name: Option<String>,
    pub shortname: Option<String>,
    pub terms: Option<RegistrationTerms>,
    /// `Some(None)` clears the date.
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub max_participants: Option<Option<u32>>,
}
