//! Course-engine types: courses, enrolment methods and enrolments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub fullname: String,
    pub shortname: String,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourse {
    pub fullname: String,
    pub shortname: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrolMethod {
    /// Learners join on their own.
    SelfEnrol,
    /// Managers enrol learners.
    Manual,
}

impl EnrolMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfEnrol => "self",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "self" => Some(Self::SelfEnrol),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolInstance {
    pub id: Uuid,
    pub course_id: Uuid,
    pub method: EnrolMethod,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseRole {
    Participant,
    Trainer,
    Tutor,
}

impl CourseRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Trainer => "trainer",
            Self::Tutor => "tutor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "participant" => Some(Self::Participant),
            "trainer" => Some(Self::Trainer),
            "tutor" => Some(Self::Tutor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrolment {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub role: CourseRole,
}
