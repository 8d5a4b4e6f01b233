//! Repository and collaborator trait definitions.
//!
//! All operations are async. Services are generic over these traits so
//! they carry no dependency on the database crate; tests swap in doubles
//! implementing the same traits.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MentorResult;
use crate::models::{
    course::{Course, CourseRole, CreateCourse, EnrolInstance, EnrolMethod, Enrolment},
    entity::{CreateEntity, Entity, UpdateEntity},
    listing::ScopedQuery,
    profile::{CreateProfile, Profile, UpdateProfile},
    role::{CreateRole, Role, RoleAssignment},
    session::{NewSession, Session, SessionStatus, UpdateSession},
    training::{NewTraining, Training, TrainingChanges},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub trait EntityRepository: Send + Sync {
    fn create(&self, input: CreateEntity) -> impl Future<Output = MentorResult<Entity>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MentorResult<Entity>> + Send;
    fn get_by_shortname(
        &self,
        shortname: &str,
    ) -> impl Future<Output = MentorResult<Entity>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = MentorResult<Entity>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateEntity,
    ) -> impl Future<Output = MentorResult<Entity>> + Send;
    /// Direct children, in creation order.
    fn get_children(&self, parent_id: Uuid)
    -> impl Future<Output = MentorResult<Vec<Entity>>> + Send;
    fn list_main_entities(&self) -> impl Future<Output = MentorResult<Vec<Entity>>> + Send;
}

pub trait TrainingRepository: Send + Sync {
    fn create(&self, input: NewTraining) -> impl Future<Output = MentorResult<Training>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MentorResult<Training>> + Send;
    fn shortname_exists(&self, shortname: &str)
    -> impl Future<Output = MentorResult<bool>> + Send;
    fn update(
        &self,
        id: Uuid,
        changes: TrainingChanges,
    ) -> impl Future<Output = MentorResult<Training>> + Send;
    /// Trainings owned by any of the given entities, in creation order.
    fn list_by_entities(
        &self,
        entity_ids: &[Uuid],
    ) -> impl Future<Output = MentorResult<Vec<Training>>> + Send;
    fn search(
        &self,
        query: &ScopedQuery,
    ) -> impl Future<Output = MentorResult<PaginatedResult<Training>>> + Send;
    fn count(&self, query: &ScopedQuery) -> impl Future<Output = MentorResult<u64>> + Send;
}

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: NewSession) -> impl Future<Output = MentorResult<Session>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MentorResult<Session>> + Send;
    fn shortname_exists(&self, shortname: &str)
    -> impl Future<Output = MentorResult<bool>> + Send;
    /// One past the highest session number used for the training.
    fn next_session_number(
        &self,
        training_id: Uuid,
    ) -> impl Future<Output = MentorResult<u32>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateSession,
    ) -> impl Future<Output = MentorResult<Session>> + Send;
    /// Write a status if the stored version still equals
    /// `expected_version`; bumps the version. `Conflict` otherwise.
    fn update_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        expected_version: u64,
    ) -> impl Future<Output = MentorResult<Session>> + Send;
    fn list_by_status(
        &self,
        statuses: &[SessionStatus],
    ) -> impl Future<Output = MentorResult<Vec<Session>>> + Send;
    fn search(
        &self,
        query: &ScopedQuery,
    ) -> impl Future<Output = MentorResult<PaginatedResult<Session>>> + Send;
    fn count(&self, query: &ScopedQuery) -> impl Future<Output = MentorResult<u64>> + Send;
    /// Case-insensitive exact lookup on entity, training, session names
    /// and external id.
    fn find_exact(
        &self,
        entity_ids: &[Uuid],
        term: &str,
    ) -> impl Future<Output = MentorResult<Vec<Session>>> + Send;
}

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = MentorResult<Role>> + Send;
    fn get(&self, shortname: &str) -> impl Future<Output = MentorResult<Role>> + Send;
    fn exists(&self, shortname: &str) -> impl Future<Output = MentorResult<bool>> + Send;
    fn list(&self) -> impl Future<Output = MentorResult<Vec<Role>>> + Send;
    /// Returns `false` when the assignment already existed.
    fn assign(
        &self,
        user_id: Uuid,
        role: &str,
        entity_id: Uuid,
    ) -> impl Future<Output = MentorResult<bool>> + Send;
    fn unassign(
        &self,
        user_id: Uuid,
        role: &str,
        entity_id: Uuid,
    ) -> impl Future<Output = MentorResult<()>> + Send;
    fn get_user_assignments(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = MentorResult<Vec<RoleAssignment>>> + Send;
    fn users_with_role(
        &self,
        role: &str,
        entity_id: Uuid,
    ) -> impl Future<Output = MentorResult<Vec<Uuid>>> + Send;
}

pub trait ProfileRepository: Send + Sync {
    fn create(&self, input: CreateProfile) -> impl Future<Output = MentorResult<Profile>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MentorResult<Profile>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateProfile,
    ) -> impl Future<Output = MentorResult<Profile>> + Send;
}

// ---------------------------------------------------------------------------
// External collaborators
// ---------------------------------------------------------------------------

/// The host course engine: course visibility and enrolment methods.
pub trait CourseEngine: Send + Sync {
    fn create_course(&self, input: CreateCourse)
    -> impl Future<Output = MentorResult<Course>> + Send;
    fn get_course(&self, course_id: Uuid) -> impl Future<Output = MentorResult<Course>> + Send;
    fn set_course_visibility(
        &self,
        course_id: Uuid,
        visible: bool,
    ) -> impl Future<Output = MentorResult<()>> + Send;
    fn get_enrolment_instances(
        &self,
        course_id: Uuid,
    ) -> impl Future<Output = MentorResult<Vec<EnrolInstance>>> + Send;
    fn set_enrolment_instance_status(
        &self,
        instance_id: Uuid,
        enabled: bool,
    ) -> impl Future<Output = MentorResult<()>> + Send;
    fn create_enrolment_instance(
        &self,
        course_id: Uuid,
        method: EnrolMethod,
    ) -> impl Future<Output = MentorResult<EnrolInstance>> + Send;
    fn enrol_user(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        role: CourseRole,
    ) -> impl Future<Output = MentorResult<()>> + Send;
    fn get_enrolled_users(
        &self,
        course_id: Uuid,
    ) -> impl Future<Output = MentorResult<Vec<Enrolment>>> + Send;
}

/// Best-effort message delivery. `false` means the send failed; callers
/// never turn that into an error.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        user_id: Uuid,
        template: &str,
        context: serde_json::Value,
    ) -> impl Future<Output = bool> + Send;
}
