//! SurrealDB-backed [`CourseEngine`]: courses, enrolment methods and
//! enrolments stored alongside the catalog.

use chrono::{DateTime, Utc};
use mentor_core::error::MentorResult;
use mentor_core::models::course::{
    Course, CourseRole, CreateCourse, EnrolInstance, EnrolMethod, Enrolment,
};
use mentor_core::repository::CourseEngine;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct CourseRow {
    record_id: String,
    fullname: String,
    shortname: String,
    visible: bool,
    created_at: DateTime<Utc>,
}

impl CourseRow {
    fn try_into_course(self) -> Result<Course, DbError> {
        Ok(Course {
            id: parse_uuid(&self.record_id, "course")?,
            fullname: self.fullname,
            shortname: self.shortname,
            visible: self.visible,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct InstanceRow {
    record_id: String,
    course_id: String,
    method: String,
    enabled: bool,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

impl InstanceRow {
    fn try_into_instance(self) -> Result<EnrolInstance, DbError> {
        let method = EnrolMethod::parse(&self.method)
            .ok_or_else(|| DbError::Decode(format!("unknown enrol method: {}", self.method)))?;
        Ok(EnrolInstance {
            id: parse_uuid(&self.record_id, "enrol instance")?,
            course_id: parse_uuid(&self.course_id, "course")?,
            method,
            enabled: self.enabled,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct EnrolmentRow {
    course_id: String,
    user_id: String,
    role: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

impl EnrolmentRow {
    fn try_into_enrolment(self) -> Result<Enrolment, DbError> {
        let role = CourseRole::parse(&self.role)
            .ok_or_else(|| DbError::Decode(format!("unknown course role: {}", self.role)))?;
        Ok(Enrolment {
            course_id: parse_uuid(&self.course_id, "course")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            role,
        })
    }
}

/// Rows touched by an UPDATE; only used to detect missing records.
#[derive(Debug, SurrealValue)]
struct TouchedRow {
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

const SELECT_INSTANCE: &str = "SELECT meta::id(id) AS record_id, course_id, method, enabled, \
     created_at FROM";

/// Course engine living in the same SurrealDB database as the catalog.
#[derive(Clone)]
pub struct SurrealCourseEngine<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCourseEngine<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_instance(&self, id: &str) -> Result<EnrolInstance, DbError> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_INSTANCE} type::record('enrol_instance', $id)"
            ))
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<InstanceRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("enrol_instance", id))?
            .try_into_instance()
    }
}

impl<C: Connection> CourseEngine for SurrealCourseEngine<C> {
    async fn create_course(&self, input: CreateCourse) -> MentorResult<Course> {
        let id = Uuid::now_v7();

        let result = self
            .db
            .query(
                "CREATE type::record('course', $id) SET \
                 fullname = $fullname, shortname = $shortname, \
                 visible = $visible RETURN NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("fullname", input.fullname))
            .bind(("shortname", input.shortname))
            .bind(("visible", input.visible))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        self.get_course(id).await
    }

    async fn get_course(&self, course_id: Uuid) -> MentorResult<Course> {
        let id_str = course_id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('course', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CourseRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("course", &id_str))?
            .try_into_course()?)
    }

    async fn set_course_visibility(&self, course_id: Uuid, visible: bool) -> MentorResult<()> {
        let id_str = course_id.to_string();
        let mut result = self
            .db
            .query("UPDATE type::record('course', $id) SET visible = $visible")
            .bind(("id", id_str.clone()))
            .bind(("visible", visible))
            .await
            .map_err(DbError::from)?;

        let touched: Vec<TouchedRow> = result.take(0).map_err(DbError::from)?;
        if touched.is_empty() {
            return Err(DbError::not_found("course", id_str).into());
        }
        Ok(())
    }

    async fn get_enrolment_instances(&self, course_id: Uuid) -> MentorResult<Vec<EnrolInstance>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_INSTANCE} enrol_instance WHERE course_id = $course_id \
                 ORDER BY record_id ASC"
            ))
            .bind(("course_id", course_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InstanceRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(InstanceRow::try_into_instance)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn set_enrolment_instance_status(
        &self,
        instance_id: Uuid,
        enabled: bool,
    ) -> MentorResult<()> {
        let id_str = instance_id.to_string();
        let mut result = self
            .db
            .query("UPDATE type::record('enrol_instance', $id) SET enabled = $enabled")
            .bind(("id", id_str.clone()))
            .bind(("enabled", enabled))
            .await
            .map_err(DbError::from)?;

        let touched: Vec<TouchedRow> = result.take(0).map_err(DbError::from)?;
        if touched.is_empty() {
            return Err(DbError::not_found("enrol_instance", id_str).into());
        }
        Ok(())
    }

    async fn create_enrolment_instance(
        &self,
        course_id: Uuid,
        method: EnrolMethod,
    ) -> MentorResult<EnrolInstance> {
        let id = Uuid::now_v7().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('enrol_instance', $id) SET \
                 course_id = $course_id, method = $method, enabled = true \
                 RETURN NONE",
            )
            .bind(("id", id.clone()))
            .bind(("course_id", course_id.to_string()))
            .bind(("method", method.as_str()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.fetch_instance(&id).await?)
    }

    async fn enrol_user(&self, course_id: Uuid, user_id: Uuid, role: CourseRole) -> MentorResult<()> {
        // Re-enrolling replaces the previous role.
        self.db
            .query(
                "DELETE enrolment WHERE course_id = $course_id AND user_id = $user_id; \
                 CREATE enrolment SET course_id = $course_id, user_id = $user_id, \
                 role = $role RETURN NONE;",
            )
            .bind(("course_id", course_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("role", role.as_str()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_enrolled_users(&self, course_id: Uuid) -> MentorResult<Vec<Enrolment>> {
        let mut result = self
            .db
            .query(
                "SELECT course_id, user_id, role, created_at FROM enrolment \
                 WHERE course_id = $course_id ORDER BY created_at ASC",
            )
            .bind(("course_id", course_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EnrolmentRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(EnrolmentRow::try_into_enrolment)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
