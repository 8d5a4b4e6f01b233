//! SurrealDB implementation of [`RoleRepository`].
//!
//! Roles are keyed by shortname. Assignments are `has_role` edges from a
//! profile to a role, carrying the entity they apply to.

use chrono::{DateTime, Utc};
use mentor_core::error::{MentorError, MentorResult};
use mentor_core::models::role::{CreateRole, Role, RoleAssignment};
use mentor_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    name: String,
    capabilities: Vec<String>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            shortname: row.record_id,
            name: row.name,
            capabilities: row.capabilities,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    user_id: String,
    role: String,
    entity_id: String,
    capabilities: Option<Vec<String>>,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn try_into_assignment(self) -> Result<RoleAssignment, DbError> {
        Ok(RoleAssignment {
            user_id: parse_uuid(&self.user_id, "user")?,
            role: self.role,
            entity_id: parse_uuid(&self.entity_id, "entity")?,
            capabilities: self.capabilities.unwrap_or_default(),
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

const SELECT_ROLE: &str = "SELECT meta::id(id) AS record_id, name, capabilities FROM";

/// Role shortnames end up inside record ids of RELATE statements.
fn check_shortname(shortname: &str) -> MentorResult<()> {
    let valid = !shortname.is_empty()
        && shortname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MentorError::validation(format!(
            "invalid role shortname: {shortname:?}"
        )))
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn assignment_exists(
        &self,
        user_id: &str,
        role: &str,
        entity_id: &str,
    ) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM has_role WHERE \
                 in = type::record('profile', $user_id) AND \
                 out = type::record('role', $role) AND \
                 entity_id = $entity_id GROUP ALL",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role", role.to_string()))
            .bind(("entity_id", entity_id.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> MentorResult<Role> {
        check_shortname(&input.shortname)?;
        let capabilities: Vec<String> = input
            .capabilities
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $shortname) SET \
                 name = $name, capabilities = $capabilities RETURN NONE",
            )
            .bind(("shortname", input.shortname.clone()))
            .bind(("name", input.name))
            .bind(("capabilities", capabilities))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        self.get(&input.shortname).await
    }

    async fn get(&self, shortname: &str) -> MentorResult<Role> {
        let mut result = self
            .db
            .query(format!("{SELECT_ROLE} type::record('role', $shortname)"))
            .bind(("shortname", shortname.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(Role::from)
            .ok_or_else(|| DbError::not_found("role", shortname).into())
    }

    async fn exists(&self, shortname: &str) -> MentorResult<bool> {
        match self.get(shortname).await {
            Ok(_) => Ok(true),
            Err(MentorError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list(&self) -> MentorResult<Vec<Role>> {
        let mut result = self
            .db
            .query(format!("{SELECT_ROLE} role ORDER BY record_id ASC"))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn assign(&self, user_id: Uuid, role: &str, entity_id: Uuid) -> MentorResult<bool> {
        check_shortname(role)?;
        let user_id_str = user_id.to_string();
        let entity_id_str = entity_id.to_string();

        if self
            .assignment_exists(&user_id_str, role, &entity_id_str)
            .await?
        {
            return Ok(false);
        }

        let query = format!(
            "RELATE profile:`{user_id_str}` -> has_role -> role:`{role}` \
             SET entity_id = $entity_id;"
        );

        self.db
            .query(query)
            .bind(("entity_id", entity_id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(true)
    }

    async fn unassign(&self, user_id: Uuid, role: &str, entity_id: Uuid) -> MentorResult<()> {
        self.db
            .query(
                "DELETE has_role WHERE \
                 in = type::record('profile', $user_id) AND \
                 out = type::record('role', $role) AND \
                 entity_id = $entity_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role", role.to_string()))
            .bind(("entity_id", entity_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_user_assignments(&self, user_id: Uuid) -> MentorResult<Vec<RoleAssignment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(in) AS user_id, meta::id(out) AS role, \
                 entity_id, out.capabilities AS capabilities, created_at \
                 FROM has_role WHERE in = type::record('profile', $user_id) \
                 ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(AssignmentRow::try_into_assignment)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn users_with_role(&self, role: &str, entity_id: Uuid) -> MentorResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(in) FROM has_role WHERE \
                 out = type::record('role', $role) AND entity_id = $entity_id",
            )
            .bind(("role", role.to_string()))
            .bind(("entity_id", entity_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        let mut users = ids
            .iter()
            .map(|raw| parse_uuid(raw, "user"))
            .collect::<Result<Vec<_>, _>>()?;
        users.sort();
        users.dedup();
        Ok(users)
    }
}
