//! Capability checks against entity-scoped role assignments.

use mentor_core::error::{MentorError, MentorResult};
use mentor_core::models::role::{Capability, default_roles};
use mentor_core::repository::{EntityRepository, RoleRepository};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::ancestor_chain;

/// Answers whether a user may act on an entity.
pub trait AccessPolicy: Send + Sync {
    fn has_capability(
        &self,
        user_id: Uuid,
        capability: Capability,
        entity_id: Uuid,
    ) -> impl Future<Output = MentorResult<bool>> + Send;

    /// `PermissionDenied` unless the user holds the capability.
    fn require(
        &self,
        user_id: Uuid,
        capability: Capability,
        entity_id: Uuid,
    ) -> impl Future<Output = MentorResult<()>> + Send {
        async move {
            if self.has_capability(user_id, capability, entity_id).await? {
                Ok(())
            } else {
                debug!(%user_id, %capability, %entity_id, "Capability check failed");
                Err(MentorError::PermissionDenied {
                    reason: format!("{capability} required on entity {entity_id}"),
                })
            }
        }
    }
}

/// Role-based policy: a capability granted at an entity also holds in
/// every entity below it.
pub struct RoleAccess<E: EntityRepository, R: RoleRepository> {
    entities: E,
    roles: R,
}

impl<E: EntityRepository, R: RoleRepository> RoleAccess<E, R> {
    pub fn new(entities: E, roles: R) -> Self {
        Self { entities, roles }
    }
}

impl<E: EntityRepository, R: RoleRepository> AccessPolicy for RoleAccess<E, R> {
    async fn has_capability(
        &self,
        user_id: Uuid,
        capability: Capability,
        entity_id: Uuid,
    ) -> MentorResult<bool> {
        let granting: Vec<Uuid> = self
            .roles
            .get_user_assignments(user_id)
            .await?
            .into_iter()
            .filter(|a| a.grants(capability))
            .map(|a| a.entity_id)
            .collect();
        if granting.is_empty() {
            return Ok(false);
        }

        let chain = ancestor_chain(&self.entities, entity_id).await?;
        Ok(chain.iter().any(|entity| granting.contains(&entity.id)))
    }
}

/// Create whichever default roles are missing; returns how many were
/// created.
pub async fn ensure_default_roles<R: RoleRepository>(roles: &R) -> MentorResult<usize> {
    let mut created = 0;
    for role in default_roles() {
        if roles.exists(&role.shortname).await? {
            continue;
        }
        info!(role = %role.shortname, "Seeding role");
        roles.create(role).await?;
        created += 1;
    }
    Ok(created)
}
