//! Role assignment and the referent auto-grant rule.

use mentor_core::error::MentorResult;
use mentor_core::models::role::{Capability, Role};
use mentor_core::repository::{EntityRepository, RoleRepository};
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::AccessPolicy;
use crate::config::MentorConfig;
use crate::entity::main_entity_of;

/// Grants made at a sub-entity with the referent role imply the
/// restricted referent role at the main entity above it.
///
/// The derived grant is shared: it stays as long as the user keeps the
/// referent role at any sub-entity of that main entity.
pub struct ReferentRule {
    referent: String,
    restricted: String,
}

impl ReferentRule {
    pub fn new(config: &MentorConfig) -> Self {
        Self {
            referent: config.referent_role.clone(),
            restricted: config.referent_restricted_role.clone(),
        }
    }

    /// Runs after `role` was granted to `user_id` at `entity_id`.
    /// Returns the main entity that received the derived grant, if any.
    pub async fn on_assigned<E, R>(
        &self,
        entities: &E,
        roles: &R,
        user_id: Uuid,
        role: &str,
        entity_id: Uuid,
    ) -> MentorResult<Option<Uuid>>
    where
        E: EntityRepository,
        R: RoleRepository,
    {
        if role != self.referent {
            return Ok(None);
        }
        let root = main_entity_of(entities, entity_id).await?;
        if root.id == entity_id {
            return Ok(None);
        }
        if !roles.exists(&self.restricted).await? {
            debug!(role = %self.restricted, "Restricted referent role missing, no derived grant");
            return Ok(None);
        }

        if roles.assign(user_id, &self.restricted, root.id).await? {
            info!(
                %user_id,
                role = %self.restricted,
                entity_id = %root.id,
                "Derived referent grant added"
            );
        }
        Ok(Some(root.id))
    }

    /// Runs after `role` was revoked from `user_id` at `entity_id`.
    /// Returns the main entity whose derived grant was removed, if any.
    pub async fn on_unassigned<E, R>(
        &self,
        entities: &E,
        roles: &R,
        user_id: Uuid,
        role: &str,
        entity_id: Uuid,
    ) -> MentorResult<Option<Uuid>>
    where
        E: EntityRepository,
        R: RoleRepository,
    {
        if role != self.referent {
            return Ok(None);
        }
        let root = main_entity_of(entities, entity_id).await?;
        if root.id == entity_id {
            return Ok(None);
        }

        for assignment in roles.get_user_assignments(user_id).await? {
            if assignment.role != self.referent
                || assignment.entity_id == entity_id
                || assignment.entity_id == root.id
            {
                continue;
            }
            let other_root = main_entity_of(entities, assignment.entity_id).await?;
            if other_root.id == root.id {
                debug!(
                    %user_id,
                    sibling = %assignment.entity_id,
                    "Referent role still held under the same main entity"
                );
                return Ok(None);
            }
        }

        roles.unassign(user_id, &self.restricted, root.id).await?;
        info!(
            %user_id,
            role = %self.restricted,
            entity_id = %root.id,
            "Derived referent grant removed"
        );
        Ok(Some(root.id))
    }
}

pub struct RoleService<E: EntityRepository, R: RoleRepository, A: AccessPolicy> {
    entities: E,
    roles: R,
    access: A,
    rule: ReferentRule,
}

impl<E, R, A> RoleService<E, R, A>
where
    E: EntityRepository,
    R: RoleRepository,
    A: AccessPolicy,
{
    pub fn new(entities: E, roles: R, access: A, config: &MentorConfig) -> Self {
        Self {
            entities,
            roles,
            access,
            rule: ReferentRule::new(config),
        }
    }

    pub async fn list_roles(&self) -> MentorResult<Vec<Role>> {
        self.roles.list().await
    }

    /// Grant `role` to `user_id` at `entity_id`. Returns `false` when the
    /// user already held it there.
    pub async fn assign_role(
        &self,
        actor: Uuid,
        user_id: Uuid,
        role: &str,
        entity_id: Uuid,
    ) -> MentorResult<bool> {
        self.entities.get_by_id(entity_id).await?;
        self.access
            .require(actor, Capability::ManageUsers, entity_id)
            .await?;
        self.roles.get(role).await?;

        let added = self.roles.assign(user_id, role, entity_id).await?;
        self.rule
            .on_assigned(&self.entities, &self.roles, user_id, role, entity_id)
            .await?;

        info!(%user_id, %role, %entity_id, %actor, added, "Role assigned");
        Ok(added)
    }

    pub async fn unassign_role(
        &self,
        actor: Uuid,
        user_id: Uuid,
        role: &str,
        entity_id: Uuid,
    ) -> MentorResult<()> {
        self.entities.get_by_id(entity_id).await?;
        self.access
            .require(actor, Capability::ManageUsers, entity_id)
            .await?;
        self.roles.get(role).await?;

        self.roles.unassign(user_id, role, entity_id).await?;
        self.rule
            .on_unassigned(&self.entities, &self.roles, user_id, role, entity_id)
            .await?;

        info!(%user_id, %role, %entity_id, %actor, "Role unassigned");
        Ok(())
    }
}
