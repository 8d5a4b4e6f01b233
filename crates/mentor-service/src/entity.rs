//! Entity tree operations.

use std::collections::{HashSet, VecDeque};

use mentor_core::error::{MentorError, MentorResult};
use mentor_core::models::entity::{CreateEntity, Entity, UpdateEntity};
use mentor_core::models::role::Capability;
use mentor_core::models::training::Training;
use mentor_core::repository::{EntityRepository, RoleRepository, TrainingRepository};
use tracing::info;
use uuid::Uuid;

use crate::access::AccessPolicy;
use crate::config::MentorConfig;

/// Deepest ancestor chain walked before the tree is considered corrupt.
const MAX_DEPTH: usize = 64;

/// The entity followed by its ancestors, ending at the main entity.
pub(crate) async fn ancestor_chain<E: EntityRepository>(
    entities: &E,
    id: Uuid,
) -> MentorResult<Vec<Entity>> {
    let mut chain = vec![entities.get_by_id(id).await?];
    while let Some(parent_id) = chain.last().and_then(|e| e.parent_id) {
        if chain.len() >= MAX_DEPTH {
            return Err(MentorError::Internal(format!(
                "entity {id} is nested deeper than {MAX_DEPTH} levels"
            )));
        }
        chain.push(entities.get_by_id(parent_id).await?);
    }
    Ok(chain)
}

/// The main entity above `id` (itself when it has no parent).
pub(crate) async fn main_entity_of<E: EntityRepository>(
    entities: &E,
    id: Uuid,
) -> MentorResult<Entity> {
    ancestor_chain(entities, id)
        .await?
        .pop()
        .ok_or_else(|| MentorError::not_found("entity", id))
}

/// `id` followed by every descendant, breadth first, without duplicates.
pub(crate) async fn descendant_ids<E: EntityRepository>(
    entities: &E,
    id: Uuid,
) -> MentorResult<Vec<Uuid>> {
    entities.get_by_id(id).await?;

    let mut seen = HashSet::from([id]);
    let mut ordered = vec![id];
    let mut queue = VecDeque::from([id]);
    while let Some(current) = queue.pop_front() {
        for child in entities.get_children(current).await? {
            if seen.insert(child.id) {
                ordered.push(child.id);
                queue.push_back(child.id);
            }
        }
    }
    Ok(ordered)
}

pub(crate) fn required(value: &str, field: &str) -> MentorResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MentorError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Entity tree management.
///
/// Writes require `ManageEntity`: on the parent for a sub-entity, on the
/// entity itself for an edit.
pub struct EntityService<E, T, R, A>
where
    E: EntityRepository,
    T: TrainingRepository,
    R: RoleRepository,
    A: AccessPolicy,
{
    entities: E,
    trainings: T,
    roles: R,
    access: A,
    config: MentorConfig,
}

impl<E, T, R, A> EntityService<E, T, R, A>
where
    E: EntityRepository,
    T: TrainingRepository,
    R: RoleRepository,
    A: AccessPolicy,
{
    pub fn new(entities: E, trainings: T, roles: R, access: A, config: MentorConfig) -> Self {
        Self {
            entities,
            trainings,
            roles,
            access,
            config,
        }
    }

    pub async fn create_entity(&self, actor: Uuid, input: CreateEntity) -> MentorResult<Entity> {
        match input.parent_id {
            Some(parent_id) => {
                self.entities.get_by_id(parent_id).await?;
                self.access
                    .require(actor, Capability::ManageEntity, parent_id)
                    .await?;
            }
            None => self.require_root_manager(actor).await?,
        }
        let name = required(&input.name, "entity name")?;
        let shortname = required(&input.shortname, "entity shortname")?;
        self.ensure_shortname_free(&shortname, None).await?;

        let entity = self
            .entities
            .create(CreateEntity {
                name,
                shortname,
                ..input
            })
            .await?;

        info!(
            entity_id = %entity.id,
            parent_id = ?entity.parent_id,
            shortname = %entity.shortname,
            %actor,
            "Entity created"
        );
        Ok(entity)
    }

    pub async fn get_entity(&self, id: Uuid) -> MentorResult<Entity> {
        self.entities.get_by_id(id).await
    }

    pub async fn update_entity(
        &self,
        actor: Uuid,
        id: Uuid,
        input: UpdateEntity,
    ) -> MentorResult<Entity> {
        self.entities.get_by_id(id).await?;
        self.access
            .require(actor, Capability::ManageEntity, id)
            .await?;

        let name = input
            .name
            .as_deref()
            .map(|n| required(n, "entity name"))
            .transpose()?;
        let shortname = match input.shortname.as_deref() {
            Some(raw) => {
                let shortname = required(raw, "entity shortname")?;
                self.ensure_shortname_free(&shortname, Some(id)).await?;
                Some(shortname)
            }
            None => None,
        };

        let entity = self
            .entities
            .update(
                id,
                UpdateEntity {
                    name,
                    shortname,
                    ..input
                },
            )
            .await?;

        info!(entity_id = %id, hidden = entity.hidden, %actor, "Entity updated");
        Ok(entity)
    }

    /// Direct children of an entity, in creation order.
    pub async fn get_sub_entities(&self, id: Uuid) -> MentorResult<Vec<Entity>> {
        self.entities.get_by_id(id).await?;
        self.entities.get_children(id).await
    }

    pub async fn descendant_ids(&self, id: Uuid) -> MentorResult<Vec<Uuid>> {
        descendant_ids(&self.entities, id).await
    }

    pub async fn get_main_entity(&self, id: Uuid) -> MentorResult<Entity> {
        main_entity_of(&self.entities, id).await
    }

    pub async fn is_main_entity(&self, id: Uuid) -> MentorResult<bool> {
        Ok(self.entities.get_by_id(id).await?.parent_id.is_none())
    }

    pub async fn list_main_entities(&self) -> MentorResult<Vec<Entity>> {
        self.entities.list_main_entities().await
    }

    /// Users holding the manager role at this entity.
    pub async fn get_managers(&self, id: Uuid) -> MentorResult<Vec<Uuid>> {
        self.entities.get_by_id(id).await?;
        self.roles
            .users_with_role(&self.config.manager_role, id)
            .await
    }

    /// Trainings of the entity, plus those of its sub-entities unless
    /// `only_main` is set.
    pub async fn get_trainings_by_entity(
        &self,
        id: Uuid,
        only_main: bool,
    ) -> MentorResult<Vec<Training>> {
        let scope = if only_main {
            self.entities.get_by_id(id).await?;
            vec![id]
        } else {
            descendant_ids(&self.entities, id).await?
        };
        self.trainings.list_by_entities(&scope).await
    }

    /// A new main entity needs `ManageEntity` at some existing main entity.
    /// The very first one is created freely.
    async fn require_root_manager(&self, actor: Uuid) -> MentorResult<()> {
        let roots = self.entities.list_main_entities().await?;
        if roots.is_empty() {
            return Ok(());
        }
        for root in &roots {
            if self
                .access
                .has_capability(actor, Capability::ManageEntity, root.id)
                .await?
            {
                return Ok(());
            }
        }
        Err(MentorError::PermissionDenied {
            reason: format!("{} required on a main entity", Capability::ManageEntity),
        })
    }

    async fn ensure_shortname_free(&self, shortname: &str, owner: Option<Uuid>) -> MentorResult<()> {
        match self.entities.get_by_shortname(shortname).await {
            Ok(existing) if Some(existing.id) == owner => Ok(()),
            Ok(_) => Err(MentorError::AlreadyExists {
                entity: format!("entity with shortname {shortname}"),
            }),
            Err(MentorError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
