//! User profiles and entity-change notifications.

use mentor_core::error::{MentorError, MentorResult};
use mentor_core::models::profile::{CreateProfile, Profile, UpdateProfile};
use mentor_core::models::role::Capability;
use mentor_core::multi_value::{MultiValue, same_values};
use mentor_core::repository::{EntityRepository, Notifier, ProfileRepository};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::AccessPolicy;

pub const TEMPLATE_MAIN_ENTITY_CHANGED: &str = "main_entity_changed";
pub const TEMPLATE_SECONDARY_ENTITIES_CHANGED: &str = "secondary_entities_changed";

pub struct ProfileService<E, P, N, A>
where
    E: EntityRepository,
    P: ProfileRepository,
    N: Notifier,
    A: AccessPolicy,
{
    entities: E,
    profiles: P,
    notifier: N,
    access: A,
}

impl<E, P, N, A> ProfileService<E, P, N, A>
where
    E: EntityRepository,
    P: ProfileRepository,
    N: Notifier,
    A: AccessPolicy,
{
    pub fn new(entities: E, profiles: P, notifier: N, access: A) -> Self {
        Self {
            entities,
            profiles,
            notifier,
            access,
        }
    }

    pub async fn create_profile(&self, input: CreateProfile) -> MentorResult<Profile> {
        let profile = self.profiles.create(input).await?;
        info!(user_id = %profile.id, username = %profile.username, "Profile created");
        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> MentorResult<Profile> {
        self.profiles.get_by_id(user_id).await
    }

    /// Save profile changes. When another user with `ManageUsers` at the
    /// user's main entity moves them between entities, the user is told.
    pub async fn update_profile(
        &self,
        actor: Uuid,
        user_id: Uuid,
        input: UpdateProfile,
    ) -> MentorResult<Profile> {
        let before = self.profiles.get_by_id(user_id).await?;

        let main_changed = input
            .main_entity
            .as_ref()
            .is_some_and(|new| {
                normalized(new.as_deref()) != normalized(before.main_entity.as_deref())
            });
        let secondary_changed = input.secondary_entities.as_ref().is_some_and(|new| {
            !same_values(new, &MultiValue::List(before.secondary_entities.clone()))
        });

        let after = self.profiles.update(user_id, input).await?;
        info!(%user_id, %actor, "Profile updated");

        if !(main_changed || secondary_changed) {
            return Ok(after);
        }
        if actor == user_id {
            debug!(%user_id, "Self edit, entity change not notified");
            return Ok(after);
        }
        if !self.may_notify(actor, &before, &after).await? {
            debug!(%user_id, %actor, "Actor lacks user management rights, not notified");
            return Ok(after);
        }

        if main_changed {
            let context = json!({
                "old": before.main_entity,
                "new": after.main_entity,
            });
            self.send(user_id, TEMPLATE_MAIN_ENTITY_CHANGED, context).await;
        }
        if secondary_changed {
            let context = json!({
                "old": before.secondary_entities,
                "new": after.secondary_entities,
            });
            self.send(user_id, TEMPLATE_SECONDARY_ENTITIES_CHANGED, context)
                .await;
        }
        Ok(after)
    }

    /// The actor must manage users at the user's main entity, taken from
    /// the new profile and falling back to the old one.
    async fn may_notify(&self, actor: Uuid, before: &Profile, after: &Profile) -> MentorResult<bool> {
        let Some(shortname) = normalized(after.main_entity.as_deref())
            .or_else(|| normalized(before.main_entity.as_deref()))
        else {
            return Ok(false);
        };
        let entity = match self.entities.get_by_shortname(shortname).await {
            Ok(entity) => entity,
            Err(MentorError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        self.access
            .has_capability(actor, Capability::ManageUsers, entity.id)
            .await
    }

    async fn send(&self, user_id: Uuid, template: &str, context: serde_json::Value) {
        if !self.notifier.send(user_id, template, context).await {
            warn!(%user_id, %template, "Profile change notice not delivered");
        }
    }
}

fn normalized(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
