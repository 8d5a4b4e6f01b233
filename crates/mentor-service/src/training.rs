//! Training management.

use mentor_core::error::{MentorError, MentorResult};
use mentor_core::models::role::Capability;
use mentor_core::models::training::{
    CreateTraining, NewTraining, Training, TrainingChanges, TrainingStatus, UpdateTraining,
};
use mentor_core::multi_value::MultiValue;
use mentor_core::repository::{EntityRepository, TrainingRepository};
use tracing::{error, info};
use uuid::Uuid;

use crate::access::AccessPolicy;
use crate::config::MentorConfig;
use crate::entity::required;
use crate::notice::Notices;

pub struct TrainingService<E: EntityRepository, T: TrainingRepository, A: AccessPolicy> {
    entities: E,
    trainings: T,
    access: A,
    notices: Notices,
    config: MentorConfig,
}

impl<E, T, A> TrainingService<E, T, A>
where
    E: EntityRepository,
    T: TrainingRepository,
    A: AccessPolicy,
{
    pub fn new(entities: E, trainings: T, access: A, notices: Notices, config: MentorConfig) -> Self {
        Self {
            entities,
            trainings,
            access,
            notices,
            config,
        }
    }

    pub async fn get_training(&self, id: Uuid) -> MentorResult<Training> {
        self.trainings.get_by_id(id).await
    }

    pub async fn create_training(&self, actor: Uuid, input: CreateTraining) -> MentorResult<Training> {
        self.entities.get_by_id(input.entity_id).await?;
        self.access
            .require(actor, Capability::ManageTrainings, input.entity_id)
            .await?;

        let name = required(&input.name, "training name")?;
        let shortname = required(&input.shortname, "training shortname")?;
        if self.trainings.shortname_exists(&shortname).await? {
            return Err(MentorError::AlreadyExists {
                entity: format!("training with shortname {shortname}"),
            });
        }
        let collection = self.collection_tags(input.collection.as_ref())?;
        let skills = input.skills.map(|s| s.joined()).unwrap_or_default();

        let training = self
            .trainings
            .create(NewTraining {
                entity_id: input.entity_id,
                name,
                shortname,
                status: input.status,
                collection,
                skills,
                idsirh: input.idsirh,
            })
            .await?;

        info!(
            training_id = %training.id,
            entity_id = %training.entity_id,
            %actor,
            "Training created"
        );
        Ok(training)
    }

    /// Apply an update. A storage failure is reported on the notice board
    /// and yields `Ok(false)`; other errors propagate.
    pub async fn update_training(
        &self,
        actor: Uuid,
        id: Uuid,
        input: UpdateTraining,
    ) -> MentorResult<bool> {
        let current = self.trainings.get_by_id(id).await?;
        self.access
            .require(actor, Capability::ManageTrainings, current.entity_id)
            .await?;

        let name = input
            .name
            .as_deref()
            .map(|n| required(n, "training name"))
            .transpose()?;
        let shortname = match input.shortname.as_deref() {
            Some(raw) => {
                let shortname = required(raw, "training shortname")?;
                if shortname != current.shortname
                    && self.trainings.shortname_exists(&shortname).await?
                {
                    return Err(MentorError::AlreadyExists {
                        entity: format!("training with shortname {shortname}"),
                    });
                }
                Some(shortname)
            }
            None => None,
        };
        let collection = match input.collection.as_ref() {
            Some(tags) => Some(self.collection_tags(Some(tags))?),
            None => None,
        };

        let changes = TrainingChanges {
            name,
            shortname,
            status: input.status,
            collection,
            skills: input.skills.map(|s| s.joined()),
            idsirh: input.idsirh,
        };

        match self.trainings.update(id, changes).await {
            Ok(training) => {
                info!(training_id = %id, status = %training.status, %actor, "Training updated");
                self.notices
                    .success(format!("Training \"{}\" saved", training.name));
                Ok(true)
            }
            Err(MentorError::Database(message)) => {
                error!(training_id = %id, error = %message, "Training update failed");
                self.notices
                    .error(format!("Training \"{}\" could not be saved", current.name));
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Copy a training, optionally into another entity. The copy starts
    /// as a draft; its shortname gets the copy suffix until it is unique.
    pub async fn duplicate_training(
        &self,
        actor: Uuid,
        id: Uuid,
        shortname: Option<String>,
        entity_id: Option<Uuid>,
    ) -> MentorResult<Training> {
        let source = self.trainings.get_by_id(id).await?;
        let target_entity = entity_id.unwrap_or(source.entity_id);
        self.entities.get_by_id(target_entity).await?;
        self.access
            .require(actor, Capability::ManageTrainings, target_entity)
            .await?;

        let mut candidate = match shortname.as_deref() {
            Some(raw) => required(raw, "training shortname")?,
            None => source.shortname.clone(),
        };
        while self.trainings.shortname_exists(&candidate).await? {
            candidate.push_str(&self.config.copy_suffix);
        }

        let copy = self
            .trainings
            .create(NewTraining {
                entity_id: target_entity,
                name: source.name,
                shortname: candidate,
                status: TrainingStatus::Draft,
                collection: source.collection,
                skills: source.skills,
                idsirh: source.idsirh,
            })
            .await?;

        info!(
            source_id = %id,
            training_id = %copy.id,
            shortname = %copy.shortname,
            "Training duplicated"
        );
        Ok(copy)
    }

    /// Comma-joined tags, each checked against the catalog and spelled the
    /// way the catalog spells it.
    fn collection_tags(&self, input: Option<&MultiValue>) -> MentorResult<String> {
        let Some(input) = input else {
            return Ok(String::new());
        };
        let mut tags: Vec<&str> = Vec::new();
        for tag in input.values() {
            let known = self
                .config
                .collections
                .get(&tag)
                .ok_or_else(|| MentorError::validation(format!("unknown collection: {tag}")))?;
            if !tags.contains(&known.tag.as_str()) {
                tags.push(known.tag.as_str());
            }
        }
        Ok(tags.join(","))
    }
}
