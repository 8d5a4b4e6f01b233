//! SurrealDB implementation of [`ProfileRepository`].

use chrono::{DateTime, Utc};
use mentor_core::error::MentorResult;
use mentor_core::models::profile::{CreateProfile, Profile, UpdateProfile};
use mentor_core::repository::ProfileRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct ProfileRow {
    record_id: String,
    username: String,
    firstname: String,
    lastname: String,
    email: String,
    main_entity: Option<String>,
    secondary_entities: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn try_into_profile(self) -> Result<Profile, DbError> {
        Ok(Profile {
            id: parse_uuid(&self.record_id, "profile")?,
            username: self.username,
            firstname: self.firstname,
            lastname: self.lastname,
            email: self.email,
            main_entity: self.main_entity,
            secondary_entities: self.secondary_entities,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Profile repository.
#[derive(Clone)]
pub struct SurrealProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, id: &str) -> Result<Profile, DbError> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('profile', $id)")
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<ProfileRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("profile", id))?
            .try_into_profile()
    }
}

impl<C: Connection> ProfileRepository for SurrealProfileRepository<C> {
    async fn create(&self, input: CreateProfile) -> MentorResult<Profile> {
        let id = Uuid::now_v7().to_string();
        let secondary = input
            .secondary_entities
            .map(|v| v.values())
            .unwrap_or_default();

        let result = self
            .db
            .query(
                "CREATE type::record('profile', $id) SET \
                 username = $username, firstname = $firstname, \
                 lastname = $lastname, email = $email, \
                 main_entity = $main_entity, \
                 secondary_entities = $secondary_entities \
                 RETURN NONE",
            )
            .bind(("id", id.clone()))
            .bind(("username", input.username))
            .bind(("firstname", input.firstname))
            .bind(("lastname", input.lastname))
            .bind(("email", input.email))
            .bind(("main_entity", input.main_entity))
            .bind(("secondary_entities", secondary))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.fetch_one(&id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> MentorResult<Profile> {
        Ok(self.fetch_one(&id.to_string()).await?)
    }

    async fn update(&self, id: Uuid, input: UpdateProfile) -> MentorResult<Profile> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.firstname.is_some() {
            sets.push("firstname = $firstname");
        }
        if input.lastname.is_some() {
            sets.push("lastname = $lastname");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.main_entity.is_some() {
            sets.push("main_entity = $main_entity");
        }
        if input.secondary_entities.is_some() {
            sets.push("secondary_entities = $secondary_entities");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('profile', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(firstname) = input.firstname {
            builder = builder.bind(("firstname", firstname));
        }
        if let Some(lastname) = input.lastname {
            builder = builder.bind(("lastname", lastname));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(main_entity) = input.main_entity {
            builder = builder.bind(("main_entity", main_entity));
        }
        if let Some(secondary) = input.secondary_entities {
            builder = builder.bind(("secondary_entities", secondary.values()));
        }

        let result = builder.await.map_err(DbError::from)?;
        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.fetch_one(&id_str).await?)
    }
}
