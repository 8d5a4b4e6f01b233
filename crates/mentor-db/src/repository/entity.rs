//! SurrealDB implementation of [`EntityRepository`].

use chrono::{DateTime, Utc};
use mentor_core::error::MentorResult;
use mentor_core::models::entity::{CreateEntity, Entity, UpdateEntity};
use mentor_core::repository::EntityRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

/// DB-side row struct; the record id comes back via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct EntityRow {
    record_id: String,
    name: String,
    shortname: String,
    parent_id: Option<String>,
    regions: Vec<String>,
    sirh: Vec<String>,
    hidden: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntityRow {
    fn try_into_entity(self) -> Result<Entity, DbError> {
        let parent_id = self
            .parent_id
            .as_deref()
            .map(|raw| parse_uuid(raw, "parent"))
            .transpose()?;
        Ok(Entity {
            id: parse_uuid(&self.record_id, "entity")?,
            name: self.name,
            shortname: self.shortname,
            parent_id,
            regions: self.regions,
            sirh: self.sirh,
            hidden: self.hidden,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_ENTITY: &str = "SELECT meta::id(id) AS record_id, * FROM";

/// SurrealDB implementation of the Entity repository.
#[derive(Clone)]
pub struct SurrealEntityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEntityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, id: &str) -> Result<Entity, DbError> {
        let mut result = self
            .db
            .query(format!("{SELECT_ENTITY} type::record('entity', $id)"))
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<EntityRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("entity", id))?
            .try_into_entity()
    }

    async fn fetch_where(
        &self,
        condition: &str,
        key: &'static str,
        value: String,
    ) -> Result<Vec<Entity>, DbError> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_ENTITY} entity WHERE {condition} ORDER BY record_id ASC"
            ))
            .bind((key, value))
            .await?;

        let rows: Vec<EntityRow> = result.take(0)?;
        rows.into_iter().map(EntityRow::try_into_entity).collect()
    }
}

impl<C: Connection> EntityRepository for SurrealEntityRepository<C> {
    async fn create(&self, input: CreateEntity) -> MentorResult<Entity> {
        let id = Uuid::now_v7().to_string();
        let regions = input.regions.map(|v| v.values()).unwrap_or_default();
        let sirh = input.sirh.map(|v| v.values()).unwrap_or_default();

        let result = self
            .db
            .query(
                "CREATE type::record('entity', $id) SET \
                 name = $name, shortname = $shortname, \
                 parent_id = $parent_id, regions = $regions, sirh = $sirh \
                 RETURN NONE",
            )
            .bind(("id", id.clone()))
            .bind(("name", input.name))
            .bind(("shortname", input.shortname))
            .bind(("parent_id", input.parent_id.map(|p| p.to_string())))
            .bind(("regions", regions))
            .bind(("sirh", sirh))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.fetch_one(&id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> MentorResult<Entity> {
        Ok(self.fetch_one(&id.to_string()).await?)
    }

    async fn get_by_shortname(&self, shortname: &str) -> MentorResult<Entity> {
        self.fetch_where("shortname = $shortname", "shortname", shortname.to_string())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("entity", format!("shortname={shortname}")).into())
    }

    async fn get_by_name(&self, name: &str) -> MentorResult<Entity> {
        self.fetch_where("name = $name", "name", name.to_string())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("entity", format!("name={name}")).into())
    }

    async fn update(&self, id: Uuid, input: UpdateEntity) -> MentorResult<Entity> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.shortname.is_some() {
            sets.push("shortname = $shortname");
        }
        if input.regions.is_some() {
            sets.push("regions = $regions");
        }
        if input.sirh.is_some() {
            sets.push("sirh = $sirh");
        }
        if input.hidden.is_some() {
            sets.push("hidden = $hidden");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('entity', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(shortname) = input.shortname {
            builder = builder.bind(("shortname", shortname));
        }
        if let Some(regions) = input.regions {
            builder = builder.bind(("regions", regions.values()));
        }
        if let Some(sirh) = input.sirh {
            builder = builder.bind(("sirh", sirh.values()));
        }
        if let Some(hidden) = input.hidden {
            builder = builder.bind(("hidden", hidden));
        }

        let result = builder.await.map_err(DbError::from)?;
        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.fetch_one(&id_str).await?)
    }

    async fn get_children(&self, parent_id: Uuid) -> MentorResult<Vec<Entity>> {
        Ok(self
            .fetch_where("parent_id = $parent_id", "parent_id", parent_id.to_string())
            .await?)
    }

    async fn list_main_entities(&self) -> MentorResult<Vec<Entity>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_ENTITY} entity WHERE parent_id = NONE ORDER BY record_id ASC"
            ))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EntityRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(EntityRow::try_into_entity)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
