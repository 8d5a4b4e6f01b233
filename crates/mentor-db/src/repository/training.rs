//! SurrealDB implementation of [`TrainingRepository`].

use chrono::{DateTime, Utc};
use mentor_core::error::MentorResult;
use mentor_core::models::listing::ScopedQuery;
use mentor_core::models::training::{NewTraining, Training, TrainingChanges, TrainingStatus};
use mentor_core::repository::{PaginatedResult, TrainingRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};
use crate::query::{FilterClause, TRAINING_LISTING, TRAINING_PROJECTION, bind_filter, order_sql};

#[derive(Debug, SurrealValue)]
struct TrainingRow {
    record_id: String,
    entity_id: String,
    entity_name: Option<String>,
    name: String,
    shortname: String,
    status: String,
    collection: String,
    skills: String,
    idsirh: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TrainingRow {
    fn try_into_training(self) -> Result<Training, DbError> {
        let status = TrainingStatus::parse(&self.status)
            .ok_or_else(|| DbError::Decode(format!("unknown training status: {}", self.status)))?;
        Ok(Training {
            id: parse_uuid(&self.record_id, "training")?,
            entity_id: parse_uuid(&self.entity_id, "entity")?,
            entity_name: self.entity_name.unwrap_or_default(),
            name: self.name,
            shortname: self.shortname,
            status,
            collection: self.collection,
            skills: self.skills,
            idsirh: self.idsirh,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Training repository.
#[derive(Clone)]
pub struct SurrealTrainingRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTrainingRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, id: &str) -> Result<Training, DbError> {
        let mut result = self
            .db
            .query(format!(
                "SELECT {TRAINING_PROJECTION} FROM type::record('training', $id)"
            ))
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<TrainingRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("training", id))?
            .try_into_training()
    }
}

impl<C: Connection> TrainingRepository for SurrealTrainingRepository<C> {
    async fn create(&self, input: NewTraining) -> MentorResult<Training> {
        let id = Uuid::now_v7().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('training', $id) SET \
                 entity = type::record('entity', $entity_id), \
                 name = $name, shortname = $shortname, status = $status, \
                 collection = $collection, skills = $skills, idsirh = $idsirh \
                 RETURN NONE",
            )
            .bind(("id", id.clone()))
            .bind(("entity_id", input.entity_id.to_string()))
            .bind(("name", input.name))
            .bind(("shortname", input.shortname))
            .bind(("status", input.status.as_str()))
            .bind(("collection", input.collection))
            .bind(("skills", input.skills))
            .bind(("idsirh", input.idsirh))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.fetch_one(&id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> MentorResult<Training> {
        Ok(self.fetch_one(&id.to_string()).await?)
    }

    async fn shortname_exists(&self, shortname: &str) -> MentorResult<bool> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM training WHERE shortname = $shortname GROUP ALL")
            .bind(("shortname", shortname.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn update(&self, id: Uuid, changes: TrainingChanges) -> MentorResult<Training> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if changes.name.is_some() {
            sets.push("name = $name");
        }
        if changes.shortname.is_some() {
            sets.push("shortname = $shortname");
        }
        if changes.status.is_some() {
            sets.push("status = $status");
        }
        if changes.collection.is_some() {
            sets.push("collection = $collection");
        }
        if changes.skills.is_some() {
            sets.push("skills = $skills");
        }
        if changes.idsirh.is_some() {
            sets.push("idsirh = $idsirh");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('training', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = changes.name {
            builder = builder.bind(("name", name));
        }
        if let Some(shortname) = changes.shortname {
            builder = builder.bind(("shortname", shortname));
        }
        if let Some(status) = changes.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(collection) = changes.collection {
            builder = builder.bind(("collection", collection));
        }
        if let Some(skills) = changes.skills {
            builder = builder.bind(("skills", skills));
        }
        if let Some(idsirh) = changes.idsirh {
            builder = builder.bind(("idsirh", idsirh));
        }

        let result = builder.await.map_err(DbError::from)?;
        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.fetch_one(&id_str).await?)
    }

    async fn list_by_entities(&self, entity_ids: &[Uuid]) -> MentorResult<Vec<Training>> {
        let ids: Vec<String> = entity_ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(format!(
                "SELECT {TRAINING_PROJECTION} FROM training \
                 WHERE meta::id(entity) IN $entity_ids ORDER BY record_id ASC"
            ))
            .bind(("entity_ids", ids))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TrainingRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(TrainingRow::try_into_training)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn search(&self, query: &ScopedQuery) -> MentorResult<PaginatedResult<Training>> {
        let clause = FilterClause::compose(&TRAINING_LISTING, query);
        let order = order_sql(&TRAINING_LISTING, query.order.as_ref())?;
        let total = self.count(query).await?;

        let sql = format!(
            "SELECT {TRAINING_PROJECTION} FROM training {} {order} \
             LIMIT $limit START $offset",
            clause.where_sql()
        );
        let builder = self
            .db
            .query(sql)
            .bind(("limit", query.pagination.limit))
            .bind(("offset", query.pagination.offset));
        let mut result = bind_filter!(builder, clause.params)
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TrainingRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(TrainingRow::try_into_training)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: query.pagination.offset,
            limit: query.pagination.limit,
        })
    }

    async fn count(&self, query: &ScopedQuery) -> MentorResult<u64> {
        let clause = FilterClause::compose(&TRAINING_LISTING, query);
        let sql = format!(
            "SELECT count() AS total FROM training {} GROUP ALL",
            clause.where_sql()
        );
        let mut result = bind_filter!(self.db.query(sql), clause.params)
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
