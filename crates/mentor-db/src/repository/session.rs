//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use mentor_core::error::{MentorError, MentorResult};
use mentor_core::models::listing::ScopedQuery;
use mentor_core::models::session::{
    NewSession, RegistrationTerms, Session, SessionStatus, UpdateSession,
};
use mentor_core::repository::{PaginatedResult, SessionRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};
use crate::query::{
    FilterClause, SESSION_LISTING, SESSION_PROJECTION, bind_filter, exact_expression, order_sql,
};

#[derive(Debug, SurrealValue)]
struct SessionRow {
    record_id: String,
    training_id: String,
    training_name: Option<String>,
    entity_id: String,
    entity_name: Option<String>,
    collection: Option<String>,
    course_id: String,
    name: String,
    shortname: String,
    session_number: u32,
    status: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    terms: String,
    max_participants: Option<u32>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, DbError> {
        let status = SessionStatus::parse(&self.status)
            .ok_or_else(|| DbError::Decode(format!("unknown session status: {}", self.status)))?;
        Ok(Session {
            id: parse_uuid(&self.record_id, "session")?,
            training_id: parse_uuid(&self.training_id, "training")?,
            training_name: self.training_name.unwrap_or_default(),
            entity_id: parse_uuid(&self.entity_id, "entity")?,
            entity_name: self.entity_name.unwrap_or_default(),
            collection: self.collection.unwrap_or_default(),
            course_id: parse_uuid(&self.course_id, "course")?,
            name: self.name,
            shortname: self.shortname,
            session_number: self.session_number,
            status,
            start_date: self.start_date,
            end_date: self.end_date,
            terms: RegistrationTerms::parse(&self.terms),
            max_participants: self.max_participants,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct VersionRow {
    version: u64,
}

fn rows_into_sessions(rows: Vec<SessionRow>) -> Result<Vec<Session>, DbError> {
    rows.into_iter().map(SessionRow::try_into_session).collect()
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, id: &str) -> Result<Session, DbError> {
        let mut result = self
            .db
            .query(format!(
                "SELECT {SESSION_PROJECTION} FROM type::record('session', $id)"
            ))
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<SessionRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("session", id))?
            .try_into_session()
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: NewSession) -> MentorResult<Session> {
        let id = Uuid::now_v7().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 training = type::record('training', $training_id), \
                 entity = type::record('entity', $entity_id), \
                 course_id = $course_id, name = $name, shortname = $shortname, \
                 session_number = $session_number, status = $status, \
                 start_date = $start_date, end_date = $end_date, \
                 terms = $terms, max_participants = $max_participants \
                 RETURN NONE",
            )
            .bind(("id", id.clone()))
            .bind(("training_id", input.training_id.to_string()))
            .bind(("entity_id", input.entity_id.to_string()))
            .bind(("course_id", input.course_id.to_string()))
            .bind(("name", input.name))
            .bind(("shortname", input.shortname))
            .bind(("session_number", input.session_number))
            .bind(("status", SessionStatus::InPreparation.as_str()))
            .bind(("start_date", input.start_date))
            .bind(("end_date", input.end_date))
            .bind(("terms", input.terms.as_str().to_string()))
            .bind(("max_participants", input.max_participants))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.fetch_one(&id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> MentorResult<Session> {
        Ok(self.fetch_one(&id.to_string()).await?)
    }

    async fn shortname_exists(&self, shortname: &str) -> MentorResult<bool> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM session WHERE shortname = $shortname GROUP ALL")
            .bind(("shortname", shortname.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn next_session_number(&self, training_id: Uuid) -> MentorResult<u32> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE session_number FROM session \
                 WHERE meta::id(training) = $training_id",
            )
            .bind(("training_id", training_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let numbers: Vec<u32> = result.take(0).map_err(DbError::from)?;
        Ok(numbers.into_iter().max().unwrap_or(0) + 1)
    }

    async fn update(&self, id: Uuid, input: UpdateSession) -> MentorResult<Session> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.shortname.is_some() {
            sets.push("shortname = $shortname");
        }
        if input.terms.is_some() {
            sets.push("terms = $terms");
        }
        if input.start_date.is_some() {
            sets.push("start_date = $start_date");
        }
        if input.end_date.is_some() {
            sets.push("end_date = $end_date");
        }
        if input.max_participants.is_some() {
            sets.push("max_participants = $max_participants");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('session', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(shortname) = input.shortname {
            builder = builder.bind(("shortname", shortname));
        }
        if let Some(terms) = input.terms {
            builder = builder.bind(("terms", terms.as_str().to_string()));
        }
        if let Some(start_date) = input.start_date {
            builder = builder.bind(("start_date", start_date));
        }
        if let Some(end_date) = input.end_date {
            builder = builder.bind(("end_date", end_date));
        }
        if let Some(max_participants) = input.max_participants {
            builder = builder.bind(("max_participants", max_participants));
        }

        let result = builder.await.map_err(DbError::from)?;
        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.fetch_one(&id_str).await?)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        expected_version: u64,
    ) -> MentorResult<Session> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('session', $id) SET \
                 status = $status, version += 1, updated_at = time::now() \
                 WHERE version = $version",
            )
            .bind(("id", id_str.clone()))
            .bind(("status", status.as_str()))
            .bind(("version", expected_version))
            .await
            .map_err(DbError::from)?;

        let written: Vec<VersionRow> = result.take(0).map_err(DbError::from)?;
        let session = self.fetch_one(&id_str).await?;

        if written.is_empty() {
            debug!(
                session_id = %id,
                expected_version,
                stored_version = session.version,
                "Status write lost a version race"
            );
            return Err(MentorError::Conflict {
                entity: "session".into(),
                id: id_str,
            });
        }

        Ok(session)
    }

    async fn list_by_status(&self, statuses: &[SessionStatus]) -> MentorResult<Vec<Session>> {
        let statuses: Vec<&'static str> = statuses.iter().map(SessionStatus::as_str).collect();

        let mut result = self
            .db
            .query(format!(
                "SELECT {SESSION_PROJECTION} FROM session \
                 WHERE status IN $statuses ORDER BY record_id ASC"
            ))
            .bind(("statuses", statuses))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_sessions(rows)?)
    }

    async fn search(&self, query: &ScopedQuery) -> MentorResult<PaginatedResult<Session>> {
        let clause = FilterClause::compose(&SESSION_LISTING, query);
        let order = order_sql(&SESSION_LISTING, query.order.as_ref())?;
        let total = self.count(query).await?;

        let sql = format!(
            "SELECT {SESSION_PROJECTION} FROM session {} {order} \
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

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows_into_sessions(rows)?,
            total,
            offset: query.pagination.offset,
            limit: query.pagination.limit,
        })
    }

    async fn count(&self, query: &ScopedQuery) -> MentorResult<u64> {
        let clause = FilterClause::compose(&SESSION_LISTING, query);
        let sql = format!(
            "SELECT count() AS total FROM session {} GROUP ALL",
            clause.where_sql()
        );
        let mut result = bind_filter!(self.db.query(sql), clause.params)
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn find_exact(&self, entity_ids: &[Uuid], term: &str) -> MentorResult<Vec<Session>> {
        let expr = exact_expression(term);
        let ids: Vec<String> = entity_ids.iter().map(Uuid::to_string).collect();

        let sql = format!(
            "SELECT {SESSION_PROJECTION} FROM session \
             WHERE meta::id(entity) IN $entity_ids AND {} \
             ORDER BY record_id ASC",
            expr.clause
        );
        let mut builder = self.db.query(sql).bind(("entity_ids", ids));
        for binding in expr.bindings {
            builder = builder.bind(binding);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_sessions(rows)?)
    }
}
