//! Message outbox backing the [`Notifier`] collaborator.
//!
//! Sending appends a row to the `message` table; delivery to mail or
//! chat is left to whatever drains the outbox.

use chrono::{DateTime, Utc};
use mentor_core::error::MentorResult;
use mentor_core::repository::Notifier;
use serde::Serialize;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use crate::error::DbError;

/// A queued notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboxMessage {
    pub user_id: Uuid,
    pub template: String,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct MessageRow {
    template: String,
    context: serde_json::Value,
    created_at: DateTime<Utc>,
}

/// Outbox-writing notifier.
#[derive(Clone)]
pub struct SurrealNotifier<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealNotifier<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn enqueue(
        &self,
        user_id: Uuid,
        template: &str,
        context: serde_json::Value,
    ) -> Result<(), DbError> {
        self.db
            .query(
                "CREATE message SET user_id = $user_id, \
                 template = $template, context = $context RETURN NONE",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("template", template.to_string()))
            .bind(("context", context))
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    /// Messages queued for one user, oldest first.
    pub async fn sent_to(&self, user_id: Uuid) -> MentorResult<Vec<OutboxMessage>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, user_id, template, context, \
                 created_at FROM message WHERE user_id = $user_id \
                 ORDER BY created_at ASC, record_id ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MessageRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| OutboxMessage {
                user_id,
                template: row.template,
                context: row.context,
                created_at: row.created_at,
            })
            .collect())
    }
}

impl<C: Connection> Notifier for SurrealNotifier<C> {
    async fn send(&self, user_id: Uuid, template: &str, context: serde_json::Value) -> bool {
        match self.enqueue(user_id, template, context).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%user_id, template, error = %e, "Failed to queue notification");
                false
            }
        }
    }
}
