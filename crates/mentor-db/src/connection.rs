//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address (e.g., `127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "mentor".into(),
            database: "catalog".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Defaults overridden by `MENTOR_DB_URL`, `MENTOR_DB_NAMESPACE`,
    /// `MENTOR_DB_DATABASE`, `MENTOR_DB_USERNAME` and `MENTOR_DB_PASSWORD`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, fallback: String| std::env::var(key).unwrap_or(fallback);
        Self {
            url: var("MENTOR_DB_URL", defaults.url),
            namespace: var("MENTOR_DB_NAMESPACE", defaults.namespace),
            database: var("MENTOR_DB_DATABASE", defaults.database),
            username: var("MENTOR_DB_USERNAME", defaults.username),
            password: var("MENTOR_DB_PASSWORD", defaults.password),
        }
    }
}

/// Owns the SurrealDB client shared by every repository.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect, authenticate as root and select namespace/database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Successfully connected to SurrealDB");

        Ok(Self { db })
    }

    /// Bring the schema up to date.
    pub async fn migrate(&self) -> Result<u32, DbError> {
        run_migrations(&self.db).await
    }

    /// The underlying client; cheap to clone into repositories.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
