//! Mentor maintenance runner.
//!
//! Brings the schema up to date, seeds the role catalog and runs one pass
//! of date-driven session status changes. Meant to be run on a schedule.

use std::error::Error;

use chrono::Utc;
use mentor_db::repository::{
    SurrealCourseEngine, SurrealEntityRepository, SurrealNotifier, SurrealRoleRepository,
    SurrealSessionRepository, SurrealTrainingRepository,
};
use mentor_db::{DbConfig, DbManager};
use mentor_service::{MentorConfig, Notices, RoleAccess, SessionLifecycle, ensure_default_roles};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting Mentor maintenance run");

    let manager = DbManager::connect(&DbConfig::from_env()).await?;
    let applied = manager.migrate().await?;
    info!(applied, "Schema up to date");

    let db = manager.client().clone();
    let config = MentorConfig::from_env();
    let entities = SurrealEntityRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());

    let seeded = ensure_default_roles(&roles).await?;
    info!(seeded, "Role catalog ready");

    let notices = Notices::new();
    let lifecycle = SessionLifecycle::new(
        entities.clone(),
        SurrealTrainingRepository::new(db.clone()),
        SurrealSessionRepository::new(db.clone()),
        SurrealCourseEngine::new(db.clone()),
        SurrealNotifier::new(db),
        RoleAccess::new(entities, roles),
        notices.clone(),
        config,
    );

    let report = lifecycle.refresh_statuses(Utc::now()).await?;
    info!(
        started = report.started,
        completed = report.completed,
        failed = report.failed,
        "Session statuses refreshed"
    );
    for notice in notices.take() {
        warn!(level = ?notice.level, message = %notice.message, "Pending notice");
    }

    info!("Mentor maintenance run finished");
    Ok(())
}
