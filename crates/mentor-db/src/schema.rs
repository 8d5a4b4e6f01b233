//! Catalog schema and its versioned migrations.
//!
//! Tables are SCHEMAFULL. Ids travel as uuid strings and status-like
//! fields as strings constrained by ASSERT. Trainings and sessions point at
//! their owners through record links so listings can filter and sort on
//! `entity.name` and `training.name` without a second query.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// Applied versions are recorded here, one row per migration.

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "listing_indexes",
        sql: SCHEMA_V2,
    },
];

// v1: catalog, course engine, profiles, roles and outbox.

const SCHEMA_V1: &str = "\
-- -----------------------------------------------------------------------
-- Entities (tree of organizational units)
-- -----------------------------------------------------------------------
DEFINE TABLE entity SCHEMAFULL;
DEFINE FIELD name ON TABLE entity TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD shortname ON TABLE entity TYPE string;
DEFINE FIELD parent_id ON TABLE entity TYPE option<string>;
DEFINE FIELD regions ON TABLE entity TYPE array<string> DEFAULT [];
DEFINE FIELD sirh ON TABLE entity TYPE array<string> DEFAULT [];
DEFINE FIELD hidden ON TABLE entity TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE entity TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE entity TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_entity_shortname ON TABLE entity \
    COLUMNS shortname UNIQUE;
DEFINE INDEX idx_entity_parent ON TABLE entity COLUMNS parent_id;

-- -----------------------------------------------------------------------
-- Trainings (entity scope)
-- -----------------------------------------------------------------------
DEFINE TABLE training SCHEMAFULL;
DEFINE FIELD entity ON TABLE training TYPE record<entity>;
DEFINE FIELD name ON TABLE training TYPE string;
DEFINE FIELD shortname ON TABLE training TYPE string;
DEFINE FIELD status ON TABLE training TYPE string \
    ASSERT $value IN ['draft', 'template', 'elaboration_completed', \
    'archived'];
DEFINE FIELD collection ON TABLE training TYPE string DEFAULT '';
DEFINE FIELD skills ON TABLE training TYPE string DEFAULT '';
DEFINE FIELD idsirh ON TABLE training TYPE option<string>;
DEFINE FIELD created_at ON TABLE training TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE training TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_training_shortname ON TABLE training \
    COLUMNS shortname UNIQUE;

-- -----------------------------------------------------------------------
-- Sessions (entity scope, one course each)
-- -----------------------------------------------------------------------
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD training ON TABLE session TYPE record<training>;
DEFINE FIELD entity ON TABLE session TYPE record<entity>;
DEFINE FIELD course_id ON TABLE session TYPE string;
DEFINE FIELD name ON TABLE session TYPE string;
DEFINE FIELD shortname ON TABLE session TYPE string;
DEFINE FIELD session_number ON TABLE session TYPE int;
DEFINE FIELD status ON TABLE session TYPE string \
    ASSERT $value IN ['in_preparation', 'opened_registration', \
    'in_progress', 'completed', 'archived', 'reported', 'cancelled'];
DEFINE FIELD start_date ON TABLE session TYPE option<datetime>;
DEFINE FIELD end_date ON TABLE session TYPE option<datetime>;
DEFINE FIELD terms ON TABLE session TYPE string;
DEFINE FIELD max_participants ON TABLE session TYPE option<int>;
DEFINE FIELD version ON TABLE session TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_shortname ON TABLE session \
    COLUMNS shortname UNIQUE;
DEFINE INDEX idx_session_status ON TABLE session COLUMNS status;

-- -----------------------------------------------------------------------
-- Course engine: courses, enrolment methods, enrolments
-- -----------------------------------------------------------------------
DEFINE TABLE course SCHEMAFULL;
DEFINE FIELD fullname ON TABLE course TYPE string;
DEFINE FIELD shortname ON TABLE course TYPE string;
DEFINE FIELD visible ON TABLE course TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE course TYPE datetime \
    DEFAULT time::now();

DEFINE TABLE enrol_instance SCHEMAFULL;
DEFINE FIELD course_id ON TABLE enrol_instance TYPE string;
DEFINE FIELD method ON TABLE enrol_instance TYPE string \
    ASSERT $value IN ['self', 'manual'];
DEFINE FIELD enabled ON TABLE enrol_instance TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE enrol_instance TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_enrol_instance_course ON TABLE enrol_instance \
    COLUMNS course_id;

DEFINE TABLE enrolment SCHEMAFULL;
DEFINE FIELD course_id ON TABLE enrolment TYPE string;
DEFINE FIELD user_id ON TABLE enrolment TYPE string;
DEFINE FIELD role ON TABLE enrolment TYPE string \
    ASSERT $value IN ['participant', 'trainer', 'tutor'];
DEFINE FIELD created_at ON TABLE enrolment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_enrolment_course_user ON TABLE enrolment \
    COLUMNS course_id, user_id UNIQUE;

-- -----------------------------------------------------------------------
-- Profiles
-- -----------------------------------------------------------------------
DEFINE TABLE profile SCHEMAFULL;
DEFINE FIELD username ON TABLE profile TYPE string;
DEFINE FIELD firstname ON TABLE profile TYPE string;
DEFINE FIELD lastname ON TABLE profile TYPE string;
DEFINE FIELD email ON TABLE profile TYPE string;
DEFINE FIELD main_entity ON TABLE profile TYPE option<string>;
DEFINE FIELD secondary_entities ON TABLE profile TYPE array<string> \
    DEFAULT [];
DEFINE FIELD created_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_profile_username ON TABLE profile \
    COLUMNS username UNIQUE;

-- -----------------------------------------------------------------------
-- Role catalog (record id = shortname)
-- -----------------------------------------------------------------------
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD capabilities ON TABLE role TYPE array<string> DEFAULT [];
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();

-- -----------------------------------------------------------------------
-- Message outbox (append-only)
-- -----------------------------------------------------------------------
DEFINE TABLE message SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD user_id ON TABLE message TYPE string;
DEFINE FIELD template ON TABLE message TYPE string;
DEFINE FIELD context ON TABLE message TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE message TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_message_user ON TABLE message COLUMNS user_id;


-- Profile -> Role assignment in an entity context
DEFINE TABLE has_role TYPE RELATION SCHEMAFULL;
DEFINE FIELD entity_id ON TABLE has_role TYPE string;
DEFINE FIELD created_at ON TABLE has_role TYPE datetime \
    DEFAULT time::now();
";

// v2: indexes backing entity-scoped listings.

const SCHEMA_V2: &str = "\
DEFINE INDEX IF NOT EXISTS idx_training_entity ON TABLE training \
    COLUMNS entity;
DEFINE INDEX IF NOT EXISTS idx_session_entity ON TABLE session \
    COLUMNS entity;
DEFINE INDEX IF NOT EXISTS idx_session_training ON TABLE session \
    COLUMNS training;
DEFINE INDEX IF NOT EXISTS idx_has_role_entity ON TABLE has_role \
    COLUMNS entity_id;
";

/// Apply every migration newer than the last recorded one; returns how
/// many ran. Safe to call on every start.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let recorded: Vec<MigrationRecord> = result.take(0)?;
    let current_version = recorded.first().map_or(0, |m| m.version);

    let pending = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current_version);
    let mut applied = 0;

    for migration in pending {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {e}",
                migration.version, migration.name
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!("recording v{} failed: {e}", migration.version))
            })?;
        applied += 1;
    }

    if applied > 0 {
        info!(applied, from = current_version, "Schema up to date");
    }

    Ok(applied)
}
