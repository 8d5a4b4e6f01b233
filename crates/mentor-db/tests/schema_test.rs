//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    let applied = mentor_db::run_migrations(&db).await.unwrap();
    assert_eq!(applied, 2);

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "entity",
        "training",
        "session",
        "course",
        "enrol_instance",
        "enrolment",
        "profile",
        "role",
        "message",
        "has_role",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    mentor_db::run_migrations(&db).await.unwrap();
    let second = mentor_db::run_migrations(&db).await.unwrap();
    assert_eq!(second, 0);

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 2, "expected one record per migration");
}

#[tokio::test]
async fn session_status_is_constrained() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mentor_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE session SET \
             training = training:t1, entity = entity:e1, \
             course_id = 'c', name = 'n', shortname = 's', \
             session_number = 1, status = 'sleeping', terms = 'x'",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "unknown status should be rejected");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_entity_shortnames() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mentor_db::run_migrations(&db).await.unwrap();

    db.query("CREATE entity SET name = 'North', shortname = 'north'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let result = db
        .query("CREATE entity SET name = 'North bis', shortname = 'north'")
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "duplicate shortname should be rejected");
}
