//! Integration tests for the Entity and Profile repositories using
//! in-memory SurrealDB.

use mentor_core::error::MentorError;
use mentor_core::models::entity::{CreateEntity, UpdateEntity};
use mentor_core::models::profile::{CreateProfile, UpdateProfile};
use mentor_core::repository::{EntityRepository, ProfileRepository};
use mentor_db::repository::{SurrealEntityRepository, SurrealProfileRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mentor_db::run_migrations(&db).await.unwrap();
    db
}

fn entity(name: &str, shortname: &str, parent_id: Option<Uuid>) -> CreateEntity {
    CreateEntity {
        name: name.into(),
        shortname: shortname.into(),
        parent_id,
        regions: None,
        sirh: None,
    }
}

#[tokio::test]
async fn create_and_get_entity() {
    let repo = SurrealEntityRepository::new(setup().await);

    let created = repo
        .create(CreateEntity {
            regions: Some("R1, R2".into()),
            sirh: Some(vec!["RENOIRH", "SIRH2"].into()),
            ..entity("New Entity 1", "NE1", None)
        })
        .await
        .unwrap();

    assert_eq!(created.name, "New Entity 1");
    assert!(created.is_main_entity());
    assert_eq!(created.regions, vec!["R1", "R2"]);
    assert_eq!(created.sirh, vec!["RENOIRH", "SIRH2"]);
    assert!(!created.hidden);

    let fetched = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(repo.get_by_shortname("NE1").await.unwrap().id, created.id);
    assert_eq!(repo.get_by_name("New Entity 1").await.unwrap().id, created.id);
}

#[tokio::test]
async fn unknown_entity_is_not_found() {
    let repo = SurrealEntityRepository::new(setup().await);

    let err = repo.get_by_id(Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, MentorError::NotFound { .. }));

    let err = repo.get_by_shortname("missing").await.unwrap_err();
    assert!(matches!(err, MentorError::NotFound { .. }));
}

#[tokio::test]
async fn children_and_main_entities() {
    let repo = SurrealEntityRepository::new(setup().await);

    let root = repo.create(entity("Root", "root", None)).await.unwrap();
    let other_root = repo.create(entity("Other", "other", None)).await.unwrap();
    let child1 = repo
        .create(entity("Child 1", "c1", Some(root.id)))
        .await
        .unwrap();
    let child2 = repo
        .create(entity("Child 2", "c2", Some(root.id)))
        .await
        .unwrap();

    let children = repo.get_children(root.id).await.unwrap();
    let ids: Vec<Uuid> = children.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![child1.id, child2.id]);
    assert!(children.iter().all(|c| c.parent_id == Some(root.id)));

    let mains: Vec<Uuid> = repo
        .list_main_entities()
        .await
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(mains, vec![root.id, other_root.id]);
}

#[tokio::test]
async fn update_entity_fields() {
    let repo = SurrealEntityRepository::new(setup().await);
    let created = repo.create(entity("Before", "before", None)).await.unwrap();

    let updated = repo
        .update(
            created.id,
            UpdateEntity {
                name: Some("After".into()),
                regions: Some("R3,R3,R4".into()),
                hidden: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "After");
    assert_eq!(updated.shortname, "before");
    assert_eq!(updated.regions, vec!["R3", "R4"]);
    assert!(updated.hidden);
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn duplicate_shortname_is_rejected() {
    let repo = SurrealEntityRepository::new(setup().await);
    repo.create(entity("First", "dup", None)).await.unwrap();

    let err = repo.create(entity("Second", "dup", None)).await.unwrap_err();
    assert!(matches!(err, MentorError::Database(_)));
}

#[tokio::test]
async fn profile_create_and_update() {
    let repo = SurrealProfileRepository::new(setup().await);

    let profile = repo
        .create(CreateProfile {
            username: "jdoe".into(),
            firstname: "Jane".into(),
            lastname: "Doe".into(),
            email: "jane@example.test".into(),
            main_entity: Some("Root".into()),
            secondary_entities: Some("Child 1,Child 2".into()),
        })
        .await
        .unwrap();

    assert_eq!(profile.secondary_entities, vec!["Child 1", "Child 2"]);

    let updated = repo
        .update(
            profile.id,
            UpdateProfile {
                main_entity: Some(None),
                secondary_entities: Some(Vec::<String>::new().into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.main_entity, None);
    assert!(updated.secondary_entities.is_empty());
    assert_eq!(updated.username, "jdoe");

    let err = repo
        .update(Uuid::now_v7(), UpdateProfile::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MentorError::NotFound { .. }));
}
