//! Integration tests for profile updates and entity-change notifications
//! using in-memory SurrealDB and the outbox notifier.

use mentor_core::models::entity::CreateEntity;
use mentor_core::models::profile::{CreateProfile, Profile, UpdateProfile};
use mentor_core::multi_value::MultiValue;
use mentor_core::repository::{EntityRepository, RoleRepository};
use mentor_db::repository::{
    SurrealEntityRepository, SurrealNotifier, SurrealProfileRepository, SurrealRoleRepository,
};
use mentor_service::{ProfileService, RoleAccess, ensure_default_roles};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Entities = SurrealEntityRepository<Db>;
type Roles = SurrealRoleRepository<Db>;

struct Fixture {
    service: ProfileService<
        Entities,
        SurrealProfileRepository<Db>,
        SurrealNotifier<Db>,
        RoleAccess<Entities, Roles>,
    >,
    outbox: SurrealNotifier<Db>,
    entities: Entities,
    manager: Uuid,
    user: Profile,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mentor_db::run_migrations(&db).await.unwrap();

    let entities = SurrealEntityRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    ensure_default_roles(&roles).await.unwrap();

    let mut ids = Vec::new();
    for name in ["Ministry", "Agency"] {
        let entity = entities
            .create(CreateEntity {
                name: name.into(),
                shortname: name.to_lowercase(),
                parent_id: None,
                regions: None,
                sirh: None,
            })
            .await
            .unwrap();
        ids.push(entity.id);
    }
    let manager = Uuid::now_v7();
    roles.assign(manager, "admindedie", ids[0]).await.unwrap();

    let outbox = SurrealNotifier::new(db.clone());
    let service = ProfileService::new(
        entities.clone(),
        SurrealProfileRepository::new(db),
        outbox.clone(),
        RoleAccess::new(entities.clone(), roles),
    );
    let user = service
        .create_profile(CreateProfile {
            username: "jdoe".into(),
            firstname: "Jo".into(),
            lastname: "Doe".into(),
            email: "jdoe@example.org".into(),
            main_entity: Some("ministry".into()),
            secondary_entities: Some(MultiValue::from("agency,ministry")),
        })
        .await
        .unwrap();

    Fixture {
        service,
        outbox,
        entities,
        manager,
        user,
    }
}

impl Fixture {
    async fn templates(&self) -> Vec<String> {
        self.outbox
            .sent_to(self.user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.template)
            .collect()
    }
}

#[tokio::test]
async fn manager_moving_a_user_notifies_them() {
    let f = setup().await;
    let updated = f
        .service
        .update_profile(
            f.manager,
            f.user.id,
            UpdateProfile {
                secondary_entities: Some(MultiValue::from(vec!["agency"])),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.secondary_entities, vec!["agency"]);
    assert_eq!(f.templates().await, vec!["secondary_entities_changed"]);

    f.service
        .update_profile(
            f.manager,
            f.user.id,
            UpdateProfile {
                main_entity: Some(Some("agency".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    // The new main entity is Agency, where the manager has no rights.
    assert_eq!(f.templates().await, vec!["secondary_entities_changed"]);
}

#[tokio::test]
async fn equivalent_values_are_not_a_change() {
    let f = setup().await;
    f.service
        .update_profile(
            f.manager,
            f.user.id,
            UpdateProfile {
                main_entity: Some(Some(" ministry ".into())),
                secondary_entities: Some(MultiValue::from(vec!["ministry", "agency"])),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(f.templates().await.is_empty());
}

#[tokio::test]
async fn rights_are_checked_at_the_entity_with_that_shortname() {
    let f = setup().await;
    // Same display name as the managed entity, different shortname.
    f.entities
        .create(CreateEntity {
            name: "Ministry".into(),
            shortname: "ministry-annex".into(),
            parent_id: None,
            regions: None,
            sirh: None,
        })
        .await
        .unwrap();

    f.service
        .update_profile(
            f.manager,
            f.user.id,
            UpdateProfile {
                main_entity: Some(Some("ministry-annex".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(f.templates().await.is_empty());

    f.service
        .update_profile(
            f.manager,
            f.user.id,
            UpdateProfile {
                main_entity: Some(Some("ministry".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(f.templates().await, vec!["main_entity_changed"]);
}

#[tokio::test]
async fn self_edits_are_silent() {
    let f = setup().await;
    let updated = f
        .service
        .update_profile(
            f.user.id,
            f.user.id,
            UpdateProfile {
                secondary_entities: Some(MultiValue::from("")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.secondary_entities.is_empty());
    assert!(f.templates().await.is_empty());
}

#[tokio::test]
async fn actors_without_rights_do_not_notify() {
    let f = setup().await;
    f.service
        .update_profile(
            Uuid::now_v7(),
            f.user.id,
            UpdateProfile {
                main_entity: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(f.templates().await.is_empty());
}

#[tokio::test]
async fn clearing_the_main_entity_notifies() {
    let f = setup().await;
    let updated = f
        .service
        .update_profile(
            f.manager,
            f.user.id,
            UpdateProfile {
                main_entity: Some(None),
                firstname: Some("Joanne".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.main_entity, None);
    assert_eq!(updated.firstname, "Joanne");
    assert_eq!(f.templates().await, vec!["main_entity_changed"]);
}
