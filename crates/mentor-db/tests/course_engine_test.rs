//! Integration tests for the SurrealDB course engine, notifier and role
//! repository using in-memory SurrealDB.

use mentor_core::error::MentorError;
use mentor_core::models::course::{CourseRole, CreateCourse, EnrolMethod};
use mentor_core::models::role::{Capability, CreateRole, default_roles};
use mentor_core::repository::{CourseEngine, Notifier, RoleRepository};
use mentor_db::repository::{SurrealCourseEngine, SurrealNotifier, SurrealRoleRepository};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mentor_db::run_migrations(&db).await.unwrap();
    db
}

fn course(shortname: &str) -> CreateCourse {
    CreateCourse {
        fullname: format!("{shortname} course"),
        shortname: shortname.into(),
        visible: false,
    }
}

// -----------------------------------------------------------------------
// Course engine
// -----------------------------------------------------------------------

#[tokio::test]
async fn course_visibility_toggles() {
    let engine = SurrealCourseEngine::new(setup().await);
    let created = engine.create_course(course("c1")).await.unwrap();
    assert!(!created.visible);

    engine.set_course_visibility(created.id, true).await.unwrap();
    assert!(engine.get_course(created.id).await.unwrap().visible);

    let err = engine
        .set_course_visibility(Uuid::now_v7(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, MentorError::NotFound { .. }));
}

#[tokio::test]
async fn enrolment_instances_are_created_enabled_and_toggle() {
    let engine = SurrealCourseEngine::new(setup().await);
    let created = engine.create_course(course("c1")).await.unwrap();

    let manual = engine
        .create_enrolment_instance(created.id, EnrolMethod::Manual)
        .await
        .unwrap();
    let self_enrol = engine
        .create_enrolment_instance(created.id, EnrolMethod::SelfEnrol)
        .await
        .unwrap();
    assert!(manual.enabled);

    engine
        .set_enrolment_instance_status(self_enrol.id, false)
        .await
        .unwrap();

    let instances = engine.get_enrolment_instances(created.id).await.unwrap();
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].method, EnrolMethod::Manual);
    assert!(instances[0].enabled);
    assert_eq!(instances[1].method, EnrolMethod::SelfEnrol);
    assert!(!instances[1].enabled);

    let err = engine
        .set_enrolment_instance_status(Uuid::now_v7(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, MentorError::NotFound { .. }));
}

#[tokio::test]
async fn re_enrolling_replaces_the_role() {
    let engine = SurrealCourseEngine::new(setup().await);
    let created = engine.create_course(course("c1")).await.unwrap();
    let alice = Uuid::now_v7();
    let bob = Uuid::now_v7();

    engine
        .enrol_user(created.id, alice, CourseRole::Participant)
        .await
        .unwrap();
    engine
        .enrol_user(created.id, bob, CourseRole::Trainer)
        .await
        .unwrap();
    engine
        .enrol_user(created.id, alice, CourseRole::Tutor)
        .await
        .unwrap();

    let enrolled = engine.get_enrolled_users(created.id).await.unwrap();
    assert_eq!(enrolled.len(), 2);
    let alice_row = enrolled.iter().find(|e| e.user_id == alice).unwrap();
    assert_eq!(alice_row.role, CourseRole::Tutor);
}

// -----------------------------------------------------------------------
// Notifier
// -----------------------------------------------------------------------

#[tokio::test]
async fn notifier_appends_to_outbox() {
    let notifier = SurrealNotifier::new(setup().await);
    let user = Uuid::now_v7();

    assert!(
        notifier
            .send(user, "session_cancelled_participant", json!({"session": "s1"}))
            .await
    );
    assert!(notifier.send(user, "main_entity_changed", json!({})).await);

    let sent = notifier.sent_to(user).await.unwrap();
    let templates: Vec<&str> = sent.iter().map(|m| m.template.as_str()).collect();
    assert_eq!(
        templates,
        vec!["session_cancelled_participant", "main_entity_changed"]
    );
    assert_eq!(sent[0].context["session"], "s1");
    assert!(notifier.sent_to(Uuid::now_v7()).await.unwrap().is_empty());
}

// -----------------------------------------------------------------------
// Roles
// -----------------------------------------------------------------------

#[tokio::test]
async fn role_catalog_round_trip() {
    let roles = SurrealRoleRepository::new(setup().await);
    for role in default_roles() {
        roles.create(role).await.unwrap();
    }

    let referent = roles.get("referentlocal").await.unwrap();
    assert!(referent.grants(Capability::ManageSessions));
    assert!(!referent.grants(Capability::ManageUsers));

    assert!(roles.exists("admindedie").await.unwrap());
    assert!(!roles.exists("nosuchrole").await.unwrap());
    assert_eq!(roles.list().await.unwrap().len(), 5);

    let err = roles
        .create(CreateRole {
            shortname: "bad name".into(),
            name: "Bad".into(),
            capabilities: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, MentorError::Validation { .. }));
}

#[tokio::test]
async fn assignments_are_idempotent_and_scoped_by_entity() {
    let roles = SurrealRoleRepository::new(setup().await);
    for role in default_roles() {
        roles.create(role).await.unwrap();
    }
    let user = Uuid::now_v7();
    let entity_a = Uuid::now_v7();
    let entity_b = Uuid::now_v7();

    assert!(roles.assign(user, "referentlocal", entity_a).await.unwrap());
    assert!(!roles.assign(user, "referentlocal", entity_a).await.unwrap());
    assert!(roles.assign(user, "referentlocal", entity_b).await.unwrap());

    let assignments = roles.get_user_assignments(user).await.unwrap();
    assert_eq!(assignments.len(), 2);
    assert!(assignments.iter().all(|a| a.role == "referentlocal"));
    assert!(assignments[0].grants(Capability::ManageSessions));
    assert_eq!(assignments[0].entity_id, entity_a);

    assert_eq!(
        roles.users_with_role("referentlocal", entity_b).await.unwrap(),
        vec![user]
    );

    roles.unassign(user, "referentlocal", entity_a).await.unwrap();
    let remaining = roles.get_user_assignments(user).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].entity_id, entity_b);
    assert!(
        roles
            .users_with_role("referentlocal", entity_a)
            .await
            .unwrap()
            .is_empty()
    );
}
