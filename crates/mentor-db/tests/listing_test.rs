//! Integration tests for entity-scoped training and session listings
//! using in-memory SurrealDB.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mentor_core::models::entity::CreateEntity;
use mentor_core::models::listing::{ScopedQuery, SortDirection, SortSpec};
use mentor_core::models::session::{NewSession, RegistrationTerms, Session, SessionStatus};
use mentor_core::models::training::{NewTraining, Training, TrainingStatus};
use mentor_core::repository::{
    EntityRepository, Pagination, SessionRepository, TrainingRepository,
};
use mentor_db::repository::{
    SurrealEntityRepository, SurrealSessionRepository, SurrealTrainingRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

struct Fixture {
    entities: SurrealEntityRepository<Db>,
    trainings: SurrealTrainingRepository<Db>,
    sessions: SurrealSessionRepository<Db>,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mentor_db::run_migrations(&db).await.unwrap();
    Fixture {
        entities: SurrealEntityRepository::new(db.clone()),
        trainings: SurrealTrainingRepository::new(db.clone()),
        sessions: SurrealSessionRepository::new(db),
    }
}

impl Fixture {
    async fn entity(&self, name: &str, parent_id: Option<Uuid>) -> Uuid {
        self.entities
            .create(CreateEntity {
                name: name.into(),
                shortname: name.to_lowercase().replace(' ', "_"),
                parent_id,
                regions: None,
                sirh: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn training(&self, entity_id: Uuid, name: &str, collection: &str) -> Training {
        self.trainings
            .create(NewTraining {
                entity_id,
                name: name.into(),
                shortname: format!("{name}_short"),
                status: TrainingStatus::Draft,
                collection: collection.into(),
                skills: String::new(),
                idsirh: Some(format!("{name}_sirh")),
            })
            .await
            .unwrap()
    }

    async fn session(
        &self,
        training: &Training,
        name: &str,
        start_date: Option<DateTime<Utc>>,
    ) -> Session {
        let number = self
            .sessions
            .next_session_number(training.id)
            .await
            .unwrap();
        self.sessions
            .create(NewSession {
                training_id: training.id,
                entity_id: training.entity_id,
                course_id: Uuid::now_v7(),
                name: name.into(),
                shortname: format!("{name}_short"),
                session_number: number,
                terms: RegistrationTerms::OpenEnrolment,
                start_date,
                end_date: start_date.map(|d| d + Duration::days(2)),
                max_participants: None,
            })
            .await
            .unwrap()
    }

    async fn set_status(&self, session: &Session, status: SessionStatus) -> Session {
        self.sessions
            .update_status(session.id, status, session.version)
            .await
            .unwrap()
    }
}

fn scoped(entity_ids: Vec<Uuid>) -> ScopedQuery {
    ScopedQuery {
        entity_ids,
        collections: Vec::new(),
        statuses: Vec::new(),
        start_date: None,
        end_date: None,
        search: None,
        order: None,
        pagination: Pagination::default(),
    }
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> Uuid) -> Vec<Uuid> {
    items.iter().map(id).collect()
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, 9, 0, 0).unwrap()
}

#[tokio::test]
async fn session_record_resolves_linked_names() {
    let fx = setup().await;
    let root = fx.entity("Root Entity", None).await;
    let training = fx.training(root, "training1", "management,accompagnement").await;
    let session = fx.session(&training, "fullname1", Some(day(1))).await;

    assert_eq!(session.entity_name, "Root Entity");
    assert_eq!(session.training_name, "training1");
    assert_eq!(session.collection, "management,accompagnement");
    assert_eq!(session.session_number, 1);
    assert_eq!(session.status, SessionStatus::InPreparation);
    assert_eq!(session.version, 0);

    let second = fx.session(&training, "fullname2", None).await;
    assert_eq!(second.session_number, 2);
}

#[tokio::test]
async fn status_filter_counts() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let training = fx.training(root, "training", "").await;

    let s1 = fx.session(&training, "s1", None).await;
    let s2 = fx.session(&training, "s2", None).await;
    let s3 = fx.session(&training, "s3", None).await;
    fx.set_status(&s1, SessionStatus::InProgress).await;
    fx.set_status(&s2, SessionStatus::OpenedRegistration).await;
    fx.set_status(&s3, SessionStatus::OpenedRegistration).await;

    let mut query = scoped(vec![root]);
    query.statuses = vec!["opened_registration".into()];
    assert_eq!(fx.sessions.count(&query).await.unwrap(), 2);

    query.statuses = vec!["in_progress".into()];
    assert_eq!(fx.sessions.count(&query).await.unwrap(), 1);

    query.statuses = vec!["in_progress".into(), "opened_registration".into()];
    assert_eq!(fx.sessions.count(&query).await.unwrap(), 3);
}

#[tokio::test]
async fn listing_is_scoped_to_entity_ids() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let child = fx.entity("Child", Some(root)).await;
    let other = fx.entity("Other", None).await;

    let t_root = fx.training(root, "t_root", "").await;
    let t_child = fx.training(child, "t_child", "").await;
    fx.training(other, "t_other", "").await;

    let page = fx.trainings.search(&scoped(vec![root, child])).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(ids(&page.items, |t| t.id), vec![t_root.id, t_child.id]);

    let only_child = fx.trainings.search(&scoped(vec![child])).await.unwrap();
    assert_eq!(ids(&only_child.items, |t| t.id), vec![t_child.id]);

    let listed = fx.trainings.list_by_entities(&[root]).await.unwrap();
    assert_eq!(ids(&listed, |t| t.id), vec![t_root.id]);
}

#[tokio::test]
async fn collection_filter_matches_any_tag_case_insensitively() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let a = fx.training(root, "a", "management,accompagnement").await;
    let b = fx.training(root, "b", "Numerique").await;
    fx.training(root, "c", "").await;

    let mut query = scoped(vec![root]);
    query.collections = vec!["ACCOMPAGNEMENT".into(), "numerique".into()];
    let page = fx.trainings.search(&query).await.unwrap();
    assert_eq!(ids(&page.items, |t| t.id), vec![a.id, b.id]);

    query.collections = vec!["unknown".into()];
    assert_eq!(fx.trainings.count(&query).await.unwrap(), 0);

    // Sessions inherit the tags of their training.
    let session = fx.session(&a, "s", None).await;
    let mut query = scoped(vec![root]);
    query.collections = vec!["management".into()];
    let page = fx.sessions.search(&query).await.unwrap();
    assert_eq!(ids(&page.items, |s| s.id), vec![session.id]);
}

#[tokio::test]
async fn search_round_trip() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let training = fx.training(root, "training", "").await;
    let target = fx.session(&training, "fullname3", None).await;
    fx.session(&training, "another", None).await;

    for term in ["fullname3", "FULLNAME3", "name3", "ULLn"] {
        let mut query = scoped(vec![root]);
        query.search = Some(term.into());
        let page = fx.sessions.search(&query).await.unwrap();
        assert_eq!(ids(&page.items, |s| s.id), vec![target.id], "term {term}");
    }

    let mut query = scoped(vec![root]);
    query.search = Some("zzz-unrelated".into());
    assert_eq!(fx.sessions.count(&query).await.unwrap(), 0);

    query.search = Some(String::new());
    assert_eq!(fx.sessions.count(&query).await.unwrap(), 2);
}

#[tokio::test]
async fn search_matches_entity_name_and_status_label() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let child = fx.entity("Paris Office", Some(root)).await;
    let t_root = fx.training(root, "t1", "").await;
    let t_child = fx.training(child, "t2", "").await;
    let s_root = fx.session(&t_root, "s1", None).await;
    let s_child = fx.session(&t_child, "s2", None).await;
    fx.set_status(&s_root, SessionStatus::InProgress).await;

    let mut query = scoped(vec![root, child]);
    query.search = Some("paris".into());
    let page = fx.sessions.search(&query).await.unwrap();
    assert_eq!(ids(&page.items, |s| s.id), vec![s_child.id]);

    query.search = Some("in progress".into());
    let page = fx.sessions.search(&query).await.unwrap();
    assert_eq!(ids(&page.items, |s| s.id), vec![s_root.id]);
}

#[tokio::test]
async fn date_filters_bound_start_date() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let training = fx.training(root, "training", "").await;
    let early = fx.session(&training, "early", Some(day(1))).await;
    let middle = fx.session(&training, "middle", Some(day(10))).await;
    let late = fx.session(&training, "late", Some(day(20))).await;
    fx.session(&training, "undated", None).await;

    let mut query = scoped(vec![root]);
    query.start_date = Some(day(5));
    let page = fx.sessions.search(&query).await.unwrap();
    assert_eq!(ids(&page.items, |s| s.id), vec![middle.id, late.id]);

    query.start_date = None;
    query.end_date = Some(day(10));
    let page = fx.sessions.search(&query).await.unwrap();
    assert_eq!(ids(&page.items, |s| s.id), vec![early.id, middle.id]);

    query.start_date = Some(day(5));
    let page = fx.sessions.search(&query).await.unwrap();
    assert_eq!(ids(&page.items, |s| s.id), vec![middle.id]);
}

#[tokio::test]
async fn sort_by_start_date_reverses() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let training = fx.training(root, "training", "").await;
    fx.session(&training, "b", Some(day(12))).await;
    fx.session(&training, "a", Some(day(3))).await;
    fx.session(&training, "c", Some(day(25))).await;

    let mut query = scoped(vec![root]);
    query.order = Some(SortSpec {
        column: 5,
        direction: SortDirection::Asc,
    });
    let asc = fx.sessions.search(&query).await.unwrap();

    query.order = Some(SortSpec {
        column: 5,
        direction: SortDirection::Desc,
    });
    let desc = fx.sessions.search(&query).await.unwrap();

    let names: Vec<&str> = asc.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);

    let mut reversed = ids(&desc.items, |s| s.id);
    reversed.reverse();
    assert_eq!(ids(&asc.items, |s| s.id), reversed);
}

#[tokio::test]
async fn ties_keep_creation_order() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let first = fx.training(root, "first", "").await;
    let second = fx.training(root, "second", "").await;
    let third = fx.training(root, "third", "").await;

    // Column 0 sorts by entity name, identical for every record.
    let mut query = scoped(vec![root]);
    query.order = Some(SortSpec {
        column: 0,
        direction: SortDirection::Desc,
    });
    let page = fx.trainings.search(&query).await.unwrap();
    assert_eq!(
        ids(&page.items, |t| t.id),
        vec![first.id, second.id, third.id]
    );
}

#[tokio::test]
async fn identical_queries_are_idempotent() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let training = fx.training(root, "training", "").await;
    for i in 0..4 {
        fx.session(&training, &format!("session{i}"), Some(day(i + 1)))
            .await;
    }

    let mut query = scoped(vec![root]);
    query.order = Some(SortSpec {
        column: 2,
        direction: SortDirection::Desc,
    });
    let first = fx.sessions.search(&query).await.unwrap();
    let second = fx.sessions.search(&query).await.unwrap();
    assert_eq!(ids(&first.items, |s| s.id), ids(&second.items, |s| s.id));
}

#[tokio::test]
async fn count_ignores_paging() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let training = fx.training(root, "training", "").await;
    let mut created = Vec::new();
    for i in 0..5 {
        created.push(fx.session(&training, &format!("s{i}"), None).await.id);
    }

    let mut query = scoped(vec![root]);
    query.pagination = Pagination {
        offset: 1,
        limit: 2,
    };
    let page = fx.sessions.search(&query).await.unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(ids(&page.items, |s| s.id), created[1..3].to_vec());
    assert_eq!(fx.sessions.count(&query).await.unwrap(), 5);
}

#[tokio::test]
async fn unknown_sort_column_is_rejected() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;

    let mut query = scoped(vec![root]);
    query.order = Some(SortSpec {
        column: 99,
        direction: SortDirection::Asc,
    });
    let err = fx.sessions.search(&query).await.unwrap_err();
    assert!(matches!(
        err,
        mentor_core::error::MentorError::Validation { .. }
    ));
}

#[tokio::test]
async fn find_exact_matches_whole_names_only() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let training = fx.training(root, "Leadership", "").await;
    let session = fx.session(&training, "fullname3", None).await;

    let by_name = fx.sessions.find_exact(&[root], "FullName3").await.unwrap();
    assert_eq!(ids(&by_name, |s| s.id), vec![session.id]);

    let by_training = fx.sessions.find_exact(&[root], "leadership").await.unwrap();
    assert_eq!(ids(&by_training, |s| s.id), vec![session.id]);

    let by_idsirh = fx
        .sessions
        .find_exact(&[root], "Leadership_sirh")
        .await
        .unwrap();
    assert_eq!(ids(&by_idsirh, |s| s.id), vec![session.id]);

    assert!(
        fx.sessions
            .find_exact(&[root], "fullname")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn stale_version_conflicts() {
    let fx = setup().await;
    let root = fx.entity("Root", None).await;
    let training = fx.training(root, "training", "").await;
    let session = fx.session(&training, "s", None).await;

    let moved = fx.set_status(&session, SessionStatus::OpenedRegistration).await;
    assert_eq!(moved.version, 1);

    let err = fx
        .sessions
        .update_status(session.id, SessionStatus::Reported, session.version)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        mentor_core::error::MentorError::Conflict { .. }
    ));

    let err = fx
        .sessions
        .update_status(Uuid::now_v7(), SessionStatus::Reported, 0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        mentor_core::error::MentorError::NotFound { .. }
    ));

    let listed = fx
        .sessions
        .list_by_status(&[SessionStatus::OpenedRegistration])
        .await
        .unwrap();
    assert_eq!(ids(&listed, |s| s.id), vec![session.id]);
}
