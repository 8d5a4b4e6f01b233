//! Session creation, editing and status lifecycle.
//!
//! Every status write, manual or scheduled, goes through one path: the
//! status is stored with a version check, then the course is brought in
//! line with [`TransitionEffects`]. When the course side fails the
//! previous status is written back and its effects re-applied before the
//! error is returned.

use chrono::{DateTime, Duration, Utc};
use mentor_core::error::{MentorError, MentorResult};
use mentor_core::lifecycle::{
    SelfEnrolment, TransitionEffects, available_statuses, check_scheduled_transition,
    check_transition,
};
use mentor_core::models::course::{CourseRole, CreateCourse, EnrolMethod};
use mentor_core::models::role::Capability;
use mentor_core::models::session::{
    CreateSession, NewSession, Session, SessionStatus, UpdateSession,
};
use mentor_core::repository::{
    CourseEngine, EntityRepository, Notifier, SessionRepository, TrainingRepository,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::access::AccessPolicy;
use crate::config::MentorConfig;
use crate::entity::required;
use crate::notice::Notices;

pub const TEMPLATE_CANCELLED_PARTICIPANT: &str = "session_cancelled_participant";
pub const TEMPLATE_CANCELLED_TRAINER: &str = "session_cancelled_trainer";

/// Outcome of a cancellation broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FanOut {
    sent: usize,
    failed: usize,
}

/// Outcome of a date-driven status pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub started: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Session lifecycle service.
///
/// Generic over its collaborators so that tests can inject failing
/// course engines or notifiers.
pub struct SessionLifecycle<E, T, S, C, N, A>
where
    E: EntityRepository,
    T: TrainingRepository,
    S: SessionRepository,
    C: CourseEngine,
    N: Notifier,
    A: AccessPolicy,
{
    entities: E,
    trainings: T,
    sessions: S,
    engine: C,
    notifier: N,
    access: A,
    notices: Notices,
    config: MentorConfig,
}

impl<E, T, S, C, N, A> SessionLifecycle<E, T, S, C, N, A>
where
    E: EntityRepository,
    T: TrainingRepository,
    S: SessionRepository,
    C: CourseEngine,
    N: Notifier,
    A: AccessPolicy,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entities: E,
        trainings: T,
        sessions: S,
        engine: C,
        notifier: N,
        access: A,
        notices: Notices,
        config: MentorConfig,
    ) -> Self {
        Self {
            entities,
            trainings,
            sessions,
            engine,
            notifier,
            access,
            notices,
            config,
        }
    }

    pub async fn get_session(&self, id: Uuid) -> MentorResult<Session> {
        self.sessions.get_by_id(id).await
    }

    /// Create a session of a training, with its own hidden course.
    pub async fn create_session(&self, actor: Uuid, input: CreateSession) -> MentorResult<Session> {
        let training = self.trainings.get_by_id(input.training_id).await?;
        let entity_id = input.entity_id.unwrap_or(training.entity_id);
        self.entities.get_by_id(entity_id).await?;
        self.access
            .require(actor, Capability::ManageSessions, entity_id)
            .await?;

        let shortname = required(&input.shortname, "session shortname")?;
        if self.sessions.shortname_exists(&shortname).await? {
            return Err(MentorError::AlreadyExists {
                entity: format!("session with shortname {shortname}"),
            });
        }
        check_dates(input.start_date, input.end_date)?;
        let name = match input.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => training.name.clone(),
        };

        let course = self
            .engine
            .create_course(CreateCourse {
                fullname: name.clone(),
                shortname: shortname.clone(),
                visible: false,
            })
            .await?;
        self.engine
            .create_enrolment_instance(course.id, EnrolMethod::Manual)
            .await?;

        let session_number = self.sessions.next_session_number(training.id).await?;
        let session = self
            .sessions
            .create(NewSession {
                training_id: training.id,
                entity_id,
                course_id: course.id,
                name,
                shortname,
                session_number,
                terms: input.terms,
                start_date: input.start_date,
                end_date: input.end_date,
                max_participants: input.max_participants,
            })
            .await?;

        info!(
            session_id = %session.id,
            training_id = %training.id,
            session_number,
            %actor,
            "Session created"
        );
        Ok(session)
    }

    /// Apply an edit. A storage failure is reported on the notice board
    /// and yields `Ok(false)`; other errors propagate.
    pub async fn update_session(
        &self,
        actor: Uuid,
        id: Uuid,
        input: UpdateSession,
    ) -> MentorResult<bool> {
        let current = self.sessions.get_by_id(id).await?;
        self.access
            .require(actor, Capability::ManageSessions, current.entity_id)
            .await?;

        let name = input
            .name
            .as_deref()
            .map(|n| required(n, "session name"))
            .transpose()?;
        let shortname = match input.shortname.as_deref() {
            Some(raw) => {
                let shortname = required(raw, "session shortname")?;
                if shortname != current.shortname
                    && self.sessions.shortname_exists(&shortname).await?
                {
                    return Err(MentorError::AlreadyExists {
                        entity: format!("session with shortname {shortname}"),
                    });
                }
                Some(shortname)
            }
            None => None,
        };
        check_dates(
            input.start_date.unwrap_or(current.start_date),
            input.end_date.unwrap_or(current.end_date),
        )?;
        let terms_changed = input
            .terms
            .as_ref()
            .is_some_and(|terms| *terms != current.terms);

        let update = UpdateSession {
            name,
            shortname,
            ..input
        };
        let updated = match self.sessions.update(id, update).await {
            Ok(session) => session,
            Err(MentorError::Database(message)) => {
                error!(session_id = %id, error = %message, "Session update failed");
                self.notices
                    .error(format!("Session \"{}\" could not be saved", current.name));
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        // Self-enrolment depends on the terms; keep the course in step.
        if terms_changed {
            let effects = TransitionEffects::for_status(updated.status, &updated.terms);
            self.apply_effects(&updated, effects).await?;
        }

        info!(session_id = %id, %actor, "Session updated");
        self.notices
            .success(format!("Session \"{}\" saved", updated.name));
        Ok(true)
    }

    /// Statuses a manager may pick for the session right now.
    pub async fn available_statuses(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> MentorResult<Vec<SessionStatus>> {
        let session = self.sessions.get_by_id(id).await?;
        Ok(available_statuses(
            session.status,
            session.end_date,
            now,
            Duration::days(self.config.archive_after_days),
        ))
    }

    /// Move a session to `target`.
    ///
    /// The target must be offered by [`Self::available_statuses`], except
    /// `cancelled`, which any non-terminal session accepts. Re-applying the
    /// current status changes nothing.
    ///
    /// `expected_version` is the version the caller last saw; when given
    /// and stale the call fails with `Conflict` before anything is
    /// written.
    pub async fn update_status(
        &self,
        actor: Uuid,
        id: Uuid,
        target: SessionStatus,
        expected_version: Option<u64>,
    ) -> MentorResult<Session> {
        let session = self.sessions.get_by_id(id).await?;
        self.access
            .require(actor, Capability::ManageSessions, session.entity_id)
            .await?;

        if let Some(expected) = expected_version
            && expected != session.version
        {
            return Err(MentorError::Conflict {
                entity: "session".into(),
                id: id.to_string(),
            });
        }

        check_transition(
            session.status,
            target,
            session.end_date,
            Utc::now(),
            Duration::days(self.config.archive_after_days),
        )?;
        if target == session.status {
            return Ok(session);
        }

        let updated = self.transition(session, target).await?;
        info!(session_id = %id, status = %target, %actor, "Session status changed");
        Ok(updated)
    }

    /// Advance sessions whose dates have passed: open sessions that have
    /// started go in progress, running sessions that have ended complete.
    pub async fn refresh_statuses(&self, now: DateTime<Utc>) -> MentorResult<RefreshReport> {
        let candidates = self
            .sessions
            .list_by_status(&[SessionStatus::OpenedRegistration, SessionStatus::InProgress])
            .await?;

        let mut report = RefreshReport::default();
        for session in candidates {
            let ended = session.end_date.is_some_and(|end| end <= now);
            let started = session.start_date.is_some_and(|start| start <= now);
            let target = match session.status {
                SessionStatus::InProgress if ended => SessionStatus::Completed,
                SessionStatus::OpenedRegistration if ended => SessionStatus::Completed,
                SessionStatus::OpenedRegistration if started => SessionStatus::InProgress,
                _ => continue,
            };

            let id = session.id;
            let outcome = match check_scheduled_transition(session.status, target) {
                Ok(()) => self.transition(session, target).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(_) if target == SessionStatus::Completed => report.completed += 1,
                Ok(_) => report.started += 1,
                Err(e) => {
                    warn!(session_id = %id, status = %target, error = %e, "Scheduled status change failed");
                    report.failed += 1;
                }
            }
        }

        if report != RefreshReport::default() {
            info!(
                started = report.started,
                completed = report.completed,
                failed = report.failed,
                "Session statuses refreshed"
            );
        }
        Ok(report)
    }

    /// Write an already validated status and bring the course in line.
    async fn transition(&self, session: Session, target: SessionStatus) -> MentorResult<Session> {
        let updated = self
            .sessions
            .update_status(session.id, target, session.version)
            .await?;
        let effects = TransitionEffects::for_status(target, &updated.terms);

        if let Err(e) = self.apply_effects(&updated, effects).await {
            error!(
                session_id = %session.id,
                status = %target,
                error = %e,
                "Applying status effects failed, restoring previous status"
            );
            self.restore(&session, &updated).await;
            return Err(e);
        }

        if effects.notify_enrolled {
            self.notify_cancellation(&updated).await;
        }
        Ok(updated)
    }

    /// Compensation for a failed transition. Failures here are logged; the
    /// original error is what the caller sees.
    async fn restore(&self, previous: &Session, written: &Session) {
        if let Err(e) = self
            .sessions
            .update_status(previous.id, previous.status, written.version)
            .await
        {
            error!(session_id = %previous.id, error = %e, "Could not restore session status");
            return;
        }
        let effects = TransitionEffects::for_status(previous.status, &previous.terms);
        if let Err(e) = self.apply_effects(previous, effects).await {
            error!(session_id = %previous.id, error = %e, "Could not restore course state");
        }
    }

    async fn apply_effects(&self, session: &Session, effects: TransitionEffects) -> MentorResult<()> {
        let course_id = session.course_id;
        self.engine
            .set_course_visibility(course_id, effects.course_visible)
            .await?;

        let instances = self.engine.get_enrolment_instances(course_id).await?;

        if effects.disable_all {
            for instance in instances.iter().filter(|i| i.enabled) {
                self.engine
                    .set_enrolment_instance_status(instance.id, false)
                    .await?;
            }
            return Ok(());
        }

        let self_instance = instances
            .iter()
            .find(|i| i.method == EnrolMethod::SelfEnrol);
        match (effects.self_enrolment, self_instance) {
            (SelfEnrolment::Enable, Some(instance)) if !instance.enabled => {
                self.engine
                    .set_enrolment_instance_status(instance.id, true)
                    .await?;
            }
            (SelfEnrolment::Enable, None) => {
                self.engine
                    .create_enrolment_instance(course_id, EnrolMethod::SelfEnrol)
                    .await?;
            }
            (SelfEnrolment::Disable, Some(instance)) if instance.enabled => {
                self.engine
                    .set_enrolment_instance_status(instance.id, false)
                    .await?;
            }
            _ => {}
        }

        for instance in instances
            .iter()
            .filter(|i| i.method == EnrolMethod::Manual && i.enabled != effects.manual_enabled)
        {
            self.engine
                .set_enrolment_instance_status(instance.id, effects.manual_enabled)
                .await?;
        }
        Ok(())
    }

    /// One message per enrolled user. Individual failures are counted,
    /// never raised.
    async fn notify_cancellation(&self, session: &Session) -> FanOut {
        let enrolled = match self.engine.get_enrolled_users(session.course_id).await {
            Ok(enrolled) => enrolled,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Could not list enrolled users");
                return FanOut::default();
            }
        };

        let context = json!({
            "session_id": session.id,
            "session_name": session.name,
            "session_shortname": session.shortname,
            "training_name": session.training_name,
            "start_date": session.start_date,
        });

        let mut outcome = FanOut::default();
        for enrolment in enrolled {
            let template = match enrolment.role {
                CourseRole::Participant => TEMPLATE_CANCELLED_PARTICIPANT,
                CourseRole::Trainer | CourseRole::Tutor => TEMPLATE_CANCELLED_TRAINER,
            };
            if self
                .notifier
                .send(enrolment.user_id, template, context.clone())
                .await
            {
                outcome.sent += 1;
            } else {
                outcome.failed += 1;
            }
        }

        if outcome.failed > 0 {
            warn!(
                session_id = %session.id,
                sent = outcome.sent,
                failed = outcome.failed,
                "Some cancellation notices were not delivered"
            );
            self.notices.warning(format!(
                "{} of {} participants of \"{}\" could not be told about the cancellation",
                outcome.failed,
                outcome.sent + outcome.failed,
                session.name
            ));
        } else {
            info!(session_id = %session.id, sent = outcome.sent, "Cancellation notices sent");
        }
        outcome
    }
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> MentorResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(MentorError::validation(
            "session end date must not precede its start date",
        )),
        _ => Ok(()),
    }
}
