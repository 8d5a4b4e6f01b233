//! Session lifecycle rules.
//!
//! Pure functions: which statuses a manager may pick next, which
//! transitions are legal, and what a status implies for the session
//! course. Applying the effects is the lifecycle service's job.

use chrono::{DateTime, Duration, Utc};

use crate::error::{MentorError, MentorResult};
use crate::models::session::{RegistrationTerms, SessionStatus};

/// Statuses offered to a manager for a session currently in `current`.
///
/// `archived` is offered from `completed` once `end_date + archive_after`
/// has passed, or at once when the session has no end date.
pub fn available_statuses(
    current: SessionStatus,
    end_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    archive_after: Duration,
) -> Vec<SessionStatus> {
    use SessionStatus::*;
    match current {
        InPreparation => vec![InPreparation, OpenedRegistration],
        OpenedRegistration => vec![OpenedRegistration, Reported],
        InProgress => vec![InProgress, Reported],
        Completed => {
            let archivable = end_date.is_none_or(|end| end + archive_after <= now);
            if archivable {
                vec![Completed, Archived]
            } else {
                vec![Completed]
            }
        }
        Reported => vec![Reported, OpenedRegistration],
        Cancelled => vec![Cancelled],
        Archived => vec![Archived],
    }
}

/// Validate a manager's status change.
///
/// The target must be one of [`available_statuses`]. `cancelled` is the
/// one exception: any non-terminal session may be cancelled.
pub fn check_transition(
    current: SessionStatus,
    target: SessionStatus,
    end_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    archive_after: Duration,
) -> MentorResult<()> {
    if target == SessionStatus::Cancelled && !current.is_terminal() {
        return Ok(());
    }
    if available_statuses(current, end_date, now, archive_after).contains(&target) {
        return Ok(());
    }
    Err(invalid(current, target))
}

/// Validate a date-driven status change. Only the moves made by the
/// scheduled refresh are accepted: an open session starts or completes,
/// a running one completes.
pub fn check_scheduled_transition(from: SessionStatus, to: SessionStatus) -> MentorResult<()> {
    use SessionStatus::*;
    match (from, to) {
        (OpenedRegistration, InProgress)
        | (OpenedRegistration, Completed)
        | (InProgress, Completed) => Ok(()),
        _ => Err(invalid(from, to)),
    }
}

fn invalid(from: SessionStatus, to: SessionStatus) -> MentorError {
    MentorError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// What to do with the self-enrolment instance of a session course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfEnrolment {
    /// Enable it, creating it first when missing.
    Enable,
    /// Disable it if present; never deleted.
    Disable,
}

/// The course-side consequences of a session status.
///
/// Visibility and enrolment state are always derived together from one
/// value of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEffects {
    pub course_visible: bool,
    pub self_enrolment: SelfEnrolment,
    pub manual_enabled: bool,
    /// Disable every enrolment method, whatever its type.
    pub disable_all: bool,
    /// Tell every enrolled user about the change.
    pub notify_enrolled: bool,
}

impl TransitionEffects {
    pub fn for_status(status: SessionStatus, terms: &RegistrationTerms) -> Self {
        use SessionStatus::*;
        let open_self = if terms.is_open_enrolment() {
            SelfEnrolment::Enable
        } else {
            SelfEnrolment::Disable
        };
        let (course_visible, self_enrolment) = match status {
            InPreparation => (false, SelfEnrolment::Disable),
            OpenedRegistration | InProgress => (true, open_self),
            Completed | Archived => (true, SelfEnrolment::Disable),
            Reported | Cancelled => (false, SelfEnrolment::Disable),
        };
        let cancelled = status == Cancelled;
        Self {
            course_visible,
            self_enrolment,
            manual_enabled: !cancelled,
            disable_all: cancelled,
            notify_enrolled: cancelled,
        }
    }
}
