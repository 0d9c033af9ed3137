//! Booking lifecycle.
//!
//! A booking is visible to both participants. Every status change first
//! confirms that both sides are still linked to the booking, then checks the
//! status machine, then writes with a compare-and-set so the two views can
//! never disagree.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use database::validation::{
    validate_day_of_week, validate_rate, validate_rating, validate_slot, validate_text,
    validate_url, MAX_TITLE_LENGTH,
};
use database::{DatabaseError, NewBooking, NewNotification, Role, SessionEntry};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{MarketplaceError, Result};
use crate::status::{SessionStatus, Trigger};
use crate::store::SessionStore;

/// A student's booking request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionRequest {
    /// The tutor's uid.
    pub people: String,
    #[serde(default)]
    pub posting_id: Option<String>,
    pub course: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub rate: f64,
    /// Overrides the computed end of the session.
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Next time `day` at `time` (UTC) falls strictly after `after`.
pub fn next_occurrence(day: Weekday, time: NaiveTime, after: DateTime<Utc>) -> DateTime<Utc> {
    let days_ahead = (7 + day.num_days_from_monday() as i64
        - after.weekday().num_days_from_monday() as i64)
        % 7;
    let candidate = (after.date_naive() + Duration::days(days_ahead))
        .and_time(time)
        .and_utc();

    if candidate > after {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

/// Applies the booking rules on top of a [`SessionStore`].
pub struct SessionManager<S> {
    store: S,
}

impl<S: SessionStore> SessionManager<S> {
    /// Create a manager over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Book a tutor. The session always starts `Pending`.
    pub async fn create_session(
        &self,
        student_id: &str,
        request: NewSessionRequest,
    ) -> Result<SessionEntry> {
        validate_text("people", &request.people, MAX_TITLE_LENGTH)?;
        validate_text("course", &request.course, MAX_TITLE_LENGTH)?;
        let day = validate_day_of_week(&request.day_of_week)?;
        validate_slot(&request.start_time, &request.end_time)?;
        validate_rate(request.rate)?;

        if request.people == student_id {
            return Err(MarketplaceError::Validation(
                "cannot book a session with yourself".to_string(),
            ));
        }

        if let Some(posting_id) = &request.posting_id {
            self.check_posting(posting_id, &request.people).await?;
        }

        let ended_at = match request.ended_at {
            Some(at) => at,
            None => {
                let end = NaiveTime::parse_from_str(&request.end_time, "%H:%M")
                    .map_err(|e| MarketplaceError::Validation(format!("endTime: {e}")))?;
                next_occurrence(day, end, Utc::now())
            }
        };

        let booking = self
            .store
            .create_session(&NewBooking {
                posting_id: request.posting_id,
                student_id: student_id.to_string(),
                tutor_id: request.people.clone(),
                course: request.course.clone(),
                day_of_week: request.day_of_week,
                start_time: request.start_time,
                end_time: request.end_time,
                rate: request.rate,
                status: SessionStatus::Pending.as_str().to_string(),
                ended_at: Some(ended_at),
            })
            .await?;

        self.notify(
            &request.people,
            student_id,
            &booking.id,
            "booking_requested",
            format!("New booking request for {}", request.course),
        )
        .await;

        self.get_session(student_id, &booking.id).await
    }

    /// A participant's view of a session.
    pub async fn get_session(&self, user_id: &str, session_id: &str) -> Result<SessionEntry> {
        self.store
            .get_session(user_id, session_id)
            .await?
            .ok_or_else(|| MarketplaceError::NotFound {
                entity: "Session",
                id: session_id.to_string(),
            })
    }

    /// Every session a user participates in.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionEntry>> {
        self.store.list_sessions(user_id).await
    }

    /// Move a session to `status` on behalf of one participant.
    pub async fn update_status(
        &self,
        user_id: &str,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<SessionEntry> {
        let linked = self.linked(user_id, session_id).await?;
        linked
            .status
            .check_transition(status, Trigger::Participant(linked.role))?;

        self.write(&linked, status, None).await?;

        if status == SessionStatus::Accepted {
            if let Some(posting_id) = &linked.entry.posting_id {
                if let Err(err) = self.store.mark_posting_booked(posting_id).await {
                    warn!(posting_id = %posting_id, "Failed to mark posting booked: {}", err);
                }
            }
        }

        self.notify(
            &linked.entry.people,
            user_id,
            session_id,
            "session_status",
            format!("Your {} session is now {}", linked.entry.course, status),
        )
        .await;

        self.get_session(user_id, session_id).await
    }

    /// Attach payment proof. Only the student may pay; the session becomes `Paid`.
    pub async fn update_payment_proof(
        &self,
        user_id: &str,
        session_id: &str,
        proof_url: &str,
    ) -> Result<SessionEntry> {
        validate_url("paymentProof", proof_url)?;

        let linked = self.linked(user_id, session_id).await?;
        if linked.role != Role::Student {
            return Err(MarketplaceError::Forbidden(
                "only the student can submit payment".to_string(),
            ));
        }
        linked
            .status
            .check_transition(SessionStatus::Paid, Trigger::PaymentProof)?;

        self.write(&linked, SessionStatus::Paid, Some(proof_url)).await?;

        self.notify(
            &linked.entry.people,
            user_id,
            session_id,
            "payment_submitted",
            format!("Payment submitted for {}", linked.entry.course),
        )
        .await;

        self.get_session(user_id, session_id).await
    }

    /// Review the tutor and fold `rating` into their running mean.
    pub async fn submit_review(
        &self,
        user_id: &str,
        session_id: &str,
        rating: f64,
    ) -> Result<SessionEntry> {
        validate_rating(rating)?;

        let linked = self.linked(user_id, session_id).await?;
        if linked.role != Role::Student {
            return Err(MarketplaceError::Forbidden(
                "only the student can review a session".to_string(),
            ));
        }
        linked
            .status
            .check_transition(SessionStatus::Reviewed, Trigger::Review)?;

        self.write(&linked, SessionStatus::Reviewed, None).await?;
        self.store.record_rating(&linked.entry.people, rating).await?;

        info!(session_id = %session_id, tutor_id = %linked.entry.people, rating, "Session reviewed");

        self.notify(
            &linked.entry.people,
            user_id,
            session_id,
            "session_reviewed",
            format!("You received a {rating} star review for {}", linked.entry.course),
        )
        .await;

        self.get_session(user_id, session_id).await
    }

    /// Complete every open session whose end time is before `now`.
    ///
    /// Returns the number of sessions completed.
    pub async fn sweep_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let expired: Vec<String> = self
            .store
            .list_open_sessions()
            .await?
            .into_iter()
            .filter(|b| b.ended_at.is_some_and(|at| at < now))
            .filter(|b| {
                SessionStatus::from_str(&b.status).is_some_and(|s| {
                    s.check_transition(SessionStatus::Completed, Trigger::Sweep)
                        .is_ok()
                })
            })
            .map(|b| b.id)
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }

        let completed = self.store.complete_sessions(&expired).await?;
        info!(candidates = expired.len(), completed, "Swept expired sessions");
        Ok(completed)
    }

    /// Like [`get_session`](Self::get_session), completing the session first
    /// if it has ended.
    pub async fn get_session_with_expiration_check(
        &self,
        user_id: &str,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionEntry> {
        let entry = self.get_session(user_id, session_id).await?;

        let expired = entry.ended_at.is_some_and(|at| at < now)
            && SessionStatus::from_str(&entry.status).is_some_and(|s| !s.is_terminal());
        if !expired {
            return Ok(entry);
        }

        self.store.complete_sessions(&[entry.id.clone()]).await?;
        self.get_session(user_id, session_id).await
    }

    /// A booking may only cite an open posting of the tutor being booked.
    async fn check_posting(&self, posting_id: &str, tutor_id: &str) -> Result<()> {
        let posting = self
            .store
            .get_posting(posting_id)
            .await?
            .ok_or_else(|| MarketplaceError::NotFound {
                entity: "TutorPosting",
                id: posting_id.to_string(),
            })?;

        if posting.tutor_id != tutor_id {
            return Err(MarketplaceError::Validation(format!(
                "posting {posting_id} is not offered by {tutor_id}"
            )));
        }
        if posting.booked {
            return Err(MarketplaceError::Conflict(format!(
                "posting {posting_id} is already booked"
            )));
        }
        Ok(())
    }

    async fn linked(&self, user_id: &str, session_id: &str) -> Result<Linked> {
        let entry = self.get_session(user_id, session_id).await?;

        if let Err(err) = self.store.counterpart_session(&entry.people, session_id).await {
            if matches!(err, MarketplaceError::MissingCounterpart { .. }) {
                error!(session_id = %session_id, user_id = %user_id, "Session is not linked to its counterpart");
            }
            return Err(err);
        }

        let role = Role::from_str(&entry.role)
            .ok_or_else(|| corrupt(&entry.id, "role", &entry.role))?;
        let status = SessionStatus::from_str(&entry.status)
            .ok_or_else(|| corrupt(&entry.id, "status", &entry.status))?;

        Ok(Linked {
            entry,
            role,
            status,
        })
    }

    async fn write(
        &self,
        linked: &Linked,
        next: SessionStatus,
        payment_proof: Option<&str>,
    ) -> Result<()> {
        let written = self
            .store
            .write_status(&linked.entry.id, linked.status, next, payment_proof)
            .await?;

        if !written {
            return Err(MarketplaceError::Conflict(format!(
                "session {} changed while moving it to {}; reload and retry",
                linked.entry.id, next
            )));
        }

        info!(
            session_id = %linked.entry.id,
            from = %linked.status,
            to = %next,
            by = %linked.entry.user_id,
            "Session status changed"
        );
        Ok(())
    }

    async fn notify(&self, to: &str, from: &str, session_id: &str, kind: &str, message: String) {
        let notification = NewNotification {
            user_id: to.to_string(),
            from_user_id: from.to_string(),
            session_id: Some(session_id.to_string()),
            kind: kind.to_string(),
            message,
        };

        if let Err(err) = self.store.notify(&notification).await {
            warn!(session_id = %session_id, kind, "Failed to notify {}: {}", to, err);
        }
    }
}

struct Linked {
    entry: SessionEntry,
    role: Role,
    status: SessionStatus,
}

fn corrupt(session_id: &str, field: &str, value: &str) -> MarketplaceError {
    MarketplaceError::Database(DatabaseError::Corrupt {
        entity: "Session",
        id: session_id.to_string(),
        reason: format!("unknown {field} '{value}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;
    use chrono::TimeZone;
    use database::TutorPosting;

    fn request(tutor: &str) -> NewSessionRequest {
        NewSessionRequest {
            people: tutor.to_string(),
            posting_id: None,
            course: "CS2040S".to_string(),
            day_of_week: "Wednesday".to_string(),
            start_time: "10:00".to_string(),
            end_time: "12:00".to_string(),
            rate: 25.0,
            ended_at: None,
        }
    }

    fn manager() -> SessionManager<MemorySessionStore> {
        SessionManager::new(MemorySessionStore::new())
    }

    fn posting(id: &str, tutor: &str) -> TutorPosting {
        TutorPosting {
            id: id.to_string(),
            tutor_id: tutor.to_string(),
            course: "CS2040S".to_string(),
            location: "COM1".to_string(),
            description: String::new(),
            day_of_week: "Wednesday".to_string(),
            start_time: "10:00".to_string(),
            end_time: "12:00".to_string(),
            rate: 25.0,
            booked: false,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    fn citing(tutor: &str, posting_id: &str) -> NewSessionRequest {
        NewSessionRequest {
            posting_id: Some(posting_id.to_string()),
            ..request(tutor)
        }
    }

    async fn booked(manager: &SessionManager<MemorySessionStore>) -> String {
        manager.create_session("stu", request("tut")).await.unwrap().id
    }

    #[test]
    fn test_next_occurrence() {
        // Wednesday 2026-10-14 09:00 UTC.
        let wed_morning = Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();

        assert_eq!(
            next_occurrence(Weekday::Wed, noon, wed_morning),
            Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
        );
        assert_eq!(
            next_occurrence(Weekday::Fri, noon, wed_morning),
            Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
        );
        assert_eq!(
            next_occurrence(Weekday::Mon, noon, wed_morning),
            Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
        );

        // Same weekday but the slot already ended: next week.
        let wed_evening = Utc.with_ymd_and_hms(2026, 10, 14, 18, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(Weekday::Wed, noon, wed_evening),
            Utc.with_ymd_and_hms(2026, 10, 21, 12, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_create_session_indexes_both_sides_and_notifies_tutor() {
        let manager = manager();
        let created = manager.create_session("stu", request("tut")).await.unwrap();

        assert_eq!(created.status, "Pending");
        assert_eq!(created.people, "tut");
        assert!(created.ended_at.is_some_and(|at| at > Utc::now()));

        let tutor_view = manager.get_session("tut", &created.id).await.unwrap();
        assert_eq!(tutor_view.people, "stu");
        assert_eq!(tutor_view.status, created.status);

        let sent = manager.store().notifications().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, "tut");
        assert_eq!(sent[0].kind, "booking_requested");
    }

    #[tokio::test]
    async fn test_create_session_validation() {
        let manager = manager();

        let mut bad = request("tut");
        bad.start_time = "13:00".to_string();
        assert!(matches!(
            manager.create_session("stu", bad).await,
            Err(MarketplaceError::Validation(_))
        ));

        let mut bad = request("tut");
        bad.rate = 0.0;
        assert!(manager.create_session("stu", bad).await.is_err());

        let mut bad = request("tut");
        bad.day_of_week = "Caturday".to_string();
        assert!(manager.create_session("stu", bad).await.is_err());

        assert!(matches!(
            manager.create_session("stu", request("stu")).await,
            Err(MarketplaceError::Validation(_))
        ));

        assert!(manager.store().notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let manager = manager();
        manager.store().add_posting(posting("posting-1", "tut")).await;
        let id = manager
            .create_session("stu", citing("tut", "posting-1"))
            .await
            .unwrap()
            .id;

        let accepted = manager
            .update_status("tut", &id, SessionStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.status, "Accepted");
        assert!(manager.store().is_booked("posting-1").await);

        let paid = manager
            .update_payment_proof("stu", &id, "https://cdn.example/receipt.jpg")
            .await
            .unwrap();
        assert_eq!(paid.status, "Paid");

        let confirmed = manager
            .update_status("tut", &id, SessionStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(confirmed.status, "Confirmed");

        let reviewed = manager.submit_review("stu", &id, 4.0).await.unwrap();
        assert_eq!(reviewed.status, "Reviewed");
        assert_eq!(manager.store().rating("tut").await, Some((4.0, 1)));

        // Both participants observe the same status.
        assert_eq!(manager.get_session("tut", &id).await.unwrap().status, "Reviewed");

        let kinds: Vec<String> = manager
            .store()
            .notifications()
            .await
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                "booking_requested",
                "session_status",
                "payment_submitted",
                "session_status",
                "session_reviewed"
            ]
        );
    }

    #[tokio::test]
    async fn test_booking_must_cite_an_open_posting_of_the_tutor() {
        let manager = manager();
        manager.store().add_posting(posting("by-tut", "tut")).await;
        manager.store().add_posting(posting("by-other", "other")).await;

        assert!(matches!(
            manager.create_session("stu", citing("tut", "no-such-posting")).await,
            Err(MarketplaceError::NotFound { .. })
        ));
        assert!(matches!(
            manager.create_session("stu", citing("tut", "by-other")).await,
            Err(MarketplaceError::Validation(_))
        ));
        assert!(manager.store().notifications().await.is_empty());

        let id = manager
            .create_session("stu", citing("tut", "by-tut"))
            .await
            .unwrap()
            .id;
        manager
            .update_status("tut", &id, SessionStatus::Accepted)
            .await
            .unwrap();
        assert!(manager.store().is_booked("by-tut").await);
        assert!(!manager.store().is_booked("by-other").await);

        assert!(matches!(
            manager.create_session("stu2", citing("tut", "by-tut")).await,
            Err(MarketplaceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_roles_are_enforced() {
        let manager = manager();
        let id = booked(&manager).await;

        assert!(matches!(
            manager.update_status("stu", &id, SessionStatus::Accepted).await,
            Err(MarketplaceError::Forbidden(_))
        ));

        manager
            .update_status("tut", &id, SessionStatus::Accepted)
            .await
            .unwrap();

        assert!(matches!(
            manager.update_payment_proof("tut", &id, "https://x/y.png").await,
            Err(MarketplaceError::Forbidden(_))
        ));
        assert!(matches!(
            manager.update_status("stu", &id, SessionStatus::Paid).await,
            Err(MarketplaceError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_caller_is_not_found() {
        let manager = manager();
        let id = booked(&manager).await;

        assert!(matches!(
            manager.update_status("mallory", &id, SessionStatus::Cancelled).await,
            Err(MarketplaceError::NotFound { .. })
        ));
        assert!(matches!(
            manager.get_session("stu", "no-such-session").await,
            Err(MarketplaceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_counterpart_blocks_updates() {
        let manager = manager();
        let id = booked(&manager).await;
        manager.store().remove_entry("tut", &id).await;

        assert!(matches!(
            manager.update_status("stu", &id, SessionStatus::Cancelled).await,
            Err(MarketplaceError::MissingCounterpart { .. })
        ));
        assert_eq!(manager.get_session("stu", &id).await.unwrap().status, "Pending");
    }

    #[tokio::test]
    async fn test_review_requires_a_finished_session() {
        let manager = manager();
        let id = booked(&manager).await;

        assert!(matches!(
            manager.submit_review("stu", &id, 5.0).await,
            Err(MarketplaceError::InvalidTransition { .. })
        ));
        assert!(matches!(
            manager.submit_review("stu", &id, 9.0).await,
            Err(MarketplaceError::Validation(_))
        ));
        assert_eq!(manager.store().rating("tut").await, None);
    }

    #[tokio::test]
    async fn test_sweep_completes_only_open_expired_sessions() {
        let manager = manager();
        let past = Utc::now() - Duration::hours(1);

        let mut expired = request("tut");
        expired.ended_at = Some(past);
        let open_id = manager.create_session("stu", expired.clone()).await.unwrap().id;

        let cancelled_id = manager.create_session("stu", expired).await.unwrap().id;
        manager
            .update_status("stu", &cancelled_id, SessionStatus::Cancelled)
            .await
            .unwrap();

        let future_id = booked(&manager).await;

        assert_eq!(manager.sweep_expired_sessions(Utc::now()).await.unwrap(), 1);
        assert_eq!(manager.get_session("tut", &open_id).await.unwrap().status, "Completed");
        assert_eq!(
            manager.get_session("tut", &cancelled_id).await.unwrap().status,
            "Cancelled"
        );
        assert_eq!(manager.get_session("tut", &future_id).await.unwrap().status, "Pending");

        // Completed sessions can still be reviewed.
        manager.submit_review("stu", &open_id, 5.0).await.unwrap();
        assert_eq!(manager.sweep_expired_sessions(Utc::now()).await.unwrap(), 0);
        assert_eq!(manager.get_session("stu", &open_id).await.unwrap().status, "Reviewed");
    }

    #[tokio::test]
    async fn test_lazy_expiration_check() {
        let manager = manager();
        let id = booked(&manager).await;

        let now = Utc::now();
        let fresh = manager
            .get_session_with_expiration_check("stu", &id, now)
            .await
            .unwrap();
        assert_eq!(fresh.status, "Pending");

        let later = now + Duration::days(8);
        let expired = manager
            .get_session_with_expiration_check("stu", &id, later)
            .await
            .unwrap();
        assert_eq!(expired.status, "Completed");
    }

    #[tokio::test]
    async fn test_lost_race_is_a_conflict() {
        let manager = manager();
        let id = booked(&manager).await;

        // Another writer moves the session between our read and our write.
        let linked = manager.linked("tut", &id).await.unwrap();
        manager.store().force_status(&id, SessionStatus::Cancelled).await;

        assert!(matches!(
            manager.write(&linked, SessionStatus::Accepted, None).await,
            Err(MarketplaceError::Conflict(_))
        ));
        assert_eq!(manager.get_session("stu", &id).await.unwrap().status, "Cancelled");
    }

    #[tokio::test]
    async fn test_against_sqlite() {
        let db = database::Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let manager = SessionManager::new(db.clone());

        let id = manager.create_session("stu", request("tut")).await.unwrap().id;
        manager
            .update_status("tut", &id, SessionStatus::Rejected)
            .await
            .unwrap();

        let tutor_view = manager.get_session("tut", &id).await.unwrap();
        let student_view = manager.get_session("stu", &id).await.unwrap();
        assert_eq!(tutor_view.status, "Rejected");
        assert_eq!(student_view.status, "Rejected");

        let inbox = database::notification::list_notifications(db.pool(), "stu")
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, "session_status");
    }

    #[tokio::test]
    async fn test_sqlite_rejects_another_tutors_posting() {
        let db = database::Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let manager = SessionManager::new(db.clone());

        let theirs = database::tutor::create_posting(
            db.pool(),
            &database::NewPosting {
                tutor_id: "tutor-a".to_string(),
                course: "CS2040S".to_string(),
                location: "COM1".to_string(),
                description: String::new(),
                day_of_week: "Wednesday".to_string(),
                start_time: "10:00".to_string(),
                end_time: "12:00".to_string(),
                rate: 25.0,
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            manager.create_session("stu", citing("tutor-b", &theirs.id)).await,
            Err(MarketplaceError::Validation(_))
        ));

        let open = database::tutor::list_postings(db.pool(), &database::PostingFilter::default())
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert!(!open[0].booked);
    }
}
