//! Session storage capability.
//!
//! [`SessionManager`](crate::sessions::SessionManager) only talks to storage
//! through [`SessionStore`], so the same rules run against SQLite in
//! production and against [`MemorySessionStore`] in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use database::{
    notification, session, tutor, user, Booking, Database, DatabaseError, NewBooking,
    NewNotification, Role, SessionEntry, TutorPosting,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{MarketplaceError, Result};
use crate::status::SessionStatus;

/// Storage operations the session lifecycle needs.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a booking and index it for both participants atomically.
    async fn create_session(&self, booking: &NewBooking) -> Result<Booking>;

    /// A participant's view of a session, if they are indexed for it.
    async fn get_session(&self, user_id: &str, session_id: &str) -> Result<Option<SessionEntry>>;

    /// Every session a user participates in, newest first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionEntry>>;

    /// The other participant's view of a session.
    ///
    /// Fails with `MissingCounterpart` when that participant is not indexed.
    async fn counterpart_session(
        &self,
        counterpart_id: &str,
        session_id: &str,
    ) -> Result<SessionEntry>;

    /// Move a session from `expected` to `next`.
    ///
    /// Returns `false` without writing if the stored status is no longer
    /// `expected`.
    async fn write_status(
        &self,
        session_id: &str,
        expected: SessionStatus,
        next: SessionStatus,
        payment_proof: Option<&str>,
    ) -> Result<bool>;

    /// Non-terminal sessions that have an end time.
    async fn list_open_sessions(&self) -> Result<Vec<Booking>>;

    /// Mark sessions `Completed` in one batch, skipping any that reached a
    /// terminal status meanwhile. Returns the number changed.
    async fn complete_sessions(&self, session_ids: &[String]) -> Result<u64>;

    /// Fold a rating into a tutor's running mean.
    async fn record_rating(&self, tutor_id: &str, rating: f64) -> Result<()>;

    /// The posting a booking cites, if it exists.
    async fn get_posting(&self, posting_id: &str) -> Result<Option<TutorPosting>>;

    /// Flag a posting as taken.
    async fn mark_posting_booked(&self, posting_id: &str) -> Result<()>;

    /// Deliver a notification.
    async fn notify(&self, notification: &NewNotification) -> Result<()>;
}

fn terminal_names() -> Vec<&'static str> {
    SessionStatus::TERMINAL.iter().map(|s| s.as_str()).collect()
}

#[async_trait]
impl SessionStore for Database {
    async fn create_session(&self, booking: &NewBooking) -> Result<Booking> {
        Ok(session::create_booking(self.pool(), booking).await?)
    }

    async fn get_session(&self, user_id: &str, session_id: &str) -> Result<Option<SessionEntry>> {
        Ok(session::find_entry(self.pool(), user_id, session_id).await?)
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionEntry>> {
        Ok(session::list_entries(self.pool(), user_id).await?)
    }

    async fn counterpart_session(
        &self,
        counterpart_id: &str,
        session_id: &str,
    ) -> Result<SessionEntry> {
        Ok(session::counterpart_entry(self.pool(), counterpart_id, session_id).await?)
    }

    async fn write_status(
        &self,
        session_id: &str,
        expected: SessionStatus,
        next: SessionStatus,
        payment_proof: Option<&str>,
    ) -> Result<bool> {
        Ok(session::compare_and_set_status(
            self.pool(),
            session_id,
            expected.as_str(),
            next.as_str(),
            payment_proof,
        )
        .await?)
    }

    async fn list_open_sessions(&self) -> Result<Vec<Booking>> {
        Ok(session::list_open_bookings(self.pool(), &terminal_names()).await?)
    }

    async fn complete_sessions(&self, session_ids: &[String]) -> Result<u64> {
        Ok(session::set_status_batch(
            self.pool(),
            session_ids,
            SessionStatus::Completed.as_str(),
            &terminal_names(),
        )
        .await?)
    }

    async fn record_rating(&self, tutor_id: &str, rating: f64) -> Result<()> {
        user::apply_rating(self.pool(), tutor_id, rating).await?;
        Ok(())
    }

    async fn get_posting(&self, posting_id: &str) -> Result<Option<TutorPosting>> {
        match tutor::get_posting(self.pool(), posting_id).await {
            Ok(posting) => Ok(Some(posting)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn mark_posting_booked(&self, posting_id: &str) -> Result<()> {
        Ok(tutor::set_booked(self.pool(), posting_id, true).await?)
    }

    async fn notify(&self, notification: &NewNotification) -> Result<()> {
        notification::create_notification(self.pool(), notification).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    bookings: HashMap<String, Booking>,
    index: HashMap<(String, String), Role>,
    notifications: Vec<NewNotification>,
    ratings: HashMap<String, (f64, i64)>,
    postings: HashMap<String, TutorPosting>,
}

impl MemoryState {
    fn entry(&self, user_id: &str, session_id: &str) -> Option<SessionEntry> {
        let role = *self
            .index
            .get(&(user_id.to_string(), session_id.to_string()))?;
        let booking = self.bookings.get(session_id)?;
        Some(view(booking, user_id, role))
    }
}

fn view(booking: &Booking, user_id: &str, role: Role) -> SessionEntry {
    let people = match role {
        Role::Student => booking.tutor_id.clone(),
        Role::Tutor => booking.student_id.clone(),
    };

    SessionEntry {
        id: booking.id.clone(),
        user_id: user_id.to_string(),
        role: role.as_str().to_string(),
        people,
        posting_id: booking.posting_id.clone(),
        course: booking.course.clone(),
        day_of_week: booking.day_of_week.clone(),
        start_time: booking.start_time.clone(),
        end_time: booking.end_time.clone(),
        rate: booking.rate,
        status: booking.status.clone(),
        payment_proof: booking.payment_proof.clone(),
        ended_at: booking.ended_at,
        created_at: booking.created_at.clone(),
        updated_at: booking.updated_at.clone(),
    }
}

/// In-process [`SessionStore`] for tests and local experiments.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: RwLock<MemoryState>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications delivered so far, oldest first.
    pub async fn notifications(&self) -> Vec<NewNotification> {
        self.state.read().await.notifications.clone()
    }

    /// A tutor's running mean and rating count.
    pub async fn rating(&self, tutor_id: &str) -> Option<(f64, i64)> {
        self.state.read().await.ratings.get(tutor_id).copied()
    }

    /// Make a posting available for bookings to cite.
    pub async fn add_posting(&self, posting: TutorPosting) {
        self.state
            .write()
            .await
            .postings
            .insert(posting.id.clone(), posting);
    }

    /// Whether a posting has been flagged as booked.
    pub async fn is_booked(&self, posting_id: &str) -> bool {
        self.state
            .read()
            .await
            .postings
            .get(posting_id)
            .is_some_and(|posting| posting.booked)
    }

    /// Drop one participant's index entry, leaving the booking in place.
    #[cfg(test)]
    pub(crate) async fn remove_entry(&self, user_id: &str, session_id: &str) {
        self.state
            .write()
            .await
            .index
            .remove(&(user_id.to_string(), session_id.to_string()));
    }

    /// Overwrite a stored status, bypassing the compare-and-set.
    #[cfg(test)]
    pub(crate) async fn force_status(&self, session_id: &str, status: SessionStatus) {
        if let Some(booking) = self.state.write().await.bookings.get_mut(session_id) {
            booking.status = status.as_str().to_string();
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, booking: &NewBooking) -> Result<Booking> {
        let now = Utc::now().to_rfc3339();
        let stored = Booking {
            id: Uuid::new_v4().to_string(),
            posting_id: booking.posting_id.clone(),
            student_id: booking.student_id.clone(),
            tutor_id: booking.tutor_id.clone(),
            course: booking.course.clone(),
            day_of_week: booking.day_of_week.clone(),
            start_time: booking.start_time.clone(),
            end_time: booking.end_time.clone(),
            rate: booking.rate,
            status: booking.status.clone(),
            payment_proof: None,
            ended_at: booking.ended_at,
            created_at: now.clone(),
            updated_at: now,
        };

        let mut state = self.state.write().await;
        for (user_id, role) in [
            (&stored.student_id, Role::Student),
            (&stored.tutor_id, Role::Tutor),
        ] {
            let key = (user_id.clone(), stored.id.clone());
            if state.index.contains_key(&key) {
                return Err(MarketplaceError::Conflict(format!(
                    "Session already exists: {}",
                    stored.id
                )));
            }
            state.index.insert(key, role);
        }
        state.bookings.insert(stored.id.clone(), stored.clone());

        Ok(stored)
    }

    async fn get_session(&self, user_id: &str, session_id: &str) -> Result<Option<SessionEntry>> {
        Ok(self.state.read().await.entry(user_id, session_id))
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<SessionEntry> = state
            .index
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .filter_map(|((user, session_id), role)| {
                state
                    .bookings
                    .get(session_id)
                    .map(|booking| view(booking, user, *role))
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn counterpart_session(
        &self,
        counterpart_id: &str,
        session_id: &str,
    ) -> Result<SessionEntry> {
        self.state
            .read()
            .await
            .entry(counterpart_id, session_id)
            .ok_or_else(|| MarketplaceError::MissingCounterpart {
                session_id: session_id.to_string(),
                user_id: counterpart_id.to_string(),
            })
    }

    async fn write_status(
        &self,
        session_id: &str,
        expected: SessionStatus,
        next: SessionStatus,
        payment_proof: Option<&str>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let booking = match state.bookings.get_mut(session_id) {
            Some(booking) if booking.status == expected.as_str() => booking,
            _ => return Ok(false),
        };

        booking.status = next.as_str().to_string();
        if let Some(proof) = payment_proof {
            booking.payment_proof = Some(proof.to_string());
        }
        booking.updated_at = Utc::now().to_rfc3339();
        Ok(true)
    }

    async fn list_open_sessions(&self) -> Result<Vec<Booking>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.ended_at.is_some())
            .filter(|b| {
                SessionStatus::from_str(&b.status).is_some_and(|status| !status.is_terminal())
            })
            .cloned()
            .collect())
    }

    async fn complete_sessions(&self, session_ids: &[String]) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;

        for id in session_ids {
            if let Some(booking) = state.bookings.get_mut(id) {
                let open = SessionStatus::from_str(&booking.status)
                    .is_some_and(|status| !status.is_terminal());
                if open {
                    booking.status = SessionStatus::Completed.as_str().to_string();
                    changed += 1;
                }
            }
        }

        Ok(changed)
    }

    async fn record_rating(&self, tutor_id: &str, rating: f64) -> Result<()> {
        let mut state = self.state.write().await;
        let (mean, count) = state.ratings.entry(tutor_id.to_string()).or_insert((0.0, 0));
        *mean = (*mean * *count as f64 + rating) / (*count + 1) as f64;
        *count += 1;
        Ok(())
    }

    async fn get_posting(&self, posting_id: &str) -> Result<Option<TutorPosting>> {
        Ok(self.state.read().await.postings.get(posting_id).cloned())
    }

    async fn mark_posting_booked(&self, posting_id: &str) -> Result<()> {
        match self.state.write().await.postings.get_mut(posting_id) {
            Some(posting) => {
                posting.booked = true;
                Ok(())
            }
            None => Err(MarketplaceError::NotFound {
                entity: "TutorPosting",
                id: posting_id.to_string(),
            }),
        }
    }

    async fn notify(&self, notification: &NewNotification) -> Result<()> {
        self.state
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }
}
