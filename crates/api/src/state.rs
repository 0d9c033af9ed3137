//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use marketplace::{Chats, Forum, Scorer, SessionManager, WeightedScorer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Booking lifecycle.
    pub sessions: Arc<SessionManager<Database>>,
    pub forum: Forum,
    pub chats: Chats,
    /// Ranks postings for the suggestion endpoint.
    pub scorer: Arc<dyn Scorer>,
    pub suggested_limit: usize,
}

impl AppState {
    /// Create new application state with the default scorer.
    pub fn new(db: Database, suggested_limit: usize) -> Self {
        Self::with_scorer(db, suggested_limit, Arc::new(WeightedScorer::default()))
    }

    pub fn with_scorer(db: Database, suggested_limit: usize, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(db.clone())),
            forum: Forum::new(db.clone()),
            chats: Chats::new(db.clone()),
            db,
            scorer,
            suggested_limit,
        }
    }
}
