//! Marketplace rules for LearNUS.
//!
//! This crate sits between the HTTP layer and the database:
//!
//! - [`sessions`]: booking lifecycle and the [`SessionStatus`] machine
//! - [`matcher`]: suggested tutors for a student
//! - [`forum`]: posts, comments and upvotes
//! - [`chat`]: direct chats and messages
//! - [`profiles`]: profiles, postings and notifications
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//! use marketplace::{NewSessionRequest, SessionManager, SessionStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("sqlite:learnus.db?mode=rwc").await?;
//! db.migrate().await?;
//!
//! let sessions = SessionManager::new(db);
//! let booked = sessions
//!     .create_session(
//!         "student-uid",
//!         NewSessionRequest {
//!             people: "tutor-uid".to_string(),
//!             posting_id: None,
//!             course: "CS1101S".to_string(),
//!             day_of_week: "Monday".to_string(),
//!             start_time: "10:00".to_string(),
//!             end_time: "12:00".to_string(),
//!             rate: 20.0,
//!             ended_at: None,
//!         },
//!     )
//!     .await?;
//!
//! sessions
//!     .update_status("tutor-uid", &booked.id, SessionStatus::Accepted)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod error;
pub mod forum;
pub mod matcher;
pub mod profiles;
pub mod sessions;
pub mod status;
pub mod store;

pub use chat::{Chats, SendMessageRequest};
pub use error::{MarketplaceError, Result};
pub use forum::{Forum, NewPostRequest};
pub use matcher::{rank_candidates, suggest_tutors, Candidate, MatchWeights, Scorer, WeightedScorer};
pub use sessions::{NewSessionRequest, SessionManager};
pub use status::{SessionStatus, Trigger};
pub use store::{MemorySessionStore, SessionStore};
