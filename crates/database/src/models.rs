//! Database models.
//!
//! Everything here is also the JSON shape handed to the mobile client, hence
//! the camelCase renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A user profile, keyed by the auth provider's uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Auth uid.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Profile picture URL.
    pub picture: Option<String>,
    /// Running mean of all ratings received as a tutor.
    pub rating: f64,
    /// Number of ratings folded into `rating`.
    pub rating_count: i64,
    /// Payment QR image URL shown to students at payment time.
    pub payment_qr: Option<String>,
    pub faculty: Option<String>,
    pub major: Option<String>,
    pub year_of_study: Option<i64>,
    /// Course codes the user studies or teaches.
    pub courses: Json<Vec<String>>,
    pub preferred_location: Option<String>,
    /// Highest hourly rate the user is willing to pay.
    pub max_rate: Option<f64>,
    /// Whether onboarding has been completed.
    pub onboarded: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to register a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Onboarding answers, applied in one update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Onboarding {
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub year_of_study: Option<i64>,
    #[serde(default)]
    pub courses: Vec<String>,
    #[serde(default)]
    pub preferred_location: Option<String>,
    #[serde(default)]
    pub max_rate: Option<f64>,
}

/// A tutor's advertised weekly slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TutorPosting {
    pub id: String,
    pub tutor_id: String,
    /// Course code, e.g. "CS1101S".
    pub course: String,
    pub location: String,
    pub description: String,
    /// Day name, e.g. "Monday".
    pub day_of_week: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    /// Hourly rate.
    pub rate: f64,
    /// Set once a booking against this posting is accepted.
    pub booked: bool,
    pub created_at: String,
}

/// Fields required to create a posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPosting {
    pub tutor_id: String,
    pub course: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub rate: f64,
}

/// Which side of a booking a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Student,
    Tutor,
}

impl Role {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Tutor => "Tutor",
        }
    }

    /// Parse a role name, ignoring case.
    pub fn from_str(s: &str) -> Option<Self> {
        [Role::Student, Role::Tutor]
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// The canonical booking row shared by both participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub posting_id: Option<String>,
    pub student_id: String,
    pub tutor_id: String,
    pub course: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub rate: f64,
    pub status: String,
    pub payment_proof: Option<String>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to create a booking.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub posting_id: Option<String>,
    pub student_id: String,
    pub tutor_id: String,
    pub course: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub rate: f64,
    pub status: String,
    pub ended_at: Option<DateTime<Utc>>,
}

/// A booking as seen from one participant's index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    /// Booking id, shared by both participants.
    pub id: String,
    /// Owner of this index entry.
    pub user_id: String,
    /// "Student" or "Tutor".
    pub role: String,
    /// The other participant's uid.
    pub people: String,
    pub posting_id: Option<String>,
    pub course: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub rate: f64,
    pub status: String,
    pub payment_proof: Option<String>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: String,
    pub updated_at: String,
}

/// A per-user notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// Recipient.
    pub user_id: String,
    /// The user whose action produced the notification.
    pub from_user_id: String,
    pub session_id: Option<String>,
    /// Short machine-readable tag, e.g. "booking_requested".
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

/// Fields required to create a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: String,
    pub from_user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// A forum post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub course: Option<String>,
    pub upvote_count: i64,
    pub created_at: String,
}

/// A comment on a forum post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub upvote_count: i64,
    pub created_at: String,
}

/// Counter plus the caller's presence marker for an upvotable target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteStatus {
    pub upvote_count: i64,
    pub has_upvoted: bool,
}

/// Preview of the newest message in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at: String,
}

/// A conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    /// Always "direct" for now.
    pub kind: String,
    pub participants: Json<Vec<String>>,
    /// Posting the conversation was started from, if any.
    pub tutor_posting_id: Option<String>,
    pub last_message: Option<Json<LastMessage>>,
    pub created_at: String,
    pub updated_at: String,
}

impl Chat {
    /// Whether `user_id` is one of the participants.
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub body: String,
    /// "text", "image", ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Users who have read the message; always includes the sender.
    pub read_by: Json<Vec<String>>,
    pub edited: bool,
    pub edited_at: Option<String>,
    pub created_at: String,
}
