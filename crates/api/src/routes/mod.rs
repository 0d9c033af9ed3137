//! Route handlers.

pub mod admin;
pub mod chats;
pub mod forum;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod sessions;
pub mod tutors;
pub mod users;

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Profiles
        .route("/api/users", post(users::register))
        .route("/api/users/:uid", get(users::get_user))
        .route("/api/users/:uid/favourites", get(users::list_favourites))
        .route("/api/update-favourite", post(users::update_favourite))
        .route("/api/update-rating", post(users::update_rating))
        .route("/api/update-qr", post(users::update_qr))
        .route("/api/onboard", post(users::onboard))
        // Postings
        .route("/api/tutors", get(tutors::list).post(tutors::create))
        .route("/api/tutors/suggested", post(tutors::suggested))
        .route("/api/tutors/:id", get(tutors::get_posting))
        // Sessions
        .route(
            "/api/users/:uid/classes",
            get(sessions::list).post(sessions::create),
        )
        .route("/api/users/:uid/classes/:session_id", get(sessions::get_session))
        .route(
            "/api/users/:uid/classes/:session_id/status",
            post(sessions::update_status),
        )
        .route(
            "/api/users/:uid/classes/:session_id/payment",
            post(sessions::submit_payment),
        )
        .route(
            "/api/users/:uid/classes/:session_id/review",
            post(sessions::submit_review),
        )
        .route("/api/admin/sweep-sessions", post(admin::sweep_sessions))
        // Forum
        .route("/api/forum", get(forum::list_posts).post(forum::create_post))
        .route(
            "/api/forum/:post_id",
            get(forum::get_post).delete(forum::delete_post),
        )
        .route(
            "/api/forum/:post_id/comments",
            get(forum::list_comments).post(forum::add_comment),
        )
        .route("/api/forum/:post_id/upvote", post(forum::upvote_post))
        .route(
            "/api/forum/:post_id/upvote-status/:user_id",
            get(forum::post_upvote_status),
        )
        .route(
            "/api/forum/:post_id/comments/:comment_id",
            delete(forum::delete_comment),
        )
        .route(
            "/api/forum/:post_id/comments/:comment_id/upvote",
            post(forum::upvote_comment),
        )
        .route(
            "/api/forum/:post_id/comments/:comment_id/upvote-status/:user_id",
            get(forum::comment_upvote_status),
        )
        // Chats
        .route("/api/chats", get(chats::list).post(chats::find_or_create))
        .route("/api/chats/:chat_id", get(chats::get_chat))
        .route("/api/chats/:chat_id/tutor", post(chats::attach_tutor_posting))
        .route("/api/messages", get(messages::list).post(messages::send))
        .route("/api/messages/read", patch(messages::mark_read))
        .route(
            "/api/messages/:message_id",
            patch(messages::edit).delete(messages::delete),
        )
        // Notifications
        .route(
            "/api/users/:uid/notifications",
            get(notifications::list).post(notifications::create),
        )
        .route(
            "/api/users/:uid/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/users/:uid/notifications/:notification_id/read",
            patch(notifications::mark_read),
        )
}
