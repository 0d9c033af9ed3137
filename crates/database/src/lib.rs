//! SQLite persistence layer for LearNUS.
//!
//! This crate provides async database operations for profiles, tutor
//! postings, bookings, notifications, the forum and chats using SQLx with
//! SQLite. Each module maps to one collection and exposes free functions
//! taking a `&SqlitePool`.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, models::NewUser, user};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:learnus.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let profile = user::create_user(
//!         db.pool(),
//!         &NewUser {
//!             id: "firebase-uid-123".to_string(),
//!             name: "Alice".to_string(),
//!             email: "alice@u.nus.edu".to_string(),
//!             picture: None,
//!         },
//!     )
//!     .await?;
//!     println!("{} has rating {}", profile.name, profile.rating);
//!
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod error;
pub mod forum;
pub mod message;
pub mod models;
pub mod notification;
pub mod session;
pub mod tutor;
pub mod user;
pub mod user_profile;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use forum::UpvoteTarget;
pub use models::{
    Booking, Chat, Comment, ForumPost, LastMessage, Message, NewBooking, NewNotification,
    NewPosting, NewUser, Notification, Onboarding, Role, SessionEntry, TutorPosting,
    UpvoteStatus, UserProfile,
};
pub use tutor::{PostingFilter, PostingSort};
pub use validation::ValidationError;

pub use sqlx::types::Json;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    pub const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/learnus.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(url, pool_size, "Connected to database");

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_migrations_create_every_collection() {
        let db = test_db().await;

        for table in [
            "users",
            "favourites",
            "tutor_postings",
            "bookings",
            "session_index",
            "notifications",
            "forum_posts",
            "forum_comments",
            "upvotes",
            "chats",
            "messages",
        ] {
            let count = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(db.pool())
            .await
            .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = test_db().await;
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let db = test_db().await;

        let created = user::create_user(
            db.pool(),
            &NewUser {
                id: "uid-1".to_string(),
                name: "Alice".to_string(),
                email: "alice@u.nus.edu".to_string(),
                picture: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(created.rating_count, 0);
        assert!(!created.onboarded);

        let result = user::get_user(db.pool(), "uid-2").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
