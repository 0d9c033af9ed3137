//! User profile CRUD operations.

use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{NewUser, Onboarding, UserProfile};

/// Register a new profile.
pub async fn create_user(pool: &SqlitePool, user: &NewUser) -> Result<UserProfile> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, picture)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.picture)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::on_conflict(e, "User", &user.id))?;

    get_user(pool, &user.id).await
}

/// Get a profile by uid.
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<UserProfile> {
    sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT id, name, email, picture, rating, rating_count, payment_qr,
               faculty, major, year_of_study, courses, preferred_location,
               max_rate, onboarded, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Fold a new rating into the running mean.
///
/// The mean and count are updated in one statement, so concurrent ratings
/// cannot lose an update.
pub async fn apply_rating(pool: &SqlitePool, id: &str, rating: f64) -> Result<UserProfile> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET rating = (rating * rating_count + ?) / (rating_count + 1),
            rating_count = rating_count + 1,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(rating)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    get_user(pool, id).await
}

/// Store onboarding answers and mark the profile as onboarded.
pub async fn onboard(pool: &SqlitePool, id: &str, answers: &Onboarding) -> Result<UserProfile> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET faculty = ?, major = ?, year_of_study = ?, courses = ?,
            preferred_location = ?, max_rate = ?, onboarded = 1,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(&answers.faculty)
    .bind(&answers.major)
    .bind(answers.year_of_study)
    .bind(Json(&answers.courses))
    .bind(&answers.preferred_location)
    .bind(answers.max_rate)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    get_user(pool, id).await
}

/// Add or remove a posting from the user's favourites.
///
/// Returns the favourites after the toggle.
pub async fn toggle_favourite(
    pool: &SqlitePool,
    user_id: &str,
    posting_id: &str,
) -> Result<Vec<String>> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query(
        r#"
        DELETE FROM favourites
        WHERE user_id = ? AND posting_id = ?
        "#,
    )
    .bind(user_id)
    .bind(posting_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed == 0 {
        let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DatabaseError::NotFound {
                entity: "User",
                id: user_id.to_string(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO favourites (user_id, posting_id)
            VALUES (?, ?)
            "#,
        )
        .bind(user_id)
        .bind(posting_id)
        .execute(&mut *tx)
        .await?;
    }

    let favourites = sqlx::query_scalar::<_, String>(
        r#"
        SELECT posting_id
        FROM favourites
        WHERE user_id = ?
        ORDER BY created_at, posting_id
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(favourites)
}

/// List a user's favourite posting ids.
pub async fn list_favourites(pool: &SqlitePool, user_id: &str) -> Result<Vec<String>> {
    let favourites = sqlx::query_scalar::<_, String>(
        r#"
        SELECT posting_id
        FROM favourites
        WHERE user_id = ?
        ORDER BY created_at, posting_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(favourites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn alice() -> NewUser {
        NewUser {
            id: "uid-alice".to_string(),
            name: "Alice".to_string(),
            email: "alice@u.nus.edu".to_string(),
            picture: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = test_db().await;
        let created = create_user(db.pool(), &alice()).await.unwrap();
        assert_eq!(created.name, "Alice");
        assert_eq!(created.rating_count, 0);
        assert!(created.courses.is_empty());
        assert!(!created.onboarded);

        let result = create_user(db.pool(), &alice()).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));

        let result = get_user(db.pool(), "nobody").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_apply_rating_running_mean() {
        let db = test_db().await;
        create_user(db.pool(), &alice()).await.unwrap();

        apply_rating(db.pool(), "uid-alice", 4.0).await.unwrap();
        apply_rating(db.pool(), "uid-alice", 5.0).await.unwrap();
        let profile = apply_rating(db.pool(), "uid-alice", 3.0).await.unwrap();

        assert_eq!(profile.rating_count, 3);
        assert!((profile.rating - 4.0).abs() < 1e-9);

        let result = apply_rating(db.pool(), "nobody", 5.0).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_onboard() {
        let db = test_db().await;
        create_user(db.pool(), &alice()).await.unwrap();

        let answers = Onboarding {
            faculty: Some("Computing".to_string()),
            major: Some("Computer Science".to_string()),
            year_of_study: Some(2),
            courses: vec!["CS1101S".to_string(), "MA1521".to_string()],
            preferred_location: Some("COM1".to_string()),
            max_rate: Some(30.0),
        };
        let profile = onboard(db.pool(), "uid-alice", &answers).await.unwrap();

        assert!(profile.onboarded);
        assert_eq!(profile.courses.0, answers.courses);
        assert_eq!(profile.year_of_study, Some(2));
    }

    #[tokio::test]
    async fn test_toggle_favourite() {
        let db = test_db().await;
        create_user(db.pool(), &alice()).await.unwrap();

        let favs = toggle_favourite(db.pool(), "uid-alice", "post-1").await.unwrap();
        assert_eq!(favs, vec!["post-1".to_string()]);

        let favs = toggle_favourite(db.pool(), "uid-alice", "post-2").await.unwrap();
        assert_eq!(favs.len(), 2);

        let favs = toggle_favourite(db.pool(), "uid-alice", "post-1").await.unwrap();
        assert_eq!(favs, vec!["post-2".to_string()]);
        assert_eq!(list_favourites(db.pool(), "uid-alice").await.unwrap(), favs);

        let result = toggle_favourite(db.pool(), "nobody", "post-1").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
