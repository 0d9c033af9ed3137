//! Tutor posting CRUD operations.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{NewPosting, TutorPosting};

/// Ordering for posting listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostingSort {
    /// Most recently created first.
    #[default]
    Newest,
    /// Cheapest first.
    RateAsc,
    /// Most expensive first.
    RateDesc,
}

impl PostingSort {
    /// Parse a sort key, ignoring case.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Some(PostingSort::Newest),
            "rate_asc" | "rate" | "cheapest" => Some(PostingSort::RateAsc),
            "rate_desc" => Some(PostingSort::RateDesc),
            _ => None,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            PostingSort::Newest => " ORDER BY created_at DESC, id",
            PostingSort::RateAsc => " ORDER BY rate ASC, created_at DESC",
            PostingSort::RateDesc => " ORDER BY rate DESC, created_at DESC",
        }
    }
}

/// Filters for posting listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingFilter {
    /// Exact course code match.
    pub course: Option<String>,
    /// Exact location match.
    pub location: Option<String>,
    /// Include postings that are already booked.
    pub include_booked: bool,
    /// Exclude postings made by this tutor.
    pub exclude_tutor: Option<String>,
    pub sort: PostingSort,
}

/// Create a posting.
pub async fn create_posting(pool: &SqlitePool, posting: &NewPosting) -> Result<TutorPosting> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO tutor_postings
            (id, tutor_id, course, location, description, day_of_week, start_time, end_time, rate)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&posting.tutor_id)
    .bind(&posting.course)
    .bind(&posting.location)
    .bind(&posting.description)
    .bind(&posting.day_of_week)
    .bind(&posting.start_time)
    .bind(&posting.end_time)
    .bind(posting.rate)
    .execute(pool)
    .await?;

    tracing::debug!(posting_id = %id, tutor_id = %posting.tutor_id, "Created tutor posting");

    get_posting(pool, &id).await
}

/// Get a posting by id.
pub async fn get_posting(pool: &SqlitePool, id: &str) -> Result<TutorPosting> {
    sqlx::query_as::<_, TutorPosting>(
        r#"
        SELECT id, tutor_id, course, location, description, day_of_week,
               start_time, end_time, rate, booked, created_at
        FROM tutor_postings
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "TutorPosting",
        id: id.to_string(),
    })
}

/// List postings matching a filter.
pub async fn list_postings(pool: &SqlitePool, filter: &PostingFilter) -> Result<Vec<TutorPosting>> {
    let mut query = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT id, tutor_id, course, location, description, day_of_week,
               start_time, end_time, rate, booked, created_at
        FROM tutor_postings
        WHERE 1 = 1
        "#,
    );

    if !filter.include_booked {
        query.push(" AND booked = 0");
    }
    if let Some(course) = &filter.course {
        query.push(" AND course = ").push_bind(course.as_str());
    }
    if let Some(location) = &filter.location {
        query.push(" AND location = ").push_bind(location.as_str());
    }
    if let Some(tutor) = &filter.exclude_tutor {
        query.push(" AND tutor_id != ").push_bind(tutor.as_str());
    }
    query.push(filter.sort.order_by());

    let postings = query
        .build_query_as::<TutorPosting>()
        .fetch_all(pool)
        .await?;

    Ok(postings)
}

/// Set or clear the `booked` flag.
pub async fn set_booked(pool: &SqlitePool, id: &str, booked: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE tutor_postings
        SET booked = ?
        WHERE id = ?
        "#,
    )
    .bind(booked)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "TutorPosting",
            id: id.to_string(),
        });
    }

    Ok(())
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

    fn posting(tutor: &str, course: &str, rate: f64) -> NewPosting {
        NewPosting {
            tutor_id: tutor.to_string(),
            course: course.to_string(),
            location: "COM1".to_string(),
            description: String::new(),
            day_of_week: "Monday".to_string(),
            start_time: "10:00".to_string(),
            end_time: "12:00".to_string(),
            rate,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_posting() {
        let db = test_db().await;
        let created = create_posting(db.pool(), &posting("t1", "CS1101S", 20.0))
            .await
            .unwrap();
        assert!(!created.booked);

        let fetched = get_posting(db.pool(), &created.id).await.unwrap();
        assert_eq!(fetched, created);

        let result = get_posting(db.pool(), "missing").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_filters_and_sort() {
        let db = test_db().await;
        let a = create_posting(db.pool(), &posting("t1", "CS1101S", 25.0)).await.unwrap();
        create_posting(db.pool(), &posting("t2", "CS1101S", 15.0)).await.unwrap();
        create_posting(db.pool(), &posting("t3", "MA1521", 30.0)).await.unwrap();

        set_booked(db.pool(), &a.id, true).await.unwrap();

        let filter = PostingFilter {
            course: Some("CS1101S".to_string()),
            ..Default::default()
        };
        let unbooked = list_postings(db.pool(), &filter).await.unwrap();
        assert_eq!(unbooked.len(), 1);
        assert_eq!(unbooked[0].tutor_id, "t2");

        let filter = PostingFilter {
            include_booked: true,
            sort: PostingSort::RateAsc,
            ..Default::default()
        };
        let rates: Vec<f64> = list_postings(db.pool(), &filter)
            .await
            .unwrap()
            .iter()
            .map(|p| p.rate)
            .collect();
        assert_eq!(rates, vec![15.0, 25.0, 30.0]);

        let filter = PostingFilter {
            exclude_tutor: Some("t2".to_string()),
            ..Default::default()
        };
        let others = list_postings(db.pool(), &filter).await.unwrap();
        assert!(others.iter().all(|p| p.tutor_id == "t3"));
    }

    #[test]
    fn test_posting_sort_from_str() {
        assert_eq!(PostingSort::from_str("newest"), Some(PostingSort::Newest));
        assert_eq!(PostingSort::from_str("RATE_DESC"), Some(PostingSort::RateDesc));
        assert_eq!(PostingSort::from_str(" cheapest "), Some(PostingSort::RateAsc));
        assert_eq!(PostingSort::from_str("popular"), None);
    }
}
