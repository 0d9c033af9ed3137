//! Booking records and the per-user session index.
//!
//! A booking is stored once in `bookings`. Each participant reaches it through
//! their own row in `session_index`, which also records their role. Both index
//! rows are written in the same transaction as the booking.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{Booking, NewBooking, Role, SessionEntry};

/// Create a booking and index it for both participants.
pub async fn create_booking(pool: &SqlitePool, booking: &NewBooking) -> Result<Booking> {
    let id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO bookings
            (id, posting_id, student_id, tutor_id, course, day_of_week,
             start_time, end_time, rate, status, ended_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&booking.posting_id)
    .bind(&booking.student_id)
    .bind(&booking.tutor_id)
    .bind(&booking.course)
    .bind(&booking.day_of_week)
    .bind(&booking.start_time)
    .bind(&booking.end_time)
    .bind(booking.rate)
    .bind(&booking.status)
    .bind(booking.ended_at)
    .execute(&mut *tx)
    .await?;

    for (user_id, role) in [
        (&booking.student_id, Role::Student),
        (&booking.tutor_id, Role::Tutor),
    ] {
        sqlx::query(
            r#"
            INSERT INTO session_index (user_id, booking_id, role)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&id)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::on_conflict(e, "Session", &id))?;
    }

    tx.commit().await?;

    tracing::info!(
        session_id = %id,
        student_id = %booking.student_id,
        tutor_id = %booking.tutor_id,
        "Created booking"
    );

    get_booking(pool, &id).await
}

/// Get the canonical booking row.
pub async fn get_booking(pool: &SqlitePool, id: &str) -> Result<Booking> {
    sqlx::query_as::<_, Booking>(
        r#"
        SELECT id, posting_id, student_id, tutor_id, course, day_of_week,
               start_time, end_time, rate, status, payment_proof, ended_at,
               created_at, updated_at
        FROM bookings
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Session",
        id: id.to_string(),
    })
}

/// Get a user's view of a booking, if the user is indexed for it.
pub async fn find_entry(
    pool: &SqlitePool,
    user_id: &str,
    booking_id: &str,
) -> Result<Option<SessionEntry>> {
    let entry = sqlx::query_as::<_, SessionEntry>(
        r#"
        SELECT b.id, i.user_id, i.role,
               CASE i.role WHEN 'Student' THEN b.tutor_id ELSE b.student_id END AS people,
               b.posting_id, b.course, b.day_of_week, b.start_time, b.end_time,
               b.rate, b.status, b.payment_proof, b.ended_at, b.created_at, b.updated_at
        FROM session_index i
        INNER JOIN bookings b ON b.id = i.booking_id
        WHERE i.user_id = ? AND i.booking_id = ?
        "#,
    )
    .bind(user_id)
    .bind(booking_id)
    .fetch_optional(pool)
    .await?;

    Ok(entry)
}

/// Get a user's view of a booking.
pub async fn get_entry(pool: &SqlitePool, user_id: &str, booking_id: &str) -> Result<SessionEntry> {
    find_entry(pool, user_id, booking_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Session",
            id: booking_id.to_string(),
        })
}

/// List every booking a user participates in, newest first.
pub async fn list_entries(pool: &SqlitePool, user_id: &str) -> Result<Vec<SessionEntry>> {
    let entries = sqlx::query_as::<_, SessionEntry>(
        r#"
        SELECT b.id, i.user_id, i.role,
               CASE i.role WHEN 'Student' THEN b.tutor_id ELSE b.student_id END AS people,
               b.posting_id, b.course, b.day_of_week, b.start_time, b.end_time,
               b.rate, b.status, b.payment_proof, b.ended_at, b.created_at, b.updated_at
        FROM session_index i
        INNER JOIN bookings b ON b.id = i.booking_id
        WHERE i.user_id = ?
        ORDER BY b.created_at DESC, b.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Find the counterpart's index entry for a booking.
///
/// Fails with `MissingCounterpart` when the other participant is not indexed.
pub async fn counterpart_entry(
    pool: &SqlitePool,
    counterpart_id: &str,
    booking_id: &str,
) -> Result<SessionEntry> {
    find_entry(pool, counterpart_id, booking_id)
        .await?
        .ok_or_else(|| DatabaseError::MissingCounterpart {
            session_id: booking_id.to_string(),
            user_id: counterpart_id.to_string(),
        })
}

/// Move a booking from `expected` to `next` status.
///
/// Returns `false` if the booking's status was no longer `expected`. A
/// `payment_proof` replaces the stored proof; `None` leaves it untouched.
pub async fn compare_and_set_status(
    pool: &SqlitePool,
    booking_id: &str,
    expected: &str,
    next: &str,
    payment_proof: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET status = ?,
            payment_proof = COALESCE(?, payment_proof),
            updated_at = datetime('now')
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(next)
    .bind(payment_proof)
    .bind(booking_id)
    .bind(expected)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// List bookings with an end time whose status is not in `excluded`.
pub async fn list_open_bookings(pool: &SqlitePool, excluded: &[&str]) -> Result<Vec<Booking>> {
    let mut query = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT id, posting_id, student_id, tutor_id, course, day_of_week,
               start_time, end_time, rate, status, payment_proof, ended_at,
               created_at, updated_at
        FROM bookings
        WHERE ended_at IS NOT NULL
        "#,
    );
    push_status_exclusion(&mut query, excluded);
    query.push(" ORDER BY ended_at");

    let bookings = query.build_query_as::<Booking>().fetch_all(pool).await?;
    Ok(bookings)
}

/// Set `status` on every listed booking whose status is not in `excluded`,
/// in one transaction.
///
/// Returns the number of bookings changed.
pub async fn set_status_batch(
    pool: &SqlitePool,
    booking_ids: &[String],
    status: &str,
    excluded: &[&str],
) -> Result<u64> {
    if booking_ids.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut changed = 0;

    for id in booking_ids {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE bookings SET status = ");
        query
            .push_bind(status)
            .push(", updated_at = datetime('now') WHERE id = ")
            .push_bind(id.as_str());
        push_status_exclusion(&mut query, excluded);

        changed += query.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    Ok(changed)
}

fn push_status_exclusion<'a>(query: &mut QueryBuilder<'a, Sqlite>, excluded: &[&'a str]) {
    if excluded.is_empty() {
        return;
    }
    query.push(" AND status NOT IN (");
    let mut separated = query.separated(", ");
    for status in excluded {
        separated.push_bind(*status);
    }
    separated.push_unseparated(")");
}
