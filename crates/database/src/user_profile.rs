//! Payment details on a profile.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::UserProfile;
use crate::user::get_user;

/// Replace the payment QR image shown to students.
///
/// `None` clears it.
pub async fn set_payment_qr(pool: &SqlitePool, id: &str, qr_url: Option<&str>) -> Result<UserProfile> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET payment_qr = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(qr_url)
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
