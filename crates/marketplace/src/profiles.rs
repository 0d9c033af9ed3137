//! Profiles, tutor postings and notifications.
//!
//! Thin checks in front of the database: these collections have no rules
//! beyond input validation and ownership.

use database::validation::{
    validate_day_of_week, validate_email, validate_rate, validate_rating, validate_slot,
    validate_text, validate_url, ValidationError, MAX_BODY_LENGTH, MAX_TITLE_LENGTH,
};
use database::{
    notification, tutor, user, user_profile, Database, NewNotification, NewPosting, NewUser,
    Notification, Onboarding, PostingFilter, TutorPosting, UserProfile,
};
use tracing::info;

use crate::error::{MarketplaceError, Result};

/// Register a profile for a freshly authenticated user.
pub async fn create_user(db: &Database, new_user: &NewUser) -> Result<UserProfile> {
    validate_text("id", &new_user.id, MAX_TITLE_LENGTH)?;
    validate_text("name", &new_user.name, MAX_TITLE_LENGTH)?;
    validate_email(&new_user.email)?;
    if let Some(picture) = &new_user.picture {
        validate_url("picture", picture)?;
    }

    let profile = user::create_user(db.pool(), new_user).await?;
    info!(user_id = %profile.id, "Registered profile");
    Ok(profile)
}

pub async fn get_user(db: &Database, user_id: &str) -> Result<UserProfile> {
    Ok(user::get_user(db.pool(), user_id).await?)
}

/// Favourite a posting, or unfavourite it if already favourited.
///
/// Returns the user's favourites after the toggle.
pub async fn toggle_favourite(db: &Database, user_id: &str, posting_id: &str) -> Result<Vec<String>> {
    validate_text("sessionId", posting_id, MAX_TITLE_LENGTH)?;
    Ok(user::toggle_favourite(db.pool(), user_id, posting_id).await?)
}

pub async fn list_favourites(db: &Database, user_id: &str) -> Result<Vec<String>> {
    user::get_user(db.pool(), user_id).await?;
    Ok(user::list_favourites(db.pool(), user_id).await?)
}

/// Fold a 1-5 rating into a user's running mean.
pub async fn apply_rating(db: &Database, user_id: &str, rating: f64) -> Result<UserProfile> {
    validate_rating(rating)?;
    Ok(user::apply_rating(db.pool(), user_id, rating).await?)
}

/// Replace the payment QR shown to students.
pub async fn update_payment_qr(db: &Database, user_id: &str, qr_url: &str) -> Result<UserProfile> {
    validate_url("paymentQr", qr_url)?;
    Ok(user_profile::set_payment_qr(db.pool(), user_id, Some(qr_url)).await?)
}

/// Store onboarding answers.
pub async fn onboard(db: &Database, user_id: &str, answers: &Onboarding) -> Result<UserProfile> {
    if let Some(year) = answers.year_of_study {
        if !(1..=10).contains(&year) {
            return Err(MarketplaceError::Validation(
                "yearOfStudy must be between 1 and 10".to_string(),
            ));
        }
    }
    if let Some(max_rate) = answers.max_rate {
        validate_rate(max_rate)?;
    }
    for course in &answers.courses {
        validate_text("courses", course, MAX_TITLE_LENGTH)?;
    }

    Ok(user::onboard(db.pool(), user_id, answers).await?)
}

/// Advertise a weekly slot. The tutor must have a profile.
pub async fn create_posting(db: &Database, posting: &NewPosting) -> Result<TutorPosting> {
    validate_text("course", &posting.course, MAX_TITLE_LENGTH)?;
    validate_text("location", &posting.location, MAX_TITLE_LENGTH)?;
    let description_len = posting.description.chars().count();
    if description_len > MAX_BODY_LENGTH {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_BODY_LENGTH,
            actual: description_len,
        }
        .into());
    }
    validate_day_of_week(&posting.day_of_week)?;
    validate_slot(&posting.start_time, &posting.end_time)?;
    validate_rate(posting.rate)?;

    user::get_user(db.pool(), &posting.tutor_id).await?;
    Ok(tutor::create_posting(db.pool(), posting).await?)
}

pub async fn get_posting(db: &Database, posting_id: &str) -> Result<TutorPosting> {
    Ok(tutor::get_posting(db.pool(), posting_id).await?)
}

pub async fn list_postings(db: &Database, filter: &PostingFilter) -> Result<Vec<TutorPosting>> {
    Ok(tutor::list_postings(db.pool(), filter).await?)
}

/// Deliver a notification to `notification.user_id`.
pub async fn create_notification(
    db: &Database,
    notification: &NewNotification,
) -> Result<Notification> {
    validate_text("userId", &notification.user_id, MAX_TITLE_LENGTH)?;
    validate_text("fromUserId", &notification.from_user_id, MAX_TITLE_LENGTH)?;
    validate_text("kind", &notification.kind, MAX_TITLE_LENGTH)?;

    Ok(notification::create_notification(db.pool(), notification).await?)
}

pub async fn list_notifications(db: &Database, user_id: &str) -> Result<Vec<Notification>> {
    Ok(notification::list_notifications(db.pool(), user_id).await?)
}

/// How many of a user's notifications are still unread.
pub async fn count_unread_notifications(db: &Database, user_id: &str) -> Result<i64> {
    Ok(notification::count_unread(db.pool(), user_id).await?)
}

pub async fn mark_notification_read(
    db: &Database,
    user_id: &str,
    notification_id: &str,
) -> Result<Notification> {
    Ok(notification::mark_read(db.pool(), user_id, notification_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn new_user(id: &str) -> NewUser {
        NewUser {
            id: id.to_string(),
            name: "Tan Ah Kow".to_string(),
            email: format!("{id}@u.nus.edu"),
            picture: None,
        }
    }

    fn slot(tutor: &str) -> NewPosting {
        NewPosting {
            tutor_id: tutor.to_string(),
            course: "CS3230".to_string(),
            location: "COM3".to_string(),
            description: "Master theorem drills".to_string(),
            day_of_week: "Saturday".to_string(),
            start_time: "13:00".to_string(),
            end_time: "15:00".to_string(),
            rate: 35.0,
        }
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let db = test_db().await;
        create_user(&db, &new_user("u1")).await.unwrap();
        assert!(matches!(
            create_user(&db, &new_user("u1")).await,
            Err(MarketplaceError::Conflict(_))
        ));

        let mut bad = new_user("u2");
        bad.email = "not-an-email".to_string();
        assert!(matches!(
            create_user(&db, &bad).await,
            Err(MarketplaceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rating_and_qr() {
        let db = test_db().await;
        create_user(&db, &new_user("tut")).await.unwrap();

        apply_rating(&db, "tut", 5.0).await.unwrap();
        let rated = apply_rating(&db, "tut", 4.0).await.unwrap();
        assert_eq!(rated.rating_count, 2);
        assert!((rated.rating - 4.5).abs() < 1e-9);
        assert!(apply_rating(&db, "tut", 0.0).await.is_err());

        let updated = update_payment_qr(&db, "tut", "https://cdn.example/qr.png")
            .await
            .unwrap();
        assert_eq!(updated.payment_qr.as_deref(), Some("https://cdn.example/qr.png"));
        assert!(matches!(
            update_payment_qr(&db, "ghost", "https://cdn.example/qr.png").await,
            Err(MarketplaceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_onboarding_validation() {
        let db = test_db().await;
        create_user(&db, &new_user("stu")).await.unwrap();

        let answers = Onboarding {
            year_of_study: Some(2),
            courses: vec!["CS2030S".to_string(), "MA2001".to_string()],
            max_rate: Some(40.0),
            ..Onboarding::default()
        };
        let profile = onboard(&db, "stu", &answers).await.unwrap();
        assert!(profile.onboarded);
        assert_eq!(profile.courses.len(), 2);

        let bad = Onboarding {
            year_of_study: Some(0),
            ..Onboarding::default()
        };
        assert!(matches!(
            onboard(&db, "stu", &bad).await,
            Err(MarketplaceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_posting_needs_tutor_and_valid_slot() {
        let db = test_db().await;

        assert!(matches!(
            create_posting(&db, &slot("tut")).await,
            Err(MarketplaceError::NotFound { .. })
        ));

        create_user(&db, &new_user("tut")).await.unwrap();
        let created = create_posting(&db, &slot("tut")).await.unwrap();
        assert!(!created.booked);

        let mut bad = slot("tut");
        bad.end_time = "12:00".to_string();
        assert!(matches!(
            create_posting(&db, &bad).await,
            Err(MarketplaceError::Validation(_))
        ));

        let listed = list_postings(&db, &PostingFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_favourites_toggle() {
        let db = test_db().await;
        create_user(&db, &new_user("stu")).await.unwrap();

        assert_eq!(toggle_favourite(&db, "stu", "p1").await.unwrap(), vec!["p1"]);
        assert!(toggle_favourite(&db, "stu", "p1").await.unwrap().is_empty());
        assert!(matches!(
            list_favourites(&db, "ghost").await,
            Err(MarketplaceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_notifications() {
        let db = test_db().await;
        let sent = create_notification(
            &db,
            &NewNotification {
                user_id: "tut".to_string(),
                from_user_id: "stu".to_string(),
                session_id: None,
                kind: "reminder".to_string(),
                message: "See you at 2pm".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(list_notifications(&db, "tut").await.unwrap().len(), 1);
        assert_eq!(count_unread_notifications(&db, "tut").await.unwrap(), 1);
        let read = mark_notification_read(&db, "tut", &sent.id).await.unwrap();
        assert!(read.is_read);
        assert_eq!(count_unread_notifications(&db, "tut").await.unwrap(), 0);
    }
}
