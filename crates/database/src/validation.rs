//! Input validation for profiles, postings, bookings and posts.

use std::fmt;

use chrono::Weekday;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid email format.
    InvalidEmail(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
    /// Numeric value outside its allowed range.
    OutOfRange { field: String, reason: String },
    /// Not a `HH:MM` time of day.
    InvalidTime { field: String, value: String },
    /// Not a day name.
    InvalidDay(String),
    /// A slot that does not end after it starts.
    EmptySlot { start: String, end: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(msg) => write!(f, "Invalid email: {}", msg),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
            ValidationError::OutOfRange { field, reason } => write!(f, "{} {}", field, reason),
            ValidationError::InvalidTime { field, value } => {
                write!(f, "{} must be HH:MM, got '{}'", field, value)
            }
            ValidationError::InvalidDay(value) => write!(f, "Invalid day of week: '{}'", value),
            ValidationError::EmptySlot { start, end } => {
                write!(f, "startTime {} must be before endTime {}", start, end)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum allowed length for forum post titles.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum allowed length for forum posts, comments and chat messages.
pub const MAX_BODY_LENGTH: usize = 10_000;

/// Maximum allowed length for stored URLs (pictures, QR codes, payment proofs).
pub const MAX_URL_LENGTH: usize = 2048;

/// Validate an email address (basic RFC 5322 format check).
///
/// This is a basic validation that checks:
/// - Contains exactly one @
/// - Has at least one character on each side of the @
/// - Has a dotted domain
/// - Is not too long
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Empty("email".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ValidationError::InvalidEmail(
            "must contain exactly one @ symbol".to_string(),
        ));
    }

    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing local part (before @)".to_string(),
        ));
    }

    if domain.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing domain (after @)".to_string(),
        ));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::InvalidEmail(
            "domain must be dotted, e.g. u.nus.edu".to_string(),
        ));
    }

    if domain.contains("..") {
        return Err(ValidationError::InvalidEmail(
            "domain cannot contain consecutive dots".to_string(),
        ));
    }

    Ok(())
}

/// Require a non-blank value no longer than `max` characters.
pub fn validate_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }

    let actual = trimmed.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual,
        });
    }

    Ok(())
}

/// A rating must be between 1 and 5 inclusive.
pub fn validate_rating(rating: f64) -> Result<(), ValidationError> {
    if !(1.0..=5.0).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            reason: "must be between 1 and 5".to_string(),
        });
    }
    Ok(())
}

/// An hourly rate must be a positive, finite amount.
pub fn validate_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "rate".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Parse a `HH:MM` time into minutes after midnight.
pub fn validate_time(field: &str, value: &str) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::InvalidTime {
        field: field.to_string(),
        value: value.to_string(),
    };

    let (hours, minutes) = value.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }

    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    Ok(hours * 60 + minutes)
}

/// Check that a slot starts before it ends.
pub fn validate_slot(start: &str, end: &str) -> Result<(), ValidationError> {
    let start_minutes = validate_time("startTime", start)?;
    let end_minutes = validate_time("endTime", end)?;

    if start_minutes >= end_minutes {
        return Err(ValidationError::EmptySlot {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    Ok(())
}

/// Parse a day name ("Monday", "mon", ...).
pub fn validate_day_of_week(day: &str) -> Result<Weekday, ValidationError> {
    day.trim()
        .parse::<Weekday>()
        .map_err(|_| ValidationError::InvalidDay(day.to_string()))
}

/// Validate a URL the client stored elsewhere (picture, QR code, payment proof).
pub fn validate_url(field: &str, url: &str) -> Result<(), ValidationError> {
    validate_text(field, url, MAX_URL_LENGTH)
}
