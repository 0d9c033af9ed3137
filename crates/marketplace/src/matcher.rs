//! Suggested tutor matching.
//!
//! Every unbooked posting is scored against the student's profile and the
//! best `limit` are returned. Each candidate costs one profile lookup, so
//! this is linear in the number of open postings.

use std::cmp::Ordering;

use database::{tutor, user, Database, DatabaseError, PostingFilter, TutorPosting, UserProfile};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// Scores how well a posting suits a student.
pub trait Scorer: Send + Sync {
    /// Higher is a better match.
    fn score(&self, student: &UserProfile, tutor: &UserProfile, posting: &TutorPosting) -> f64;
}

/// Weight given to each matching attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchWeights {
    /// Posting course is one of the student's courses.
    pub course: f64,
    /// Same faculty.
    pub faculty: f64,
    /// Same major.
    pub major: f64,
    /// Tutor is further along than the student.
    pub seniority: f64,
    /// Scaled by tutor rating out of 5.
    pub rating: f64,
    /// Rate is within the student's budget.
    pub budget: f64,
    /// Posting is at the student's preferred location.
    pub location: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            course: 5.0,
            faculty: 1.0,
            major: 2.0,
            seniority: 1.0,
            rating: 2.0,
            budget: 1.5,
            location: 1.0,
        }
    }
}

/// Linear weighted sum over [`MatchWeights`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedScorer {
    pub weights: MatchWeights,
}

impl WeightedScorer {
    pub fn new(weights: MatchWeights) -> Self {
        Self { weights }
    }
}

fn same(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a.trim().eq_ignore_ascii_case(b.trim()))
}

fn flag(hit: bool) -> f64 {
    if hit {
        1.0
    } else {
        0.0
    }
}

impl Scorer for WeightedScorer {
    fn score(&self, student: &UserProfile, tutor: &UserProfile, posting: &TutorPosting) -> f64 {
        let w = &self.weights;

        let course = student
            .courses
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&posting.course));
        let faculty = same(student.faculty.as_deref(), tutor.faculty.as_deref());
        let major = same(student.major.as_deref(), tutor.major.as_deref());
        let senior = matches!(
            (student.year_of_study, tutor.year_of_study),
            (Some(s), Some(t)) if t > s
        );
        let rating = if tutor.rating_count > 0 {
            (tutor.rating / 5.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let affordable = student.max_rate.is_some_and(|max| posting.rate <= max);
        let nearby = same(student.preferred_location.as_deref(), Some(posting.location.as_str()));

        w.course * flag(course)
            + w.faculty * flag(faculty)
            + w.major * flag(major)
            + w.seniority * flag(senior)
            + w.rating * rating
            + w.budget * flag(affordable)
            + w.location * flag(nearby)
    }
}

/// A scored posting with its tutor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub posting: TutorPosting,
    pub tutor: UserProfile,
    pub score: f64,
}

/// Sort by descending score, keeping input order on ties, and keep the top `limit`.
pub fn rank_candidates(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates.truncate(limit);
    candidates
}

/// Suggest up to `limit` postings for a student.
///
/// Postings owned by the student, booked postings, and postings whose tutor
/// has no profile are left out.
pub async fn suggest_tutors<S: Scorer + ?Sized>(
    db: &Database,
    scorer: &S,
    student_id: &str,
    limit: usize,
) -> Result<Vec<Candidate>> {
    let student = user::get_user(db.pool(), student_id).await?;
    let postings = tutor::list_postings(
        db.pool(),
        &PostingFilter {
            exclude_tutor: Some(student_id.to_string()),
            ..PostingFilter::default()
        },
    )
    .await?;

    let mut candidates = Vec::with_capacity(postings.len());
    for posting in postings {
        let tutor = match user::get_user(db.pool(), &posting.tutor_id).await {
            Ok(tutor) => tutor,
            Err(DatabaseError::NotFound { .. }) => {
                debug!(posting_id = %posting.id, tutor_id = %posting.tutor_id, "Skipping posting without tutor profile");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let score = scorer.score(&student, &tutor, &posting);
        candidates.push(Candidate {
            posting,
            tutor,
            score,
        });
    }

    Ok(rank_candidates(candidates, limit))
}
