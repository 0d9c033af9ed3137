//! Session status machine.
//!
//! | From | To | Who |
//! |------|----|-----|
//! | Pending | Accepted, Rejected | tutor |
//! | Pending, Accepted | Cancelled | either participant |
//! | Accepted | Rejected | tutor |
//! | Accepted, Paid | Paid | student, by submitting payment proof |
//! | Paid | Confirmed | tutor |
//! | Confirmed, Completed | Reviewed | student, by submitting a review |
//! | any non-terminal | Completed | expiry sweep |

use std::fmt;

use database::Role;
use serde::{Deserialize, Serialize};

use crate::error::{MarketplaceError, Result};

/// Lifecycle state of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Paid,
    Confirmed,
    Reviewed,
    Completed,
}

/// What is driving a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A participant asking for a status directly.
    Participant(Role),
    /// The student uploading payment proof.
    PaymentProof,
    /// The student rating the tutor.
    Review,
    /// The end-time expiry sweep.
    Sweep,
}

/// Who a transition is reserved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Tutor,
    Either,
    PaymentProof,
    Review,
    Sweep,
}

impl SessionStatus {
    /// Every status.
    pub const ALL: [SessionStatus; 8] = [
        SessionStatus::Pending,
        SessionStatus::Accepted,
        SessionStatus::Rejected,
        SessionStatus::Cancelled,
        SessionStatus::Paid,
        SessionStatus::Confirmed,
        SessionStatus::Reviewed,
        SessionStatus::Completed,
    ];

    /// Statuses the expiry sweep leaves alone.
    pub const TERMINAL: [SessionStatus; 4] = [
        SessionStatus::Reviewed,
        SessionStatus::Completed,
        SessionStatus::Rejected,
        SessionStatus::Cancelled,
    ];

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "Pending",
            SessionStatus::Accepted => "Accepted",
            SessionStatus::Rejected => "Rejected",
            SessionStatus::Cancelled => "Cancelled",
            SessionStatus::Paid => "Paid",
            SessionStatus::Confirmed => "Confirmed",
            SessionStatus::Reviewed => "Reviewed",
            SessionStatus::Completed => "Completed",
        }
    }

    /// Parse a status name, ignoring case.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Whether the sweep must leave this status alone.
    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    fn permit(self, to: SessionStatus) -> Option<Permit> {
        use SessionStatus::*;

        match (self, to) {
            (Pending, Accepted) | (Pending, Rejected) | (Accepted, Rejected) => Some(Permit::Tutor),
            (Paid, Confirmed) => Some(Permit::Tutor),
            (Pending, Cancelled) | (Accepted, Cancelled) => Some(Permit::Either),
            (Accepted, Paid) | (Paid, Paid) => Some(Permit::PaymentProof),
            (Confirmed, Reviewed) | (Completed, Reviewed) => Some(Permit::Review),
            (from, Completed) if !from.is_terminal() => Some(Permit::Sweep),
            _ => None,
        }
    }

    /// Check that `trigger` may move a session from `self` to `to`.
    ///
    /// A participant with the wrong role gets `Forbidden`; a move the table
    /// does not contain for this trigger gets `InvalidTransition`.
    pub fn check_transition(self, to: SessionStatus, trigger: Trigger) -> Result<()> {
        let invalid = MarketplaceError::InvalidTransition { from: self, to };

        match (self.permit(to), trigger) {
            (Some(Permit::Tutor), Trigger::Participant(Role::Tutor)) => Ok(()),
            (Some(Permit::Tutor), Trigger::Participant(Role::Student)) => Err(
                MarketplaceError::Forbidden(format!("only the tutor can mark a session {to}")),
            ),
            (Some(Permit::Either), Trigger::Participant(_)) => Ok(()),
            (Some(Permit::PaymentProof), Trigger::PaymentProof) => Ok(()),
            (Some(Permit::Review), Trigger::Review) => Ok(()),
            (Some(Permit::Sweep), Trigger::Sweep) => Ok(()),
            _ => Err(invalid),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionStatus::*;

    const TUTOR: Trigger = Trigger::Participant(Role::Tutor);
    const STUDENT: Trigger = Trigger::Participant(Role::Student);

    #[test]
    fn test_round_trip_names() {
        for status in SessionStatus::ALL {
            assert_eq!(SessionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::from_str("accepted"), Some(Accepted));
        assert_eq!(SessionStatus::from_str("Done"), None);
    }

    #[test]
    fn test_serializes_as_stored_name() {
        assert_eq!(serde_json::to_string(&Confirmed).unwrap(), "\"Confirmed\"");
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = SessionStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![Rejected, Cancelled, Reviewed, Completed]);
    }

    #[test]
    fn test_tutor_moves() {
        assert!(Pending.check_transition(Accepted, TUTOR).is_ok());
        assert!(Pending.check_transition(Rejected, TUTOR).is_ok());
        assert!(Accepted.check_transition(Rejected, TUTOR).is_ok());
        assert!(Paid.check_transition(Confirmed, TUTOR).is_ok());

        assert!(matches!(
            Pending.check_transition(Accepted, STUDENT),
            Err(MarketplaceError::Forbidden(_))
        ));
        assert!(matches!(
            Paid.check_transition(Confirmed, STUDENT),
            Err(MarketplaceError::Forbidden(_))
        ));
    }

    #[test]
    fn test_either_can_cancel_before_payment() {
        for trigger in [TUTOR, STUDENT] {
            assert!(Pending.check_transition(Cancelled, trigger).is_ok());
            assert!(Accepted.check_transition(Cancelled, trigger).is_ok());
        }
        assert!(matches!(
            Paid.check_transition(Cancelled, STUDENT),
            Err(MarketplaceError::InvalidTransition { from: Paid, to: Cancelled })
        ));
    }

    #[test]
    fn test_paid_and_reviewed_need_their_own_channel() {
        assert!(Accepted.check_transition(Paid, Trigger::PaymentProof).is_ok());
        assert!(Paid.check_transition(Paid, Trigger::PaymentProof).is_ok());
        assert!(matches!(
            Accepted.check_transition(Paid, STUDENT),
            Err(MarketplaceError::InvalidTransition { .. })
        ));
        assert!(Pending.check_transition(Paid, Trigger::PaymentProof).is_err());

        assert!(Confirmed.check_transition(Reviewed, Trigger::Review).is_ok());
        assert!(Completed.check_transition(Reviewed, Trigger::Review).is_ok());
        assert!(Confirmed.check_transition(Reviewed, STUDENT).is_err());
        assert!(Reviewed.check_transition(Reviewed, Trigger::Review).is_err());
    }

    #[test]
    fn test_sweep_only_completes_open_sessions() {
        for status in SessionStatus::ALL {
            let result = status.check_transition(Completed, Trigger::Sweep);
            assert_eq!(result.is_ok(), !status.is_terminal(), "{status}");
        }
        assert!(Confirmed.check_transition(Completed, TUTOR).is_err());
    }

    #[test]
    fn test_no_way_back() {
        for from in SessionStatus::TERMINAL {
            for to in [Pending, Accepted, Paid, Confirmed] {
                for trigger in [TUTOR, STUDENT, Trigger::PaymentProof, Trigger::Review] {
                    assert!(from.check_transition(to, trigger).is_err());
                }
            }
        }
    }
}
