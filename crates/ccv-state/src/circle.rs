//! # Circle Lifecycle State Machine
//!
//! ```text
//! Forming ──▶ Active ──▶ Completed (terminal)
//!    │          │
//!    └──────────┴──▶ Cancelled (terminal)
//! ```
//!
//! `current_round` counts completed rounds. It starts at 0, only ever
//! increases, and the circle completes when it reaches `total_rounds`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ccv_core::{Amount, CircleId, Currency, MemberId, Timestamp};

// ─── Circle Status ───────────────────────────────────────────────────

/// The lifecycle status of a circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircleStatus {
    /// Accepting members, no rounds yet.
    Forming,
    /// Rounds are running.
    Active,
    /// Every round has paid out (terminal).
    Completed,
    /// Stopped administratively (terminal).
    Cancelled,
}

impl CircleStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether new members may join.
    pub fn accepts_members(&self) -> bool {
        matches!(self, Self::Forming | Self::Active)
    }
}

impl std::fmt::Display for CircleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Forming => "FORMING",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

// ─── Payment Frequency ───────────────────────────────────────────────

/// How often a round opens; determines each round's payment window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    /// Every 7 days.
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Every 30 days.
    Monthly,
}

impl PaymentFrequency {
    /// Length of the payment window in seconds.
    pub fn window_secs(&self) -> u64 {
        const DAY: u64 = 24 * 60 * 60;
        match self {
            Self::Weekly => 7 * DAY,
            Self::Biweekly => 14 * DAY,
            Self::Monthly => 30 * DAY,
        }
    }
}

impl std::fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PaymentFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown payment frequency {other:?}")),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from circle lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CircleStateError {
    /// Attempted transition is not valid from the current status.
    #[error("invalid circle transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: CircleStatus,
        /// Attempted target status.
        to: CircleStatus,
    },

    /// The circle is in a terminal status.
    #[error("circle is in terminal status {status}")]
    Terminal {
        /// The terminal status.
        status: CircleStatus,
    },

    /// The round counter cannot move as requested.
    #[error("round counter {current}/{total} cannot move to {requested}")]
    RoundCounter {
        /// Completed rounds.
        current: u32,
        /// Scheduled rounds.
        total: u32,
        /// Requested value.
        requested: u32,
    },
}

// ─── Terms and Records ───────────────────────────────────────────────

/// Parameters fixed at circle creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleTerms {
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Member who created the circle.
    pub creator: MemberId,
    /// Currency denomination.
    pub currency: Currency,
    /// Round cadence.
    pub frequency: PaymentFrequency,
    /// Maximum number of members.
    pub capacity: u32,
    /// Contribution each active member owes per round.
    pub per_round_amount: Amount,
    /// Number of rounds (one payout each).
    pub total_rounds: u32,
    /// Requested start time.
    pub start_time: Timestamp,
}

/// Record of a circle status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleTransitionRecord {
    /// Status before the transition.
    pub from_status: CircleStatus,
    /// Status after the transition.
    pub to_status: CircleStatus,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Reason for the transition.
    pub reason: String,
}

/// A lending circle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circle {
    /// Circle identifier.
    pub id: CircleId,
    /// Parameters fixed at creation (except `total_rounds`, which may
    /// shrink after an exclusion).
    pub terms: CircleTerms,
    /// Number of completed rounds; the open round has this index.
    pub current_round: u32,
    /// Lifecycle status.
    pub status: CircleStatus,
    /// When the circle was created.
    pub created_at: Timestamp,
    /// When the circle became active.
    pub activated_at: Option<Timestamp>,
    /// When the circle reached a terminal status.
    pub closed_at: Option<Timestamp>,
    /// Ordered log of status transitions.
    pub transitions: Vec<CircleTransitionRecord>,
}

impl Circle {
    /// Create a circle in `Forming`.
    pub fn new(id: CircleId, terms: CircleTerms, created_at: Timestamp) -> Self {
        Self {
            id,
            terms,
            current_round: 0,
            status: CircleStatus::Forming,
            created_at,
            activated_at: None,
            closed_at: None,
            transitions: Vec::new(),
        }
    }

    /// Scheduled number of rounds.
    pub fn total_rounds(&self) -> u32 {
        self.terms.total_rounds
    }

    /// Rounds still to be completed.
    pub fn remaining_rounds(&self) -> u32 {
        self.terms.total_rounds.saturating_sub(self.current_round)
    }

    /// FORMING → ACTIVE.
    pub fn activate(&mut self, at: Timestamp, reason: &str) -> Result<(), CircleStateError> {
        self.require_status(CircleStatus::Forming, CircleStatus::Active)?;
        self.activated_at = Some(at);
        self.do_transition(CircleStatus::Active, at, reason);
        Ok(())
    }

    /// FORMING or ACTIVE → CANCELLED.
    pub fn cancel(&mut self, at: Timestamp, reason: &str) -> Result<(), CircleStateError> {
        if self.status.is_terminal() {
            return Err(CircleStateError::Terminal {
                status: self.status,
            });
        }
        self.closed_at = Some(at);
        self.do_transition(CircleStatus::Cancelled, at, reason);
        Ok(())
    }

    /// Count one more completed round. Completes the circle when the
    /// counter reaches `total_rounds`.
    ///
    /// Returns `true` if the circle completed.
    pub fn advance_round(&mut self, at: Timestamp) -> Result<bool, CircleStateError> {
        self.require_status(CircleStatus::Active, CircleStatus::Active)?;
        if self.current_round >= self.terms.total_rounds {
            return Err(CircleStateError::RoundCounter {
                current: self.current_round,
                total: self.terms.total_rounds,
                requested: self.current_round.saturating_add(1),
            });
        }
        self.current_round += 1;
        Ok(self.complete_if_done(at, "final round completed"))
    }

    /// Reduce `total_rounds` after members were excluded. Completes an
    /// active circle if no rounds remain.
    ///
    /// Returns `true` if the circle completed.
    pub fn shrink_rounds(&mut self, new_total: u32, at: Timestamp) -> Result<bool, CircleStateError> {
        if self.status.is_terminal() {
            return Err(CircleStateError::Terminal {
                status: self.status,
            });
        }
        if new_total < self.current_round || new_total > self.terms.total_rounds {
            return Err(CircleStateError::RoundCounter {
                current: self.current_round,
                total: self.terms.total_rounds,
                requested: new_total,
            });
        }
        self.terms.total_rounds = new_total;
        if self.status == CircleStatus::Active {
            Ok(self.complete_if_done(at, "no eligible recipients remain"))
        } else {
            Ok(false)
        }
    }

    /// Grow `total_rounds` so a member who joined an active circle also
    /// receives the pool. Bounded by capacity.
    pub fn extend_rounds(&mut self, new_total: u32) -> Result<(), CircleStateError> {
        self.require_status(CircleStatus::Active, CircleStatus::Active)?;
        if new_total < self.terms.total_rounds || new_total > self.terms.capacity {
            return Err(CircleStateError::RoundCounter {
                current: self.current_round,
                total: self.terms.total_rounds,
                requested: new_total,
            });
        }
        self.terms.total_rounds = new_total;
        Ok(())
    }

    fn complete_if_done(&mut self, at: Timestamp, reason: &str) -> bool {
        if self.current_round == self.terms.total_rounds {
            self.closed_at = Some(at);
            self.do_transition(CircleStatus::Completed, at, reason);
            true
        } else {
            false
        }
    }

    fn require_status(
        &self,
        expected: CircleStatus,
        target: CircleStatus,
    ) -> Result<(), CircleStateError> {
        if self.status.is_terminal() {
            return Err(CircleStateError::Terminal {
                status: self.status,
            });
        }
        if self.status != expected {
            return Err(CircleStateError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: CircleStatus, at: Timestamp, reason: &str) {
        self.transitions.push(CircleTransitionRecord {
            from_status: self.status,
            to_status: to,
            timestamp: at,
            reason: reason.to_string(),
        });
        self.status = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(1_700_000_000 + secs).unwrap()
    }

    fn terms(total_rounds: u32) -> CircleTerms {
        CircleTerms {
            name: "Family savings".to_string(),
            description: "Monthly pot".to_string(),
            creator: MemberId::new("creator").unwrap(),
            currency: Currency::Usdc,
            frequency: PaymentFrequency::Monthly,
            capacity: 5,
            per_round_amount: Amount(100),
            total_rounds,
            start_time: at(0),
        }
    }

    fn active(total_rounds: u32) -> Circle {
        let mut c = Circle::new(CircleId::new(), terms(total_rounds), at(0));
        c.activate(at(1), "full").unwrap();
        c
    }

    #[test]
    fn new_circle_is_forming() {
        let c = Circle::new(CircleId::new(), terms(3), at(0));
        assert_eq!(c.status, CircleStatus::Forming);
        assert_eq!(c.current_round, 0);
        assert!(c.status.accepts_members());
    }

    #[test]
    fn activate_records_transition() {
        let c = active(3);
        assert_eq!(c.status, CircleStatus::Active);
        assert_eq!(c.activated_at, Some(at(1)));
        assert_eq!(c.transitions.len(), 1);
        assert_eq!(c.transitions[0].from_status, CircleStatus::Forming);
    }

    #[test]
    fn cannot_activate_twice() {
        let mut c = active(3);
        assert_eq!(
            c.activate(at(2), "again").unwrap_err(),
            CircleStateError::InvalidTransition {
                from: CircleStatus::Active,
                to: CircleStatus::Active
            }
        );
    }

    #[test]
    fn advance_until_completed() {
        let mut c = active(3);
        assert!(!c.advance_round(at(10)).unwrap());
        assert!(!c.advance_round(at(20)).unwrap());
        assert!(c.advance_round(at(30)).unwrap());
        assert_eq!(c.status, CircleStatus::Completed);
        assert_eq!(c.current_round, 3);
        assert_eq!(c.closed_at, Some(at(30)));
    }

    #[test]
    fn completed_circle_cannot_advance_or_reactivate() {
        let mut c = active(1);
        c.advance_round(at(10)).unwrap();
        assert!(matches!(
            c.advance_round(at(11)),
            Err(CircleStateError::Terminal { .. })
        ));
        assert!(matches!(c.activate(at(12), "x"), Err(CircleStateError::Terminal { .. })));
        assert_eq!(c.current_round, 1);
    }

    #[test]
    fn forming_circle_cannot_advance() {
        let mut c = Circle::new(CircleId::new(), terms(3), at(0));
        assert!(c.advance_round(at(1)).is_err());
        assert_eq!(c.current_round, 0);
    }

    #[test]
    fn cancel_from_forming_and_active() {
        let mut forming = Circle::new(CircleId::new(), terms(3), at(0));
        forming.cancel(at(1), "abandoned").unwrap();
        assert_eq!(forming.status, CircleStatus::Cancelled);

        let mut running = active(3);
        running.cancel(at(2), "dispute").unwrap();
        assert_eq!(running.status, CircleStatus::Cancelled);
        assert!(running.cancel(at(3), "again").is_err());
    }

    #[test]
    fn shrink_rounds_completes_when_caught_up() {
        let mut c = active(3);
        c.advance_round(at(10)).unwrap();
        assert!(!c.shrink_rounds(2, at(11)).unwrap());
        assert_eq!(c.total_rounds(), 2);
        assert!(c.shrink_rounds(1, at(12)).unwrap());
        assert_eq!(c.status, CircleStatus::Completed);
    }

    #[test]
    fn shrink_rounds_never_below_counter_or_above_total() {
        let mut c = active(3);
        c.advance_round(at(10)).unwrap();
        assert!(c.shrink_rounds(0, at(11)).is_err());
        assert!(c.shrink_rounds(4, at(11)).is_err());
        assert_eq!(c.total_rounds(), 3);
    }

    #[test]
    fn extend_rounds_bounded_by_capacity() {
        let mut c = active(3);
        c.extend_rounds(4).unwrap();
        assert_eq!(c.total_rounds(), 4);
        assert!(c.extend_rounds(6).is_err());
        assert!(c.extend_rounds(2).is_err());
        assert_eq!(c.total_rounds(), 4);
    }

    #[test]
    fn frequency_windows() {
        assert_eq!(PaymentFrequency::Weekly.window_secs(), 604_800);
        assert_eq!(PaymentFrequency::Biweekly.window_secs(), 1_209_600);
        assert_eq!(PaymentFrequency::Monthly.window_secs(), 2_592_000);
        assert_eq!("Monthly".parse::<PaymentFrequency>().unwrap(), PaymentFrequency::Monthly);
    }

    #[test]
    fn status_display() {
        assert_eq!(CircleStatus::Forming.to_string(), "FORMING");
        assert_eq!(CircleStatus::Cancelled.to_string(), "CANCELLED");
    }
}
