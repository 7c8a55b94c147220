//! Round state machine: Locked → Open → ReadyToShortlist → Shortlisted

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::coverage::ScopeProgress;
use crate::models::{RoundProgress, Round};

/// Where a round is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Previous round has not progressed yet
    Locked,
    /// Scoring in progress
    Open,
    /// Every pool submission has its evaluations
    ReadyToShortlist,
    /// Shortlist persisted, eligibility computed
    Shortlisted,
}

/// Whether allocation and scoring may happen in `round_index`.
///
/// Round 0 is open from the start; every later round opens once the
/// previous one has been progressed.
pub fn is_opened(round_index: i32, previous: Option<&RoundProgress>) -> bool {
    round_index == 0 || previous.is_some_and(|p| p.next_round_eligibility)
}

pub fn phase(
    round_index: i32,
    previous: Option<&RoundProgress>,
    current: Option<&RoundProgress>,
    scoring: &ScopeProgress,
) -> RoundPhase {
    if current.is_some_and(|p| p.round_completed) {
        RoundPhase::Shortlisted
    } else if !is_opened(round_index, previous) {
        RoundPhase::Locked
    } else if scoring.is_complete() {
        RoundPhase::ReadyToShortlist
    } else {
        RoundPhase::Open
    }
}

/// Why a round cannot progress yet, if it can't
pub fn progression_blocker(
    round: &Round,
    current: Option<&RoundProgress>,
    now: DateTime<Utc>,
    organizer_override: bool,
) -> Option<String> {
    if !current.is_some_and(|p| p.round_completed) {
        return Some(format!("Round {} has not been shortlisted yet", round.index));
    }
    if organizer_override {
        return None;
    }
    match round.end_date {
        Some(end) if now < end => Some(format!(
            "Round {} ends at {}",
            round.index,
            end.to_rfc3339()
        )),
        _ => None,
    }
}
