//! Per-round progression state and winners

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Shortlist and eligibility state of one round.
///
/// Keyed by (hackathon_id, round_index). `version` is the optimistic
/// concurrency token; 0 means the record has never been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RoundProgress {
    pub hackathon_id: Uuid,
    pub round_index: i32,
    pub shortlisted_submissions: Vec<Uuid>,
    pub shortlisted_teams: Vec<Uuid>,
    pub eligible_participants: Vec<Uuid>,
    pub eligible_teams: Vec<Uuid>,
    pub round_completed: bool,
    pub next_round_eligibility: bool,
    pub shortlisted_at: Option<DateTime<Utc>>,
    pub shortlisted_by: Option<Uuid>,
    pub shortlist_revision: i32,
    pub progressed_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl RoundProgress {
    pub fn new(hackathon_id: Uuid, round_index: i32) -> Self {
        Self {
            hackathon_id,
            round_index,
            shortlisted_submissions: Vec::new(),
            shortlisted_teams: Vec::new(),
            eligible_participants: Vec::new(),
            eligible_teams: Vec::new(),
            round_completed: false,
            next_round_eligibility: false,
            shortlisted_at: None,
            shortlisted_by: None,
            shortlist_revision: 0,
            progressed_at: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn is_shortlisted(&self, submission_id: Uuid) -> bool {
        self.shortlisted_submissions.contains(&submission_id)
    }

    /// Whether a participant or any of their teams advanced out of this round
    pub fn admits(&self, user_id: Uuid, team_ids: &[Uuid]) -> bool {
        self.round_completed
            && (self.eligible_participants.contains(&user_id)
                || team_ids.iter().any(|t| self.eligible_teams.contains(t)))
    }
}

/// Final placements of a hackathon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerBoard {
    pub hackathon_id: Uuid,
    pub round_index: i32,
    pub winners: Vec<Winner>,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Uuid,
    /// Fingerprint of the winner set the last announcement went out for
    pub notified_fingerprint: Option<String>,
    pub notified_at: Option<DateTime<Utc>>,
    pub version: i64,
}

/// One placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub placement: u32,
    pub submission_id: Uuid,
    pub team_id: Option<Uuid>,
    pub submitted_by: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_requires_completed_round() {
        let user = Uuid::new_v4();
        let team = Uuid::new_v4();
        let mut progress = RoundProgress::new(Uuid::new_v4(), 0);
        progress.eligible_participants.push(user);
        progress.eligible_teams.push(team);

        assert!(!progress.admits(user, &[]));

        progress.round_completed = true;
        assert!(progress.admits(user, &[]));
        assert!(progress.admits(Uuid::new_v4(), &[team]));
        assert!(!progress.admits(Uuid::new_v4(), &[Uuid::new_v4()]));
    }
}
