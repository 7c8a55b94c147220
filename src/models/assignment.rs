//! Judge assignment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Scope;
use crate::error::AppError;

/// A judge's engagement with one hackathon.
///
/// There is at most one assignment per (hackathon, judge); the scope lists
/// say which rounds / problem statements / teams / submissions it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeAssignment {
    pub id: Uuid,
    pub hackathon_id: Uuid,
    pub judge_id: Uuid,
    /// Legacy email reference, never used for matching
    pub judge_email: Option<String>,
    pub status: AssignmentStatus,
    pub rounds: Vec<i32>,
    pub problem_statements: Vec<i32>,
    pub assigned_teams: Vec<Uuid>,
    pub assigned_submissions: Vec<ScopedSubmission>,
    pub version: i64,
    pub invited_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Submission explicitly handed to a judge within a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopedSubmission {
    pub scope: Scope,
    pub submission_id: Uuid,
}

impl JudgeAssignment {
    /// Fresh invitation for a single scope
    pub fn invite(hackathon_id: Uuid, judge_id: Uuid, scope: Scope) -> Self {
        let now = Utc::now();
        let mut assignment = Self {
            id: Uuid::new_v4(),
            hackathon_id,
            judge_id,
            judge_email: None,
            status: AssignmentStatus::Invited,
            rounds: Vec::new(),
            problem_statements: Vec::new(),
            assigned_teams: Vec::new(),
            assigned_submissions: Vec::new(),
            version: 0,
            invited_at: now,
            responded_at: None,
            updated_at: now,
        };
        assignment.add_scope(scope);
        assignment
    }

    pub fn is_accepted(&self) -> bool {
        self.status == AssignmentStatus::Accepted
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        match scope {
            Scope::Round(i) => self.rounds.contains(&i),
            Scope::ProblemStatement(i) => self.problem_statements.contains(&i),
        }
    }

    /// Returns false when the scope was already present
    pub fn add_scope(&mut self, scope: Scope) -> bool {
        if self.has_scope(scope) {
            return false;
        }
        match scope {
            Scope::Round(i) => {
                self.rounds.push(i);
                self.rounds.sort_unstable();
            }
            Scope::ProblemStatement(i) => {
                self.problem_statements.push(i);
                self.problem_statements.sort_unstable();
            }
        }
        true
    }

    /// Submissions handed to this judge within `scope`, in stored order
    pub fn submissions_in(&self, scope: Scope) -> Vec<Uuid> {
        self.assigned_submissions
            .iter()
            .filter(|s| s.scope == scope)
            .map(|s| s.submission_id)
            .collect()
    }

    pub fn holds_submission(&self, scope: Scope, submission_id: Uuid) -> bool {
        self.assigned_submissions
            .iter()
            .any(|s| s.scope == scope && s.submission_id == submission_id)
    }

    /// Append submissions without touching existing entries
    pub fn add_submissions(&mut self, scope: Scope, submission_ids: &[Uuid]) -> usize {
        let mut added = 0;
        for &submission_id in submission_ids {
            if !self.holds_submission(scope, submission_id) {
                self.assigned_submissions.push(ScopedSubmission {
                    scope,
                    submission_id,
                });
                added += 1;
            }
        }
        added
    }

    /// Replace the partition for one scope, leaving other scopes alone
    pub fn replace_submissions(&mut self, scope: Scope, submission_ids: &[Uuid]) {
        self.assigned_submissions.retain(|s| s.scope != scope);
        self.assigned_submissions
            .extend(submission_ids.iter().map(|&submission_id| ScopedSubmission {
                scope,
                submission_id,
            }));
    }

    pub fn add_teams(&mut self, team_ids: &[Uuid]) -> usize {
        let mut added = 0;
        for team_id in team_ids {
            if !self.assigned_teams.contains(team_id) {
                self.assigned_teams.push(*team_id);
                added += 1;
            }
        }
        added
    }
}

/// Invitation status of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Invited,
    Accepted,
    Declined,
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invited => write!(f, "invited"),
            Self::Accepted => write!(f, "accepted"),
            Self::Declined => write!(f, "declined"),
        }
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invited" => Ok(Self::Invited),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(AppError::Validation(format!(
                "Unknown assignment status '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_scope_is_idempotent() {
        let mut a = JudgeAssignment::invite(Uuid::new_v4(), Uuid::new_v4(), Scope::Round(0));
        assert!(!a.add_scope(Scope::Round(0)));
        assert!(a.add_scope(Scope::Round(1)));
        assert_eq!(a.rounds, vec![0, 1]);
    }

    #[test]
    fn test_replace_submissions_keeps_other_scopes() {
        let mut a = JudgeAssignment::invite(Uuid::new_v4(), Uuid::new_v4(), Scope::Round(0));
        let kept = Uuid::new_v4();
        a.add_submissions(Scope::ProblemStatement(1), &[kept]);
        a.add_submissions(Scope::Round(0), &[Uuid::new_v4(), Uuid::new_v4()]);

        let fresh = Uuid::new_v4();
        a.replace_submissions(Scope::Round(0), &[fresh]);

        assert_eq!(a.submissions_in(Scope::Round(0)), vec![fresh]);
        assert_eq!(a.submissions_in(Scope::ProblemStatement(1)), vec![kept]);
    }

    #[test]
    fn test_add_submissions_skips_duplicates() {
        let mut a = JudgeAssignment::invite(Uuid::new_v4(), Uuid::new_v4(), Scope::Round(0));
        let s = Uuid::new_v4();
        assert_eq!(a.add_submissions(Scope::Round(0), &[s, s]), 1);
        assert_eq!(a.add_submissions(Scope::Round(0), &[s]), 0);
    }
}
