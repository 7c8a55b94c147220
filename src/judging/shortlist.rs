//! Shortlist selection and the advancement sets derived from it

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::aggregate::RankedSubmission;
use crate::error::{AppError, AppResult};
use crate::models::{RoundProgress, Submission, Team};

/// How many leaderboard entries advance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShortlistRule {
    /// Top N scored submissions
    Count(usize),
    /// Every scored submission at or above the threshold
    Threshold(f64),
}

/// Pick submissions from an already ranked leaderboard. Unscored rows never qualify.
pub fn select(rows: &[RankedSubmission], rule: ShortlistRule) -> AppResult<Vec<Uuid>> {
    let scored = rows.iter().filter(|r| r.average_score.is_some());

    let selected = match rule {
        ShortlistRule::Count(0) => {
            return Err(AppError::Validation(
                "Shortlist count must be at least 1".to_string(),
            ));
        }
        ShortlistRule::Count(n) => scored.take(n).map(|r| r.submission_id).collect(),
        ShortlistRule::Threshold(t) if !t.is_finite() => {
            return Err(AppError::Validation(
                "Shortlist threshold must be a finite number".to_string(),
            ));
        }
        ShortlistRule::Threshold(t) => scored
            .filter(|r| r.average_score.is_some_and(|s| s >= t))
            .map(|r| r.submission_id)
            .collect(),
    };

    Ok(selected)
}

/// Teams and participants linked to a set of submissions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Advancement {
    pub teams: BTreeSet<Uuid>,
    pub participants: BTreeSet<Uuid>,
}

/// Submitters, plus team leaders and members, of the given submissions
pub fn derive_advancement(
    submission_ids: &[Uuid],
    submissions: &[Submission],
    teams: &[Team],
) -> Advancement {
    let mut advancement = Advancement::default();

    for submission in submissions.iter().filter(|s| submission_ids.contains(&s.id)) {
        advancement.participants.insert(submission.submitted_by);

        if let Some(team_id) = submission.team_id {
            advancement.teams.insert(team_id);
            if let Some(team) = teams.iter().find(|t| t.id == team_id) {
                advancement.participants.insert(team.leader_id);
                advancement.participants.extend(team.members.iter().copied());
            }
        }
    }

    advancement
}

/// Overwrite the round's shortlist. Never merges with the previous one.
pub fn apply_shortlist(
    progress: &mut RoundProgress,
    selected: Vec<Uuid>,
    advancement: Advancement,
    actor_id: Uuid,
    now: DateTime<Utc>,
) {
    progress.shortlisted_teams = advancement.teams.iter().copied().collect();
    progress.eligible_teams = advancement.teams.into_iter().collect();
    progress.eligible_participants = advancement.participants.into_iter().collect();
    progress.shortlisted_submissions = selected;
    progress.round_completed = true;
    progress.shortlisted_at = Some(now);
    progress.shortlisted_by = Some(actor_id);
    progress.shortlist_revision += 1;
    progress.updated_at = now;
}

/// Flip one submission in or out. Returns whether it is now shortlisted.
///
/// Other shortlisted submissions are untouched; a team or participant is only
/// dropped when no remaining shortlisted submission still links to it.
pub fn toggle(
    progress: &mut RoundProgress,
    submission_id: Uuid,
    submissions: &[Submission],
    teams: &[Team],
    now: DateTime<Utc>,
) -> bool {
    let own = derive_advancement(&[submission_id], submissions, teams);

    let included = if let Some(pos) = progress
        .shortlisted_submissions
        .iter()
        .position(|id| *id == submission_id)
    {
        progress.shortlisted_submissions.remove(pos);
        let still_linked =
            derive_advancement(&progress.shortlisted_submissions, submissions, teams);

        let drop_team = |t: &Uuid| own.teams.contains(t) && !still_linked.teams.contains(t);
        progress.shortlisted_teams.retain(|t| !drop_team(t));
        progress.eligible_teams.retain(|t| !drop_team(t));
        progress.eligible_participants.retain(|p| {
            !(own.participants.contains(p) && !still_linked.participants.contains(p))
        });
        false
    } else {
        progress.shortlisted_submissions.push(submission_id);
        for team in &own.teams {
            if !progress.shortlisted_teams.contains(team) {
                progress.shortlisted_teams.push(*team);
            }
            if !progress.eligible_teams.contains(team) {
                progress.eligible_teams.push(*team);
            }
        }
        for participant in &own.participants {
            if !progress.eligible_participants.contains(participant) {
                progress.eligible_participants.push(*participant);
            }
        }
        true
    };

    progress.shortlisted_at = Some(now);
    progress.shortlist_revision += 1;
    progress.updated_at = now;
    included
}
