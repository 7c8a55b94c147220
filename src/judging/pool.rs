//! Which submissions are evaluable in a scope

use crate::models::{RoundProgress, Scope, Submission};

/// Submissions in play for round `round_index`, sorted by submission id.
///
/// Round 0 takes every submitted project entered into it. Later rounds need
/// the previous round's shortlist to be completed, and take the projects it
/// carried forward plus fresh round entries from advanced teams/participants.
pub fn round_pool<'a>(
    round_index: i32,
    submissions: &'a [Submission],
    previous: Option<&RoundProgress>,
) -> Vec<&'a Submission> {
    let mut pool: Vec<&Submission> = if round_index == 0 {
        submissions
            .iter()
            .filter(|s| s.is_submitted() && s.round_index == 0)
            .collect()
    } else {
        let Some(previous) = previous.filter(|p| p.round_completed) else {
            return Vec::new();
        };
        submissions
            .iter()
            .filter(|s| s.is_submitted())
            .filter(|s| {
                previous.is_shortlisted(s.id)
                    || (s.round_index == round_index
                        && (previous.eligible_participants.contains(&s.submitted_by)
                            || s
                                .team_id
                                .is_some_and(|t| previous.eligible_teams.contains(&t))))
            })
            .collect()
    };
    pool.sort_by_key(|s| s.id);
    pool
}

/// Submitted projects targeting one problem statement, sorted by id
pub fn problem_statement_pool(ps_index: i32, submissions: &[Submission]) -> Vec<&Submission> {
    let mut pool: Vec<&Submission> = submissions
        .iter()
        .filter(|s| s.is_submitted() && s.problem_statement_index == Some(ps_index))
        .collect();
    pool.sort_by_key(|s| s.id);
    pool
}

/// Pool for any scope; `previous` is only consulted for rounds
pub fn scope_pool<'a>(
    scope: Scope,
    submissions: &'a [Submission],
    previous: Option<&RoundProgress>,
) -> Vec<&'a Submission> {
    match scope {
        Scope::Round(index) => round_pool(index, submissions, previous),
        Scope::ProblemStatement(index) => problem_statement_pool(index, submissions),
    }
}
