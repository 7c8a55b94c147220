//! Which judges cover which submissions, and how far scoring has got

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use uuid::Uuid;

use crate::models::{AssignmentMode, Hackathon, JudgeAssignment, Score, Scope, Submission};

/// How an assignment relates to a submission in a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    None,
    /// Self-serve: the scope is in open mode
    Open,
    /// Rostered: the submission or its team was handed to the judge
    Explicit,
}

impl Coverage {
    pub fn allows_scoring(self) -> bool {
        self != Coverage::None
    }
}

/// Coverage of `submission` in round `round_index` by `assignment`.
///
/// Only accepted assignments cover anything.
pub fn coverage(
    assignment: &JudgeAssignment,
    submission: &Submission,
    round_index: i32,
    hackathon: &Hackathon,
) -> Coverage {
    if !assignment.is_accepted() {
        return Coverage::None;
    }

    let ps = submission.problem_statement_index;
    let in_round = assignment.rounds.contains(&round_index);
    let in_ps = ps.is_some_and(|p| assignment.problem_statements.contains(&p));

    let explicit = assignment.holds_submission(Scope::Round(round_index), submission.id)
        || ps.is_some_and(|p| {
            assignment.holds_submission(Scope::ProblemStatement(p), submission.id)
        })
        || (submission
            .team_id
            .is_some_and(|t| assignment.assigned_teams.contains(&t))
            && (in_round || in_ps));
    if explicit {
        return Coverage::Explicit;
    }

    let round_open = in_round
        && hackathon
            .round(round_index)
            .is_ok_and(|r| r.assignment_mode == AssignmentMode::Open);
    let ps_open = in_ps
        && ps.is_some_and(|p| {
            hackathon
                .problem_statement(p)
                .is_ok_and(|s| s.assignment_mode == AssignmentMode::Open)
        });

    if round_open || ps_open {
        Coverage::Open
    } else {
        Coverage::None
    }
}

/// Scoring state of one submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionProgress {
    pub submission_id: Uuid,
    /// Judges the submission was explicitly handed to
    pub required_judges: Vec<Uuid>,
    /// Accepted judges allowed to score it (explicit or open)
    pub eligible_judges: Vec<Uuid>,
    /// Accepted covering judges that have scored it
    pub scored_by: Vec<Uuid>,
    pub evaluations_required: usize,
    pub evaluations_completed: usize,
    pub complete: bool,
}

/// Totals over a pool
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScopeProgress {
    pub submissions: usize,
    pub fully_scored: usize,
    pub unassigned: usize,
    pub evaluations_required: usize,
    pub evaluations_completed: usize,
}

impl ScopeProgress {
    pub fn is_complete(&self) -> bool {
        self.submissions > 0 && self.fully_scored == self.submissions
    }

    pub fn completion_percent(&self) -> f64 {
        if self.evaluations_required == 0 {
            return 0.0;
        }
        (self.evaluations_completed as f64 / self.evaluations_required as f64) * 100.0
    }
}

/// Judges (by id) that have at least one score per submission
pub fn scorers_by_submission(scores: &[Score]) -> HashMap<Uuid, BTreeSet<Uuid>> {
    let mut scorers: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
    for score in scores {
        scorers
            .entry(score.submission_id)
            .or_default()
            .insert(score.judge_id);
    }
    scorers
}

/// Evaluators needed vs. done for one submission.
///
/// Rostered submissions need every rostered accepted judge; open ones need
/// one score from any accepted covering judge. Declined and pending
/// assignments never count.
pub fn submission_progress(
    submission: &Submission,
    round_index: i32,
    hackathon: &Hackathon,
    assignments: &[JudgeAssignment],
    scorers: Option<&BTreeSet<Uuid>>,
) -> SubmissionProgress {
    let mut required = Vec::new();
    let mut eligible = Vec::new();

    for assignment in assignments {
        match coverage(assignment, submission, round_index, hackathon) {
            Coverage::Explicit => {
                required.push(assignment.judge_id);
                eligible.push(assignment.judge_id);
            }
            Coverage::Open => eligible.push(assignment.judge_id),
            Coverage::None => {}
        }
    }

    let scored_by: Vec<Uuid> = eligible
        .iter()
        .copied()
        .filter(|j| scorers.is_some_and(|s| s.contains(j)))
        .collect();

    let (evaluations_required, evaluations_completed) = if required.is_empty() {
        (1, scored_by.len().min(1))
    } else {
        let done = required
            .iter()
            .filter(|j| scorers.is_some_and(|s| s.contains(j)))
            .count();
        (required.len(), done)
    };

    SubmissionProgress {
        submission_id: submission.id,
        required_judges: required,
        eligible_judges: eligible,
        scored_by,
        evaluations_required,
        evaluations_completed,
        complete: evaluations_completed >= evaluations_required,
    }
}

/// Per-submission progress plus totals for a round's pool
pub fn pool_progress(
    pool: &[&Submission],
    round_index: i32,
    hackathon: &Hackathon,
    assignments: &[JudgeAssignment],
    scores: &[Score],
) -> (Vec<SubmissionProgress>, ScopeProgress) {
    let scorers = scorers_by_submission(scores);
    let mut totals = ScopeProgress::default();

    let rows: Vec<SubmissionProgress> = pool
        .iter()
        .map(|s| {
            let row =
                submission_progress(s, round_index, hackathon, assignments, scorers.get(&s.id));
            totals.submissions += 1;
            totals.evaluations_required += row.evaluations_required;
            totals.evaluations_completed += row.evaluations_completed;
            if row.complete {
                totals.fully_scored += 1;
            }
            if row.eligible_judges.is_empty() {
                totals.unassigned += 1;
            }
            row
        })
        .collect();

    (rows, totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssignmentStatus;
    use crate::test_utils::fixtures::{accepted, hackathon, submission};
    use chrono::Utc;

    fn score_by(judge: Uuid, submission_id: Uuid) -> Score {
        Score {
            hackathon_id: Uuid::nil(),
            round_index: 0,
            submission_id,
            judge_id: judge,
            criterion_id: "impact".into(),
            value: 5.0,
            scored_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_round_lets_any_round_judge_score() {
        let h = hackathon(1);
        let s = submission(h.id, None);
        let a = accepted(h.id, Scope::Round(0));
        assert_eq!(coverage(&a, &s, 0, &h), Coverage::Open);
        assert_eq!(coverage(&a, &s, 1, &h), Coverage::None);
    }

    #[test]
    fn test_assigned_round_requires_roster() {
        let mut h = hackathon(1);
        h.rounds[0].assignment_mode = AssignmentMode::Assigned;
        let s = submission(h.id, None);

        let mut a = accepted(h.id, Scope::Round(0));
        assert_eq!(coverage(&a, &s, 0, &h), Coverage::None);

        a.add_submissions(Scope::Round(0), &[s.id]);
        assert_eq!(coverage(&a, &s, 0, &h), Coverage::Explicit);
    }

    #[test]
    fn test_declined_judge_covers_nothing() {
        let h = hackathon(1);
        let s = submission(h.id, None);
        let mut a = accepted(h.id, Scope::Round(0));
        a.add_submissions(Scope::Round(0), &[s.id]);
        a.status = AssignmentStatus::Declined;
        assert_eq!(coverage(&a, &s, 0, &h), Coverage::None);
    }

    #[test]
    fn test_team_roster_counts_within_scope() {
        let mut h = hackathon(1);
        h.rounds[0].assignment_mode = AssignmentMode::Assigned;
        let team_id = Uuid::new_v4();
        let s = submission(h.id, Some(team_id));

        let mut a = accepted(h.id, Scope::Round(0));
        a.add_teams(&[team_id]);
        assert_eq!(coverage(&a, &s, 0, &h), Coverage::Explicit);
    }

    #[test]
    fn test_declined_judges_do_not_count_as_evaluators_needed() {
        let mut h = hackathon(1);
        h.rounds[0].assignment_mode = AssignmentMode::Assigned;
        let s = submission(h.id, None);

        let mut active = accepted(h.id, Scope::Round(0));
        active.add_submissions(Scope::Round(0), &[s.id]);
        let mut gone = accepted(h.id, Scope::Round(0));
        gone.add_submissions(Scope::Round(0), &[s.id]);
        gone.status = AssignmentStatus::Declined;

        let scores = vec![score_by(active.judge_id, s.id)];
        let (rows, totals) = pool_progress(&[&s], 0, &h, &[active, gone], &scores);

        assert_eq!(rows[0].evaluations_required, 1);
        assert!(rows[0].complete);
        assert!(totals.is_complete());
        assert_eq!(totals.completion_percent(), 100.0);
    }

    #[test]
    fn test_open_submission_needs_one_score() {
        let h = hackathon(1);
        let s = submission(h.id, None);
        let a = accepted(h.id, Scope::Round(0));
        let b = accepted(h.id, Scope::Round(0));

        let (_, before) = pool_progress(&[&s], 0, &h, &[a.clone(), b.clone()], &[]);
        assert!(!before.is_complete());

        let scores = vec![score_by(b.judge_id, s.id)];
        let (_, after) = pool_progress(&[&s], 0, &h, &[a, b], &scores);
        assert!(after.is_complete());
    }

    #[test]
    fn test_unassigned_submissions_are_reported() {
        let mut h = hackathon(1);
        h.rounds[0].assignment_mode = AssignmentMode::Assigned;
        let s = submission(h.id, None);
        let (_, totals) = pool_progress(&[&s], 0, &h, &[], &[]);
        assert_eq!(totals.unassigned, 1);
        assert!(!totals.is_complete());
    }
}
