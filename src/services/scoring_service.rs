//! Scoring service
//!
//! Judges record one live score set per submission and round; organizers
//! read the weighted leaderboard and per-round coverage.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    handlers::scoring::response::{
        JudgingCriteriaResponse, LeaderboardResponse, RoundStatusResponse, ScoreResponse,
    },
    judging::{
        aggregate, coverage, is_opened, phase, pool_progress, rank, round_pool, weighted_score,
    },
    middleware::AuthenticatedUser,
    models::{Hackathon, JudgingCriteria, RoundProgress, Score, Submission},
    notify::{EventKind, Notification},
    state::{AppState, LockKey},
};

use super::{load_hackathon, load_managed_hackathon, previous_progress};

/// Scoring service
pub struct ScoringService;

/// Check a judge's values against the round's criteria
fn validate_values(criteria: &JudgingCriteria, values: &BTreeMap<String, f64>) -> AppResult<()> {
    if let Some(unknown) = values.keys().find(|id| criteria.find(id).is_none()) {
        return Err(AppError::Validation(format!(
            "Unknown criterion '{}'",
            unknown
        )));
    }

    for criterion in criteria.iter() {
        let value = values.get(&criterion.id).ok_or_else(|| {
            AppError::Validation(format!("Missing score for criterion '{}'", criterion.id))
        })?;
        if !value.is_finite() || *value < 0.0 || *value > criterion.max_score {
            return Err(AppError::Validation(format!(
                "Score for '{}' must be between 0 and {}",
                criterion.id, criterion.max_score
            )));
        }
    }
    Ok(())
}

/// Submissions, previous and current progress of one round
struct RoundContext {
    submissions: Vec<Submission>,
    previous: Option<RoundProgress>,
    current: Option<RoundProgress>,
}

impl RoundContext {
    async fn load(state: &AppState, hackathon_id: Uuid, round_index: i32) -> AppResult<Self> {
        Ok(Self {
            submissions: state.repo().list_submissions(hackathon_id).await?,
            previous: previous_progress(state, hackathon_id, round_index).await?,
            current: state
                .repo()
                .find_round_progress(hackathon_id, round_index)
                .await?,
        })
    }

    fn pool(&self, round_index: i32) -> Vec<&Submission> {
        round_pool(round_index, &self.submissions, self.previous.as_ref())
    }
}

impl ScoringService {
    /// Record (or overwrite) the caller's scores for a submission in a round
    pub async fn score_submission(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
        submission_id: Uuid,
        values: &BTreeMap<String, f64>,
    ) -> AppResult<ScoreResponse> {
        actor.ensure_judge()?;

        // Criteria, modes and rosters are read under the same locks their
        // writers take.
        let problem_statement = Self::find_submission(state, hackathon_id, submission_id)
            .await?
            .problem_statement_index;
        let mut keys = vec![
            LockKey::Round(hackathon_id, round_index),
            LockKey::Submission(submission_id),
            LockKey::Assignments(hackathon_id),
        ];
        if let Some(index) = problem_statement {
            keys.push(LockKey::ProblemStatement(hackathon_id, index));
        }
        let _guards = state.locks().acquire_all(keys).await;

        let hackathon = load_hackathon(state, hackathon_id).await?;
        let criteria = &hackathon.round(round_index)?.judging_criteria;
        if criteria.is_empty() {
            return Err(AppError::InvalidState(format!(
                "Round {} has no judging criteria yet",
                round_index
            )));
        }
        validate_values(criteria, values)?;

        let submission = Self::find_submission(state, hackathon_id, submission_id).await?;
        if !submission.is_submitted() {
            return Err(AppError::InvalidState(
                "Submission has not been submitted".to_string(),
            ));
        }

        let ctx = RoundContext::load(state, hackathon_id, round_index).await?;
        if !is_opened(round_index, ctx.previous.as_ref()) {
            return Err(AppError::InvalidState(format!(
                "Round {} is not open yet",
                round_index
            )));
        }
        if ctx.current.as_ref().is_some_and(|p| p.round_completed) {
            return Err(AppError::InvalidState(format!(
                "Round {} is already shortlisted",
                round_index
            )));
        }
        if !ctx.pool(round_index).iter().any(|s| s.id == submission_id) {
            return Err(AppError::InvalidState(format!(
                "Submission is not evaluable in round {}",
                round_index
            )));
        }

        let covered = state
            .repo()
            .list_assignments_for_judge(actor.id)
            .await?
            .iter()
            .filter(|a| a.hackathon_id == hackathon_id)
            .any(|a| coverage(a, &submission, round_index, &hackathon).allows_scoring());
        if !covered {
            return Err(AppError::Forbidden(format!(
                "No accepted assignment covers this submission in round {}",
                round_index
            )));
        }

        let now = Utc::now();
        let scores: Vec<Score> = criteria
            .iter()
            .filter_map(|c| {
                values.get(&c.id).map(|value| Score {
                    hackathon_id,
                    round_index,
                    submission_id,
                    judge_id: actor.id,
                    criterion_id: c.id.clone(),
                    value: *value,
                    scored_at: now,
                })
            })
            .collect();

        state
            .repo()
            .replace_scores(hackathon_id, round_index, submission_id, actor.id, &scores)
            .await?;

        let weighted = weighted_score(&scores, criteria);
        info!(
            hackathon_id = %hackathon_id,
            round_index,
            submission_id = %submission_id,
            judge_id = %actor.id,
            weighted_score = ?weighted,
            "Score recorded"
        );

        state
            .notify(Notification::new(
                EventKind::ScoreRecorded,
                hackathon_id,
                vec![hackathon.organizer_id],
                json!({
                    "round_index": round_index,
                    "submission_id": submission_id,
                    "judge_id": actor.id,
                }),
            ))
            .await;

        Ok(ScoreResponse {
            submission_id,
            round_index,
            judge_id: actor.id,
            scores,
            weighted_score: weighted,
        })
    }

    async fn find_submission(
        state: &AppState,
        hackathon_id: Uuid,
        submission_id: Uuid,
    ) -> AppResult<Submission> {
        state
            .repo()
            .find_submission(submission_id)
            .await?
            .filter(|s| s.hackathon_id == hackathon_id)
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))
    }

    /// Pool of a round ranked by aggregated weighted score, unscored last
    pub async fn get_leaderboard(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<LeaderboardResponse> {
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        let criteria = &hackathon.round(round_index)?.judging_criteria;

        let ctx = RoundContext::load(state, hackathon_id, round_index).await?;
        let pool = ctx.pool(round_index);
        let scores = state.repo().list_scores(hackathon_id, round_index).await?;
        let entries = rank(&pool, &aggregate(&scores, criteria));
        let round_phase = Self::round_phase(state, &hackathon, round_index, &ctx, &scores).await?;

        Ok(LeaderboardResponse {
            round_index,
            phase: round_phase,
            max_weighted_score: criteria.max_weighted_score(),
            scored: entries.iter().filter(|e| e.average_score.is_some()).count(),
            total: entries.len(),
            entries,
        })
    }

    /// Criteria of a round
    pub async fn get_judging_criteria(
        state: &AppState,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<JudgingCriteriaResponse> {
        let hackathon = load_hackathon(state, hackathon_id).await?;
        let criteria = hackathon.round(round_index)?.judging_criteria.clone();
        Ok(JudgingCriteriaResponse {
            round_index,
            max_weighted_score: criteria.max_weighted_score(),
            judging_criteria: criteria,
        })
    }

    /// Replace a round's criteria while nobody has scored it yet
    pub async fn update_judging_criteria(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
        criteria: JudgingCriteria,
    ) -> AppResult<JudgingCriteriaResponse> {
        criteria.validate()?;

        let _guard = state
            .locks()
            .acquire(LockKey::Round(hackathon_id, round_index))
            .await;
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        let mut round = hackathon.round(round_index)?.clone();

        if state.repo().count_scores(hackathon_id, round_index).await? > 0 {
            return Err(AppError::InvalidState(format!(
                "Round {} already has scores; its criteria are frozen",
                round_index
            )));
        }

        round.judging_criteria = criteria;
        state.repo().update_round(hackathon_id, &round).await?;
        info!(
            hackathon_id = %hackathon_id,
            round_index,
            criteria = round.judging_criteria.iter().count(),
            "Judging criteria updated"
        );

        Ok(JudgingCriteriaResponse {
            round_index,
            max_weighted_score: round.judging_criteria.max_weighted_score(),
            judging_criteria: round.judging_criteria,
        })
    }

    /// Required and completed evaluations per pool submission
    pub async fn round_submissions_status(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<RoundStatusResponse> {
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        hackathon.round(round_index)?;

        let ctx = RoundContext::load(state, hackathon_id, round_index).await?;
        let pool = ctx.pool(round_index);
        let assignments = state.repo().list_assignments(hackathon_id).await?;
        let scores = state.repo().list_scores(hackathon_id, round_index).await?;
        let (submissions, progress) =
            pool_progress(&pool, round_index, &hackathon, &assignments, &scores);

        Ok(RoundStatusResponse {
            round_index,
            phase: phase(
                round_index,
                ctx.previous.as_ref(),
                ctx.current.as_ref(),
                &progress,
            ),
            completion_percent: progress.completion_percent(),
            progress,
            submissions,
        })
    }

    async fn round_phase(
        state: &AppState,
        hackathon: &Hackathon,
        round_index: i32,
        ctx: &RoundContext,
        scores: &[Score],
    ) -> AppResult<crate::judging::RoundPhase> {
        let assignments = state.repo().list_assignments(hackathon.id).await?;
        let pool = ctx.pool(round_index);
        let (_, progress) = pool_progress(&pool, round_index, hackathon, &assignments, scores);
        Ok(phase(
            round_index,
            ctx.previous.as_ref(),
            ctx.current.as_ref(),
            &progress,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::roles,
        db::EngineRepository,
        handlers::assignments::request::AssignmentResponse,
        models::{Criterion, Scope},
        services::AllocationService,
        test_utils::fixtures::{
            caller, hackathon, judge, organizer_of, seed_accepted_judges, submission, test_state,
        },
    };

    fn values(impact: f64, demo: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([("impact".to_string(), impact), ("demo".to_string(), demo)])
    }

    #[tokio::test]
    async fn test_rescoring_overwrites() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let s = submission(h.id, None);
        repo.insert_submission(s.clone()).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        let me = judge(judges[0].judge_id);

        ScoringService::score_submission(&state, &me, h.id, 0, s.id, &values(4.0, 1.0))
            .await
            .unwrap();
        let second = ScoringService::score_submission(
            &state,
            &me,
            h.id,
            0,
            s.id,
            &values(10.0, 7.0),
        )
        .await
        .unwrap();

        let stored = repo.list_scores(h.id, 0).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|sc| sc.value >= 7.0));
        // (10·2 + 7·1) / 3
        assert!((second.weighted_score.unwrap() - 9.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_values_must_be_within_bounds_and_complete() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let s = submission(h.id, None);
        repo.insert_submission(s.clone()).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        let me = judge(judges[0].judge_id);

        for bad in [
            values(11.0, 1.0),
            values(-1.0, 1.0),
            values(f64::NAN, 1.0),
            BTreeMap::from([("impact".to_string(), 5.0)]),
            BTreeMap::from([
                ("impact".to_string(), 5.0),
                ("demo".to_string(), 5.0),
                ("style".to_string(), 5.0),
            ]),
        ] {
            let err = ScoringService::score_submission(&state, &me, h.id, 0, s.id, &bad)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{:?}", bad);
        }
        assert_eq!(repo.count_scores(h.id, 0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_declined_judge_cannot_score() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let s = submission(h.id, None);
        repo.insert_submission(s.clone()).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        let me = judge(judges[0].judge_id);

        AllocationService::respond_to_assignment(
            &state,
            &me,
            judges[0].id,
            AssignmentResponse::Declined,
        )
        .await
        .unwrap();

        let err = ScoringService::score_submission(&state, &me, h.id, 0, s.id, &values(5.0, 5.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_locked_round_rejects_scores() {
        let (state, repo) = test_state();
        let h = hackathon(2);
        repo.insert_hackathon(h.clone()).await;
        let mut s = submission(h.id, None);
        s.round_index = 1;
        repo.insert_submission(s.clone()).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(1), 1).await;

        let err = ScoringService::score_submission(
            &state,
            &judge(judges[0].judge_id),
            h.id,
            1,
            s.id,
            &values(5.0, 5.0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_only_judges_score() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let participant = caller(Uuid::new_v4(), roles::PARTICIPANT);
        let err = ScoringService::score_submission(
            &state,
            &participant,
            h.id,
            0,
            Uuid::new_v4(),
            &values(1.0, 1.0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_leaderboard_ranks_unscored_last() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let subs: Vec<_> = (0..3).map(|_| submission(h.id, None)).collect();
        for s in &subs {
            repo.insert_submission(s.clone()).await;
        }
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 2).await;

        let (a, b) = (judge(judges[0].judge_id), judge(judges[1].judge_id));
        ScoringService::score_submission(&state, &a, h.id, 0, subs[0].id, &values(6.0, 6.0))
            .await
            .unwrap();
        ScoringService::score_submission(&state, &b, h.id, 0, subs[0].id, &values(8.0, 8.0))
            .await
            .unwrap();
        ScoringService::score_submission(&state, &a, h.id, 0, subs[1].id, &values(9.0, 9.0))
            .await
            .unwrap();

        let board = ScoringService::get_leaderboard(&state, &organizer_of(&h), h.id, 0)
            .await
            .unwrap();
        let order: Vec<Uuid> = board.entries.iter().map(|e| e.submission_id).collect();
        assert_eq!(order, vec![subs[1].id, subs[0].id, subs[2].id]);
        assert_eq!(board.entries[1].average_score, Some(7.0));
        assert_eq!(board.entries[1].judge_count, 2);
        assert_eq!(board.entries[2].average_score, None);
        assert_eq!(board.scored, 2);
    }

    #[tokio::test]
    async fn test_criteria_frozen_once_scored() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let s = submission(h.id, None);
        repo.insert_submission(s.clone()).await;
        let organizer = organizer_of(&h);

        let mut criteria = h.rounds[0].judging_criteria.clone();
        criteria.project[0].max_score = 5.0;
        let updated =
            ScoringService::update_judging_criteria(&state, &organizer, h.id, 0, criteria.clone())
                .await
                .unwrap();
        assert_eq!(updated.judging_criteria.project[0].max_score, 5.0);

        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        ScoringService::score_submission(
            &state,
            &judge(judges[0].judge_id),
            h.id,
            0,
            s.id,
            &values(5.0, 5.0),
        )
        .await
        .unwrap();

        let err = ScoringService::update_judging_criteria(&state, &organizer, h.id, 0, criteria)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_scores_validated_against_criteria_current_under_lock() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let s = submission(h.id, None);
        repo.insert_submission(s.clone()).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        let me = judge(judges[0].judge_id);

        // Hold the round like a criteria update in flight
        let guard = state.locks().acquire(LockKey::Round(h.id, 0)).await;
        let pending = {
            let state = state.clone();
            let (hackathon_id, submission_id) = (h.id, s.id);
            tokio::spawn(async move {
                ScoringService::score_submission(
                    &state,
                    &me,
                    hackathon_id,
                    0,
                    submission_id,
                    &values(4.0, 1.0),
                )
                .await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        let mut round = h.rounds[0].clone();
        round.judging_criteria = JudgingCriteria {
            project: vec![Criterion {
                id: "novelty".to_string(),
                name: "Novelty".to_string(),
                description: None,
                max_score: 10.0,
                weight: 1.0,
            }],
            presentation: Vec::new(),
        };
        repo.update_round(h.id, &round).await.unwrap();
        drop(guard);

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(repo.count_scores(h.id, 0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_round_status_excludes_declined_judges() {
        let (state, repo) = test_state();
        let mut h = hackathon(1);
        h.rounds[0].assignment_mode = crate::models::AssignmentMode::Assigned;
        repo.insert_hackathon(h.clone()).await;
        for _ in 0..4 {
            repo.insert_submission(submission(h.id, None)).await;
        }
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 2).await;
        let organizer = organizer_of(&h);
        AllocationService::auto_distribute(&state, &organizer, h.id, Scope::Round(0))
            .await
            .unwrap();

        let status = ScoringService::round_submissions_status(&state, &organizer, h.id, 0)
            .await
            .unwrap();
        assert_eq!(status.progress.evaluations_required, 4);
        assert_eq!(status.progress.unassigned, 0);

        AllocationService::respond_to_assignment(
            &state,
            &judge(judges[0].judge_id),
            judges[0].id,
            AssignmentResponse::Declined,
        )
        .await
        .unwrap();

        let status = ScoringService::round_submissions_status(&state, &organizer, h.id, 0)
            .await
            .unwrap();
        assert_eq!(status.progress.unassigned, 2);
    }
}
