//! Round progression service
//!
//! Opens the next round once a round is shortlisted, records winners on the
//! final round and reports allocation and scoring figures to organizers.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    handlers::rounds::response::{
        AssignmentOverviewResponse, OverviewTotals, ProgressOutcome, ProgressResponse,
        ScopeOverview, WinnersResponse,
    },
    judging::{
        is_opened, phase, pool_progress, problem_statement_pool, progression_blocker,
        round_pool, validate_placements, winner_fingerprint, ScopeProgress,
    },
    middleware::AuthenticatedUser,
    models::{
        AssignmentStatus, Hackathon, JudgeAssignment, RoundProgress, Scope, Score, Submission,
        Winner, WinnerBoard,
    },
    notify::{self, EventKind, Notification},
    state::{AppState, LockKey},
};

use super::{active_round, load_managed_hackathon, previous_progress};

/// Round progression service
pub struct ProgressionService;

fn winners_view(board: &WinnerBoard) -> WinnersResponse {
    WinnersResponse {
        hackathon_id: board.hackathon_id,
        round_index: board.round_index,
        winners: board.winners.clone(),
        assigned_at: board.assigned_at,
        assigned_by: board.assigned_by,
        notified: board.notified_fingerprint.as_deref()
            == Some(winner_fingerprint(&board.winners).as_str()),
        notified_at: board.notified_at,
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}

impl ProgressionService {
    /// Open the round after `round_index` if it is ready.
    ///
    /// Repeating the call after progression reports `AlreadyProgressed`.
    pub async fn check_and_auto_progress(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
        organizer_override: bool,
    ) -> AppResult<ProgressResponse> {
        let _guard = state
            .locks()
            .acquire(LockKey::Round(hackathon_id, round_index))
            .await;
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        let round = hackathon.round(round_index)?;

        if hackathon.terminal_round_index() == Some(round_index) {
            return Err(AppError::InvalidState(format!(
                "Round {} is the final round; assign winners instead",
                round_index
            )));
        }
        let next_round = round_index + 1;

        let current = state
            .repo()
            .find_round_progress(hackathon_id, round_index)
            .await?;
        if current.as_ref().is_some_and(|p| p.next_round_eligibility) {
            return Ok(ProgressResponse {
                round_index,
                outcome: ProgressOutcome::AlreadyProgressed { next_round },
            });
        }

        let now = Utc::now();
        if let Some(reason) =
            progression_blocker(round, current.as_ref(), now, organizer_override)
        {
            return Ok(ProgressResponse {
                round_index,
                outcome: ProgressOutcome::NotReady { reason },
            });
        }

        let mut progress = current.ok_or_else(|| {
            AppError::InvalidState(format!("Round {} has not been shortlisted yet", round_index))
        })?;
        progress.next_round_eligibility = true;
        progress.progressed_at = Some(now);
        progress.updated_at = now;
        let saved = state.repo().save_round_progress(&progress).await?;

        info!(
            hackathon_id = %hackathon_id,
            round_index,
            next_round,
            overridden = organizer_override,
            eligible_participants = saved.eligible_participants.len(),
            "Round progressed"
        );

        state
            .notify(Notification::new(
                EventKind::RoundProgressed,
                hackathon_id,
                saved.eligible_participants.clone(),
                json!({ "round_index": round_index, "next_round": next_round }),
            ))
            .await;

        Ok(ProgressResponse {
            round_index,
            outcome: ProgressOutcome::Progressed { next_round },
        })
    }

    /// Record the final placements.
    ///
    /// Saving again is an update. The announcement goes out only when the
    /// winner set differs from the one last announced.
    pub async fn assign_winners(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
        placements: &[(u32, Uuid)],
    ) -> AppResult<WinnersResponse> {
        validate_placements(placements)?;

        let _guards = state
            .locks()
            .acquire_all(vec![
                LockKey::Winners(hackathon_id),
                LockKey::Round(hackathon_id, round_index),
            ])
            .await;
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        hackathon.round(round_index)?;

        if hackathon.terminal_round_index() != Some(round_index) {
            return Err(AppError::InvalidState(format!(
                "Winners can only be assigned on the final round, not round {}",
                round_index
            )));
        }
        let previous = previous_progress(state, hackathon_id, round_index).await?;
        if !is_opened(round_index, previous.as_ref()) {
            return Err(AppError::InvalidState(format!(
                "Round {} is not open yet",
                round_index
            )));
        }

        let mut winners = Vec::with_capacity(placements.len());
        for (placement, submission_id) in placements {
            let submission = state
                .repo()
                .find_submission(*submission_id)
                .await?
                .filter(|s| s.hackathon_id == hackathon_id)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Submission {} not found", submission_id))
                })?;
            if !submission.is_submitted() {
                return Err(AppError::InvalidState(format!(
                    "Submission {} has not been submitted",
                    submission_id
                )));
            }
            winners.push(Winner {
                placement: *placement,
                submission_id: submission.id,
                team_id: submission.team_id,
                submitted_by: submission.submitted_by,
            });
        }
        winners.sort_by_key(|w| w.placement);

        let existing = state.repo().find_winners(hackathon_id).await?;
        let board = WinnerBoard {
            hackathon_id,
            round_index,
            winners,
            assigned_at: Utc::now(),
            assigned_by: actor.id,
            notified_fingerprint: existing
                .as_ref()
                .and_then(|b| b.notified_fingerprint.clone()),
            notified_at: existing.as_ref().and_then(|b| b.notified_at),
            version: existing.as_ref().map_or(0, |b| b.version),
        };
        let mut saved = state.repo().save_winners(&board).await?;
        info!(
            hackathon_id = %hackathon_id,
            round_index,
            winners = saved.winners.len(),
            updated = existing.is_some(),
            "Winners assigned"
        );

        let fingerprint = winner_fingerprint(&saved.winners);
        if saved.notified_fingerprint.as_deref() != Some(fingerprint.as_str()) {
            let notification = Self::announcement(state, &hackathon, &saved).await?;
            match notify::dispatch(
                state.notifier(),
                state.config().engine.notification_timeout(),
                &notification,
            )
            .await
            {
                Ok(()) => {
                    saved.notified_fingerprint = Some(fingerprint);
                    saved.notified_at = Some(Utc::now());
                    saved = state.repo().save_winners(&saved).await?;
                }
                Err(e) => {
                    warn!(
                        hackathon_id = %hackathon_id,
                        error = %e,
                        "Winner announcement not delivered; it can be re-sent explicitly"
                    );
                }
            }
        }

        Ok(winners_view(&saved))
    }

    /// Explicitly (re-)send the winner announcement; delivery errors surface
    pub async fn send_winner_emails(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
    ) -> AppResult<WinnersResponse> {
        let _guard = state.locks().acquire(LockKey::Winners(hackathon_id)).await;
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        let mut board = Self::find_board(state, hackathon_id).await?;

        let notification = Self::announcement(state, &hackathon, &board).await?;
        notify::dispatch(
            state.notifier(),
            state.config().engine.notification_timeout(),
            &notification,
        )
        .await?;

        board.notified_fingerprint = Some(winner_fingerprint(&board.winners));
        board.notified_at = Some(Utc::now());
        let saved = state.repo().save_winners(&board).await?;
        info!(
            hackathon_id = %hackathon_id,
            recipients = notification.recipients.len(),
            "Winner announcement sent"
        );
        Ok(winners_view(&saved))
    }

    pub async fn get_winners(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
    ) -> AppResult<WinnersResponse> {
        load_managed_hackathon(state, actor, hackathon_id).await?;
        let board = Self::find_board(state, hackathon_id).await?;
        Ok(winners_view(&board))
    }

    /// Assignment counts, acceptance rates and scoring completion per round
    /// and problem statement
    pub async fn get_assignment_overview(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
    ) -> AppResult<AssignmentOverviewResponse> {
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        let assignments = state.repo().list_assignments(hackathon_id).await?;
        let submissions = state.repo().list_submissions(hackathon_id).await?;
        let progress = state.repo().list_round_progress(hackathon_id).await?;

        let mut scores: HashMap<i32, Vec<Score>> = HashMap::new();
        for round in &hackathon.rounds {
            scores.insert(
                round.index,
                state.repo().list_scores(hackathon_id, round.index).await?,
            );
        }

        let ctx = OverviewContext {
            hackathon: &hackathon,
            assignments: &assignments,
            submissions: &submissions,
            progress: &progress,
            scores: &scores,
        };

        let rounds: Vec<ScopeOverview> = hackathon
            .rounds
            .iter()
            .map(|r| ctx.round_overview(r.index, r.name.clone()))
            .collect();
        let active = active_round(&hackathon, &progress);
        let problem_statements: Vec<ScopeOverview> = hackathon
            .problem_statements
            .iter()
            .map(|p| ctx.problem_statement_overview(p.index, p.statement.clone(), active))
            .collect();

        let count = |status: AssignmentStatus| {
            assignments.iter().filter(|a| a.status == status).count()
        };
        let evaluations_required = rounds.iter().map(|r| r.evaluations_required).sum();
        let evaluations_completed = rounds.iter().map(|r| r.evaluations_completed).sum();
        let totals = OverviewTotals {
            assignments: assignments.len(),
            invited: count(AssignmentStatus::Invited),
            accepted: count(AssignmentStatus::Accepted),
            declined: count(AssignmentStatus::Declined),
            acceptance_rate: percent(count(AssignmentStatus::Accepted), assignments.len()),
            evaluations_required,
            evaluations_completed,
            completion_percent: percent(evaluations_completed, evaluations_required),
        };

        Ok(AssignmentOverviewResponse {
            hackathon_id,
            rounds,
            problem_statements,
            totals,
        })
    }

    async fn find_board(state: &AppState, hackathon_id: Uuid) -> AppResult<WinnerBoard> {
        state
            .repo()
            .find_winners(hackathon_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No winners assigned yet".to_string()))
    }

    /// Winner announcement addressed to submitters and their team members
    async fn announcement(
        state: &AppState,
        hackathon: &Hackathon,
        board: &WinnerBoard,
    ) -> AppResult<Notification> {
        let teams = state.repo().list_teams(hackathon.id).await?;
        let mut recipients = BTreeSet::new();
        for winner in &board.winners {
            recipients.insert(winner.submitted_by);
            if let Some(team) = winner
                .team_id
                .and_then(|t| teams.iter().find(|team| team.id == t))
            {
                recipients.extend(team.members.iter().copied());
                recipients.insert(team.leader_id);
            }
        }

        Ok(Notification::new(
            EventKind::WinnersAnnounced,
            hackathon.id,
            recipients.into_iter().collect(),
            json!({
                "hackathon_title": hackathon.title,
                "round_index": board.round_index,
                "winners": board.winners,
            }),
        ))
    }
}

struct OverviewContext<'a> {
    hackathon: &'a Hackathon,
    assignments: &'a [JudgeAssignment],
    submissions: &'a [Submission],
    progress: &'a [RoundProgress],
    scores: &'a HashMap<i32, Vec<Score>>,
}

impl OverviewContext<'_> {
    fn find(&self, round_index: i32) -> Option<&RoundProgress> {
        self.progress.iter().find(|p| p.round_index == round_index)
    }

    fn previous(&self, round_index: i32) -> Option<&RoundProgress> {
        if round_index == 0 {
            None
        } else {
            self.find(round_index - 1)
        }
    }

    fn round_scores(&self, round_index: i32) -> &[Score] {
        self.scores.get(&round_index).map(Vec::as_slice).unwrap_or(&[])
    }

    fn scope_overview(
        &self,
        scope: Scope,
        name: String,
        pool_size: usize,
        scoring: Option<(i32, ScopeProgress)>,
    ) -> ScopeOverview {
        let judges: Vec<&JudgeAssignment> = self
            .assignments
            .iter()
            .filter(|a| a.has_scope(scope))
            .collect();
        let count = |status: AssignmentStatus| judges.iter().filter(|a| a.status == status).count();
        let accepted = count(AssignmentStatus::Accepted);

        let (round_phase, progress) = match scoring {
            Some((round_index, progress)) => (
                Some(phase(
                    round_index,
                    self.previous(round_index),
                    self.find(round_index),
                    &progress,
                )),
                progress,
            ),
            None => (None, ScopeProgress::default()),
        };

        ScopeOverview {
            scope,
            name,
            mode: self.hackathon.assignment_mode(scope).unwrap_or_default(),
            phase: round_phase,
            judges_invited: count(AssignmentStatus::Invited),
            judges_accepted: accepted,
            judges_declined: count(AssignmentStatus::Declined),
            acceptance_rate: percent(accepted, judges.len()),
            pool_size,
            evaluations_required: progress.evaluations_required,
            evaluations_completed: progress.evaluations_completed,
            completion_percent: progress.completion_percent(),
        }
    }

    fn round_overview(&self, round_index: i32, name: String) -> ScopeOverview {
        let pool = round_pool(round_index, self.submissions, self.previous(round_index));
        let (_, progress) = pool_progress(
            &pool,
            round_index,
            self.hackathon,
            self.assignments,
            self.round_scores(round_index),
        );
        self.scope_overview(
            Scope::Round(round_index),
            name,
            pool.len(),
            Some((round_index, progress)),
        )
    }

    /// Scoring figures come from the round the statement is currently
    /// scored in
    fn problem_statement_overview(
        &self,
        ps_index: i32,
        name: String,
        active: Option<i32>,
    ) -> ScopeOverview {
        let pool_size = problem_statement_pool(ps_index, self.submissions).len();
        let scoring = active.map(|round_index| {
            let pool: Vec<&Submission> =
                round_pool(round_index, self.submissions, self.previous(round_index))
                    .into_iter()
                    .filter(|s| s.problem_statement_index == Some(ps_index))
                    .collect();
            let (_, progress) = pool_progress(
                &pool,
                round_index,
                self.hackathon,
                self.assignments,
                self.round_scores(round_index),
            );
            (round_index, progress)
        });
        self.scope_overview(Scope::ProblemStatement(ps_index), name, pool_size, scoring)
    }
}
