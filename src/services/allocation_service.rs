//! Judge allocation service
//!
//! Assignment modes, invitations, manual rosters and auto-distribution.
//! Every write to a hackathon's assignments happens under its
//! `LockKey::Assignments` lock and through a version-checked save.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    constants::roles,
    error::{AppError, AppResult},
    handlers::assignments::{
        request::{AssignmentResponse, RemoveFromJudgeRequest},
        response::{
            AssignJudgesResponse, AssignmentModeResponse, AssignmentsListResponse,
            DistributionResponse, JudgeLoad, JudgeTask, MyAssignment, MyAssignmentsResponse,
            ScopeTasks,
        },
    },
    judging::{coverage, is_opened, rebalance, round_pool, scope_pool},
    middleware::AuthenticatedUser,
    models::{AssignmentMode, AssignmentStatus, Hackathon, JudgeAssignment, Scope, Score},
    notify::{EventKind, Notification},
    state::{AppState, EntityGuard, LockKey},
};

use super::{active_round, load_hackathon, load_managed_hackathon, previous_progress};

/// Judge allocation service
pub struct AllocationService;

fn scope_lock(hackathon_id: Uuid, scope: Scope) -> LockKey {
    match scope {
        Scope::Round(index) => LockKey::Round(hackathon_id, index),
        Scope::ProblemStatement(index) => LockKey::ProblemStatement(hackathon_id, index),
    }
}

fn ensure_not_declined(assignment: &JudgeAssignment) -> AppResult<()> {
    if assignment.status == AssignmentStatus::Declined {
        return Err(AppError::InvalidState(
            "Judge declined this assignment; re-invite them first".to_string(),
        ));
    }
    Ok(())
}

impl AllocationService {
    /// Get the assignment mode of a round or problem statement
    pub async fn get_assignment_mode(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        scope: Scope,
    ) -> AppResult<AssignmentModeResponse> {
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        let mode = hackathon.assignment_mode(scope)?;
        Ok(AssignmentModeResponse { scope, mode })
    }

    /// Switch a scope between open and assigned judging.
    ///
    /// Refused once scoring has started in the scope.
    pub async fn set_assignment_mode(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        scope: Scope,
        mode: AssignmentMode,
    ) -> AppResult<AssignmentModeResponse> {
        let _guard = state.locks().acquire(scope_lock(hackathon_id, scope)).await;
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;

        if hackathon.assignment_mode(scope)? == mode {
            return Ok(AssignmentModeResponse { scope, mode });
        }

        match scope {
            Scope::Round(index) => {
                let progress = state.repo().find_round_progress(hackathon_id, index).await?;
                if progress.is_some_and(|p| p.round_completed) {
                    return Err(AppError::InvalidState(format!(
                        "Round {} is already shortlisted",
                        index
                    )));
                }
                if state.repo().count_scores(hackathon_id, index).await? > 0 {
                    return Err(AppError::InvalidState(format!(
                        "Round {} already has scores; its mode can no longer change",
                        index
                    )));
                }

                let mut round = hackathon.round(index)?.clone();
                round.assignment_mode = mode;
                state.repo().update_round(hackathon_id, &round).await?;
            }
            Scope::ProblemStatement(index) => {
                let targeted: HashSet<Uuid> = state
                    .repo()
                    .list_submissions(hackathon_id)
                    .await?
                    .into_iter()
                    .filter(|s| s.problem_statement_index == Some(index))
                    .map(|s| s.id)
                    .collect();

                for round in &hackathon.rounds {
                    let scores = state.repo().list_scores(hackathon_id, round.index).await?;
                    if scores.iter().any(|s| targeted.contains(&s.submission_id)) {
                        return Err(AppError::InvalidState(format!(
                            "Problem statement {} already has scores; its mode can no longer change",
                            index
                        )));
                    }
                }

                let mut problem_statement = hackathon.problem_statement(index)?.clone();
                problem_statement.assignment_mode = mode;
                state
                    .repo()
                    .update_problem_statement(hackathon_id, &problem_statement)
                    .await?;
            }
        }

        info!(hackathon_id = %hackathon_id, %scope, %mode, "Assignment mode changed");
        Ok(AssignmentModeResponse { scope, mode })
    }

    /// Invite judges to a scope.
    ///
    /// Judges without an assignment get a fresh `invited` one; judges with an
    /// assignment get the scope appended. A judge that declined earlier is
    /// re-invited when a new scope is added. Nothing is duplicated.
    pub async fn assign_judges(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        scope: Scope,
        judge_ids: &[Uuid],
    ) -> AppResult<AssignJudgesResponse> {
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        hackathon.ensure_scope(scope)?;

        let judge_ids: BTreeSet<Uuid> = judge_ids.iter().copied().collect();
        let mut emails = HashMap::new();
        for judge_id in &judge_ids {
            let user = state
                .repo()
                .find_user(*judge_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Judge {} not found", judge_id)))?;
            if user.role != roles::JUDGE {
                return Err(AppError::Validation(format!(
                    "User {} is not a judge",
                    judge_id
                )));
            }
            emails.insert(user.id, user.email);
        }

        let _guard = state
            .locks()
            .acquire(LockKey::Assignments(hackathon_id))
            .await;

        let existing: HashMap<Uuid, JudgeAssignment> = state
            .repo()
            .list_assignments(hackathon_id)
            .await?
            .into_iter()
            .map(|a| (a.judge_id, a))
            .collect();

        let mut created = Vec::new();
        let mut extended = Vec::new();
        let mut unchanged = Vec::new();

        for judge_id in &judge_ids {
            match existing.get(judge_id) {
                Some(assignment) if assignment.has_scope(scope) => unchanged.push(*judge_id),
                Some(assignment) => {
                    let mut assignment = assignment.clone();
                    assignment.add_scope(scope);
                    if assignment.status == AssignmentStatus::Declined {
                        assignment.status = AssignmentStatus::Invited;
                        assignment.responded_at = None;
                    }
                    extended.push(assignment);
                }
                None => {
                    let mut assignment = JudgeAssignment::invite(hackathon_id, *judge_id, scope);
                    assignment.judge_email = emails.get(judge_id).cloned();
                    created.push(assignment);
                }
            }
        }

        for assignment in &created {
            state.repo().insert_assignment(assignment).await?;
        }
        if !extended.is_empty() {
            state.repo().save_assignments(&extended).await?;
        }

        let invited: Vec<Uuid> = created
            .iter()
            .chain(extended.iter())
            .map(|a| a.judge_id)
            .collect();

        let assignments: Vec<JudgeAssignment> = state
            .repo()
            .list_assignments(hackathon_id)
            .await?
            .into_iter()
            .filter(|a| judge_ids.contains(&a.judge_id))
            .collect();

        info!(
            hackathon_id = %hackathon_id,
            %scope,
            created = created.len(),
            extended = extended.len(),
            unchanged = unchanged.len(),
            "Judges assigned"
        );

        state
            .notify(Notification::new(
                EventKind::JudgeInvited,
                hackathon_id,
                invited.clone(),
                json!({ "hackathon_title": hackathon.title, "scope": scope }),
            ))
            .await;

        Ok(AssignJudgesResponse {
            scope,
            invited,
            unchanged,
            assignments,
        })
    }

    /// Accept or decline an invitation (the invited judge only).
    ///
    /// Declining clears the judge's rosters; scores already recorded stay.
    pub async fn respond_to_assignment(
        state: &AppState,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
        response: AssignmentResponse,
    ) -> AppResult<JudgeAssignment> {
        let assignment = Self::find_assignment(state, assignment_id).await?;
        if assignment.judge_id != actor.id {
            return Err(AppError::Forbidden(
                "Only the invited judge can respond to this assignment".to_string(),
            ));
        }

        let _guard = state
            .locks()
            .acquire(LockKey::Assignments(assignment.hackathon_id))
            .await;
        let mut assignment = Self::find_assignment(state, assignment_id).await?;

        let status = match response {
            AssignmentResponse::Accepted => AssignmentStatus::Accepted,
            AssignmentResponse::Declined => AssignmentStatus::Declined,
        };
        if assignment.status == status {
            return Ok(assignment);
        }

        assignment.status = status;
        assignment.responded_at = Some(Utc::now());
        if status == AssignmentStatus::Declined {
            assignment.assigned_submissions.clear();
            assignment.assigned_teams.clear();
        }

        let saved = Self::save_one(state, assignment).await?;
        info!(
            assignment_id = %saved.id,
            judge_id = %saved.judge_id,
            status = %saved.status,
            "Judge responded to assignment"
        );

        let hackathon = load_hackathon(state, saved.hackathon_id).await?;
        state
            .notify(Notification::new(
                EventKind::AssignmentResponded,
                saved.hackathon_id,
                vec![hackathon.organizer_id],
                json!({ "judge_id": saved.judge_id, "status": saved.status }),
            ))
            .await;

        Ok(saved)
    }

    /// Balance the scope's pool over its accepted judges.
    ///
    /// Accepted judges keep what they hold, scored work first, as far as the
    /// balance allows; only orphaned or surplus submissions move. A rerun
    /// without changes rewrites nothing. Judges of the scope that are not
    /// accepted lose their share of it. The batch is stored all-or-nothing.
    pub async fn auto_distribute(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        scope: Scope,
    ) -> AppResult<DistributionResponse> {
        let _guards = state
            .locks()
            .acquire_all(vec![
                scope_lock(hackathon_id, scope),
                LockKey::Assignments(hackathon_id),
            ])
            .await;
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;

        if hackathon.assignment_mode(scope)? != AssignmentMode::Assigned {
            return Err(AppError::InvalidState(format!(
                "Auto-distribution needs {} to be in assigned mode",
                scope
            )));
        }

        let previous = match scope {
            Scope::Round(index) => {
                let previous = previous_progress(state, hackathon_id, index).await?;
                if !is_opened(index, previous.as_ref()) {
                    return Err(AppError::InvalidState(format!(
                        "Round {} is not open yet",
                        index
                    )));
                }
                let current = state.repo().find_round_progress(hackathon_id, index).await?;
                if current.is_some_and(|p| p.round_completed) {
                    return Err(AppError::InvalidState(format!(
                        "Round {} is already shortlisted",
                        index
                    )));
                }
                previous
            }
            Scope::ProblemStatement(_) => None,
        };

        let submissions = state.repo().list_submissions(hackathon_id).await?;
        let pool: Vec<Uuid> = scope_pool(scope, &submissions, previous.as_ref())
            .iter()
            .map(|s| s.id)
            .collect();
        if pool.is_empty() {
            return Err(AppError::InvalidState(format!(
                "No evaluable submissions in {}",
                scope
            )));
        }

        let assignments: Vec<JudgeAssignment> = state
            .repo()
            .list_assignments(hackathon_id)
            .await?
            .into_iter()
            .filter(|a| a.has_scope(scope))
            .collect();
        let holdings: BTreeMap<Uuid, Vec<Uuid>> = assignments
            .iter()
            .filter(|a| a.is_accepted())
            .map(|a| (a.judge_id, a.submissions_in(scope)))
            .collect();

        let round_index = match scope {
            Scope::Round(index) => Some(index),
            Scope::ProblemStatement(_) => {
                let progress = state.repo().list_round_progress(hackathon_id).await?;
                active_round(&hackathon, &progress)
            }
        };
        let mut scored: BTreeMap<Uuid, BTreeSet<Uuid>> = BTreeMap::new();
        if let Some(round_index) = round_index {
            for score in state.repo().list_scores(hackathon_id, round_index).await? {
                scored
                    .entry(score.judge_id)
                    .or_default()
                    .insert(score.submission_id);
            }
        }

        let partition = rebalance(&pool, &holdings, &scored).map_err(|_| {
            AppError::NoAvailableEvaluators(format!("No accepted judges for {}", scope))
        })?;

        let mut changed = Vec::new();
        for mut assignment in assignments {
            let target = partition
                .get(&assignment.judge_id)
                .cloned()
                .unwrap_or_default();
            let mut current = assignment.submissions_in(scope);
            current.sort_unstable();
            if current != target {
                assignment.replace_submissions(scope, &target);
                changed.push(assignment);
            }
        }

        let saved = if changed.is_empty() {
            Vec::new()
        } else {
            state.repo().save_assignments(&changed).await?
        };

        info!(
            hackathon_id = %hackathon_id,
            %scope,
            pool = pool.len(),
            judges = partition.len(),
            updated = saved.len(),
            "Submissions auto-distributed"
        );

        state
            .notify(Notification::new(
                EventKind::SubmissionsAssigned,
                hackathon_id,
                saved
                    .iter()
                    .filter(|a| a.is_accepted())
                    .map(|a| a.judge_id)
                    .collect(),
                json!({ "scope": scope }),
            ))
            .await;

        Ok(DistributionResponse {
            scope,
            pool_size: pool.len(),
            judges: partition
                .iter()
                .map(|(judge_id, bucket)| JudgeLoad {
                    judge_id: *judge_id,
                    submission_count: bucket.len(),
                })
                .collect(),
            updated_assignments: saved.len(),
        })
    }

    /// Add teams to a judge's roster
    pub async fn assign_teams_to_judge(
        state: &AppState,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
        team_ids: &[Uuid],
    ) -> AppResult<JudgeAssignment> {
        let (hackathon, _guard, mut assignment) =
            Self::lock_assignment(state, actor, assignment_id).await?;
        ensure_not_declined(&assignment)?;

        let teams: HashSet<Uuid> = state
            .repo()
            .list_teams(hackathon.id)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        if let Some(unknown) = team_ids.iter().find(|t| !teams.contains(t)) {
            return Err(AppError::NotFound(format!(
                "Team {} not found in this hackathon",
                unknown
            )));
        }

        if assignment.add_teams(team_ids) == 0 {
            return Ok(assignment);
        }
        Self::save_one(state, assignment).await
    }

    /// Add rounds to a judge's scope
    pub async fn assign_rounds_to_judge(
        state: &AppState,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
        round_indices: &[i32],
    ) -> AppResult<JudgeAssignment> {
        let scopes: Vec<Scope> = round_indices.iter().map(|i| Scope::Round(*i)).collect();
        Self::add_scopes(state, actor, assignment_id, &scopes).await
    }

    /// Add problem statements to a judge's scope
    pub async fn assign_problem_statements_to_judge(
        state: &AppState,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
        problem_statement_indices: &[i32],
    ) -> AppResult<JudgeAssignment> {
        let scopes: Vec<Scope> = problem_statement_indices
            .iter()
            .map(|i| Scope::ProblemStatement(*i))
            .collect();
        Self::add_scopes(state, actor, assignment_id, &scopes).await
    }

    /// Hand specific submissions to a judge within a scope.
    ///
    /// The scope is added to the assignment when missing.
    pub async fn assign_submissions_to_judge(
        state: &AppState,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
        scope: Scope,
        submission_ids: &[Uuid],
    ) -> AppResult<JudgeAssignment> {
        let (hackathon, _guard, mut assignment) =
            Self::lock_assignment(state, actor, assignment_id).await?;
        ensure_not_declined(&assignment)?;
        hackathon.ensure_scope(scope)?;

        for submission_id in submission_ids {
            let submission = state
                .repo()
                .find_submission(*submission_id)
                .await?
                .filter(|s| s.hackathon_id == hackathon.id)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Submission {} not found", submission_id))
                })?;
            if !submission.is_submitted() {
                return Err(AppError::InvalidState(format!(
                    "Submission {} has not been submitted",
                    submission_id
                )));
            }
        }

        let scope_added = assignment.add_scope(scope);
        let added = assignment.add_submissions(scope, submission_ids);
        if !scope_added && added == 0 {
            return Ok(assignment);
        }

        let saved = Self::save_one(state, assignment).await?;
        if saved.is_accepted() {
            state
                .notify(Notification::new(
                    EventKind::SubmissionsAssigned,
                    saved.hackathon_id,
                    vec![saved.judge_id],
                    json!({ "scope": scope, "added": added }),
                ))
                .await;
        }
        Ok(saved)
    }

    /// Explicitly remove scopes, teams or submissions from an assignment.
    ///
    /// Removing a scope also drops the submissions held under it.
    pub async fn remove_from_judge(
        state: &AppState,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
        removal: &RemoveFromJudgeRequest,
    ) -> AppResult<JudgeAssignment> {
        if removal.is_empty() {
            return Err(AppError::Validation("Nothing to remove".to_string()));
        }

        let (_hackathon, _guard, mut assignment) =
            Self::lock_assignment(state, actor, assignment_id).await?;
        let before = assignment.clone();

        assignment.rounds.retain(|r| !removal.rounds.contains(r));
        assignment
            .problem_statements
            .retain(|p| !removal.problem_statements.contains(p));
        assignment.assigned_teams.retain(|t| !removal.teams.contains(t));
        assignment.assigned_submissions.retain(|s| {
            let dropped_scope = match s.scope {
                Scope::Round(i) => removal.rounds.contains(&i),
                Scope::ProblemStatement(i) => removal.problem_statements.contains(&i),
            };
            !dropped_scope && !removal.submissions.contains(s)
        });

        if assignment == before {
            return Ok(assignment);
        }
        Self::save_one(state, assignment).await
    }

    /// Delete one assignment
    pub async fn remove_assignment(
        state: &AppState,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
    ) -> AppResult<()> {
        let (_hackathon, _guard, assignment) =
            Self::lock_assignment(state, actor, assignment_id).await?;
        state.repo().delete_assignments(&[assignment.id]).await?;
        info!(
            assignment_id = %assignment.id,
            judge_id = %assignment.judge_id,
            "Assignment removed"
        );
        Ok(())
    }

    /// Remove a judge from a hackathon entirely
    pub async fn remove_judge(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        judge_id: Uuid,
    ) -> AppResult<()> {
        load_managed_hackathon(state, actor, hackathon_id).await?;
        let _guard = state
            .locks()
            .acquire(LockKey::Assignments(hackathon_id))
            .await;

        let assignment = state
            .repo()
            .list_assignments(hackathon_id)
            .await?
            .into_iter()
            .find(|a| a.judge_id == judge_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Judge {} has no assignment in this hackathon",
                    judge_id
                ))
            })?;

        state.repo().delete_assignments(&[assignment.id]).await?;
        info!(hackathon_id = %hackathon_id, judge_id = %judge_id, "Judge removed");
        Ok(())
    }

    /// Every assignment of a hackathon with its status
    pub async fn list_assignments(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
    ) -> AppResult<AssignmentsListResponse> {
        load_managed_hackathon(state, actor, hackathon_id).await?;
        let assignments = state.repo().list_assignments(hackathon_id).await?;
        Ok(AssignmentsListResponse {
            total: assignments.len(),
            assignments,
        })
    }

    /// The caller's assignments with what there is to score in each scope
    pub async fn my_assignments(
        state: &AppState,
        actor: &AuthenticatedUser,
    ) -> AppResult<MyAssignmentsResponse> {
        let assignments = state.repo().list_assignments_for_judge(actor.id).await?;
        let mut out = Vec::with_capacity(assignments.len());

        for assignment in assignments {
            let hackathon = load_hackathon(state, assignment.hackathon_id).await?;
            let scopes = if assignment.is_accepted() {
                Self::scope_tasks(state, &hackathon, &assignment).await?
            } else {
                Vec::new()
            };

            out.push(MyAssignment {
                assignment_id: assignment.id,
                hackathon_id: hackathon.id,
                hackathon_title: hackathon.title.clone(),
                status: assignment.status,
                scopes,
            });
        }

        Ok(MyAssignmentsResponse { assignments: out })
    }

    async fn scope_tasks(
        state: &AppState,
        hackathon: &Hackathon,
        assignment: &JudgeAssignment,
    ) -> AppResult<Vec<ScopeTasks>> {
        let submissions = state.repo().list_submissions(hackathon.id).await?;
        let progress = state.repo().list_round_progress(hackathon.id).await?;
        let find = |index: i32| progress.iter().find(|p| p.round_index == index);
        let mut scores: HashMap<i32, Vec<Score>> = HashMap::new();

        let scopes = assignment
            .rounds
            .iter()
            .map(|r| Scope::Round(*r))
            .chain(
                assignment
                    .problem_statements
                    .iter()
                    .map(|p| Scope::ProblemStatement(*p)),
            );

        let mut out = Vec::new();
        for scope in scopes {
            let Ok(mode) = hackathon.assignment_mode(scope) else {
                continue;
            };
            let round_index = match scope {
                Scope::Round(index) => Some(index),
                Scope::ProblemStatement(_) => active_round(hackathon, &progress),
            };

            let mut tasks = Vec::new();
            if let Some(round_index) = round_index {
                let previous = if round_index == 0 {
                    None
                } else {
                    find(round_index - 1)
                };
                if is_opened(round_index, previous) {
                    if !scores.contains_key(&round_index) {
                        let loaded = state.repo().list_scores(hackathon.id, round_index).await?;
                        scores.insert(round_index, loaded);
                    }
                    let round_scores = scores.get(&round_index).map(Vec::as_slice).unwrap_or(&[]);

                    for submission in round_pool(round_index, &submissions, previous) {
                        if let Scope::ProblemStatement(p) = scope {
                            if submission.problem_statement_index != Some(p) {
                                continue;
                            }
                        }
                        if !coverage(assignment, submission, round_index, hackathon)
                            .allows_scoring()
                        {
                            continue;
                        }
                        tasks.push(JudgeTask {
                            submission_id: submission.id,
                            title: submission.title.clone(),
                            team_id: submission.team_id,
                            round_index,
                            scored: round_scores.iter().any(|s| {
                                s.submission_id == submission.id
                                    && s.judge_id == assignment.judge_id
                            }),
                        });
                    }
                }
            }

            out.push(ScopeTasks {
                scope,
                mode,
                scored: tasks.iter().filter(|t| t.scored).count(),
                tasks,
            });
        }
        Ok(out)
    }

    async fn add_scopes(
        state: &AppState,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
        scopes: &[Scope],
    ) -> AppResult<JudgeAssignment> {
        let (hackathon, _guard, mut assignment) =
            Self::lock_assignment(state, actor, assignment_id).await?;
        ensure_not_declined(&assignment)?;

        for scope in scopes {
            hackathon.ensure_scope(*scope)?;
        }
        let added = scopes
            .iter()
            .filter(|scope| assignment.add_scope(**scope))
            .count();
        if added == 0 {
            return Ok(assignment);
        }
        Self::save_one(state, assignment).await
    }

    async fn find_assignment(state: &AppState, assignment_id: Uuid) -> AppResult<JudgeAssignment> {
        state
            .repo()
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Judge assignment not found".to_string()))
    }

    /// Check the actor manages the assignment's hackathon, take the
    /// hackathon's assignment lock and reload the record under it
    async fn lock_assignment(
        state: &AppState,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
    ) -> AppResult<(Hackathon, EntityGuard, JudgeAssignment)> {
        let assignment = Self::find_assignment(state, assignment_id).await?;
        let hackathon = load_managed_hackathon(state, actor, assignment.hackathon_id).await?;
        let guard = state
            .locks()
            .acquire(LockKey::Assignments(hackathon.id))
            .await;
        let assignment = Self::find_assignment(state, assignment_id).await?;
        Ok((hackathon, guard, assignment))
    }

    async fn save_one(state: &AppState, assignment: JudgeAssignment) -> AppResult<JudgeAssignment> {
        state
            .repo()
            .save_assignments(std::slice::from_ref(&assignment))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Judge assignment not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::EngineRepository,
        services::ScoringService,
        test_utils::fixtures::{
            caller, hackathon, judge, judge_record, organizer_of, seed_accepted_judges,
            submission, test_state,
        },
    };

    async fn assigned_round_with_submissions(
        n: usize,
    ) -> (AppState, std::sync::Arc<crate::db::repositories::MemoryRepository>, Hackathon) {
        let (state, repo) = test_state();
        let mut h = hackathon(2);
        h.rounds[0].assignment_mode = AssignmentMode::Assigned;
        repo.insert_hackathon(h.clone()).await;
        for _ in 0..n {
            repo.insert_submission(submission(h.id, None)).await;
        }
        (state, repo, h)
    }

    async fn evaluations_completed(state: &AppState, h: &Hackathon) -> usize {
        ScoringService::round_submissions_status(state, &organizer_of(h), h.id, 0)
            .await
            .unwrap()
            .progress
            .evaluations_completed
    }

    fn loads(response: &DistributionResponse) -> Vec<usize> {
        response.judges.iter().map(|j| j.submission_count).collect()
    }

    #[tokio::test]
    async fn test_auto_distribute_ten_submissions_two_judges() {
        let (state, repo, h) = assigned_round_with_submissions(10).await;
        seed_accepted_judges(&repo, h.id, Scope::Round(0), 2).await;
        let organizer = organizer_of(&h);

        let first = AllocationService::auto_distribute(&state, &organizer, h.id, Scope::Round(0))
            .await
            .unwrap();
        assert_eq!(loads(&first), vec![5, 5]);
        assert_eq!(first.updated_assignments, 2);

        // Unchanged inputs: same partition, nothing rewritten
        let before = repo.list_assignments(h.id).await.unwrap();
        let rerun = AllocationService::auto_distribute(&state, &organizer, h.id, Scope::Round(0))
            .await
            .unwrap();
        assert_eq!(rerun.updated_assignments, 0);
        assert_eq!(repo.list_assignments(h.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_redistribution_after_decline_keeps_scored_work() {
        let (state, repo, h) = assigned_round_with_submissions(10).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 2).await;
        let organizer = organizer_of(&h);
        AllocationService::auto_distribute(&state, &organizer, h.id, Scope::Round(0))
            .await
            .unwrap();

        // The judge who stays scores their whole roster first
        let stays = repo.find_assignment(judges[1].id).await.unwrap().unwrap();
        let roster = stays.submissions_in(Scope::Round(0));
        assert_eq!(roster.len(), 5);
        let values = BTreeMap::from([("impact".to_string(), 6.0), ("demo".to_string(), 4.0)]);
        for submission_id in &roster {
            ScoringService::score_submission(
                &state,
                &judge(stays.judge_id),
                h.id,
                0,
                *submission_id,
                &values,
            )
            .await
            .unwrap();
        }
        assert_eq!(evaluations_completed(&state, &h).await, 5);

        AllocationService::respond_to_assignment(
            &state,
            &judge(judges[0].judge_id),
            judges[0].id,
            AssignmentResponse::Declined,
        )
        .await
        .unwrap();
        let newcomer = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;

        let rerun = AllocationService::auto_distribute(&state, &organizer, h.id, Scope::Round(0))
            .await
            .unwrap();
        assert_eq!(loads(&rerun), vec![5, 5]);

        let kept = repo.find_assignment(judges[1].id).await.unwrap().unwrap();
        let mut kept_roster = kept.submissions_in(Scope::Round(0));
        kept_roster.sort_unstable();
        let mut expected = roster.clone();
        expected.sort_unstable();
        assert_eq!(kept_roster, expected);

        let added = repo.find_assignment(newcomer[0].id).await.unwrap().unwrap();
        assert!(added
            .submissions_in(Scope::Round(0))
            .iter()
            .all(|id| !roster.contains(id)));
        assert_eq!(evaluations_completed(&state, &h).await, 5);

        let declined = repo.find_assignment(judges[0].id).await.unwrap().unwrap();
        assert_eq!(declined.status, AssignmentStatus::Declined);
        assert!(declined.submissions_in(Scope::Round(0)).is_empty());
    }

    #[tokio::test]
    async fn test_auto_distribute_without_accepted_judges() {
        let (state, repo, h) = assigned_round_with_submissions(3).await;
        let judge_id = Uuid::new_v4();
        repo.insert_user(judge_record(judge_id)).await;
        AllocationService::assign_judges(
            &state,
            &organizer_of(&h),
            h.id,
            Scope::Round(0),
            &[judge_id],
        )
        .await
        .unwrap();

        let err = AllocationService::auto_distribute(
            &state,
            &organizer_of(&h),
            h.id,
            Scope::Round(0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NoAvailableEvaluators(_)));
        assert!(repo.list_assignments(h.id).await.unwrap()[0]
            .assigned_submissions
            .is_empty());
    }

    #[tokio::test]
    async fn test_auto_distribute_requires_assigned_mode() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let err = AllocationService::auto_distribute(
            &state,
            &organizer_of(&h),
            h.id,
            Scope::Round(0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_assign_judges_is_idempotent() {
        let (state, repo) = test_state();
        let h = hackathon(2);
        repo.insert_hackathon(h.clone()).await;
        let judge_id = Uuid::new_v4();
        repo.insert_user(judge_record(judge_id)).await;
        let organizer = organizer_of(&h);

        let first =
            AllocationService::assign_judges(&state, &organizer, h.id, Scope::Round(0), &[judge_id])
                .await
                .unwrap();
        assert_eq!(first.invited, vec![judge_id]);

        let again =
            AllocationService::assign_judges(&state, &organizer, h.id, Scope::Round(0), &[judge_id])
                .await
                .unwrap();
        assert!(again.invited.is_empty());
        assert_eq!(again.unchanged, vec![judge_id]);

        AllocationService::assign_judges(&state, &organizer, h.id, Scope::Round(1), &[judge_id])
            .await
            .unwrap();
        let stored = repo.list_assignments(h.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rounds, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_assign_unknown_judge_or_scope() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let organizer = organizer_of(&h);

        let err = AllocationService::assign_judges(
            &state,
            &organizer,
            h.id,
            Scope::Round(0),
            &[Uuid::new_v4()],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = AllocationService::set_assignment_mode(
            &state,
            &organizer,
            h.id,
            Scope::Round(7),
            AssignmentMode::Assigned,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_only_organizer_manages_assignments() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let stranger = caller(Uuid::new_v4(), roles::ORGANIZER);

        let err = AllocationService::set_assignment_mode(
            &state,
            &stranger,
            h.id,
            Scope::Round(0),
            AssignmentMode::Assigned,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_mode_change_refused_after_scoring_started() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let s = submission(h.id, None);
        repo.insert_submission(s.clone()).await;
        let score = Score {
            hackathon_id: h.id,
            round_index: 0,
            submission_id: s.id,
            judge_id: Uuid::new_v4(),
            criterion_id: "impact".into(),
            value: 4.0,
            scored_at: Utc::now(),
        };
        repo.replace_scores(h.id, 0, s.id, score.judge_id, &[score.clone()])
            .await
            .unwrap();

        let err = AllocationService::set_assignment_mode(
            &state,
            &organizer_of(&h),
            h.id,
            Scope::Round(0),
            AssignmentMode::Assigned,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_declined_judge_cannot_receive_submissions() {
        let (state, repo, h) = assigned_round_with_submissions(1).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        AllocationService::respond_to_assignment(
            &state,
            &judge(judges[0].judge_id),
            judges[0].id,
            AssignmentResponse::Declined,
        )
        .await
        .unwrap();

        let pool = repo.list_submissions(h.id).await.unwrap();
        let err = AllocationService::assign_submissions_to_judge(
            &state,
            &organizer_of(&h),
            judges[0].id,
            Scope::Round(0),
            &[pool[0].id],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_only_invited_judge_responds() {
        let (state, repo, h) = assigned_round_with_submissions(0).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        let err = AllocationService::respond_to_assignment(
            &state,
            &judge(Uuid::new_v4()),
            judges[0].id,
            AssignmentResponse::Accepted,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_manual_assignment_is_additive_until_removed() {
        let (state, repo, h) = assigned_round_with_submissions(2).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        let organizer = organizer_of(&h);

        let updated = AllocationService::assign_rounds_to_judge(
            &state,
            &organizer,
            judges[0].id,
            &[1],
        )
        .await
        .unwrap();
        assert_eq!(updated.rounds, vec![0, 1]);
        let updated = AllocationService::assign_problem_statements_to_judge(
            &state,
            &organizer,
            judges[0].id,
            &[0],
        )
        .await
        .unwrap();
        assert_eq!(updated.rounds, vec![0, 1]);
        assert_eq!(updated.problem_statements, vec![0]);

        let removal = RemoveFromJudgeRequest {
            rounds: vec![1],
            ..Default::default()
        };
        let updated = AllocationService::remove_from_judge(
            &state,
            &organizer,
            judges[0].id,
            &removal,
        )
        .await
        .unwrap();
        assert_eq!(updated.rounds, vec![0]);
        assert_eq!(updated.problem_statements, vec![0]);
    }

    #[tokio::test]
    async fn test_my_assignments_lists_rostered_work() {
        let (state, repo, h) = assigned_round_with_submissions(4).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 2).await;
        AllocationService::auto_distribute(&state, &organizer_of(&h), h.id, Scope::Round(0))
            .await
            .unwrap();

        let mine = AllocationService::my_assignments(&state, &judge(judges[0].judge_id))
            .await
            .unwrap();
        assert_eq!(mine.assignments.len(), 1);
        let round = &mine.assignments[0].scopes[0];
        assert_eq!(round.scope, Scope::Round(0));
        assert_eq!(round.tasks.len(), 2);
        assert_eq!(round.scored, 0);
    }

    #[tokio::test]
    async fn test_remove_judge() {
        let (state, repo, h) = assigned_round_with_submissions(0).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        AllocationService::remove_judge(&state, &organizer_of(&h), h.id, judges[0].judge_id)
            .await
            .unwrap();
        assert!(repo.list_assignments(h.id).await.unwrap().is_empty());

        let err = AllocationService::remove_judge(
            &state,
            &organizer_of(&h),
            h.id,
            judges[0].judge_id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
