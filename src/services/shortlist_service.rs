//! Shortlisting and eligibility service
//!
//! A round's shortlist and the eligibility sets derived from it are written
//! together in one version-checked `RoundProgress` save, so readers never
//! see one without the other.

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    handlers::rounds::response::{
        EligibilityResponse, PublicShortlistEntry, PublicShortlistResponse,
        ShortlistResponse, ShortlistedSubmission, ShortlistingStatusResponse,
        ToggleShortlistResponse, UserRoundStatus,
    },
    judging::{
        aggregate, apply_shortlist, derive_advancement, is_opened, pool_progress, rank,
        round_pool, select, toggle, ShortlistRule,
    },
    middleware::AuthenticatedUser,
    models::{Hackathon, RoundProgress, Submission},
    notify::{EventKind, Notification},
    state::{AppState, LockKey},
};

use super::{load_hackathon, load_managed_hackathon, previous_progress};

/// Shortlisting and eligibility service
pub struct ShortlistService;

fn shortlist_view(
    round_index: i32,
    progress: Option<&RoundProgress>,
    submissions: &[Submission],
) -> ShortlistResponse {
    let Some(progress) = progress.filter(|p| p.round_completed) else {
        return ShortlistResponse {
            round_index,
            published: false,
            submissions: Vec::new(),
            shortlisted_teams: Vec::new(),
            eligible_teams: Vec::new(),
            eligible_participants: Vec::new(),
            shortlisted_at: None,
            shortlist_revision: progress.map_or(0, |p| p.shortlist_revision),
            next_round_open: false,
        };
    };

    ShortlistResponse {
        round_index,
        published: true,
        submissions: progress
            .shortlisted_submissions
            .iter()
            .filter_map(|id| submissions.iter().find(|s| s.id == *id))
            .map(|s| ShortlistedSubmission {
                submission_id: s.id,
                title: s.title.clone(),
                team_id: s.team_id,
                submitted_by: s.submitted_by,
            })
            .collect(),
        shortlisted_teams: progress.shortlisted_teams.clone(),
        eligible_teams: progress.eligible_teams.clone(),
        eligible_participants: progress.eligible_participants.clone(),
        shortlisted_at: progress.shortlisted_at,
        shortlist_revision: progress.shortlist_revision,
        next_round_open: progress.next_round_eligibility,
    }
}

/// Refuse to touch a round whose winners are already on the board
async fn ensure_winners_open(
    state: &AppState,
    hackathon_id: Uuid,
    round_index: i32,
) -> AppResult<()> {
    let board = state.repo().find_winners(hackathon_id).await?;
    if board.is_some_and(|b| b.round_index == round_index) {
        return Err(AppError::InvalidState(format!(
            "Winners are already assigned for round {}; its shortlist is final",
            round_index
        )));
    }
    Ok(())
}

/// Teams the user leads or belongs to
async fn teams_of(state: &AppState, hackathon_id: Uuid, user_id: Uuid) -> AppResult<Vec<Uuid>> {
    Ok(state
        .repo()
        .list_teams(hackathon_id)
        .await?
        .into_iter()
        .filter(|t| t.has_member(user_id))
        .map(|t| t.id)
        .collect())
}

/// Eligibility for the round after `from_round`, judged on its progress
fn admitted_after(
    from_round: i32,
    progress: Option<&RoundProgress>,
    user_id: Uuid,
    team_ids: &[Uuid],
) -> (bool, Option<String>) {
    match progress {
        Some(p) if p.admits(user_id, team_ids) => (true, None),
        Some(p) if p.round_completed => (
            false,
            Some(format!("Not shortlisted in round {}", from_round)),
        ),
        _ => (
            false,
            Some(format!("Round {} has not been shortlisted yet", from_round)),
        ),
    }
}

impl ShortlistService {
    /// Select the round's shortlist from its leaderboard.
    ///
    /// Always replaces the previous shortlist of the round.
    pub async fn perform_shortlisting(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
        rule: ShortlistRule,
        force: bool,
    ) -> AppResult<ShortlistResponse> {
        let _guard = state
            .locks()
            .acquire(LockKey::Round(hackathon_id, round_index))
            .await;
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        let criteria = &hackathon.round(round_index)?.judging_criteria;
        ensure_winners_open(state, hackathon_id, round_index).await?;

        let previous = previous_progress(state, hackathon_id, round_index).await?;
        if !is_opened(round_index, previous.as_ref()) {
            return Err(AppError::InvalidState(format!(
                "Round {} is not open yet",
                round_index
            )));
        }

        let submissions = state.repo().list_submissions(hackathon_id).await?;
        let pool = round_pool(round_index, &submissions, previous.as_ref());
        let scores = state.repo().list_scores(hackathon_id, round_index).await?;
        let rows = rank(&pool, &aggregate(&scores, criteria));

        if !rows.iter().any(|r| r.average_score.is_some()) {
            return Err(AppError::InvalidState(format!(
                "Round {} has no scored submissions",
                round_index
            )));
        }

        if !force {
            let assignments = state.repo().list_assignments(hackathon_id).await?;
            let (_, progress) =
                pool_progress(&pool, round_index, &hackathon, &assignments, &scores);
            if !progress.is_complete() {
                return Err(AppError::InvalidState(format!(
                    "Round {} scoring is incomplete ({} of {} submissions fully scored); force to shortlist anyway",
                    round_index, progress.fully_scored, progress.submissions
                )));
            }
        }

        let selected = select(&rows, rule)?;
        let teams = state.repo().list_teams(hackathon_id).await?;
        let advancement = derive_advancement(&selected, &submissions, &teams);

        let mut progress = state
            .repo()
            .find_round_progress(hackathon_id, round_index)
            .await?
            .unwrap_or_else(|| RoundProgress::new(hackathon_id, round_index));
        apply_shortlist(&mut progress, selected, advancement, actor.id, Utc::now());
        let saved = state.repo().save_round_progress(&progress).await?;

        info!(
            hackathon_id = %hackathon_id,
            round_index,
            ?rule,
            forced = force,
            shortlisted = saved.shortlisted_submissions.len(),
            eligible_participants = saved.eligible_participants.len(),
            revision = saved.shortlist_revision,
            "Round shortlisted"
        );

        state
            .notify(Notification::new(
                EventKind::ShortlistPublished,
                hackathon_id,
                saved.eligible_participants.clone(),
                json!({ "round_index": round_index, "revision": saved.shortlist_revision }),
            ))
            .await;

        Ok(shortlist_view(round_index, Some(&saved), &submissions))
    }

    /// Flip one submission in or out of an existing shortlist
    pub async fn toggle_submission_shortlist(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
        submission_id: Uuid,
    ) -> AppResult<ToggleShortlistResponse> {
        let _guard = state
            .locks()
            .acquire(LockKey::Round(hackathon_id, round_index))
            .await;
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        hackathon.round(round_index)?;
        ensure_winners_open(state, hackathon_id, round_index).await?;

        let mut progress = state
            .repo()
            .find_round_progress(hackathon_id, round_index)
            .await?
            .filter(|p| p.round_completed)
            .ok_or_else(|| {
                AppError::InvalidState(format!(
                    "Round {} has no shortlist yet",
                    round_index
                ))
            })?;

        let submissions = state.repo().list_submissions(hackathon_id).await?;
        let previous = previous_progress(state, hackathon_id, round_index).await?;
        let in_pool = round_pool(round_index, &submissions, previous.as_ref())
            .iter()
            .any(|s| s.id == submission_id);
        if !in_pool {
            return Err(AppError::NotFound(format!(
                "Submission {} is not in round {}",
                submission_id, round_index
            )));
        }

        let teams = state.repo().list_teams(hackathon_id).await?;
        let shortlisted = toggle(&mut progress, submission_id, &submissions, &teams, Utc::now());
        let saved = state.repo().save_round_progress(&progress).await?;

        info!(
            hackathon_id = %hackathon_id,
            round_index,
            submission_id = %submission_id,
            shortlisted,
            "Shortlist membership toggled"
        );

        Ok(ToggleShortlistResponse {
            round_index,
            submission_id,
            shortlisted,
            total_shortlisted: saved.shortlisted_submissions.len(),
            shortlist_revision: saved.shortlist_revision,
        })
    }

    /// Organizer view of a round's shortlist
    pub async fn get_shortlisted(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<ShortlistResponse> {
        let hackathon = load_managed_hackathon(state, actor, hackathon_id).await?;
        hackathon.round(round_index)?;
        let progress = state
            .repo()
            .find_round_progress(hackathon_id, round_index)
            .await?;
        let submissions = state.repo().list_submissions(hackathon_id).await?;
        Ok(shortlist_view(round_index, progress.as_ref(), &submissions))
    }

    /// Read-only shortlist for participants; empty until published
    pub async fn get_shortlisted_public(
        state: &AppState,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<PublicShortlistResponse> {
        let hackathon = load_hackathon(state, hackathon_id).await?;
        hackathon.round(round_index)?;
        let progress = state
            .repo()
            .find_round_progress(hackathon_id, round_index)
            .await?;
        let submissions = state.repo().list_submissions(hackathon_id).await?;
        let view = shortlist_view(round_index, progress.as_ref(), &submissions);

        Ok(PublicShortlistResponse {
            round_index,
            published: view.published,
            submissions: view
                .submissions
                .into_iter()
                .map(|s| PublicShortlistEntry {
                    submission_id: s.submission_id,
                    title: s.title,
                    team_id: s.team_id,
                })
                .collect(),
            shortlisted_at: view.shortlisted_at,
        })
    }

    /// Whether the caller may take part in `round_index`
    pub async fn check_round_eligibility(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<EligibilityResponse> {
        let hackathon = load_hackathon(state, hackathon_id).await?;
        hackathon.round(round_index)?;

        if round_index == 0 {
            return Ok(EligibilityResponse {
                round_index,
                eligible: true,
                reason: None,
            });
        }

        let previous = previous_progress(state, hackathon_id, round_index).await?;
        let teams = teams_of(state, hackathon_id, actor.id).await?;
        let (eligible, reason) =
            admitted_after(round_index - 1, previous.as_ref(), actor.id, &teams);
        Ok(EligibilityResponse {
            round_index,
            eligible,
            reason,
        })
    }

    /// Whether the caller advanced out of `round_index` into the next round
    pub async fn check_next_round_eligibility(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
        round_index: i32,
    ) -> AppResult<EligibilityResponse> {
        let hackathon = load_hackathon(state, hackathon_id).await?;
        hackathon.round(round_index)?;

        if hackathon.terminal_round_index() == Some(round_index) {
            return Ok(EligibilityResponse {
                round_index: round_index + 1,
                eligible: false,
                reason: Some(format!("Round {} is the final round", round_index)),
            });
        }

        let current = state
            .repo()
            .find_round_progress(hackathon_id, round_index)
            .await?;
        let teams = teams_of(state, hackathon_id, actor.id).await?;
        let (eligible, reason) = admitted_after(round_index, current.as_ref(), actor.id, &teams);
        Ok(EligibilityResponse {
            round_index: round_index + 1,
            eligible,
            reason,
        })
    }

    /// The caller's standing in every round of a hackathon
    pub async fn user_shortlisting_status(
        state: &AppState,
        actor: &AuthenticatedUser,
        hackathon_id: Uuid,
    ) -> AppResult<ShortlistingStatusResponse> {
        let hackathon = load_hackathon(state, hackathon_id).await?;
        let progress = state.repo().list_round_progress(hackathon_id).await?;
        let teams = teams_of(state, hackathon_id, actor.id).await?;
        let mine: Vec<Uuid> = state
            .repo()
            .list_submissions(hackathon_id)
            .await?
            .into_iter()
            .filter(|s| {
                s.submitted_by == actor.id || s.team_id.is_some_and(|t| teams.contains(&t))
            })
            .map(|s| s.id)
            .collect();

        Ok(ShortlistingStatusResponse {
            hackathon_id,
            rounds: Self::round_statuses(&hackathon, &progress, actor.id, &teams, &mine),
        })
    }

    fn round_statuses(
        hackathon: &Hackathon,
        progress: &[RoundProgress],
        user_id: Uuid,
        teams: &[Uuid],
        mine: &[Uuid],
    ) -> Vec<UserRoundStatus> {
        let find = |index: i32| progress.iter().find(|p| p.round_index == index);

        hackathon
            .rounds
            .iter()
            .map(|round| {
                let previous = if round.index == 0 {
                    None
                } else {
                    find(round.index - 1)
                };
                let current = find(round.index).filter(|p| p.round_completed);

                UserRoundStatus {
                    round_index: round.index,
                    name: round.name.clone(),
                    opened: is_opened(round.index, previous),
                    eligible: round.index == 0
                        || previous.is_some_and(|p| p.admits(user_id, teams)),
                    shortlist_published: current.is_some(),
                    advanced: current.map(|p| p.admits(user_id, teams)),
                    shortlisted_submissions: current
                        .map(|p| {
                            mine.iter()
                                .copied()
                                .filter(|id| p.is_shortlisted(*id))
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        constants::roles,
        db::repositories::MemoryRepository,
        db::EngineRepository,
        models::{Scope, Winner, WinnerBoard},
        services::ScoringService,
        test_utils::fixtures::{
            caller, hackathon, judge, organizer_of, seed_accepted_judges, submission, team,
            test_state,
        },
    };

    /// Round 0 with five submissions scored 9, 8, 7, 6, 5 by one judge
    async fn scored_round(
        state: &AppState,
        repo: &MemoryRepository,
        h: &Hackathon,
    ) -> Vec<Submission> {
        let judges = seed_accepted_judges(repo, h.id, Scope::Round(0), 1).await;
        let me = judge(judges[0].judge_id);

        let mut subs = Vec::new();
        for i in 0..5 {
            let s = submission(h.id, None);
            repo.insert_submission(s.clone()).await;
            let value = 9.0 - i as f64;
            let values =
                BTreeMap::from([("impact".to_string(), value), ("demo".to_string(), value)]);
            ScoringService::score_submission(state, &me, h.id, 0, s.id, &values)
                .await
                .unwrap();
            subs.push(s);
        }
        subs
    }

    fn ids(response: &ShortlistResponse) -> Vec<Uuid> {
        response.submissions.iter().map(|s| s.submission_id).collect()
    }

    #[tokio::test]
    async fn test_reshortlisting_overwrites() {
        let (state, repo) = test_state();
        let h = hackathon(2);
        repo.insert_hackathon(h.clone()).await;
        let subs = scored_round(&state, &repo, &h).await;
        let organizer = organizer_of(&h);

        let first = ShortlistService::perform_shortlisting(
            &state,
            &organizer,
            h.id,
            0,
            ShortlistRule::Count(3),
            false,
        )
        .await
        .unwrap();
        assert_eq!(ids(&first), vec![subs[0].id, subs[1].id, subs[2].id]);
        assert_eq!(first.eligible_participants.len(), 3);

        let second = ShortlistService::perform_shortlisting(
            &state,
            &organizer,
            h.id,
            0,
            ShortlistRule::Count(2),
            false,
        )
        .await
        .unwrap();
        assert_eq!(ids(&second), vec![subs[0].id, subs[1].id]);
        assert_eq!(second.eligible_participants.len(), 2);
        assert_eq!(second.shortlist_revision, 2);
        assert!(second.shortlisted_at >= first.shortlisted_at);
    }

    #[tokio::test]
    async fn test_toggle_preserves_other_members() {
        let (state, repo) = test_state();
        let h = hackathon(2);
        repo.insert_hackathon(h.clone()).await;
        let subs = scored_round(&state, &repo, &h).await;
        let organizer = organizer_of(&h);

        ShortlistService::perform_shortlisting(
            &state,
            &organizer,
            h.id,
            0,
            ShortlistRule::Count(2),
            false,
        )
        .await
        .unwrap();

        let toggled =
            ShortlistService::toggle_submission_shortlist(&state, &organizer, h.id, 0, subs[4].id)
                .await
                .unwrap();
        assert!(toggled.shortlisted);
        assert_eq!(toggled.total_shortlisted, 3);

        let progress = repo.find_round_progress(h.id, 0).await.unwrap().unwrap();
        assert_eq!(
            progress.shortlisted_submissions,
            vec![subs[0].id, subs[1].id, subs[4].id]
        );
        assert!(progress.eligible_participants.contains(&subs[4].submitted_by));

        let toggled =
            ShortlistService::toggle_submission_shortlist(&state, &organizer, h.id, 0, subs[0].id)
                .await
                .unwrap();
        assert!(!toggled.shortlisted);
        let progress = repo.find_round_progress(h.id, 0).await.unwrap().unwrap();
        assert_eq!(progress.shortlisted_submissions, vec![subs[1].id, subs[4].id]);
    }

    #[tokio::test]
    async fn test_toggle_requires_existing_shortlist() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let subs = scored_round(&state, &repo, &h).await;

        let err = ShortlistService::toggle_submission_shortlist(
            &state,
            &organizer_of(&h),
            h.id,
            0,
            subs[0].id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_shortlisting_needs_scores_and_completeness() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let organizer = organizer_of(&h);
        repo.insert_submission(submission(h.id, None)).await;

        let err = ShortlistService::perform_shortlisting(
            &state,
            &organizer,
            h.id,
            0,
            ShortlistRule::Count(1),
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        // One unscored pool entry leaves scoring incomplete
        scored_round(&state, &repo, &h).await;
        let err = ShortlistService::perform_shortlisting(
            &state,
            &organizer,
            h.id,
            0,
            ShortlistRule::Count(1),
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let forced = ShortlistService::perform_shortlisting(
            &state,
            &organizer,
            h.id,
            0,
            ShortlistRule::Count(1),
            true,
        )
        .await
        .unwrap();
        assert_eq!(forced.submissions.len(), 1);
    }

    #[tokio::test]
    async fn test_eligibility_only_after_shortlisting() {
        let (state, repo) = test_state();
        let h = hackathon(2);
        repo.insert_hackathon(h.clone()).await;

        let t = team(h.id, 3);
        repo.insert_team(t.clone()).await;
        let judges = seed_accepted_judges(&repo, h.id, Scope::Round(0), 1).await;
        let mut s = submission(h.id, Some(t.id));
        s.submitted_by = t.leader_id;
        repo.insert_submission(s.clone()).await;
        let values = BTreeMap::from([("impact".to_string(), 8.0), ("demo".to_string(), 8.0)]);
        ScoringService::score_submission(&state, &judge(judges[0].judge_id), h.id, 0, s.id, &values)
            .await
            .unwrap();

        let member = caller(t.members[2], roles::PARTICIPANT);
        let outsider = caller(Uuid::new_v4(), roles::PARTICIPANT);

        let before = ShortlistService::check_round_eligibility(&state, &member, h.id, 1)
            .await
            .unwrap();
        assert!(!before.eligible);
        assert!(
            ShortlistService::check_round_eligibility(&state, &outsider, h.id, 0)
                .await
                .unwrap()
                .eligible
        );

        ShortlistService::perform_shortlisting(
            &state,
            &organizer_of(&h),
            h.id,
            0,
            ShortlistRule::Threshold(5.0),
            false,
        )
        .await
        .unwrap();

        let after = ShortlistService::check_next_round_eligibility(&state, &member, h.id, 0)
            .await
            .unwrap();
        assert!(after.eligible);
        assert_eq!(after.round_index, 1);
        assert!(
            !ShortlistService::check_round_eligibility(&state, &outsider, h.id, 1)
                .await
                .unwrap()
                .eligible
        );

        let terminal = ShortlistService::check_next_round_eligibility(&state, &member, h.id, 1)
            .await
            .unwrap();
        assert!(!terminal.eligible);

        let status = ShortlistService::user_shortlisting_status(&state, &member, h.id)
            .await
            .unwrap();
        assert_eq!(status.rounds[0].advanced, Some(true));
        assert_eq!(status.rounds[0].shortlisted_submissions, vec![s.id]);
        assert!(status.rounds[1].eligible);
        // Shortlisted, not yet progressed
        assert!(!status.rounds[1].opened);
    }

    #[tokio::test]
    async fn test_public_shortlist_hidden_until_published() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        scored_round(&state, &repo, &h).await;

        let hidden = ShortlistService::get_shortlisted_public(&state, h.id, 0)
            .await
            .unwrap();
        assert!(!hidden.published);
        assert!(hidden.submissions.is_empty());

        ShortlistService::perform_shortlisting(
            &state,
            &organizer_of(&h),
            h.id,
            0,
            ShortlistRule::Count(2),
            false,
        )
        .await
        .unwrap();
        let public = ShortlistService::get_shortlisted_public(&state, h.id, 0)
            .await
            .unwrap();
        assert!(public.published);
        assert_eq!(public.submissions.len(), 2);
    }

    #[tokio::test]
    async fn test_winners_close_the_shortlist() {
        let (state, repo) = test_state();
        let h = hackathon(1);
        repo.insert_hackathon(h.clone()).await;
        let subs = scored_round(&state, &repo, &h).await;

        repo.save_winners(&WinnerBoard {
            hackathon_id: h.id,
            round_index: 0,
            winners: vec![Winner {
                placement: 1,
                submission_id: subs[0].id,
                team_id: None,
                submitted_by: subs[0].submitted_by,
            }],
            assigned_at: Utc::now(),
            assigned_by: h.organizer_id,
            notified_fingerprint: None,
            notified_at: None,
            version: 0,
        })
        .await
        .unwrap();

        let err = ShortlistService::perform_shortlisting(
            &state,
            &organizer_of(&h),
            h.id,
            0,
            ShortlistRule::Count(2),
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
}
