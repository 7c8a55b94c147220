//! Business logic services
//!
//! Each service loads what it needs through the repository, runs the pure
//! judging functions, persists the outcome and emits notifications after
//! the commit.

pub mod allocation_service;
pub mod progression_service;
pub mod scoring_service;
pub mod shortlist_service;

pub use allocation_service::AllocationService;
pub use progression_service::ProgressionService;
pub use scoring_service::ScoringService;
pub use shortlist_service::ShortlistService;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    judging::is_opened,
    middleware::AuthenticatedUser,
    models::{Hackathon, RoundProgress},
    state::AppState,
};

/// Load a hackathon or fail with `NotFound`
pub(crate) async fn load_hackathon(state: &AppState, hackathon_id: Uuid) -> AppResult<Hackathon> {
    state
        .repo()
        .find_hackathon(hackathon_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Hackathon not found".to_string()))
}

/// Load a hackathon the actor organizes (or any, for admins)
pub(crate) async fn load_managed_hackathon(
    state: &AppState,
    actor: &AuthenticatedUser,
    hackathon_id: Uuid,
) -> AppResult<Hackathon> {
    let hackathon = load_hackathon(state, hackathon_id).await?;
    actor.ensure_can_manage(&hackathon)?;
    Ok(hackathon)
}

/// Progress of the round before `round_index`; `None` for round 0
pub(crate) async fn previous_progress(
    state: &AppState,
    hackathon_id: Uuid,
    round_index: i32,
) -> AppResult<Option<RoundProgress>> {
    if round_index == 0 {
        return Ok(None);
    }
    state
        .repo()
        .find_round_progress(hackathon_id, round_index - 1)
        .await
}

/// First round that is opened and not yet shortlisted, else the last opened one.
///
/// Problem-statement scopes are scored in this round.
pub(crate) fn active_round(hackathon: &Hackathon, progress: &[RoundProgress]) -> Option<i32> {
    let find = |index: i32| progress.iter().find(|p| p.round_index == index);
    let mut last_opened = None;

    for round in &hackathon.rounds {
        let previous = if round.index == 0 {
            None
        } else {
            find(round.index - 1)
        };
        if !is_opened(round.index, previous) {
            break;
        }
        last_opened = Some(round.index);
        if !find(round.index).is_some_and(|p| p.round_completed) {
            return Some(round.index);
        }
    }
    last_opened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::hackathon;

    #[test]
    fn test_active_round_follows_progression() {
        let h = hackathon(3);
        assert_eq!(active_round(&h, &[]), Some(0));

        let mut r0 = RoundProgress::new(h.id, 0);
        r0.round_completed = true;
        // Shortlisted but not progressed: round 1 is still locked
        assert_eq!(active_round(&h, &[r0.clone()]), Some(0));

        r0.next_round_eligibility = true;
        assert_eq!(active_round(&h, &[r0]), Some(1));
    }
}
