//! Winner placement checks and change detection

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Winner;

/// Placements start at 1 and are unique; each submission places once
pub fn validate_placements(placements: &[(u32, Uuid)]) -> AppResult<()> {
    if placements.is_empty() {
        return Err(AppError::Validation("At least one winner is required".to_string()));
    }

    let mut places = HashSet::new();
    let mut submissions = HashSet::new();
    for &(placement, submission_id) in placements {
        if placement == 0 {
            return Err(AppError::Validation("Placements start at 1".to_string()));
        }
        if !places.insert(placement) {
            return Err(AppError::Validation(format!(
                "Placement {} is given more than once",
                placement
            )));
        }
        if !submissions.insert(submission_id) {
            return Err(AppError::Validation(format!(
                "Submission {} is placed more than once",
                submission_id
            )));
        }
    }
    Ok(())
}

/// Hex sha256 over the placement set, independent of input order
pub fn winner_fingerprint(winners: &[Winner]) -> String {
    let mut entries: Vec<(u32, Uuid)> = winners
        .iter()
        .map(|w| (w.placement, w.submission_id))
        .collect();
    entries.sort_unstable();

    let mut hasher = Sha256::new();
    for (placement, submission_id) in entries {
        hasher.update(placement.to_le_bytes());
        hasher.update(submission_id.as_bytes());
    }
    hex::encode(hasher.finalize())
}
