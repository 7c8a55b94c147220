//! Scoring request DTOs

use std::collections::BTreeMap;

use serde::Deserialize;
use validator::Validate;

use crate::constants::MAX_CRITERIA_PER_LIST;
use crate::models::{Criterion, JudgingCriteria};

/// A judge's values for one submission, keyed by criterion id
#[derive(Debug, Deserialize)]
pub struct ScoreSubmissionRequest {
    pub scores: BTreeMap<String, f64>,
}

/// Replace a round's criteria
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateJudgingCriteriaRequest {
    #[serde(default)]
    #[validate(length(max = MAX_CRITERIA_PER_LIST))]
    pub project: Vec<Criterion>,
    #[serde(default)]
    #[validate(length(max = MAX_CRITERIA_PER_LIST))]
    pub presentation: Vec<Criterion>,
}

impl From<UpdateJudgingCriteriaRequest> for JudgingCriteria {
    fn from(req: UpdateJudgingCriteriaRequest) -> Self {
        JudgingCriteria {
            project: req.project,
            presentation: req.presentation,
        }
    }
}
