//! Round progression request DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::judging::ShortlistRule;

/// Shortlist by top count or by score threshold, exactly one of them
#[derive(Debug, Deserialize)]
pub struct ShortlistRequest {
    pub count: Option<usize>,
    pub threshold: Option<f64>,
    /// Shortlist even though some evaluations are still missing
    #[serde(default)]
    pub force: bool,
}

impl ShortlistRequest {
    pub fn rule(&self) -> AppResult<ShortlistRule> {
        match (self.count, self.threshold) {
            (Some(count), None) => Ok(ShortlistRule::Count(count)),
            (None, Some(threshold)) => Ok(ShortlistRule::Threshold(threshold)),
            _ => Err(AppError::Validation(
                "Provide either count or threshold".to_string(),
            )),
        }
    }
}

/// Query for the progression check
#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    /// Progress before the round's end date
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WinnerPlacement {
    pub placement: u32,
    pub submission_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignWinnersRequest {
    #[validate(length(min = 1))]
    pub winners: Vec<WinnerPlacement>,
}

impl AssignWinnersRequest {
    pub fn placements(&self) -> Vec<(u32, Uuid)> {
        self.winners
            .iter()
            .map(|w| (w.placement, w.submission_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortlist_rule_needs_exactly_one_criterion() {
        let both: ShortlistRequest =
            serde_json::from_str(r#"{"count":3,"threshold":7.5}"#).unwrap();
        assert!(both.rule().is_err());

        let neither: ShortlistRequest = serde_json::from_str(r#"{"force":true}"#).unwrap();
        assert!(neither.rule().is_err());

        let count: ShortlistRequest = serde_json::from_str(r#"{"count":3}"#).unwrap();
        assert_eq!(count.rule().unwrap(), ShortlistRule::Count(3));
        assert!(!count.force);
    }

    #[test]
    fn test_winners_request_needs_at_least_one_placement() {
        let empty: AssignWinnersRequest = serde_json::from_str(r#"{"winners":[]}"#).unwrap();
        assert!(empty.validate().is_err());

        let id = Uuid::new_v4();
        let one: AssignWinnersRequest = serde_json::from_value(serde_json::json!({
            "winners": [{ "placement": 1, "submission_id": id }]
        }))
        .unwrap();
        assert!(one.validate().is_ok());
        assert_eq!(one.placements(), vec![(1, id)]);
    }
}
