//! Weighted multi-judge score aggregation and leaderboard ordering

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{JudgingCriteria, Score, Submission};

/// Combined score of one submission in one round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionAggregate {
    /// Weighted score per judge who scored it
    pub judge_scores: BTreeMap<Uuid, f64>,
    /// Mean of `judge_scores`; `None` when nobody has scored it
    pub average: Option<f64>,
}

impl SubmissionAggregate {
    pub fn judge_count(&self) -> usize {
        self.judge_scores.len()
    }
}

/// `Σ(value·weight) / Σ(weight)` over the criteria a judge actually scored.
///
/// Values for criteria no longer defined on the round are ignored.
pub fn weighted_score<'a>(
    values: impl IntoIterator<Item = &'a Score>,
    criteria: &JudgingCriteria,
) -> Option<f64> {
    let (weighted, weights) = values
        .into_iter()
        .filter_map(|s| criteria.find(&s.criterion_id).map(|c| (s.value, c.weight)))
        .fold((0.0, 0.0), |(sum, w_sum), (value, weight)| {
            (sum + value * weight, w_sum + weight)
        });

    if weights > 0.0 {
        Some(weighted / weights)
    } else {
        None
    }
}

/// Aggregate every submission that has at least one score
pub fn aggregate(
    scores: &[Score],
    criteria: &JudgingCriteria,
) -> HashMap<Uuid, SubmissionAggregate> {
    let mut grouped: HashMap<(Uuid, Uuid), Vec<&Score>> = HashMap::new();
    for score in scores {
        grouped
            .entry((score.submission_id, score.judge_id))
            .or_default()
            .push(score);
    }

    let mut result: HashMap<Uuid, SubmissionAggregate> = HashMap::new();
    for ((submission_id, judge_id), values) in grouped {
        if let Some(score) = weighted_score(values, criteria) {
            result
                .entry(submission_id)
                .or_default()
                .judge_scores
                .insert(judge_id, score);
        }
    }

    for entry in result.values_mut() {
        let n = entry.judge_scores.len();
        if n > 0 {
            entry.average = Some(entry.judge_scores.values().sum::<f64>() / n as f64);
        }
    }

    result
}

/// One leaderboard row
#[derive(Debug, Clone, Serialize)]
pub struct RankedSubmission {
    pub rank: usize,
    pub submission_id: Uuid,
    pub title: String,
    pub team_id: Option<Uuid>,
    pub submitted_by: Uuid,
    pub submitted_at: Option<DateTime<Utc>>,
    pub average_score: Option<f64>,
    pub judge_count: usize,
}

/// Order the pool: best score first, earlier submission wins ties, unscored last
pub fn rank(
    pool: &[&Submission],
    aggregates: &HashMap<Uuid, SubmissionAggregate>,
) -> Vec<RankedSubmission> {
    let mut rows: Vec<RankedSubmission> = pool
        .iter()
        .map(|s| {
            let aggregate = aggregates.get(&s.id);
            RankedSubmission {
                rank: 0,
                submission_id: s.id,
                title: s.title.clone(),
                team_id: s.team_id,
                submitted_by: s.submitted_by,
                submitted_at: s.submitted_at,
                average_score: aggregate.and_then(|a| a.average),
                judge_count: aggregate.map_or(0, SubmissionAggregate::judge_count),
            }
        })
        .collect();

    rows.sort_by(compare_rows);
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}

fn compare_rows(a: &RankedSubmission, b: &RankedSubmission) -> Ordering {
    let by_score = match (a.average_score, b.average_score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    let by_time = match (a.submitted_at, b.submitted_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_score
        .then(by_time)
        .then_with(|| a.submission_id.cmp(&b.submission_id))
}
