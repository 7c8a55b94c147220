//! Hackathon read model: rounds, problem statements and judging criteria

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_CRITERION_MAX_SCORE, DEFAULT_CRITERION_WEIGHT};
use crate::error::{AppError, AppResult};

/// Hackathon with its ordered rounds and problem statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hackathon {
    pub id: Uuid,
    pub title: String,
    pub organizer_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub rounds: Vec<Round>,
    pub problem_statements: Vec<ProblemStatement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hackathon {
    /// Look up a round by its stable index
    pub fn round(&self, index: i32) -> AppResult<&Round> {
        self.rounds
            .iter()
            .find(|r| r.index == index)
            .ok_or_else(|| AppError::NotFound(format!("Round {} does not exist", index)))
    }

    /// Look up a problem statement by its stable index
    pub fn problem_statement(&self, index: i32) -> AppResult<&ProblemStatement> {
        self.problem_statements
            .iter()
            .find(|p| p.index == index)
            .ok_or_else(|| {
                AppError::NotFound(format!("Problem statement {} does not exist", index))
            })
    }

    /// Index of the last round, if any rounds are defined
    pub fn terminal_round_index(&self) -> Option<i32> {
        self.rounds.iter().map(|r| r.index).max()
    }

    /// Mode currently configured for a scope
    pub fn assignment_mode(&self, scope: Scope) -> AppResult<AssignmentMode> {
        match scope {
            Scope::Round(index) => Ok(self.round(index)?.assignment_mode),
            Scope::ProblemStatement(index) => Ok(self.problem_statement(index)?.assignment_mode),
        }
    }

    /// Fails with `NotFound` when the scope's index does not exist
    pub fn ensure_scope(&self, scope: Scope) -> AppResult<()> {
        self.assignment_mode(scope).map(|_| ())
    }
}

/// A discrete evaluation phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub index: i32,
    pub name: String,
    pub round_type: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub assignment_mode: AssignmentMode,
    pub judging_criteria: JudgingCriteria,
}

/// Problem statement a submission can target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemStatement {
    pub index: i32,
    pub statement: String,
    pub ps_type: String,
    pub assignment_mode: AssignmentMode,
}

/// Criteria judges score a round against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgingCriteria {
    #[serde(default)]
    pub project: Vec<Criterion>,
    #[serde(default)]
    pub presentation: Vec<Criterion>,
}

impl JudgingCriteria {
    /// All criteria of both lists
    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.project.iter().chain(self.presentation.iter())
    }

    pub fn find(&self, id: &str) -> Option<&Criterion> {
        self.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.project.is_empty() && self.presentation.is_empty()
    }

    /// Highest weighted average a single judge can give
    pub fn max_weighted_score(&self) -> Option<f64> {
        let total_weight: f64 = self.iter().map(|c| c.weight).sum();
        if total_weight <= 0.0 {
            return None;
        }
        Some(self.iter().map(|c| c.max_score * c.weight).sum::<f64>() / total_weight)
    }

    /// Check ids are unique and bounds are usable
    pub fn validate(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for criterion in self.iter() {
            if criterion.id.trim().is_empty() {
                return Err(AppError::Validation("Criterion id cannot be empty".to_string()));
            }
            if !seen.insert(criterion.id.as_str()) {
                return Err(AppError::Validation(format!(
                    "Duplicate criterion id '{}'",
                    criterion.id
                )));
            }
            if !criterion.max_score.is_finite() || criterion.max_score <= 0.0 {
                return Err(AppError::Validation(format!(
                    "Criterion '{}' must have a positive max score",
                    criterion.id
                )));
            }
            if !criterion.weight.is_finite() || criterion.weight <= 0.0 {
                return Err(AppError::Validation(format!(
                    "Criterion '{}' must have a positive weight",
                    criterion.id
                )));
            }
        }
        Ok(())
    }
}

/// One scored dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_max_score() -> f64 {
    DEFAULT_CRITERION_MAX_SCORE
}

fn default_weight() -> f64 {
    DEFAULT_CRITERION_WEIGHT
}

/// Whether judges self-serve or are rostered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentMode {
    #[default]
    Open,
    Assigned,
}

impl std::fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Assigned => write!(f, "assigned"),
        }
    }
}

impl std::str::FromStr for AssignmentMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "assigned" => Ok(Self::Assigned),
            other => Err(AppError::Validation(format!("Unknown assignment mode '{}'", other))),
        }
    }
}

/// Unit of allocation: a round or a problem statement, by index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum Scope {
    Round(i32),
    ProblemStatement(i32),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Round(i) => write!(f, "round {}", i),
            Self::ProblemStatement(i) => write!(f, "problem statement {}", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(id: &str, max_score: f64, weight: f64) -> Criterion {
        Criterion {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            max_score,
            weight,
        }
    }

    #[test]
    fn test_max_weighted_score() {
        let criteria = JudgingCriteria {
            project: vec![criterion("innovation", 10.0, 2.0)],
            presentation: vec![criterion("pitch", 5.0, 1.0)],
        };
        let max = criteria.max_weighted_score().unwrap();
        assert!((max - 25.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_bounds() {
        let duplicated = JudgingCriteria {
            project: vec![criterion("a", 10.0, 1.0)],
            presentation: vec![criterion("a", 10.0, 1.0)],
        };
        assert!(duplicated.validate().is_err());

        let zero_weight = JudgingCriteria {
            project: vec![criterion("a", 10.0, 0.0)],
            presentation: vec![],
        };
        assert!(zero_weight.validate().is_err());
    }

    #[test]
    fn test_criterion_defaults_when_omitted() {
        let parsed: Criterion =
            serde_json::from_str(r#"{"id":"ux","name":"UX","description":null}"#).unwrap();
        assert_eq!(parsed.max_score, 10.0);
        assert_eq!(parsed.weight, 1.0);
    }

    #[test]
    fn test_scope_wire_format() {
        let json = serde_json::to_string(&Scope::ProblemStatement(2)).unwrap();
        assert_eq!(json, r#"{"kind":"problem_statement","index":2}"#);
    }
}
