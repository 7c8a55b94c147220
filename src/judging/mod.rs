//! Judging engine core
//!
//! Pure functions over the domain models: which submissions are in play,
//! how they are dealt to judges, how scores combine, who advances and where
//! a round is in its lifecycle. Services load state, call into these, and
//! persist the result.

pub mod aggregate;
pub mod coverage;
pub mod distribution;
pub mod lifecycle;
pub mod pool;
pub mod shortlist;
pub mod winners;

pub use aggregate::{aggregate, rank, weighted_score, RankedSubmission, SubmissionAggregate};
pub use coverage::{coverage, pool_progress, Coverage, ScopeProgress, SubmissionProgress};
pub use distribution::rebalance;
pub use lifecycle::{is_opened, phase, progression_blocker, RoundPhase};
pub use pool::{problem_statement_pool, round_pool, scope_pool};
pub use shortlist::{
    apply_shortlist, derive_advancement, select, toggle, Advancement, ShortlistRule,
};
pub use winners::{validate_placements, winner_fingerprint};
