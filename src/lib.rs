//! HackJudge - Judge Assignment and Round Progression Engine
//!
//! This library provides the judging backend of a multi-round hackathon
//! platform: inviting judges, distributing submissions among them, scoring,
//! shortlisting and opening each next round.
//!
//! # Architecture
//!
//! The application follows a layered architecture:
//! - **Handlers**: HTTP request handlers (thin layer)
//! - **Services**: Authorization, locking and orchestration
//! - **Judging**: Pure ranking, distribution and progression rules
//! - **Repositories**: Storage behind `EngineRepository`
//! - **Models**: Domain models

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod handlers;
pub mod judging;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
