//! Domain models
//!
//! This module contains all domain models used throughout the application.

pub mod assignment;
pub mod hackathon;
pub mod progress;
pub mod score;
pub mod submission;
pub mod team;

pub use assignment::*;
pub use hackathon::*;
pub use progress::*;
pub use score::*;
pub use submission::*;
pub use team::*;
