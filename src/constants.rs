//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Upper bound on a single HTTP request, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

/// Storage backends
pub mod storage_backends {
    pub const POSTGRES: &str = "postgres";
    pub const MEMORY: &str = "memory";

    pub const ALL: &[&str] = &[POSTGRES, MEMORY];
}

// =============================================================================
// ENGINE DEFAULTS
// =============================================================================

/// Per-call bound on repository operations, in milliseconds
pub const DEFAULT_REPOSITORY_TIMEOUT_MS: u64 = 5_000;

/// Per-call bound on notification dispatch, in milliseconds
pub const DEFAULT_NOTIFICATION_TIMEOUT_MS: u64 = 2_000;

/// Redis channel that engine events are published on
pub const DEFAULT_NOTIFICATION_CHANNEL: &str = "hackjudge:events";

/// Notification backends
pub mod notification_backends {
    pub const REDIS: &str = "redis";
    pub const LOG: &str = "log";

    pub const ALL: &[&str] = &[REDIS, LOG];
}

// =============================================================================
// JUDGING DEFAULTS
// =============================================================================

/// Max score of a criterion when none is given
pub const DEFAULT_CRITERION_MAX_SCORE: f64 = 10.0;

/// Weight of a criterion when none is given
pub const DEFAULT_CRITERION_WEIGHT: f64 = 1.0;

/// Maximum number of judges accepted by a single invite call
pub const MAX_JUDGES_PER_REQUEST: u64 = 200;

/// Maximum number of criteria in one list of a round
pub const MAX_CRITERIA_PER_LIST: u64 = 50;

// =============================================================================
// USER ROLES
// =============================================================================

/// User role identifiers
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const ORGANIZER: &str = "organizer";
    pub const JUDGE: &str = "judge";
    pub const PARTICIPANT: &str = "participant";

    /// All user roles
    pub const ALL: &[&str] = &[ADMIN, ORGANIZER, JUDGE, PARTICIPANT];
}

// =============================================================================
// API VERSIONING
// =============================================================================

/// Current API version
pub const API_VERSION: &str = "v1";

/// API base path
pub const API_BASE_PATH: &str = "/api/v1";
