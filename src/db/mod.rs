//! Database module
//!
//! Connection pool, migrations and the repositories behind `EngineRepository`.

pub mod connection;
pub mod repositories;

use sqlx::PgPool;

pub use connection::*;
pub use repositories::EngineRepository;

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
