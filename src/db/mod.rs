use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;

const CONNECT_ATTEMPTS: u32 = 5;

/// Connects to Postgres, retrying with exponential backoff while the
/// database is still starting.
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let url = config.require_database_url()?;
    let mut attempt = 0;

    loop {
        let result = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await;

        match result {
            Ok(pool) => {
                tracing::info!("Database connection established");
                return Ok(pool);
            }
            Err(e) if attempt + 1 < CONNECT_ATTEMPTS => {
                attempt += 1;
                let backoff = Duration::from_secs(2u64.pow(attempt));
                tracing::warn!(
                    "Connection attempt {} failed: {}. Retrying in {:?}",
                    attempt,
                    e,
                    backoff
                );
                sleep(backoff).await;
            }
            Err(e) => {
                tracing::error!("Failed to establish connection after {} attempts", CONNECT_ATTEMPTS);
                return Err(e.into());
            }
        }
    }
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}
