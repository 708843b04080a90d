use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::models::{AvailabilityBlock, Requester, Roster, Worker};

/// Errors that can occur when loading reference records
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

/// Client for the requester and worker reference records
///
/// Records are loaded wholesale into an in-memory `Roster` snapshot at
/// startup and on explicit reload; the routing path itself never touches
/// the database.
pub struct RegistryClient {
    pool: PgPool,
}

impl RegistryClient {
    /// Connect to PostgreSQL and run pending migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, RegistryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Shared pool handle, used by the decision log
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Load the full requester and worker pools
    ///
    /// Malformed rows are skipped with a warning rather than failing the
    /// whole load; one bad record must not take the roster down.
    pub async fn load_roster(&self) -> Result<Roster, RegistryError> {
        let requesters = self.load_requesters().await?;
        let workers = self.load_workers().await?;

        tracing::info!(
            "Loaded roster: {} requesters, {} workers",
            requesters.len(),
            workers.len()
        );

        Ok(Roster {
            requesters,
            workers,
        })
    }

    async fn load_requesters(&self) -> Result<Vec<Requester>, RegistryError> {
        let rows = sqlx::query("SELECT * FROM requesters ORDER BY requester_id")
            .fetch_all(&self.pool)
            .await?;

        let mut requesters = Vec::with_capacity(rows.len());
        for row in &rows {
            match parse_requester(row) {
                Ok(requester) => requesters.push(requester),
                Err(e) => tracing::warn!("Skipping malformed requester record: {}", e),
            }
        }
        Ok(requesters)
    }

    async fn load_workers(&self) -> Result<Vec<Worker>, RegistryError> {
        let rows = sqlx::query("SELECT * FROM workers ORDER BY worker_id")
            .fetch_all(&self.pool)
            .await?;

        let mut workers = Vec::with_capacity(rows.len());
        for row in &rows {
            match parse_worker(row) {
                Ok(worker) => workers.push(worker),
                Err(e) => tracing::warn!("Skipping malformed worker record: {}", e),
            }
        }
        Ok(workers)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, RegistryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn parse_requester(row: &PgRow) -> Result<Requester, sqlx::Error> {
    Ok(Requester {
        requester_id: row.try_get("requester_id")?,
        name: row.try_get("name")?,
        timezone: row.try_get("timezone")?,
        languages: row.try_get::<Json<Vec<String>>, _>("languages")?.0,
        domain_tags: row.try_get::<Json<Vec<String>>, _>("domain_tags")?.0,
        availability: row
            .try_get::<Json<Vec<AvailabilityBlock>>, _>("availability")?
            .0,
        avg_session_min: row.try_get("avg_session_min")?,
        avg_session_cost: row.try_get("avg_session_cost")?,
        avg_satisfaction: row.try_get("avg_satisfaction")?,
        completion_rate: row.try_get("completion_rate")?,
        past_session_count: row.try_get("past_session_count")?,
    })
}

fn parse_worker(row: &PgRow) -> Result<Worker, sqlx::Error> {
    Ok(Worker {
        worker_id: row.try_get("worker_id")?,
        name: row.try_get("name")?,
        timezone: row.try_get("timezone")?,
        languages: row.try_get::<Json<Vec<String>>, _>("languages")?.0,
        expertise_tags: row.try_get::<Json<Vec<String>>, _>("expertise_tags")?.0,
        rate: row.try_get("rate")?,
        avg_session_min: row.try_get("avg_session_min")?,
        empathy_score: row.try_get("empathy_score")?,
        reliability: row.try_get("reliability")?,
        max_concurrent: row.try_get("max_concurrent")?,
        availability: row
            .try_get::<Json<Vec<AvailabilityBlock>>, _>("availability")?
            .0,
    })
}
