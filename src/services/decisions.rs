use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::DecisionRecord;

/// Errors that can occur when appending to the decision log
#[derive(Debug, Error)]
pub enum DecisionLogError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Decision log unavailable: {0}")]
    Unavailable(String),
}

/// Append-only log of routing decisions
///
/// The log is observability, not correctness: callers treat a failed append
/// as a warning and never fail the request over it.
#[async_trait]
pub trait DecisionLog: Send + Sync {
    async fn append(&self, record: &DecisionRecord) -> Result<(), DecisionLogError>;
}

/// PostgreSQL-backed decision log
pub struct PostgresDecisionLog {
    pool: PgPool,
}

impl PostgresDecisionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DecisionLog for PostgresDecisionLog {
    async fn append(&self, record: &DecisionRecord) -> Result<(), DecisionLogError> {
        let query = r#"
            INSERT INTO decisions
                (requester_id, worker_id, topics, language, budget, sla_min,
                 sensitivity, score, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#;

        sqlx::query(query)
            .bind(record.requester_id)
            .bind(record.worker_id)
            .bind(sqlx::types::Json(&record.topics))
            .bind(&record.language)
            .bind(record.budget)
            .bind(record.sla_min)
            .bind(record.sensitivity)
            .bind(record.score)
            .bind(record.status.as_str())
            .bind(record.created_at)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Appended {} decision for requester {}",
            record.status.as_str(),
            record.requester_id
        );

        Ok(())
    }
}

/// In-memory decision log for tests
#[derive(Default)]
pub struct MemoryDecisionLog {
    records: tokio::sync::Mutex<Vec<DecisionRecord>>,
}

impl MemoryDecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far
    pub async fn records(&self) -> Vec<DecisionRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl DecisionLog for MemoryDecisionLog {
    async fn append(&self, record: &DecisionRecord) -> Result<(), DecisionLogError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}
