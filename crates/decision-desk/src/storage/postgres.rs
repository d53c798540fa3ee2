use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::workflows::decision::domain::ModelId;
use crate::workflows::decision::repository::{
    DecisionLogId, DecisionLogRecord, DecisionLogStore, LogStoreError,
};

const CREATE_DECISION_LOGS: &str = r#"
    CREATE TABLE IF NOT EXISTS decision_logs (
        id UUID PRIMARY KEY,
        model_id TEXT NOT NULL,
        input_data JSONB NOT NULL,
        decision_result JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_CREATED_AT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS decision_logs_created_at_idx ON decision_logs (created_at DESC)";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("DATABASE_URL is not configured")]
    MissingUrl,
    #[error("failed to connect to PostgreSQL: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to prepare decision log schema: {0}")]
    Schema(#[source] sqlx::Error),
}

/// Explicitly owned connection pool. Built once at startup, closed on shutdown.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let url = config.url.as_deref().ok_or(StorageError::MissingUrl)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await
            .map_err(StorageError::Connect)?;

        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        for statement in [CREATE_DECISION_LOGS, CREATE_CREATED_AT_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(StorageError::Schema)?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// PostgreSQL implementation of [`DecisionLogStore`].
#[derive(Debug, Clone)]
pub struct PostgresDecisionLog {
    pool: PgPool,
}

impl PostgresDecisionLog {
    pub fn new(database: &DatabasePool) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }
}

#[async_trait]
impl DecisionLogStore for PostgresDecisionLog {
    async fn record(&self, record: DecisionLogRecord) -> Result<DecisionLogId, LogStoreError> {
        sqlx::query(
            r#"
            INSERT INTO decision_logs (id, model_id, input_data, decision_result, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id.0)
        .bind(record.model_id.as_str())
        .bind(Json(&record.input_data))
        .bind(Json(&record.decision_result))
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => LogStoreError::Conflict,
            _ => LogStoreError::Unavailable(err.to_string()),
        })?;

        Ok(record.id)
    }

    async fn fetch(&self, id: DecisionLogId) -> Result<Option<DecisionLogRecord>, LogStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, model_id, input_data, decision_result, created_at
            FROM decision_logs
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| LogStoreError::Unavailable(err.to_string()))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<DecisionLogRecord>, LogStoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT id, model_id, input_data, decision_result, created_at
            FROM decision_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| LogStoreError::Unavailable(err.to_string()))?;

        rows.iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: &PgRow) -> Result<DecisionLogRecord, LogStoreError> {
    let corrupt = |err: sqlx::Error| LogStoreError::Corrupt(err.to_string());

    let id: Uuid = row.try_get("id").map_err(corrupt)?;
    let model_id: String = row.try_get("model_id").map_err(corrupt)?;
    let Json(input_data): Json<Value> = row.try_get("input_data").map_err(corrupt)?;
    let Json(decision_result): Json<Value> = row.try_get("decision_result").map_err(corrupt)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(corrupt)?;

    Ok(DecisionLogRecord {
        id: DecisionLogId(id),
        model_id: ModelId(model_id),
        input_data,
        decision_result,
        created_at,
    })
}
