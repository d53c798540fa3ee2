use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::domain::ModelId;

/// Stable opaque handle of a decision log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionLogId(pub Uuid);

impl DecisionLogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DecisionLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DecisionLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One scenario submission and the decision the remote service returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionLogRecord {
    pub id: DecisionLogId,
    pub model_id: ModelId,
    pub input_data: Value,
    pub decision_result: Value,
    pub created_at: DateTime<Utc>,
}

impl DecisionLogRecord {
    /// Builds a fresh record stamped with the current time.
    pub fn new(model_id: ModelId, input_data: Value, decision_result: Value) -> Self {
        Self {
            id: DecisionLogId::new(),
            model_id,
            input_data,
            decision_result,
            created_at: Utc::now(),
        }
    }
}

/// Append-only store of decision attempts. Records are never mutated or deleted.
#[async_trait]
pub trait DecisionLogStore: Send + Sync {
    async fn record(&self, record: DecisionLogRecord) -> Result<DecisionLogId, LogStoreError>;
    async fn fetch(&self, id: DecisionLogId) -> Result<Option<DecisionLogRecord>, LogStoreError>;
    /// Most recent records first.
    async fn recent(&self, limit: usize) -> Result<Vec<DecisionLogRecord>, LogStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LogStoreError {
    #[error("decision log record already exists")]
    Conflict,
    #[error("decision log unavailable: {0}")]
    Unavailable(String),
    #[error("decision log record is corrupt: {0}")]
    Corrupt(String),
}
