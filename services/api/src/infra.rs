use async_trait::async_trait;
use decision_desk::config::DatabaseConfig;
use decision_desk::error::AppError;
use decision_desk::storage::{DatabasePool, PostgresDecisionLog};
use decision_desk::workflows::decision::{
    DecisionLogId, DecisionLogRecord, DecisionLogStore, LogStoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local decision log used when no database is configured.
///
/// Development and tests only. The log is unbounded and duplicate checks scan
/// every record; set `DATABASE_URL` for anything long running.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDecisionLog {
    records: Arc<Mutex<Vec<DecisionLogRecord>>>,
}

impl InMemoryDecisionLog {
    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Vec<DecisionLogRecord>>, LogStoreError> {
        self.records
            .lock()
            .map_err(|_| LogStoreError::Unavailable("decision log mutex poisoned".to_string()))
    }
}

#[async_trait]
impl DecisionLogStore for InMemoryDecisionLog {
    async fn record(&self, record: DecisionLogRecord) -> Result<DecisionLogId, LogStoreError> {
        let mut guard = self.guard()?;
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(LogStoreError::Conflict);
        }
        let id = record.id;
        guard.push(record);
        Ok(id)
    }

    async fn fetch(&self, id: DecisionLogId) -> Result<Option<DecisionLogRecord>, LogStoreError> {
        let guard = self.guard()?;
        Ok(guard.iter().find(|record| record.id == id).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<DecisionLogRecord>, LogStoreError> {
        let guard = self.guard()?;
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Decision log selected at startup from the database configuration.
#[derive(Clone)]
pub(crate) enum ConfiguredDecisionLog {
    Memory(InMemoryDecisionLog),
    Postgres(PostgresDecisionLog),
}

#[async_trait]
impl DecisionLogStore for ConfiguredDecisionLog {
    async fn record(&self, record: DecisionLogRecord) -> Result<DecisionLogId, LogStoreError> {
        match self {
            Self::Memory(store) => store.record(record).await,
            Self::Postgres(store) => store.record(record).await,
        }
    }

    async fn fetch(&self, id: DecisionLogId) -> Result<Option<DecisionLogRecord>, LogStoreError> {
        match self {
            Self::Memory(store) => store.fetch(id).await,
            Self::Postgres(store) => store.fetch(id).await,
        }
    }

    async fn recent(&self, limit: usize) -> Result<Vec<DecisionLogRecord>, LogStoreError> {
        match self {
            Self::Memory(store) => store.recent(limit).await,
            Self::Postgres(store) => store.recent(limit).await,
        }
    }
}

/// Opens the decision log described by `config`: Postgres when a URL is set,
/// memory otherwise. The pool is returned so the caller can close it.
pub(crate) async fn open_decision_log(
    config: &DatabaseConfig,
) -> Result<(ConfiguredDecisionLog, Option<DatabasePool>), AppError> {
    if config.url.is_none() {
        warn!("DATABASE_URL not set; decision log is kept in memory");
        return Ok((
            ConfiguredDecisionLog::Memory(InMemoryDecisionLog::default()),
            None,
        ));
    }

    let pool = DatabasePool::connect(config).await?;
    Ok((
        ConfiguredDecisionLog::Postgres(PostgresDecisionLog::new(&pool)),
        Some(pool),
    ))
}
