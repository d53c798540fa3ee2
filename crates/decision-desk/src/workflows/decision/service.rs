use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::domain::{ModelDetail, ModelId, ModelSummary};
use super::form::{FormError, ScenarioForm};
use super::gateway::{DecisionSubmitter, GatewayError, ModelCatalog};
use super::repository::{DecisionLogId, DecisionLogRecord, DecisionLogStore, LogStoreError};

/// Service composing the remote decision API with the decision log.
pub struct DecisionService<G, L> {
    gateway: Arc<G>,
    log: Arc<L>,
}

impl<G, L> DecisionService<G, L>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    pub fn new(gateway: Arc<G>, log: Arc<L>) -> Self {
        Self { gateway, log }
    }

    pub async fn models(&self) -> Result<Vec<ModelSummary>, DecisionServiceError> {
        Ok(self.gateway.list_models().await?)
    }

    /// Upstream catalog document, relayed without re-encoding.
    pub async fn catalog_document(&self) -> Result<Value, DecisionServiceError> {
        Ok(self.gateway.catalog_document().await?)
    }

    /// Upstream model document, relayed without re-encoding.
    pub async fn model_document(&self, id: &ModelId) -> Result<Value, DecisionServiceError> {
        Ok(self.gateway.model_document(id).await?)
    }

    pub async fn model(&self, id: &ModelId) -> Result<ModelDetail, DecisionServiceError> {
        Ok(self.gateway.get_model(id).await?)
    }

    /// Loads a model and returns an empty form with its hints derived.
    pub async fn form(&self, id: &ModelId) -> Result<ScenarioForm, DecisionServiceError> {
        let model = self.model(id).await?;
        Ok(ScenarioForm::for_model(&model))
    }

    /// Forwards one scenario and logs the (input, result) pair.
    ///
    /// Logging is best effort: a store failure is reported through tracing and
    /// the decision is still returned.
    pub async fn decide(
        &self,
        model_id: &ModelId,
        input_data: Value,
    ) -> Result<Value, DecisionServiceError> {
        let result = self.gateway.submit(model_id, &input_data).await?;
        self.record(model_id, input_data, result.clone()).await;
        Ok(result)
    }

    /// Forwards a batch and logs one record per input/result pair.
    pub async fn decide_batch(
        &self,
        model_id: &ModelId,
        inputs: Vec<Value>,
    ) -> Result<Vec<Value>, DecisionServiceError> {
        let results = self.gateway.submit_batch(model_id, &inputs).await?;

        if results.len() != inputs.len() {
            warn!(
                %model_id,
                inputs = inputs.len(),
                results = results.len(),
                "batch result count differs from input count; logging matched pairs only"
            );
        }

        for (input, result) in inputs.into_iter().zip(results.iter()) {
            self.record(model_id, input, result.clone()).await;
        }

        Ok(results)
    }

    /// Runs a whole form submission server side: fill, validate, check exclusions,
    /// submit and record the outcome on the returned form.
    pub async fn submit_scenario<I, K, V>(
        &self,
        model_id: &ModelId,
        entries: I,
    ) -> Result<ScenarioForm, DecisionServiceError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut form = self.form(model_id).await?;
        form.fill(entries)?;

        let payload = match form.prepare_submission() {
            Ok(payload) => payload,
            Err(blocked) => {
                info!(%model_id, reason = %blocked, "scenario submission blocked");
                return Ok(form);
            }
        };

        match self.decide(model_id, payload.to_value()).await {
            Ok(decision) => form.succeed(decision)?,
            Err(err) => {
                warn!(%model_id, error = %err, "scenario decision request failed");
                form.fail(Some(&failure_detail(&err)))?;
            }
        }

        Ok(form)
    }

    pub async fn log_record(
        &self,
        id: DecisionLogId,
    ) -> Result<Option<DecisionLogRecord>, DecisionServiceError> {
        Ok(self.log.fetch(id).await?)
    }

    pub async fn recent_logs(
        &self,
        limit: usize,
    ) -> Result<Vec<DecisionLogRecord>, DecisionServiceError> {
        Ok(self.log.recent(limit).await?)
    }

    async fn record(
        &self,
        model_id: &ModelId,
        input_data: Value,
        decision_result: Value,
    ) -> Option<DecisionLogId> {
        let record = DecisionLogRecord::new(model_id.clone(), input_data, decision_result);
        match self.log.record(record).await {
            Ok(id) => {
                info!(%model_id, log_id = %id, "decision recorded");
                Some(id)
            }
            Err(err) => {
                warn!(%model_id, error = %err, "failed to record decision");
                None
            }
        }
    }
}

/// Text shown on a failed form: the upstream detail when the API supplied one.
fn failure_detail(err: &DecisionServiceError) -> String {
    match err {
        DecisionServiceError::Gateway(GatewayError::Status { detail, .. }) => detail.clone(),
        other => other.to_string(),
    }
}

/// Error raised by the decision service.
#[derive(Debug, thiserror::Error)]
pub enum DecisionServiceError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    LogStore(#[from] LogStoreError),
    #[error(transparent)]
    Form(#[from] FormError),
}
