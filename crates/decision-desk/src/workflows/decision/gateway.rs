use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::domain::{ModelDetail, ModelId, ModelSummary};

/// Read side of the remote decision API.
///
/// Implementors return the upstream documents untouched so they can be relayed
/// as-is; the typed accessors decode the `data` member on top of them.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn catalog_document(&self) -> Result<Value, GatewayError>;
    async fn model_document(&self, id: &ModelId) -> Result<Value, GatewayError>;

    async fn list_models(&self) -> Result<Vec<ModelSummary>, GatewayError> {
        decode_data(self.catalog_document().await?)
    }

    async fn get_model(&self, id: &ModelId) -> Result<ModelDetail, GatewayError> {
        decode_data(self.model_document(id).await?)
    }
}

fn decode_data<T: DeserializeOwned>(mut document: Value) -> Result<T, GatewayError> {
    let data = document
        .get_mut("data")
        .map(Value::take)
        .ok_or_else(|| GatewayError::Decode("document carries no data member".to_string()))?;
    serde_json::from_value(data).map_err(|err| GatewayError::Decode(err.to_string()))
}

/// Write side of the remote decision API. Results are relayed untouched.
#[async_trait]
pub trait DecisionSubmitter: Send + Sync {
    async fn submit(&self, model_id: &ModelId, payload: &Value) -> Result<Value, GatewayError>;

    /// One result per input, in input order.
    async fn submit_batch(
        &self,
        model_id: &ModelId,
        inputs: &[Value],
    ) -> Result<Vec<Value>, GatewayError>;
}

/// Failure talking to the remote decision API. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("decision API request failed: {0}")]
    Transport(String),
    #[error("decision API responded with status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("decision API returned an unexpected payload: {0}")]
    Decode(String),
}
