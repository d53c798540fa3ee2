use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::domain::ModelId;
use super::gateway::{DecisionSubmitter, GatewayError, ModelCatalog};

pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// reqwest-backed client for an up2tom-style decision API.
#[derive(Clone)]
pub struct TomApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for TomApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TomApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TomApiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorization(&self) -> String {
        format!("Token {}", self.api_key)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self
            .http
            .get(self.url(path))
            .header(AUTHORIZATION, self.authorization())
            .header(ACCEPT, JSON_API_MEDIA_TYPE)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        read_json(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, GatewayError> {
        let body = serde_json::to_vec(body).map_err(|err| GatewayError::Decode(err.to_string()))?;
        let response = self
            .http
            .post(self.url(path))
            .header(AUTHORIZATION, self.authorization())
            .header(CONTENT_TYPE, JSON_API_MEDIA_TYPE)
            .header(ACCEPT, JSON_API_MEDIA_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        read_json(response).await
    }
}

#[async_trait]
impl ModelCatalog for TomApiClient {
    async fn catalog_document(&self) -> Result<Value, GatewayError> {
        self.get("models").await
    }

    async fn model_document(&self, id: &ModelId) -> Result<Value, GatewayError> {
        self.get(&format!("models/{id}")).await
    }
}

#[async_trait]
impl DecisionSubmitter for TomApiClient {
    async fn submit(&self, model_id: &ModelId, payload: &Value) -> Result<Value, GatewayError> {
        self.post(&format!("decision/{model_id}"), payload).await
    }

    async fn submit_batch(
        &self,
        model_id: &ModelId,
        inputs: &[Value],
    ) -> Result<Vec<Value>, GatewayError> {
        let body = json!({ "inputs": inputs });
        let response: Value = self
            .post(&format!("decision/batch/{model_id}"), &body)
            .await?;

        match response {
            Value::Array(results) => Ok(results),
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(results)) => Ok(results),
                _ => Err(GatewayError::Decode(
                    "batch response carries no result array".to_string(),
                )),
            },
            _ => Err(GatewayError::Decode(
                "batch response is not an array".to_string(),
            )),
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| GatewayError::Transport(err.to_string()))?;

    if !status.is_success() {
        let detail = error_detail(&bytes).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request rejected")
                .to_string()
        });
        tracing::warn!(status = status.as_u16(), %detail, "decision API rejected request");
        return Err(GatewayError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
}

/// Pulls a readable message out of a JSON:API error document or a plain `{error}` body.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;

    let from_errors = value
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|first| {
            first
                .get("detail")
                .or_else(|| first.get("title"))
                .and_then(Value::as_str)
        });

    from_errors
        .or_else(|| value.get("error").and_then(Value::as_str))
        .or_else(|| value.get("message").and_then(Value::as_str))
        .map(str::to_string)
}
