use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::client::JSON_API_MEDIA_TYPE;
use super::domain::ModelId;
use super::form::FormState;
use super::gateway::{DecisionSubmitter, ModelCatalog};
use super::repository::{DecisionLogId, DecisionLogStore};
use super::service::DecisionService;
use crate::error::AppError;

const DEFAULT_LOG_PAGE: usize = 20;
const MAX_LOG_PAGE: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub model_id: ModelId,
    pub input_data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDecisionRequest {
    pub model_id: ModelId,
    pub batch_inputs: Vec<Value>,
}

/// Raw form entries keyed by field name. Numbers are accepted and kept as typed text.
#[derive(Debug, Default, Deserialize)]
pub struct ScenarioRequest {
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

/// Router builder exposing the model catalog, decision proxy and decision log.
pub fn decision_router<G, L>(service: Arc<DecisionService<G, L>>) -> Router
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    Router::new()
        .route("/api/models", get(list_models_handler::<G, L>))
        .route("/api/models/:model_id", get(model_handler::<G, L>))
        .route("/api/models/:model_id/form", get(form_handler::<G, L>))
        .route(
            "/api/models/:model_id/scenario",
            post(scenario_handler::<G, L>),
        )
        .route("/api/decision", post(decision_handler::<G, L>))
        .route("/api/decision/batch", post(batch_handler::<G, L>))
        .route("/api/decision/logs", get(recent_logs_handler::<G, L>))
        .route("/api/decision/logs/:log_id", get(log_handler::<G, L>))
        .with_state(service)
}

pub(crate) async fn list_models_handler<G, L>(
    State(service): State<Arc<DecisionService<G, L>>>,
) -> Result<Response, AppError>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    let document = service.catalog_document().await?;
    Ok(json_api(StatusCode::OK, &document))
}

pub(crate) async fn model_handler<G, L>(
    State(service): State<Arc<DecisionService<G, L>>>,
    Path(model_id): Path<String>,
) -> Result<Response, AppError>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    let document = service.model_document(&ModelId(model_id)).await?;
    Ok(json_api(StatusCode::OK, &document))
}

pub(crate) async fn form_handler<G, L>(
    State(service): State<Arc<DecisionService<G, L>>>,
    Path(model_id): Path<String>,
) -> Result<Response, AppError>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    let form = service.form(&ModelId(model_id)).await?;
    Ok((StatusCode::OK, Json(form.view())).into_response())
}

pub(crate) async fn scenario_handler<G, L>(
    State(service): State<Arc<DecisionService<G, L>>>,
    Path(model_id): Path<String>,
    payload: Result<Json<ScenarioRequest>, JsonRejection>,
) -> Result<Response, AppError>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return Ok(rejection_response(rejection)),
    };
    let entries: BTreeMap<String, String> = request
        .values
        .into_iter()
        .map(|(name, value)| (name, raw_text(value)))
        .collect();

    let form = service.submit_scenario(&ModelId(model_id), entries).await?;
    let status = match form.state() {
        FormState::Succeeded => StatusCode::OK,
        FormState::ValidationFailed | FormState::ExclusionFailed => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(form.view())).into_response())
}

pub(crate) async fn decision_handler<G, L>(
    State(service): State<Arc<DecisionService<G, L>>>,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Response, AppError>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return Ok(rejection_response(rejection)),
    };

    let decision = service.decide(&request.model_id, request.input_data).await?;
    Ok(json_api(StatusCode::OK, &decision))
}

pub(crate) async fn batch_handler<G, L>(
    State(service): State<Arc<DecisionService<G, L>>>,
    payload: Result<Json<BatchDecisionRequest>, JsonRejection>,
) -> Result<Response, AppError>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return Ok(rejection_response(rejection)),
    };

    let results = service
        .decide_batch(&request.model_id, request.batch_inputs)
        .await?;
    Ok(json_api(StatusCode::OK, &Value::Array(results)))
}

pub(crate) async fn recent_logs_handler<G, L>(
    State(service): State<Arc<DecisionService<G, L>>>,
    Query(query): Query<LogQuery>,
) -> Result<Response, AppError>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_LOG_PAGE).clamp(1, MAX_LOG_PAGE);
    let records = service.recent_logs(limit).await?;
    Ok((StatusCode::OK, Json(json!({ "data": records }))).into_response())
}

pub(crate) async fn log_handler<G, L>(
    State(service): State<Arc<DecisionService<G, L>>>,
    Path(log_id): Path<String>,
) -> Result<Response, AppError>
where
    G: ModelCatalog + DecisionSubmitter + 'static,
    L: DecisionLogStore + 'static,
{
    let Ok(uuid) = Uuid::parse_str(&log_id) else {
        return Ok(not_found(&log_id));
    };

    Ok(match service.log_record(DecisionLogId(uuid)).await? {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => not_found(&log_id),
    })
}

fn json_api(status: StatusCode, body: &Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, JSON_API_MEDIA_TYPE)],
        body.to_string(),
    )
        .into_response()
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": rejection.body_text() });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

fn not_found(log_id: &str) -> Response {
    let payload = json!({ "error": format!("decision log {log_id} not found") });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

fn raw_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
