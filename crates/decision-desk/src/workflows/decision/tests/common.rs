use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::workflows::decision::domain::{
    Comparator, Condition, ExclusionRule, FieldDefinition, FieldDomain, FieldValue, ModelDetail,
    ModelId, ModelMetadata, ModelSummary, ScenarioInput,
};
use crate::workflows::decision::gateway::{DecisionSubmitter, GatewayError, ModelCatalog};
use crate::workflows::decision::repository::{
    DecisionLogId, DecisionLogRecord, DecisionLogStore, LogStoreError,
};
use crate::workflows::decision::service::DecisionService;

pub(super) const MODEL_ID: &str = "58d3bcf97c6b1644db73ad12";

pub(super) fn age_field() -> FieldDefinition {
    FieldDefinition {
        name: "age".to_string(),
        question: Some("How old is the applicant?".to_string()),
        domain: FieldDomain::Continuous {
            lower: 18.0,
            upper: 65.0,
            discrete: true,
        },
    }
}

pub(super) fn income_field() -> FieldDefinition {
    FieldDefinition {
        name: "income".to_string(),
        question: None,
        domain: FieldDomain::Continuous {
            lower: 0.0,
            upper: 250_000.5,
            discrete: false,
        },
    }
}

pub(super) fn plan_field() -> FieldDefinition {
    FieldDefinition {
        name: "plan".to_string(),
        question: Some("Which plan?".to_string()),
        domain: FieldDomain::Nominal {
            values: vec!["Basic".to_string(), "Premium".to_string()],
        },
    }
}

pub(super) fn named(name: &str) -> FieldDefinition {
    FieldDefinition {
        name: name.to_string(),
        question: None,
        domain: FieldDomain::Unsupported {
            kind: "Text".to_string(),
        },
    }
}

pub(super) fn condition(index: usize, comparator: Comparator, threshold: FieldValue) -> Condition {
    Condition {
        index,
        comparator,
        threshold,
    }
}

pub(super) fn input(entries: &[(&str, FieldValue)]) -> ScenarioInput {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// age, income, plan with one rule: applicants under 21 may not pick Premium.
pub(super) fn premium_metadata() -> ModelMetadata {
    ModelMetadata::new(
        vec![age_field(), income_field(), plan_field()],
        vec![ExclusionRule::BlatantEx {
            antecedent: vec![
                condition(0, Comparator::Lteq, FieldValue::Number(20.0)),
                condition(2, Comparator::Eq, FieldValue::from("Premium")),
            ],
        }],
    )
    .expect("valid metadata")
}

pub(super) fn premium_model() -> ModelDetail {
    ModelDetail {
        id: ModelId::from(MODEL_ID),
        name: "Plan upgrade".to_string(),
        description: "Decides whether a customer qualifies for an upgrade".to_string(),
        metadata: premium_metadata(),
    }
}

pub(super) fn valid_entries() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("age".to_string(), "30".to_string()),
        ("income".to_string(), "52000.50".to_string()),
        ("plan".to_string(), "Premium".to_string()),
    ])
}

#[derive(Default)]
pub(super) struct StubGateway {
    pub(super) models: Mutex<Vec<ModelDetail>>,
    pub(super) submissions: Mutex<Vec<(ModelId, Value)>>,
    pub(super) batches: Mutex<Vec<(ModelId, Vec<Value>)>>,
    pub(super) failure: Mutex<Option<GatewayError>>,
    pub(super) submit_failure: Mutex<Option<GatewayError>>,
    pub(super) documents: Mutex<BTreeMap<String, Value>>,
}

impl StubGateway {
    pub(super) fn with_model(model: ModelDetail) -> Self {
        let gateway = Self::default();
        gateway.models.lock().expect("models mutex poisoned").push(model);
        gateway
    }

    /// Serves `document` verbatim for `id`, bypassing the typed models.
    pub(super) fn serve_document(&self, id: &str, document: Value) {
        self.documents
            .lock()
            .expect("documents mutex poisoned")
            .insert(id.to_string(), document);
    }

    pub(super) fn fail_with(&self, error: GatewayError) {
        *self.failure.lock().expect("failure mutex poisoned") = Some(error);
    }

    /// Fails decision requests only; the catalog keeps answering.
    pub(super) fn fail_submissions_with(&self, error: GatewayError) {
        *self
            .submit_failure
            .lock()
            .expect("failure mutex poisoned") = Some(error);
    }

    pub(super) fn submissions(&self) -> Vec<(ModelId, Value)> {
        self.submissions
            .lock()
            .expect("submissions mutex poisoned")
            .clone()
    }

    fn check_failure(&self) -> Result<(), GatewayError> {
        match self.failure.lock().expect("failure mutex poisoned").clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ModelCatalog for StubGateway {
    async fn catalog_document(&self) -> Result<Value, GatewayError> {
        self.check_failure()?;
        let summaries: Vec<ModelSummary> = self
            .models
            .lock()
            .expect("models mutex poisoned")
            .iter()
            .map(|model| ModelSummary {
                id: model.id.clone(),
                name: model.name.clone(),
                description: model.description.clone(),
            })
            .collect();
        Ok(json!({ "data": summaries }))
    }

    async fn model_document(&self, id: &ModelId) -> Result<Value, GatewayError> {
        self.check_failure()?;
        if let Some(document) = self
            .documents
            .lock()
            .expect("documents mutex poisoned")
            .get(id.as_str())
        {
            return Ok(document.clone());
        }
        self.models
            .lock()
            .expect("models mutex poisoned")
            .iter()
            .find(|model| &model.id == id)
            .map(|model| json!({ "data": model }))
            .ok_or_else(|| GatewayError::Status {
                status: 404,
                detail: format!("model {id} not found"),
            })
    }
}

#[async_trait]
impl DecisionSubmitter for StubGateway {
    async fn submit(&self, model_id: &ModelId, payload: &Value) -> Result<Value, GatewayError> {
        self.check_failure()?;
        if let Some(error) = self
            .submit_failure
            .lock()
            .expect("failure mutex poisoned")
            .clone()
        {
            return Err(error);
        }
        self.submissions
            .lock()
            .expect("submissions mutex poisoned")
            .push((model_id.clone(), payload.clone()));
        Ok(json!({
            "data": {
                "type": "scenario",
                "attributes": { "decision": "approve", "confidence": 0.87 }
            }
        }))
    }

    async fn submit_batch(
        &self,
        model_id: &ModelId,
        inputs: &[Value],
    ) -> Result<Vec<Value>, GatewayError> {
        self.check_failure()?;
        self.batches
            .lock()
            .expect("batches mutex poisoned")
            .push((model_id.clone(), inputs.to_vec()));
        Ok((0..inputs.len())
            .map(|position| json!({ "decision": "approve", "position": position }))
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryLog {
    pub(super) records: Arc<Mutex<Vec<DecisionLogRecord>>>,
}

impl MemoryLog {
    pub(super) fn records(&self) -> Vec<DecisionLogRecord> {
        self.records.lock().expect("log mutex poisoned").clone()
    }
}

#[async_trait]
impl DecisionLogStore for MemoryLog {
    async fn record(&self, record: DecisionLogRecord) -> Result<DecisionLogId, LogStoreError> {
        let id = record.id;
        self.records.lock().expect("log mutex poisoned").push(record);
        Ok(id)
    }

    async fn fetch(&self, id: DecisionLogId) -> Result<Option<DecisionLogRecord>, LogStoreError> {
        Ok(self
            .records
            .lock()
            .expect("log mutex poisoned")
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<DecisionLogRecord>, LogStoreError> {
        Ok(self
            .records
            .lock()
            .expect("log mutex poisoned")
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

pub(super) struct OfflineLog;

#[async_trait]
impl DecisionLogStore for OfflineLog {
    async fn record(&self, _record: DecisionLogRecord) -> Result<DecisionLogId, LogStoreError> {
        Err(LogStoreError::Unavailable("database offline".to_string()))
    }

    async fn fetch(&self, _id: DecisionLogId) -> Result<Option<DecisionLogRecord>, LogStoreError> {
        Err(LogStoreError::Unavailable("database offline".to_string()))
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<DecisionLogRecord>, LogStoreError> {
        Err(LogStoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    DecisionService<StubGateway, MemoryLog>,
    Arc<StubGateway>,
    Arc<MemoryLog>,
) {
    let gateway = Arc::new(StubGateway::with_model(premium_model()));
    let log = Arc::new(MemoryLog::default());
    let service = DecisionService::new(gateway.clone(), log.clone());
    (service, gateway, log)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
