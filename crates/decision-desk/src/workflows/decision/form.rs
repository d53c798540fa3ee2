//! Per-request state of a scenario form.
//!
//! A form owns the raw text of every field, the per-field error slots, the
//! exclusion error and the outcome of the last submit. Submission is split in
//! two steps so the caller decides how the decision is fetched:
//! [`ScenarioForm::prepare_submission`] runs field validation and the
//! exclusion rules and yields the payload, then [`ScenarioForm::succeed`] or
//! [`ScenarioForm::fail`] records what the remote service answered.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::domain::{
    FieldDefinition, FieldDomain, ModelDetail, ModelId, ModelMetadata, ScenarioInput,
};
use super::exclusion::{check_model, ExclusionViolation};
use super::validation::{hint, validate, FieldError};

pub const FIELD_ERRORS_MESSAGE: &str = "Please correct the highlighted errors before submitting.";
pub const EXCLUSION_MESSAGE: &str = "Your input scenario violates an exclusion rule.";
pub const SUBMISSION_FAILED_MESSAGE: &str = "Failed to submit decision.";

/// Lifecycle of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    Idle,
    Validating,
    ValidationFailed,
    ExclusionFailed,
    Submitting,
    Succeeded,
    Failed,
}

impl FormState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FormState::ValidationFailed
                | FormState::ExclusionFailed
                | FormState::Succeeded
                | FormState::Failed
        )
    }
}

/// JSON:API document sent to the decision endpoint for a single scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioPayload {
    data: ScenarioDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ScenarioDocument {
    #[serde(rename = "type")]
    resource_type: &'static str,
    attributes: ScenarioAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ScenarioAttributes {
    input: ScenarioInput,
}

impl ScenarioPayload {
    pub fn new(input: ScenarioInput) -> Self {
        Self {
            data: ScenarioDocument {
                resource_type: "scenario",
                attributes: ScenarioAttributes { input },
            },
        }
    }

    pub fn input(&self) -> &ScenarioInput {
        &self.data.attributes.input
    }

    pub fn into_input(self) -> ScenarioInput {
        self.data.attributes.input
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Why a submit did not produce a payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionBlocked {
    #[error("{}", FIELD_ERRORS_MESSAGE)]
    InvalidFields { errors: BTreeMap<String, FieldError> },
    #[error("{0}")]
    Excluded(ExclusionViolation),
    #[error("a decision request for this form is already in flight")]
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("model has no field named '{0}'")]
    UnknownField(String),
    #[error("form is not waiting for a decision (state {0:?})")]
    NotSubmitting(FormState),
}

#[derive(Debug, Clone)]
pub struct ScenarioForm {
    model_id: ModelId,
    metadata: ModelMetadata,
    hints: BTreeMap<String, String>,
    values: BTreeMap<String, String>,
    field_errors: BTreeMap<String, FieldError>,
    exclusion_error: Option<ExclusionViolation>,
    error: Option<String>,
    decision: Option<Value>,
    state: FormState,
}

impl ScenarioForm {
    pub fn new(model_id: ModelId, metadata: ModelMetadata) -> Self {
        let hints = metadata
            .attributes()
            .iter()
            .filter_map(|field| hint(field).map(|text| (field.name.clone(), text)))
            .collect();

        Self {
            model_id,
            metadata,
            hints,
            values: BTreeMap::new(),
            field_errors: BTreeMap::new(),
            exclusion_error: None,
            error: None,
            decision: None,
            state: FormState::Idle,
        }
    }

    pub fn for_model(model: &ModelDetail) -> Self {
        Self::new(model.id.clone(), model.metadata.clone())
    }

    pub fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn hints(&self) -> &BTreeMap<String, String> {
        &self.hints
    }

    pub fn field_errors(&self) -> &BTreeMap<String, FieldError> {
        &self.field_errors
    }

    pub fn exclusion_error(&self) -> Option<&ExclusionViolation> {
        self.exclusion_error.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn decision(&self) -> Option<&Value> {
        self.decision.as_ref()
    }

    /// Stores a raw entry and refreshes that field's error slot immediately.
    pub fn edit(&mut self, name: &str, raw: impl Into<String>) -> Result<(), FormError> {
        let field = self
            .metadata
            .field(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        let raw = raw.into();

        match validate(field, &raw) {
            Ok(_) => {
                self.field_errors.remove(name);
            }
            Err(error) => {
                self.field_errors.insert(name.to_string(), error);
            }
        }
        self.values.insert(name.to_string(), raw);

        if self.state.is_terminal() {
            self.state = FormState::Idle;
        }
        Ok(())
    }

    pub fn fill<I, K, V>(&mut self, entries: I) -> Result<(), FormError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, raw) in entries {
            self.edit(name.as_ref(), raw)?;
        }
        Ok(())
    }

    /// Validates every declared field, then the exclusion rules, and returns the
    /// payload to hand to the decision service.
    pub fn prepare_submission(&mut self) -> Result<ScenarioPayload, SubmissionBlocked> {
        if self.state == FormState::Submitting {
            return Err(SubmissionBlocked::InFlight);
        }

        self.state = FormState::Validating;
        self.field_errors.clear();
        self.exclusion_error = None;
        self.error = None;
        self.decision = None;

        let mut input = ScenarioInput::new();
        for field in self.metadata.attributes() {
            let raw = self.values.get(&field.name).map(String::as_str).unwrap_or("");
            match validate(field, raw) {
                Ok(value) => {
                    input.insert(field.name.clone(), value);
                }
                Err(error) => {
                    self.field_errors.insert(field.name.clone(), error);
                }
            }
        }

        if !self.field_errors.is_empty() {
            self.state = FormState::ValidationFailed;
            self.error = Some(FIELD_ERRORS_MESSAGE.to_string());
            return Err(SubmissionBlocked::InvalidFields {
                errors: self.field_errors.clone(),
            });
        }

        if let Some(violation) = check_model(&input, &self.metadata) {
            tracing::debug!(
                model_id = %self.model_id,
                rule_index = violation.rule_index,
                "scenario rejected by exclusion rule"
            );
            self.state = FormState::ExclusionFailed;
            self.error = Some(EXCLUSION_MESSAGE.to_string());
            self.exclusion_error = Some(violation.clone());
            return Err(SubmissionBlocked::Excluded(violation));
        }

        self.state = FormState::Submitting;
        Ok(ScenarioPayload::new(input))
    }

    pub fn succeed(&mut self, decision: Value) -> Result<(), FormError> {
        self.expect_submitting()?;
        self.state = FormState::Succeeded;
        self.decision = Some(decision);
        Ok(())
    }

    /// Records a failed decision request; an empty detail falls back to a generic message.
    pub fn fail(&mut self, detail: Option<&str>) -> Result<(), FormError> {
        self.expect_submitting()?;
        self.state = FormState::Failed;
        let message = detail
            .map(str::trim)
            .filter(|detail| !detail.is_empty())
            .unwrap_or(SUBMISSION_FAILED_MESSAGE);
        self.error = Some(message.to_string());
        Ok(())
    }

    fn expect_submitting(&self) -> Result<(), FormError> {
        if self.state == FormState::Submitting {
            Ok(())
        } else {
            Err(FormError::NotSubmitting(self.state))
        }
    }

    pub fn view(&self) -> ScenarioFormView {
        let fields = self
            .metadata
            .attributes()
            .iter()
            .map(|field| self.field_view(field))
            .collect();

        ScenarioFormView {
            model_id: self.model_id.clone(),
            state: self.state,
            fields,
            exclusion_error: self
                .exclusion_error
                .as_ref()
                .map(|violation| violation.message.clone()),
            error: self.error.clone(),
            decision: self.decision.clone(),
        }
    }

    fn field_view(&self, field: &FieldDefinition) -> FieldView {
        let options = match &field.domain {
            FieldDomain::Nominal { values } => Some(values.clone()),
            FieldDomain::Continuous { .. } | FieldDomain::Unsupported { .. } => None,
        };

        FieldView {
            name: field.name.clone(),
            label: field.label().to_string(),
            kind: field.domain.kind_label().to_string(),
            hint: self.hints.get(&field.name).cloned(),
            options,
            value: self.values.get(&field.name).cloned(),
            error: self.field_errors.get(&field.name).map(ToString::to_string),
        }
    }
}

/// Serializable snapshot of a form for API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioFormView {
    pub model_id: ModelId,
    pub state: FormState,
    pub fields: Vec<FieldView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
