//! Scenario intake for remote decision models.
//!
//! Field validation and the exclusion rule engine are pure functions over a
//! model's metadata. [`ScenarioForm`] orchestrates them per submission, and
//! [`DecisionService`] ties the form to the remote decision API and the
//! decision log.

pub mod batch;
pub mod client;
pub mod domain;
pub mod exclusion;
pub mod form;
pub mod gateway;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use batch::{prepare_batch, read_rows, BatchImportError, PreparedBatch, RejectedRow};
pub use client::TomApiClient;
pub use domain::{
    Comparator, Condition, ExclusionKind, ExclusionRule, FieldDefinition, FieldDomain,
    FieldValue, MetadataError, ModelDetail, ModelId, ModelMetadata, ModelSummary, ScenarioInput,
};
pub use exclusion::{check_exclusions, evaluate, ExclusionViolation};
pub use form::{
    FormError, FormState, ScenarioForm, ScenarioFormView, ScenarioPayload, SubmissionBlocked,
};
pub use gateway::{DecisionSubmitter, GatewayError, ModelCatalog};
pub use repository::{DecisionLogId, DecisionLogRecord, DecisionLogStore, LogStoreError};
pub use router::decision_router;
pub use service::{DecisionService, DecisionServiceError};
pub use validation::{hint, validate, FieldError};
