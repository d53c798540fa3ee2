//! Scenario validation and decision proxy for remote predictive decision models.
//!
//! The [`workflows::decision`] module holds the rule engine that guards scenario
//! submissions, the collaborator traits for the remote decision API and the
//! decision log, and the HTTP router exposing them.

pub mod config;
pub mod error;
pub mod storage;
pub mod telemetry;
pub mod workflows;
