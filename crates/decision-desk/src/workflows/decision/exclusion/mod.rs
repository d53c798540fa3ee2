mod condition;
mod messages;

pub use condition::evaluate;

use serde::Serialize;
use std::fmt;

use super::domain::{
    Condition, ExclusionKind, ExclusionRule, FieldDefinition, ModelMetadata, ScenarioInput,
};

/// First exclusion rule a scenario breaks, in declared rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionViolation {
    pub rule_index: usize,
    pub kind: ExclusionKind,
    pub message: String,
}

impl fmt::Display for ExclusionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Evaluates `rules` in order and stops at the first violation.
///
/// Inputs are expected to have passed field validation already; conditions
/// whose field is missing from `input` simply do not hold.
pub fn check_exclusions(
    input: &ScenarioInput,
    attributes: &[FieldDefinition],
    rules: &[ExclusionRule],
) -> Option<ExclusionViolation> {
    rules.iter().enumerate().find_map(|(rule_index, rule)| {
        violation_message(input, attributes, rule).map(|message| ExclusionViolation {
            rule_index,
            kind: rule.kind(),
            message,
        })
    })
}

/// Convenience wrapper over [`check_exclusions`] for a whole model.
pub fn check_model(input: &ScenarioInput, metadata: &ModelMetadata) -> Option<ExclusionViolation> {
    check_exclusions(input, metadata.attributes(), metadata.rules())
}

fn violation_message(
    input: &ScenarioInput,
    attributes: &[FieldDefinition],
    rule: &ExclusionRule,
) -> Option<String> {
    match rule {
        ExclusionRule::ValueEx {
            antecedent,
            consequent,
        } => {
            if all_hold(input, attributes, antecedent) && !all_hold(input, attributes, consequent)
            {
                Some(messages::value_ex(attributes, antecedent, consequent))
            } else {
                None
            }
        }
        ExclusionRule::BlatantEx { antecedent } => all_hold(input, attributes, antecedent)
            .then(|| messages::blatant_ex(attributes, antecedent)),
        ExclusionRule::RelationshipEx { relation } => (!holds(input, attributes, relation))
            .then(|| messages::relationship_ex(attributes, relation)),
        ExclusionRule::Unrecognized => None,
    }
}

fn all_hold(
    input: &ScenarioInput,
    attributes: &[FieldDefinition],
    conditions: &[Condition],
) -> bool {
    conditions
        .iter()
        .all(|condition| holds(input, attributes, condition))
}

fn holds(input: &ScenarioInput, attributes: &[FieldDefinition], condition: &Condition) -> bool {
    let value = attributes
        .get(condition.index)
        .and_then(|field| input.get(&field.name));
    evaluate(value, condition)
}
