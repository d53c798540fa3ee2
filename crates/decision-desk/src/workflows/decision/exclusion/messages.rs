use super::super::domain::{Condition, FieldDefinition};

const PREFIX: &str = "Exclusion rule violation:";

pub(crate) fn value_ex(
    attributes: &[FieldDefinition],
    antecedent: &[Condition],
    consequent: &[Condition],
) -> String {
    let required = consequent
        .iter()
        .map(|condition| {
            format!(
                "{} must be {}",
                label(attributes, condition),
                condition.threshold
            )
        })
        .collect::<Vec<_>>()
        .join(" and ");

    format!(
        "{PREFIX} When {}, then {required}.",
        clauses(attributes, antecedent)
    )
}

pub(crate) fn blatant_ex(attributes: &[FieldDefinition], antecedent: &[Condition]) -> String {
    format!(
        "{PREFIX} {} is not allowed.",
        clauses(attributes, antecedent)
    )
}

pub(crate) fn relationship_ex(attributes: &[FieldDefinition], relation: &Condition) -> String {
    format!(
        "{PREFIX} {} must be {} {}.",
        label(attributes, relation),
        relation.comparator.phrase(),
        relation.threshold
    )
}

fn clauses(attributes: &[FieldDefinition], conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(|condition| {
            format!(
                "{} {} {}",
                label(attributes, condition),
                condition.comparator.symbol(),
                condition.threshold
            )
        })
        .collect::<Vec<_>>()
        .join(" and ")
}

fn label<'a>(attributes: &'a [FieldDefinition], condition: &Condition) -> &'a str {
    attributes
        .get(condition.index)
        .map(FieldDefinition::label)
        .unwrap_or("unknown field")
}
