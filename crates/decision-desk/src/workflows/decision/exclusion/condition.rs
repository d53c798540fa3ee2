use std::cmp::Ordering;

use super::super::domain::{Comparator, Condition, FieldValue};

/// Evaluates one condition against a field's processed value.
///
/// A missing value equals nothing and orders against nothing, so only `Neq`
/// holds for it.
pub fn evaluate(value: Option<&FieldValue>, condition: &Condition) -> bool {
    let threshold = &condition.threshold;
    match condition.comparator {
        Comparator::Eq => value == Some(threshold),
        Comparator::Neq => value != Some(threshold),
        Comparator::Lteq => matches!(
            ordering(value, threshold),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Comparator::Gt => ordering(value, threshold) == Some(Ordering::Greater),
        Comparator::Unrecognized => false,
    }
}

fn ordering(value: Option<&FieldValue>, threshold: &FieldValue) -> Option<Ordering> {
    value.and_then(|value| value.partial_cmp_same_kind(threshold))
}
