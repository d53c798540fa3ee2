use serde::Serialize;

use super::domain::{FieldDefinition, FieldDomain, FieldValue};

/// Reason a raw field entry was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("Please enter a numeric value.")]
    NotNumeric,
    #[error("Value must be between {lower} and {upper}.")]
    OutOfRange { lower: f64, upper: f64 },
    #[error("Please enter an integer value.")]
    NotInteger,
    #[error("Select one of: {}.", .allowed.join(", "))]
    NotAnOption { allowed: Vec<String> },
}

impl Serialize for FieldError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Validates a raw entry against the field's domain and returns the processed value.
///
/// Continuous fields keep a single error: an out-of-range entry reports the
/// bounds even when it is also fractional.
pub fn validate(field: &FieldDefinition, raw: &str) -> Result<FieldValue, FieldError> {
    match &field.domain {
        FieldDomain::Continuous {
            lower,
            upper,
            discrete,
        } => {
            let value = parse_number(raw).ok_or(FieldError::NotNumeric)?;
            if value < *lower || value > *upper {
                return Err(FieldError::OutOfRange {
                    lower: *lower,
                    upper: *upper,
                });
            }
            if *discrete && value.fract() != 0.0 {
                return Err(FieldError::NotInteger);
            }
            Ok(FieldValue::Number(value))
        }
        FieldDomain::Nominal { values } => {
            if values.iter().any(|allowed| allowed == raw) {
                Ok(FieldValue::Text(raw.to_string()))
            } else {
                Err(FieldError::NotAnOption {
                    allowed: values.clone(),
                })
            }
        }
        FieldDomain::Unsupported { .. } => Ok(FieldValue::Text(raw.to_string())),
    }
}

/// Input guidance shown next to a field before the user types anything.
pub fn hint(field: &FieldDefinition) -> Option<String> {
    match &field.domain {
        FieldDomain::Continuous {
            lower,
            upper,
            discrete,
        } => Some(format!(
            "Enter a number between {lower} and {upper}{}.",
            if *discrete { " (integer)" } else { "" }
        )),
        FieldDomain::Nominal { values } => Some(format!("Select one of: {}.", values.join(", "))),
        FieldDomain::Unsupported { .. } => None,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
