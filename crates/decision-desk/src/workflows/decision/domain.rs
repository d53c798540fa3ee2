use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier of a remote decision model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A processed field value: numbers for continuous fields, text for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Orders two values of the same variant; mixed variants are incomparable.
    pub fn partial_cmp_same_kind(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Number(left), FieldValue::Number(right)) => left.partial_cmp(right),
            (FieldValue::Text(left), FieldValue::Text(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Field name to processed value, built fresh for every submission attempt.
pub type ScenarioInput = BTreeMap<String, FieldValue>;

/// Legal values of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDomain {
    Continuous { lower: f64, upper: f64, discrete: bool },
    Nominal { values: Vec<String> },
    /// A field type this service does not validate; its raw text is passed through.
    Unsupported { kind: String },
}

impl FieldDomain {
    pub fn kind_label(&self) -> &str {
        match self {
            FieldDomain::Continuous { .. } => "Continuous",
            FieldDomain::Nominal { .. } => "Nominal",
            FieldDomain::Unsupported { kind } => kind,
        }
    }
}

/// One named input slot of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireFieldDefinition", into = "WireFieldDefinition")]
pub struct FieldDefinition {
    pub name: String,
    pub question: Option<String>,
    pub domain: FieldDomain,
}

impl FieldDefinition {
    /// Human-facing label, falling back to the field name.
    pub fn label(&self) -> &str {
        self.question
            .as_deref()
            .filter(|question| !question.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFieldDefinition {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    question: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    domain: Value,
}

#[derive(Debug, Deserialize)]
struct WireContinuousDomain {
    lower: f64,
    upper: f64,
    #[serde(default)]
    discrete: bool,
}

#[derive(Debug, Deserialize)]
struct WireNominalDomain {
    values: Vec<String>,
}

impl TryFrom<WireFieldDefinition> for FieldDefinition {
    type Error = String;

    fn try_from(wire: WireFieldDefinition) -> Result<Self, Self::Error> {
        let domain = match wire.kind.as_str() {
            "Continuous" => {
                let WireContinuousDomain {
                    lower,
                    upper,
                    discrete,
                } = serde_json::from_value(wire.domain).map_err(|err| {
                    format!("field '{}' has an invalid continuous domain: {err}", wire.name)
                })?;
                if lower > upper {
                    return Err(format!(
                        "field '{}' has lower bound {lower} above upper bound {upper}",
                        wire.name
                    ));
                }
                FieldDomain::Continuous {
                    lower,
                    upper,
                    discrete,
                }
            }
            "Nominal" => {
                let WireNominalDomain { values } =
                    serde_json::from_value(wire.domain).map_err(|err| {
                        format!("field '{}' has an invalid nominal domain: {err}", wire.name)
                    })?;
                FieldDomain::Nominal { values }
            }
            other => FieldDomain::Unsupported {
                kind: other.to_string(),
            },
        };

        Ok(Self {
            name: wire.name,
            question: wire.question,
            domain,
        })
    }
}

impl From<FieldDefinition> for WireFieldDefinition {
    fn from(field: FieldDefinition) -> Self {
        let (kind, domain) = match field.domain {
            FieldDomain::Continuous {
                lower,
                upper,
                discrete,
            } => (
                "Continuous".to_string(),
                serde_json::json!({ "lower": lower, "upper": upper, "discrete": discrete }),
            ),
            FieldDomain::Nominal { values } => {
                ("Nominal".to_string(), serde_json::json!({ "values": values }))
            }
            FieldDomain::Unsupported { kind } => (kind, Value::Null),
        };

        Self {
            name: field.name,
            question: field.question,
            kind,
            domain,
        }
    }
}

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Comparator {
    Eq,
    Neq,
    Lteq,
    Gt,
    /// Any comparator name the service does not know. Never satisfied.
    Unrecognized,
}

impl From<String> for Comparator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "EQ" => Self::Eq,
            "NEQ" => Self::Neq,
            "LTEQ" => Self::Lteq,
            "GT" => Self::Gt,
            _ => Self::Unrecognized,
        }
    }
}

impl From<Comparator> for String {
    fn from(value: Comparator) -> Self {
        match value {
            Comparator::Eq => "EQ",
            Comparator::Neq => "NEQ",
            Comparator::Lteq => "LTEQ",
            Comparator::Gt => "GT",
            Comparator::Unrecognized => "UNRECOGNIZED",
        }
        .to_string()
    }
}

impl Comparator {
    /// Symbol used in antecedent clauses: equality reads `=`, every other
    /// comparison reads `≠`.
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            _ => "≠",
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            Comparator::Eq => "equal to",
            Comparator::Neq => "different from",
            Comparator::Lteq => "less than or equal to",
            Comparator::Gt => "greater than",
            Comparator::Unrecognized => "comparable to",
        }
    }
}

/// Atomic comparison of one field, addressed by attribute index, against a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub index: usize,
    #[serde(rename = "type")]
    pub comparator: Comparator,
    pub threshold: FieldValue,
}

/// Cross-field business constraint attached to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExclusionRule {
    /// When every antecedent holds, every consequent must hold too.
    ValueEx {
        #[serde(deserialize_with = "one_or_many")]
        antecedent: Vec<Condition>,
        #[serde(deserialize_with = "one_or_many")]
        consequent: Vec<Condition>,
    },
    /// The antecedent combination is forbidden outright.
    BlatantEx {
        #[serde(deserialize_with = "one_or_many")]
        antecedent: Vec<Condition>,
    },
    /// The relation must hold for every scenario.
    RelationshipEx { relation: Condition },
    #[serde(other)]
    Unrecognized,
}

impl ExclusionRule {
    pub fn kind(&self) -> ExclusionKind {
        match self {
            ExclusionRule::ValueEx { .. } => ExclusionKind::ValueEx,
            ExclusionRule::BlatantEx { .. } => ExclusionKind::BlatantEx,
            ExclusionRule::RelationshipEx { .. } => ExclusionKind::RelationshipEx,
            ExclusionRule::Unrecognized => ExclusionKind::Unrecognized,
        }
    }

    pub fn conditions(&self) -> Vec<&Condition> {
        match self {
            ExclusionRule::ValueEx {
                antecedent,
                consequent,
            } => antecedent.iter().chain(consequent.iter()).collect(),
            ExclusionRule::BlatantEx { antecedent } => antecedent.iter().collect(),
            ExclusionRule::RelationshipEx { relation } => vec![relation],
            ExclusionRule::Unrecognized => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExclusionKind {
    ValueEx,
    BlatantEx,
    RelationshipEx,
    Unrecognized,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Condition),
    Many(Vec<Condition>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Condition>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(condition) => vec![condition],
        OneOrMany::Many(conditions) => conditions,
    })
}

/// Field definitions and exclusion rules of a model.
///
/// Rules address fields by position, so construction checks that every
/// condition index resolves to an attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelMetadata {
    attributes: Vec<FieldDefinition>,
    rules: Vec<ExclusionRule>,
}

impl ModelMetadata {
    pub fn new(
        attributes: Vec<FieldDefinition>,
        rules: Vec<ExclusionRule>,
    ) -> Result<Self, MetadataError> {
        for (rule_index, rule) in rules.iter().enumerate() {
            for condition in rule.conditions() {
                if condition.index >= attributes.len() {
                    return Err(MetadataError::DanglingCondition {
                        rule_index,
                        index: condition.index,
                        attribute_count: attributes.len(),
                    });
                }
            }
        }

        Ok(Self { attributes, rules })
    }

    pub fn attributes(&self) -> &[FieldDefinition] {
        &self.attributes
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.attributes.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error(
        "exclusion rule {rule_index} references attribute {index} but the model declares {attribute_count}"
    )]
    DanglingCondition {
        rule_index: usize,
        index: usize,
        attribute_count: usize,
    },
}

/// Entry in the remote model catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireModelSummary", into = "WireModelSummary")]
pub struct ModelSummary {
    pub id: ModelId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireModelSummary {
    id: ModelId,
    #[serde(rename = "type", default = "model_resource_type")]
    resource_type: String,
    attributes: WireSummaryAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireSummaryAttributes {
    name: String,
    #[serde(default)]
    description: String,
}

fn model_resource_type() -> String {
    "model".to_string()
}

impl From<WireModelSummary> for ModelSummary {
    fn from(wire: WireModelSummary) -> Self {
        Self {
            id: wire.id,
            name: wire.attributes.name,
            description: wire.attributes.description,
        }
    }
}

impl From<ModelSummary> for WireModelSummary {
    fn from(summary: ModelSummary) -> Self {
        Self {
            id: summary.id,
            resource_type: model_resource_type(),
            attributes: WireSummaryAttributes {
                name: summary.name,
                description: summary.description,
            },
        }
    }
}

/// A model together with the metadata needed to render and validate its form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireModelDetail", into = "WireModelDetail")]
pub struct ModelDetail {
    pub id: ModelId,
    pub name: String,
    pub description: String,
    pub metadata: ModelMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireModelDetail {
    id: ModelId,
    #[serde(rename = "type", default = "model_resource_type")]
    resource_type: String,
    attributes: WireDetailAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireDetailAttributes {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    metadata: WireMetadata,
    #[serde(default)]
    exclusions: WireExclusions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireMetadata {
    #[serde(default)]
    attributes: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireExclusions {
    #[serde(default, deserialize_with = "null_as_empty")]
    rules: Vec<ExclusionRule>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ExclusionRule>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ExclusionRule>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TryFrom<WireModelDetail> for ModelDetail {
    type Error = MetadataError;

    fn try_from(wire: WireModelDetail) -> Result<Self, Self::Error> {
        let WireDetailAttributes {
            name,
            description,
            metadata,
            exclusions,
        } = wire.attributes;

        Ok(Self {
            id: wire.id,
            name,
            description,
            metadata: ModelMetadata::new(metadata.attributes, exclusions.rules)?,
        })
    }
}

impl From<ModelDetail> for WireModelDetail {
    fn from(detail: ModelDetail) -> Self {
        Self {
            id: detail.id,
            resource_type: model_resource_type(),
            attributes: WireDetailAttributes {
                name: detail.name,
                description: detail.description,
                metadata: WireMetadata {
                    attributes: detail.metadata.attributes,
                },
                exclusions: WireExclusions {
                    rules: detail.metadata.rules,
                },
            },
        }
    }
}
