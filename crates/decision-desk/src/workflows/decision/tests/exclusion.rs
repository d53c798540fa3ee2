use serde_json::json;

use super::common::*;
use crate::workflows::decision::domain::{
    Comparator, ExclusionKind, ExclusionRule, FieldValue, MetadataError, ModelDetail,
    ModelMetadata,
};
use crate::workflows::decision::exclusion::{check_exclusions, evaluate};

#[test]
fn eq_and_neq_are_strict() {
    let rule = condition(0, Comparator::Eq, FieldValue::from("Minor"));
    assert!(evaluate(Some(&FieldValue::from("Minor")), &rule));
    assert!(!evaluate(Some(&FieldValue::from("minor")), &rule));
    assert!(!evaluate(Some(&FieldValue::Number(1.0)), &rule));

    let numeric = condition(0, Comparator::Eq, FieldValue::Number(1.0));
    assert!(!evaluate(Some(&FieldValue::from("1")), &numeric));

    let rule = condition(0, Comparator::Neq, FieldValue::from("Minor"));
    assert!(!evaluate(Some(&FieldValue::from("Minor")), &rule));
    assert!(evaluate(Some(&FieldValue::from("Adult")), &rule));
}

#[test]
fn ordering_comparators_follow_value_kind() {
    let lteq = condition(0, Comparator::Lteq, FieldValue::Number(100.0));
    assert!(evaluate(Some(&FieldValue::Number(100.0)), &lteq));
    assert!(evaluate(Some(&FieldValue::Number(-3.0)), &lteq));
    assert!(!evaluate(Some(&FieldValue::Number(100.5)), &lteq));

    let gt = condition(0, Comparator::Gt, FieldValue::Number(100.0));
    assert!(evaluate(Some(&FieldValue::Number(100.5)), &gt));
    assert!(!evaluate(Some(&FieldValue::Number(100.0)), &gt));

    let lexicographic = condition(0, Comparator::Lteq, FieldValue::from("m"));
    assert!(evaluate(Some(&FieldValue::from("apple")), &lexicographic));
    assert!(!evaluate(Some(&FieldValue::from("zebra")), &lexicographic));

    assert!(!evaluate(Some(&FieldValue::from("5")), &gt));
}

#[test]
fn missing_values_and_unknown_comparators_fail_closed() {
    let eq = condition(0, Comparator::Eq, FieldValue::from("x"));
    let neq = condition(0, Comparator::Neq, FieldValue::from("x"));
    let lteq = condition(0, Comparator::Lteq, FieldValue::Number(1.0));
    assert!(!evaluate(None, &eq));
    assert!(evaluate(None, &neq));
    assert!(!evaluate(None, &lteq));

    let unknown = condition(0, Comparator::Unrecognized, FieldValue::from("x"));
    assert!(!evaluate(Some(&FieldValue::from("x")), &unknown));
}

#[test]
fn blatant_rule_fires_only_when_antecedent_holds() {
    let attributes = vec![named("status")];
    let rules = vec![ExclusionRule::BlatantEx {
        antecedent: vec![condition(0, Comparator::Eq, FieldValue::from("Minor"))],
    }];

    let violation = check_exclusions(
        &input(&[("status", FieldValue::from("Minor"))]),
        &attributes,
        &rules,
    )
    .expect("minor status is forbidden");
    assert_eq!(violation.kind, ExclusionKind::BlatantEx);
    assert!(violation.message.contains("status"));
    assert!(violation.message.contains("Minor"));
    assert_eq!(
        violation.message,
        "Exclusion rule violation: status = Minor is not allowed."
    );

    assert!(check_exclusions(
        &input(&[("status", FieldValue::from("Adult"))]),
        &attributes,
        &rules
    )
    .is_none());
}

#[test]
fn value_rule_requires_consequents_once_antecedents_hold() {
    let attributes = vec![plan_field(), named("support")];
    let rules = vec![ExclusionRule::ValueEx {
        antecedent: vec![condition(0, Comparator::Eq, FieldValue::from("Premium"))],
        consequent: vec![condition(1, Comparator::Eq, FieldValue::from("Priority"))],
    }];

    let violation = check_exclusions(
        &input(&[
            ("plan", FieldValue::from("Premium")),
            ("support", FieldValue::from("Standard")),
        ]),
        &attributes,
        &rules,
    )
    .expect("premium requires priority support");
    assert_eq!(
        violation.message,
        "Exclusion rule violation: When Which plan? = Premium, then support must be Priority."
    );

    assert!(check_exclusions(
        &input(&[
            ("plan", FieldValue::from("Premium")),
            ("support", FieldValue::from("Priority")),
        ]),
        &attributes,
        &rules
    )
    .is_none());

    assert!(check_exclusions(
        &input(&[
            ("plan", FieldValue::from("Basic")),
            ("support", FieldValue::from("Standard")),
        ]),
        &attributes,
        &rules
    )
    .is_none());
}

#[test]
fn relationship_rule_fires_when_relation_fails() {
    let attributes = vec![named("score")];
    let rules = vec![ExclusionRule::RelationshipEx {
        relation: condition(0, Comparator::Lteq, FieldValue::Number(100.0)),
    }];

    let violation = check_exclusions(
        &input(&[("score", FieldValue::Number(150.0))]),
        &attributes,
        &rules,
    )
    .expect("score above bound");
    assert_eq!(
        violation.message,
        "Exclusion rule violation: score must be less than or equal to 100."
    );

    assert!(check_exclusions(
        &input(&[("score", FieldValue::Number(80.0))]),
        &attributes,
        &rules
    )
    .is_none());
}

#[test]
fn relationship_message_reflects_comparator() {
    let attributes = vec![named("score")];
    let rules = vec![ExclusionRule::RelationshipEx {
        relation: condition(0, Comparator::Gt, FieldValue::Number(10.0)),
    }];

    let violation = check_exclusions(
        &input(&[("score", FieldValue::Number(3.0))]),
        &attributes,
        &rules,
    )
    .expect("score not above bound");
    assert!(violation.message.ends_with("score must be greater than 10."));
}

#[test]
fn antecedent_clauses_render_non_equality_as_not_equal() {
    let attributes = vec![named("score")];
    let rules = vec![ExclusionRule::BlatantEx {
        antecedent: vec![condition(0, Comparator::Lteq, FieldValue::Number(10.0))],
    }];

    let violation = check_exclusions(
        &input(&[("score", FieldValue::Number(5.0))]),
        &attributes,
        &rules,
    )
    .expect("low score is forbidden");

    assert_eq!(
        violation.message,
        "Exclusion rule violation: score ≠ 10 is not allowed."
    );
}

#[test]
fn first_violated_rule_wins() {
    let attributes = vec![named("status"), named("score")];
    let status_rule = ExclusionRule::BlatantEx {
        antecedent: vec![condition(0, Comparator::Eq, FieldValue::from("Minor"))],
    };
    let score_rule = ExclusionRule::RelationshipEx {
        relation: condition(1, Comparator::Lteq, FieldValue::Number(100.0)),
    };
    let rules = vec![status_rule, score_rule];

    let only_second = check_exclusions(
        &input(&[
            ("status", FieldValue::from("Adult")),
            ("score", FieldValue::Number(150.0)),
        ]),
        &attributes,
        &rules,
    )
    .expect("score rule fires");
    assert_eq!(only_second.rule_index, 1);

    let both = check_exclusions(
        &input(&[
            ("status", FieldValue::from("Minor")),
            ("score", FieldValue::Number(150.0)),
        ]),
        &attributes,
        &rules,
    )
    .expect("status rule fires first");
    assert_eq!(both.rule_index, 0);
    assert!(both.message.contains("Minor"));
}

#[test]
fn empty_and_unrecognized_rules_never_fire() {
    let attributes = vec![named("status")];
    let values = input(&[("status", FieldValue::from("Minor"))]);
    assert!(check_exclusions(&values, &attributes, &[]).is_none());
    assert!(check_exclusions(&values, &attributes, &[ExclusionRule::Unrecognized]).is_none());
}

#[test]
fn rules_decode_single_conditions_and_lists() {
    let rules: Vec<ExclusionRule> = serde_json::from_value(json!([
        {
            "type": "ValueEx",
            "antecedent": { "index": 0, "type": "EQ", "threshold": "Premium" },
            "consequent": [
                { "index": 1, "type": "NEQ", "threshold": "None" },
                { "index": 2, "type": "GT", "threshold": 20 }
            ]
        },
        { "type": "BlatantEx", "antecedent": [{ "index": 0, "type": "EQ", "threshold": "Basic" }] },
        { "type": "RelationshipEx", "relation": { "index": 2, "type": "LTEQ", "threshold": 99 } },
        { "type": "FutureEx", "whatever": true },
        { "type": "BlatantEx", "antecedent": { "index": 0, "type": "BETWEEN", "threshold": "x" } }
    ]))
    .expect("rules decode");

    match &rules[0] {
        ExclusionRule::ValueEx {
            antecedent,
            consequent,
        } => {
            assert_eq!(antecedent.len(), 1);
            assert_eq!(consequent.len(), 2);
            assert_eq!(consequent[1].threshold, FieldValue::Number(20.0));
        }
        other => panic!("expected ValueEx, got {other:?}"),
    }
    assert!(matches!(&rules[1], ExclusionRule::BlatantEx { antecedent } if antecedent.len() == 1));
    assert!(matches!(
        &rules[2],
        ExclusionRule::RelationshipEx { relation } if relation.comparator == Comparator::Lteq
    ));
    assert_eq!(rules[3], ExclusionRule::Unrecognized);
    assert!(matches!(
        &rules[4],
        ExclusionRule::BlatantEx { antecedent }
            if antecedent[0].comparator == Comparator::Unrecognized
    ));
}

#[test]
fn metadata_rejects_dangling_condition_indices() {
    let err = ModelMetadata::new(
        vec![named("status")],
        vec![ExclusionRule::RelationshipEx {
            relation: condition(3, Comparator::Lteq, FieldValue::Number(1.0)),
        }],
    )
    .expect_err("index 3 does not exist");

    assert_eq!(
        err,
        MetadataError::DanglingCondition {
            rule_index: 0,
            index: 3,
            attribute_count: 1,
        }
    );
}

#[test]
fn model_detail_decodes_json_api_document() {
    let detail: ModelDetail = serde_json::from_value(json!({
        "id": MODEL_ID,
        "type": "model",
        "attributes": {
            "name": "Plan upgrade",
            "description": "Upgrades",
            "metadata": {
                "attributes": [
                    { "name": "age", "type": "Continuous", "domain": { "lower": 18, "upper": 65, "discrete": true } },
                    { "name": "plan", "question": "Which plan?", "type": "Nominal", "domain": { "values": ["Basic", "Premium"] } }
                ]
            },
            "exclusions": { "rules": null }
        }
    }))
    .expect("model decodes");

    let mut age = age_field();
    age.question = None;
    assert_eq!(detail.metadata.attributes()[0], age);
    assert_eq!(detail.metadata.attributes()[1], plan_field());
    assert!(detail.metadata.rules().is_empty());
}
