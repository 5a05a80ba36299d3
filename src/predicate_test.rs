use serde_json::json;

use super::*;

fn values(value: Value) -> ListQuery {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// =============================================================================
// evaluate
// =============================================================================

#[test]
fn eq_compares_numbers_by_value() {
    let form = values(json!({"kind": "user", "level": 1.0}));
    assert!(Predicate::eq("kind", "user").evaluate(&form));
    assert!(Predicate::eq("level", 1).evaluate(&form));
    assert!(!Predicate::eq("kind", "group").evaluate(&form));
    assert!(!Predicate::eq("missing", "x").evaluate(&form));
}

#[test]
fn ne_holds_for_missing_fields() {
    let form = values(json!({"kind": "user"}));
    assert!(Predicate::Ne { field: "status".into(), value: json!("open") }.evaluate(&form));
    assert!(!Predicate::Ne { field: "kind".into(), value: json!("user") }.evaluate(&form));
}

#[test]
fn in_truthy_and_empty() {
    let form = values(json!({"role": "admin", "tags": [], "name": "", "active": true}));
    assert!(Predicate::In { field: "role".into(), values: vec![json!("admin"), json!("owner")] }.evaluate(&form));
    assert!(Predicate::truthy("active").evaluate(&form));
    assert!(!Predicate::truthy("name").evaluate(&form));
    for field in ["tags", "name", "missing"] {
        assert!(Predicate::Empty { field: field.into() }.evaluate(&form), "{field} should be empty");
    }
    assert!(!Predicate::Empty { field: "role".into() }.evaluate(&form));
}

#[test]
fn comparisons_accept_numeric_strings() {
    let form = values(json!({"age": "42", "score": 7}));
    assert!(Predicate::Gt { field: "age".into(), value: 18.0 }.evaluate(&form));
    assert!(Predicate::Lt { field: "score".into(), value: 10.0 }.evaluate(&form));
    assert!(!Predicate::Gt { field: "missing".into(), value: 0.0 }.evaluate(&form));
}

#[test]
fn combinators_and_dotted_paths() {
    let form = values(json!({"owner": {"role": "admin"}, "kind": "user"}));
    let rule = Predicate::All {
        predicates: vec![
            Predicate::eq("owner.role", "admin"),
            Predicate::Any { predicates: vec![Predicate::eq("kind", "group"), Predicate::eq("kind", "user")] },
        ],
    };
    assert!(rule.evaluate(&form));
    assert!(!rule.clone().negate().evaluate(&form));
    assert!(Predicate::All { predicates: vec![] }.evaluate(&form));
    assert!(!Predicate::Any { predicates: vec![] }.evaluate(&form));
}

// =============================================================================
// serde + dependencies
// =============================================================================

#[test]
fn deserializes_from_tagged_json() {
    let raw = json!({
        "op": "all",
        "predicates": [
            {"op": "eq", "field": "kind", "value": "user"},
            {"op": "not", "inner": {"op": "truthy", "field": "archived"}}
        ]
    });
    let predicate: Predicate = serde_json::from_value(raw).expect("predicate");
    assert!(predicate.evaluate(&values(json!({"kind": "user", "archived": false}))));
    assert!(!predicate.evaluate(&values(json!({"kind": "user", "archived": true}))));
}

#[test]
fn dependencies_are_collected_statically() {
    let predicate = Predicate::Any {
        predicates: vec![
            Predicate::eq("kind", "user"),
            Predicate::truthy("owner.active").negate(),
            Predicate::Always,
            Predicate::eq("kind", "group"),
        ],
    };
    let deps: Vec<String> = predicate.dependencies().into_iter().collect();
    assert_eq!(deps, vec!["kind", "owner.active"]);
    assert!(Predicate::Always.dependencies().is_empty());
}

// =============================================================================
// field rules
// =============================================================================

#[test]
fn visible_fields_follow_rule_order() {
    let rules = vec![
        FieldRule { field: "name".into(), visible_when: Predicate::Always },
        FieldRule { field: "company".into(), visible_when: Predicate::eq("kind", "business") },
        FieldRule { field: "birthday".into(), visible_when: Predicate::eq("kind", "person") },
    ];
    let form = values(json!({"kind": "business"}));
    assert_eq!(visible_fields(&rules, &form), vec!["name", "company"]);
    assert_eq!(affected_by(&rules, "kind"), vec!["company", "birthday"]);
    assert!(affected_by(&rules, "name").is_empty());
}
