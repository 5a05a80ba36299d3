use super::*;
use serde_json::json;

fn raw(pairs: &[(&str, &str)]) -> RawParams {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

fn query(value: Value) -> ListQuery {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// =============================================================================
// decode
// =============================================================================

#[test]
fn decode_parses_listed_keys_and_passes_others_through() {
    let params = parse_query_string("page=2&tags=1,2&name=bob").expect("query string");
    let decoded = decode(&params, &["page", "tags"]);
    assert_eq!(Value::Object(decoded), json!({"page": 2, "tags": [1, 2], "name": "bob"}));
}

#[test]
fn decode_drops_empty_null_and_undefined_values() {
    let params = raw(&[("a", ""), ("b", "null"), ("c", "undefined"), ("d", "x")]);
    for parseable in [&[][..], &["a", "b", "c", "d"][..]] {
        let decoded = decode(&params, parseable);
        assert!(!decoded.contains_key("a"));
        assert!(!decoded.contains_key("b"));
        assert!(!decoded.contains_key("c"));
        assert!(decoded.contains_key("d"));
    }
}

#[test]
fn decode_falls_back_to_raw_string_on_parse_failure() {
    let params = raw(&[("status", "open"), ("ids", "1,two,3")]);
    let decoded = decode(&params, &["status", "ids"]);
    assert_eq!(decoded["status"], json!("open"));
    assert_eq!(decoded["ids"], json!("1,two,3"));
}

#[test]
fn decode_keeps_unlisted_numeric_values_as_strings() {
    let params = raw(&[("page", "3")]);
    let decoded = decode::<&str>(&params, &[]);
    assert_eq!(decoded["page"], json!("3"));
}

#[test]
fn decode_parses_booleans_and_quoted_segments() {
    let params = raw(&[("active", "true"), ("names", "\"a\",\"b\"")]);
    let decoded = decode(&params, &["active", "names"]);
    assert_eq!(decoded["active"], json!(true));
    assert_eq!(decoded["names"], json!(["a", "b"]));
}

#[test]
fn decode_view_hides_reserved_keys_from_visible_query() {
    let params = raw(&[("__tab", "archived"), ("name", "bob")]);
    let view = decode_view::<&str>(&params, &[]);
    assert!(!view.visible.contains_key("__tab"));
    assert_eq!(view.visible["name"], json!("bob"));
    assert_eq!(view.full["__tab"], json!("archived"));
}

// =============================================================================
// encode
// =============================================================================

#[test]
fn encode_merge_preserves_absent_keys_and_omits_nulls() {
    let previous = raw(&[("name", "bob"), ("status", "open")]);
    let patch = query(json!({"page": 3, "status": null}));
    let next = encode(&patch, &previous, false).expect("changed");
    assert_eq!(next, raw(&[("name", "bob"), ("page", "3")]));
}

#[test]
fn encode_replace_drops_prior_keys() {
    let previous = raw(&[("name", "bob"), ("page", "4")]);
    let patch = query(json!({"status": "open", "missing": null}));
    let next = encode(&patch, &previous, true).expect("changed");
    assert_eq!(next, raw(&[("status", "open")]));
}

#[test]
fn encode_returns_none_when_nothing_changes() {
    let previous = raw(&[("page", "2"), ("tags", "1,2")]);
    let patch = query(json!({"page": 2, "tags": [1, 2]}));
    assert_eq!(encode(&patch, &previous, false), None);
    assert_eq!(encode(&patch, &previous, true), None);
}

#[test]
fn render_value_joins_arrays_and_serializes_objects() {
    assert_eq!(render_value(&json!(["a", 1, true])), Some("a,1,true".to_owned()));
    assert_eq!(render_value(&json!({"k": 1})), Some("{\"k\":1}".to_owned()));
    assert_eq!(render_value(&Value::Null), None);
}

#[test]
fn encoded_params_decode_back_to_the_same_query() {
    let patch = query(json!({"page": 2, "tags": [1, 2], "name": "bob"}));
    let encoded = encode(&patch, &RawParams::new(), true).expect("changed");
    let text = to_query_string(&encoded).expect("query string");
    let reparsed = parse_query_string(&text).expect("reparse");
    assert_eq!(decode(&reparsed, &["page", "tags"]), patch);
}

// =============================================================================
// query strings + location
// =============================================================================

#[test]
fn query_string_round_trip_escapes_special_characters() {
    let params = raw(&[("name", "a b&c"), ("q", "x=y")]);
    let text = to_query_string(&params).expect("encode");
    assert!(!text.contains(' '));
    assert_eq!(parse_query_string(&format!("?{text}")).expect("decode"), params);
}

#[test]
fn memory_location_counts_navigations_and_rewrites_query() {
    let location = MemoryLocation::parse("https://admin.example.com/users?page=1").expect("url");
    assert_eq!(location.current(), raw(&[("page", "1")]));

    location.navigate(raw(&[("page", "2"), ("name", "bob")]));
    assert_eq!(location.navigation_count(), 1);
    assert_eq!(location.current(), raw(&[("name", "bob"), ("page", "2")]));
    assert!(location.href().starts_with("https://admin.example.com/users?"));

    location.navigate(RawParams::new());
    assert_eq!(location.href(), "https://admin.example.com/users");
}

#[test]
fn memory_location_rejects_relative_href() {
    assert!(matches!(MemoryLocation::parse("/users?page=1"), Err(QueryError::InvalidUrl(_))));
}
