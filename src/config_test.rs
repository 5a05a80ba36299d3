use super::*;

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: u64 = env_parse("__PAGELIST_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__PAGELIST_TEST_INVALID__", "soon") };
    let val: u64 = env_parse("__PAGELIST_TEST_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__PAGELIST_TEST_INVALID__") };
}

#[test]
fn from_env_saturates_huge_ttl() {
    unsafe { std::env::set_var("PAGELIST_PREFS_TTL_DAYS", "18446744073709551615") };
    let config = CoordinatorConfig::from_env("users");
    unsafe { std::env::remove_var("PAGELIST_PREFS_TTL_DAYS") };
    assert_eq!(config.expect("config").prefs_ttl, Duration::from_secs(u64::MAX));
}

// =============================================================================
// selection mode
// =============================================================================

#[test]
fn selection_mode_defaults_to_multi() {
    assert_eq!(parse_selection_mode(None).expect("mode"), SelectionMode::Multi);
    assert_eq!(parse_selection_mode(Some("single")).expect("mode"), SelectionMode::Single);
}

#[test]
fn unknown_selection_mode_is_rejected() {
    let err = parse_selection_mode(Some("radio")).expect_err("invalid");
    assert!(matches!(err, ConfigError::InvalidEnv { var: "PAGELIST_SELECTION_MODE", ref value } if value == "radio"));
}

// =============================================================================
// defaults + builders
// =============================================================================

#[test]
fn defaults_match_documented_values() {
    let config = CoordinatorConfig::new("users");
    assert_eq!(config.cache_key, "users");
    assert_eq!(config.fetch.debounce, Duration::from_millis(300));
    assert_eq!(config.fetch.init_page_size, 20);
    assert_eq!(config.prefs_ttl, Duration::from_secs(30 * 24 * 60 * 60));
    assert_eq!(config.selection.max, None);
    assert_eq!(config.parseable_keys, vec!["page", "pageSize"]);
}

#[test]
fn parseable_keys_are_deduplicated() {
    let config = CoordinatorConfig::new("users").parseable_keys(["tags", "page", "tags"]);
    assert_eq!(config.parseable_keys, vec!["page", "pageSize", "tags"]);
}

#[test]
fn builders_set_selection_rules() {
    let config = CoordinatorConfig::new("users")
        .selection_mode(SelectionMode::Single)
        .row_key("uuid")
        .max_selection(5)
        .limit_message("max {max}")
        .clear_selection_on_page_change(true)
        .page_size(0);
    assert_eq!(config.selection.mode, SelectionMode::Single);
    assert_eq!(config.selection.row_key, "uuid");
    assert_eq!(config.selection.max, Some(5));
    assert_eq!(config.selection.limit_message.as_deref(), Some("max {max}"));
    assert!(config.selection.clear_on_page_change);
    assert_eq!(config.fetch.init_page_size, 1);
}
