use std::sync::Mutex;

use serde_json::json;

use super::*;
use crate::fetch::{ListSource, from_fn};
use crate::notify::test_helpers::RecordingNotifier;
use crate::prefs::MemoryStorage;
use crate::query::MemoryLocation;

// =============================================================================
// fixture
// =============================================================================

type Calls = Arc<Mutex<Vec<ListQuery>>>;

struct Harness {
    coordinator: ListCoordinator,
    location: Arc<MemoryLocation>,
    notifier: Arc<RecordingNotifier>,
    calls: Calls,
}

impl Harness {
    fn new(href: &str) -> Self {
        Self::with_config(href, CoordinatorConfig::new("users").parseable_keys(["tags"]))
    }

    fn with_config(href: &str, config: CoordinatorConfig) -> Self {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let location = Arc::new(MemoryLocation::parse(href).expect("href"));
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = ListCoordinator::new(
            config,
            columns(),
            FetchDescriptor::local(paged_source(calls.clone())),
            Arc::new(MemoryStorage::new()),
            location.clone(),
            notifier.clone(),
        )
        .expect("coordinator");
        Self { coordinator, location, notifier, calls }
    }

    fn last_request(&self) -> ListQuery {
        self.calls.lock().unwrap().last().cloned().expect("a request")
    }

    fn address(&self) -> RawParams {
        self.location.current()
    }
}

/// Two rows per page, ids derived from the page number.
fn paged_source(calls: Calls) -> Arc<dyn ListSource> {
    from_fn(move |params: ListQuery| {
        calls.lock().unwrap().push(params.clone());
        async move {
            let page = params.get("page").and_then(Value::as_u64).unwrap_or(1);
            Ok(json!({
                "list": [{"id": page * 10 + 1}, {"id": page * 10 + 2}],
                "total": 30,
                "page": page,
            }))
        }
    })
}

fn columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "ID").fixed(),
        ColumnDescriptor::new("name", "Name").width(120),
        ColumnDescriptor::new("email", "Email"),
    ]
}

fn raw(pairs: &[(&str, &str)]) -> RawParams {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

fn q(value: Value) -> ListQuery {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

async fn settle(handle: Option<JoinHandle<()>>) {
    handle.expect("configured").await.expect("task");
}

// =============================================================================
// construction
// =============================================================================

#[test]
fn duplicate_column_keys_are_rejected() {
    let err = ListCoordinator::new(
        CoordinatorConfig::new("users"),
        vec![ColumnDescriptor::new("id", "ID"), ColumnDescriptor::new("id", "Again")],
        FetchDescriptor::default(),
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryLocation::parse("http://app.local/users").expect("href")),
        Arc::new(RecordingNotifier::default()),
    )
    .err()
    .expect("duplicate columns");
    assert!(matches!(err, CoordinatorError::Config(ConfigError::DuplicateColumn(ref key)) if key == "id"));
    assert_eq!(err.error_code(), "E_DUPLICATE_COLUMN");
}

// =============================================================================
// navigation + filters
// =============================================================================

#[tokio::test(start_paused = true)]
async fn navigation_decodes_the_address_bar_and_fetches() {
    let h = Harness::new("http://app.local/users?page=2&tags=1,2&name=bob&__tab=active");
    settle(h.coordinator.on_navigation()).await;

    let request = h.last_request();
    assert_eq!(request["page"], json!(2));
    assert_eq!(request["pageSize"], json!(20));
    assert_eq!(request["tags"], json!([1, 2]));
    assert_eq!(request["name"], json!("bob"));
    assert!(!request.contains_key("__tab"));

    let full = h.coordinator.query().full;
    assert_eq!(full["__tab"], json!("active"));
    assert_eq!(h.coordinator.state().items, vec![json!({"id": 21}), json!({"id": 22})]);
}

#[tokio::test(start_paused = true)]
async fn submit_replaces_filters_keeps_reserved_keys_and_restarts_paging() {
    let h = Harness::new("http://app.local/users?page=3&name=old&__tab=x");
    settle(h.coordinator.submit_filters(q(json!({"name": "new", "status": null})))).await;

    assert_eq!(h.address(), raw(&[("__tab", "x"), ("name", "new")]));
    let request = h.last_request();
    assert_eq!(request["page"], json!(1));
    assert_eq!(request["name"], json!("new"));
}

#[tokio::test(start_paused = true)]
async fn submitting_unchanged_filters_does_not_navigate() {
    let h = Harness::new("http://app.local/users?name=bob");
    settle(h.coordinator.submit_filters(q(json!({"name": "bob"})))).await;
    assert_eq!(h.location.navigation_count(), 0);
    assert_eq!(h.calls.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn change_page_merges_into_the_address_bar() {
    let h = Harness::new("http://app.local/users?name=bob");
    settle(h.coordinator.change_page(3, 50)).await;

    assert_eq!(h.address(), raw(&[("name", "bob"), ("page", "3"), ("pageSize", "50")]));
    let request = h.last_request();
    assert_eq!((request["page"].clone(), request["pageSize"].clone()), (json!(3), json!(50)));
    assert_eq!(request["name"], json!("bob"));
}

#[tokio::test(start_paused = true)]
async fn reset_clears_visible_filters_only() {
    let h = Harness::new("http://app.local/users?name=bob&page=4&__tab=x");
    settle(h.coordinator.reset()).await;

    assert_eq!(h.address(), raw(&[("__tab", "x")]));
    let request = h.last_request();
    assert!(!request.contains_key("name"));
    assert_eq!(request["page"], json!(1));
}

// =============================================================================
// selection
// =============================================================================

#[tokio::test(start_paused = true)]
async fn select_all_uses_current_page_and_limit_notifies_once() {
    let config = CoordinatorConfig::new("users").max_selection(3).limit_message("pick at most {max}");
    let h = Harness::with_config("http://app.local/users", config);
    settle(h.coordinator.on_navigation()).await;

    h.coordinator.select_all(true).expect("two rows fit");
    assert_eq!(h.coordinator.selection().ids(), ["11", "12"]);

    settle(h.coordinator.change_page(2, 20)).await;
    let err = h.coordinator.select_all(true).expect_err("four rows exceed the limit");
    assert_eq!(err.to_string(), "pick at most 3");
    assert_eq!(h.coordinator.selection().len(), 2);

    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].code, "E_SELECTION_LIMIT");
}

#[tokio::test(start_paused = true)]
async fn page_change_clears_selection_only_when_opted_in() {
    let h = Harness::with_config(
        "http://app.local/users",
        CoordinatorConfig::new("users").clear_selection_on_page_change(true),
    );
    h.coordinator.select(&json!({"id": 1}), true).expect("select");
    settle(h.coordinator.change_page(2, 20)).await;
    assert!(h.coordinator.selection().is_empty());

    let h = Harness::new("http://app.local/users");
    h.coordinator.select(&json!({"id": 1}), true).expect("select");
    settle(h.coordinator.change_page(2, 20)).await;
    assert_eq!(h.coordinator.selection().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn refresh_reissues_and_empties_selection() {
    let h = Harness::new("http://app.local/users?name=bob");
    settle(h.coordinator.on_navigation()).await;
    h.coordinator.select(&json!({"id": 11}), true).expect("select");

    h.coordinator.refresh().await;

    let calls = h.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
    assert!(h.coordinator.selection().is_empty());
}

// =============================================================================
// preferences
// =============================================================================

#[test]
fn visible_columns_follow_stored_preferences() {
    let h = Harness::new("http://app.local/users");
    h.coordinator.set_visible_columns(&["name"]).expect("hide");
    h.coordinator.resize_column("name", 9_000).expect("resize");

    let visible = h.coordinator.visible_columns();
    let keys: Vec<&str> = visible.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["id", "name"]);
    assert_eq!(visible[1].width, Some(400));
    assert_eq!(h.coordinator.columns().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn quick_filters_save_reject_duplicates_and_reapply() {
    let h = Harness::new("http://app.local/users?status=open&page=2");
    h.coordinator.save_filter("Open").expect("save");
    assert_eq!(h.coordinator.saved_filters()[0].query_string, "status=open");

    let err = h.coordinator.save_filter("Other").expect_err("same query");
    assert!(matches!(err, PrefsError::DuplicateFilterQuery { ref existing_label } if existing_label == "Open"));
    assert_eq!(h.notifier.notices().len(), 1);

    settle(h.coordinator.reset()).await;
    assert!(h.address().is_empty());

    settle(h.coordinator.apply_filter("Open")).await;
    assert_eq!(h.address(), raw(&[("status", "open")]));
    assert_eq!(h.last_request()["status"], json!("open"));

    assert!(h.coordinator.apply_filter("Missing").is_none());
    h.coordinator.remove_filter("Open").expect("remove");
    assert!(h.coordinator.saved_filters().is_empty());
}

#[test]
fn density_round_trips_and_clear_forgets_everything() {
    let h = Harness::new("http://app.local/users");
    h.coordinator.set_density(Density::Compact).expect("density");
    assert_eq!(h.coordinator.preferences().density, Density::Compact);

    h.coordinator.clear_preferences().expect("clear");
    assert_eq!(h.coordinator.preferences(), PreferenceRecord::default());
}
