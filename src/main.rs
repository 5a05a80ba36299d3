use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pagelist::error::ConfigError;
use pagelist::fetch::{FetchDescriptor, HttpMethod, RemoteEndpoint, ResponseFields};
use pagelist::prefs::{FileStorage, MemoryStorage, Storage, StorageError};
use pagelist::query::QueryError;
use pagelist::{CoordinatorConfig, CoordinatorError, ListCoordinator, LogNotifier, MemoryLocation};
use serde_json::json;

const LOCATION_BASE: &str = "http://localhost/";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("list request failed: {0}")]
    Fetch(String),
    #[error("fetch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "pagelist", about = "Fetch one normalized page from a list endpoint")]
struct Cli {
    /// List endpoint URL.
    #[arg(long, env = "PAGELIST_ENDPOINT")]
    endpoint: String,

    #[arg(long, default_value = "get")]
    method: HttpMethod,

    /// Address-bar query, e.g. `page=2&tags=1,2&name=bob`.
    #[arg(long, default_value = "")]
    query: String,

    /// Keys decoded as JSON in addition to the pagination keys.
    #[arg(long, value_delimiter = ',')]
    parse: Vec<String>,

    /// Dotted path to the object holding the list fields.
    #[arg(long)]
    extraction_path: Option<String>,

    #[arg(long, default_value = "list")]
    list_field: String,

    #[arg(long, default_value = "total")]
    total_field: String,

    #[arg(long, default_value = "page")]
    page_field: String,

    #[arg(long, default_value = "pageSize")]
    page_size_field: String,

    /// Preference directory; preferences stay in memory when unset.
    #[arg(long, env = "PAGELIST_PREFS_DIR")]
    prefs_dir: Option<PathBuf>,

    #[arg(long, default_value = "pagelist")]
    cache_key: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // One-shot fetch: nothing to coalesce.
    let config = CoordinatorConfig::from_env(cli.cache_key.as_str())?
        .debounce(Duration::ZERO)
        .parseable_keys(cli.parse.iter().cloned());

    let href = format!("{LOCATION_BASE}?{}", cli.query.trim_start_matches('?'));
    let location = Arc::new(MemoryLocation::parse(&href)?);
    let storage: Arc<dyn Storage> = match cli.prefs_dir {
        Some(dir) => Arc::new(FileStorage::open(dir)?),
        None => Arc::new(MemoryStorage::new()),
    };

    let fields = ResponseFields {
        list: cli.list_field,
        total: cli.total_field,
        page: cli.page_field,
        page_size: cli.page_size_field,
    };
    let mut descriptor =
        FetchDescriptor::remote(RemoteEndpoint { url: cli.endpoint, method: cli.method }).fields(fields);
    if let Some(path) = cli.extraction_path {
        descriptor = descriptor.extraction_path(path);
    }

    let coordinator = ListCoordinator::new(config, Vec::new(), descriptor, storage, location, Arc::new(LogNotifier))?;
    if let Some(task) = coordinator.on_navigation() {
        task.await?;
    }

    let state = coordinator.state();
    if let Some(error) = state.last_error {
        return Err(CliError::Fetch(error));
    }
    let output = json!({
        "query": coordinator.query().visible,
        "items": state.items,
        "total": state.total,
        "page": state.page,
        "pageSize": state.page_size,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
