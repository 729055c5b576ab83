use std::path::PathBuf;
use std::sync::Arc;

use pregao::{BoundedStore, EngineConfig, FileStore, KeyValueStore, MemoryStore, PregaoConnector};

/// Return a connector for demos.
///
/// Uses the HTTP backend at `PREGAO_API` when set, the static mock otherwise.
///
/// # Panics
/// Panics if `PREGAO_API` is not a valid base URL.
#[must_use]
pub fn get_connector() -> Arc<dyn PregaoConnector> {
    match std::env::var("PREGAO_API") {
        Ok(base) if std::env::var("PREGAO_DEMOS_USE_MOCK").is_err() => Arc::new(
            pregao_http::HttpConnector::new(&base).expect("PREGAO_API must be a valid base URL"),
        ),
        _ => {
            println!("--- (Using Mock Connector) ---");
            Arc::new(pregao_mock::MockConnector::new())
        }
    }
}

/// Return the daily cache backend for demos.
///
/// `PREGAO_CACHE_FILE` selects a JSON file (cached in memory for reads);
/// without it entries live for the process only.
///
/// # Errors
/// Returns an error if the cache file exists but cannot be read or parsed.
pub fn get_store() -> Result<Arc<dyn KeyValueStore>, pregao::PregaoError> {
    match std::env::var_os("PREGAO_CACHE_FILE") {
        Some(path) => {
            let file = Arc::new(FileStore::open(PathBuf::from(path))?);
            Ok(Arc::new(BoundedStore::with_backing(64, file)))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Load an [`EngineConfig`] from the JSON file named by the first CLI argument.
///
/// Missing fields keep their defaults; with no argument the defaults are used.
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid JSON.
pub fn load_config() -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let Some(path) = std::env::args_os().nth(1) else {
        return Ok(EngineConfig::default());
    };
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
