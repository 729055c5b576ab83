use std::sync::Arc;
use std::time::Duration;

use pregao::{Engine, PregaoError, RefreshStatus};
use pregao_demos::common::{get_connector, get_store, load_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    // Optional JSON config as the first argument; see `EngineConfig`.
    let engine = Arc::new(
        Engine::builder()
            .config(load_config()?)
            .with_connector(get_connector())
            .key_value_store(get_store()?)
            .build()?,
    );

    let cycles: u32 = std::env::var("PREGAO_DEMO_CYCLES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);

    let mut ticker = tokio::time::interval(Duration::from_secs(30));
    for _ in 0..cycles {
        ticker.tick().await;
        match engine.refresh().await {
            Ok(report) if report.status == RefreshStatus::Success => {
                if let Some(w) = report.widgets {
                    println!("{}", serde_json::to_string(&w)?);
                }
            }
            Ok(report) => tracing::warn!(status = ?report.status, "refresh did not produce widgets"),
            Err(PregaoError::RefreshInProgress) => tracing::info!("previous cycle still running"),
            Err(e) => return Err(e.into()),
        }

        // Two button presses in quick succession: the second one is debounced.
        for _ in 0..2 {
            if let Err(e) = engine.request_refresh().await {
                tracing::info!(error = %e, "manual refresh rejected");
            }
        }
    }

    Ok(())
}
