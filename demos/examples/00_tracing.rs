use pregao::Engine;
use pregao_demos::common::{get_connector, get_store};
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,pregao=trace,pregao_middleware=debug
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .try_init();

    let engine = Engine::builder()
        .with_connector(get_connector())
        .key_value_store(get_store()?)
        .build()?;

    // Backfill, backend refresh, fetch and apply, all inside traced spans.
    let _ = engine.refresh().await?;

    Ok(())
}
