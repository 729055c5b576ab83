use pregao::{Engine, ServedAggregate};
use pregao_demos::common::{get_connector, get_store};

fn show(served: &ServedAggregate) {
    match served.totals {
        Some(t) => println!(
            "{:<13} +{:>6.2} {:>7.2} = {:>6.2}  ({:?}{})",
            served.kind.as_str(),
            t.positive_sum,
            t.negative_sum,
            t.total,
            served.provenance,
            if served.provisional { ", provisional" } else { "" },
        ),
        None => println!("{:<13} no data", served.kind.as_str()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Pick a backend (mock unless PREGAO_API is set).
    let engine = Engine::builder()
        .with_connector(get_connector())
        .key_value_store(get_store()?)
        .build()?;

    // 2. Run one cycle. The first one backfills the snapshot store.
    let report = engine.refresh().await?;
    if let Some(ingestion) = &report.ingestion {
        println!(
            "backfill: {} requested, {} applied, {} empty, {} failed",
            ingestion.requested, ingestion.applied, ingestion.empty, ingestion.failed
        );
    }
    println!("status: {:?} in {} ms", report.status, report.duration_ms);
    for warning in &report.warnings {
        println!("warning: {warning}");
    }

    // 3. Print the four widgets.
    if let Some(w) = &report.widgets {
        for served in [&w.current, &w.close_of_day, &w.after_hours, &w.commodities] {
            show(served);
        }
    }

    Ok(())
}
