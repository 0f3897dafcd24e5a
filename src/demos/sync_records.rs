//! Record Sync Example
//!
//! Pushes a few records to a collection in one batch, reports the
//! aggregated outcome, then lists the collection page by page.
//!
//! Run with: cargo run --example sync_records -- http://localhost:8888/v1

use bucketry_rs::*;
use serde_json::json;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bucketry_rs=debug,bucketry_core=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let remote = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8888/v1".to_string());
    let client = Client::new(
        ClientConfig::new(remote)
            .with_bucket("demo")
            .with_header("Authorization", "Basic dXNlcjpwYXNz")
            .with_retry(2),
    )?;

    println!("Server API version: {:?}\n", client.fetch_http_api_version().await?);

    let scope = RequestOptions::new()
        .with_collection("tasks")
        .with_aggregate(true);
    let result = client
        .batch(
            |batch| {
                batch.create_bucket("demo", None, &RequestOptions::new())?;
                batch.create_collection(Some("tasks"), None, &RequestOptions::new())?;
                for i in 1..=5 {
                    batch.create_record(
                        json!({"id": format!("task-{}", i), "title": format!("Task #{}", i)}),
                        &RequestOptions::new().with_safe(true),
                    )?;
                }
                Ok(())
            },
            &scope,
        )
        .await?;

    if let Some(outcome) = result.aggregate() {
        println!("Published: {}", outcome.published.len());
        println!("Conflicts: {}", outcome.conflicts.len());
        println!("Skipped:   {}", outcome.skipped.len());
        println!("Errors:    {}\n", outcome.errors.len());
    }

    let mut page = client
        .list_records("demo", "tasks", &ListParams::new().limit(2).sort("title"))
        .await?;
    println!(
        "Collection version {:?}, {:?} records",
        page.last_modified, page.total_records
    );
    loop {
        for record in &page.data {
            println!("   {} {}", record["id"], record["title"]);
        }
        if !page.has_next_page {
            break;
        }
        page = page.next().await?;
    }

    let backoff = client.backoff().await;
    if !backoff.is_zero() {
        println!("\nServer asked to back off for {:?}", backoff);
    }

    Ok(())
}
