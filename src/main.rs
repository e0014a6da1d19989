mod api;
mod config;
mod error;
mod fetcher;
mod pipeline;
mod query;
mod state;
mod types;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{fetch_all, UraClient};
use crate::state::Dataset;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Fetch: token failure is fatal, partition failures are not ---
    let client = UraClient::connect(&cfg).await?;
    let results = fetch_all(&client, &cfg).await;

    // --- Merge + build the immutable dataset ---
    let raw = pipeline::merge::merge(results);
    info!(
        "[MERGE] {} records from {}/{} partitions, {} distinct columns",
        raw.records.len(),
        raw.partitions_ok,
        raw.partitions_ok + raw.partitions_failed,
        raw.columns.len(),
    );
    if raw.partitions_ok == 0 {
        warn!("[MERGE] every partition failed, serving an empty dataset");
    }

    let today = chrono::Local::now().date_naive();
    let (rows, months, stats) = pipeline::build_for_month(&raw, today, cfg.window_months);
    drop(raw);
    info!(
        "[PIPELINE] window {} .. {} ({} months)",
        months.first().map(String::as_str).unwrap_or("-"),
        months.last().map(String::as_str).unwrap_or("-"),
        months.len(),
    );
    let dataset = Dataset::new(rows, months, stats);
    if dataset.is_empty() {
        warn!("[PIPELINE] no rows fall inside the window, queries will return nothing");
    }

    // --- HTTP API ---
    let app = router(ApiState::new(dataset));
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
