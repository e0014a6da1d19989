use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::config::{Config, TOKEN_PATH, TRANSACTION_PATH, USER_AGENT};
use crate::error::{AppError, Result};
use crate::types::{RawBatch, RawRecord};

/// Authenticated client for the URA data service. Holds the access key and
/// the daily token acquired at construction.
pub struct UraClient {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
    token: String,
}

impl UraClient {
    /// Build the HTTP client and acquire a token. Failure here is fatal:
    /// without a token no partition can be fetched.
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        let url = format!("{}{}", cfg.base_url, TOKEN_PATH);
        let resp: serde_json::Value = client
            .get(&url)
            .header("AccessKey", &cfg.access_key)
            .send()
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let token = parse_token(&resp)?;
        info!("[FETCH] token acquired");

        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            access_key: cfg.access_key.clone(),
            token,
        })
    }

    /// Fetch one pagination partition.
    pub async fn fetch_partition(&self, partition: &str) -> Result<RawBatch> {
        let url = format!("{}{}{}", self.base_url, TRANSACTION_PATH, partition);
        let resp = self
            .client
            .get(&url)
            .header("AccessKey", &self.access_key)
            .header("Token", &self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Partition {
                partition: partition.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        Ok(parse_batch(partition, &body))
    }
}

/// Fetch every configured partition on a bounded pool. Each partition's
/// outcome is returned as-is; individual failures are logged, not raised.
pub async fn fetch_all(client: &UraClient, cfg: &Config) -> Vec<Result<RawBatch>> {
    info!(
        partitions = cfg.partitions.len(),
        workers = cfg.fetch_workers,
        "[FETCH] fetching {} partitions with {} workers",
        cfg.partitions.len(),
        cfg.fetch_workers,
    );

    stream::iter(cfg.partitions.iter())
        .map(|partition| async move {
            let result = client.fetch_partition(partition).await;
            match &result {
                Ok(batch) => info!("[FETCH] partition {partition}: {} records", batch.records.len()),
                Err(e) => warn!("[FETCH] partition {partition} failed, contributing no rows: {e}"),
            }
            result
        })
        .buffer_unordered(cfg.fetch_workers)
        .collect()
        .await
}

/// Extract the token from `{"Status": "Success", "Result": "<token>"}`.
pub fn parse_token(resp: &serde_json::Value) -> Result<String> {
    match resp.get("Result").and_then(|r| r.as_str()) {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        _ => {
            let message = resp
                .get("Message")
                .and_then(|m| m.as_str())
                .unwrap_or("response carried no token");
            Err(AppError::Auth(message.to_string()))
        }
    }
}

/// Pull the sale records out of a partition response. A missing or
/// non-array `Result` is an empty batch; non-object entries are skipped
/// with a warning.
pub fn parse_batch(partition: &str, body: &serde_json::Value) -> RawBatch {
    let items = body
        .get("Result")
        .and_then(|r| r.as_array())
        .map(|a| a.as_slice())
        .unwrap_or_default();
    let records: Vec<RawRecord> = items.iter().filter_map(|i| i.as_object().cloned()).collect();

    let skipped = items.len() - records.len();
    if skipped > 0 {
        warn!(
            partition,
            skipped,
            "[FETCH] partition {partition}: skipped {skipped} non-object records",
        );
    }

    RawBatch { partition: partition.to_string(), records }
}
