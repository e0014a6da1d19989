use tracing::{info, warn};

use crate::error::Result;
use crate::types::{RawBatch, RawRecord};

/// Key holding the nested sub-transactions of a sale record.
pub const TRANSACTION_KEY: &str = "transaction";

/// Row-wise union of every partition that came back.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    /// Ordered union of every field name seen, parent and sub-transaction alike.
    /// A record lacking one of these simply reads it as absent.
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
    pub partitions_ok: usize,
    pub partitions_failed: usize,
}

impl RawDataset {
    fn absorb_columns(&mut self, record: &RawRecord) {
        for (key, value) in record {
            if key == TRANSACTION_KEY {
                let subs = value.as_array().map(|a| a.as_slice()).unwrap_or_default();
                for sub in subs.iter().filter_map(|s| s.as_object()) {
                    for sub_key in sub.keys() {
                        self.add_column(sub_key);
                    }
                }
            } else {
                self.add_column(key);
            }
        }
    }

    fn add_column(&mut self, key: &str) {
        if !self.columns.iter().any(|c| c == key) {
            self.columns.push(key.to_string());
        }
    }
}

/// Union the per-partition fetch results. A failed partition contributes
/// nothing; the merge itself never fails.
pub fn merge(results: Vec<Result<RawBatch>>) -> RawDataset {
    let mut merged = RawDataset::default();

    for result in results {
        match result {
            Ok(batch) => {
                merged.partitions_ok += 1;
                info!(
                    partition = %batch.partition,
                    records = batch.records.len(),
                    "[MERGE] partition {} contributed {} records",
                    batch.partition,
                    batch.records.len(),
                );
                for record in batch.records {
                    merged.absorb_columns(&record);
                    merged.records.push(record);
                }
            }
            Err(e) => {
                merged.partitions_failed += 1;
                warn!("[MERGE] partition dropped, contributing no rows: {e}");
            }
        }
    }

    merged
}

/// Read a field as text. Absent keys and explicit nulls are both absent;
/// numbers are rendered so that `"3"` and `3` read the same.
pub fn text_field(record: &RawRecord, key: &str) -> Option<String> {
    match record.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
