//! Raw batches → per-unit transaction rows.
//!
//! merge → explode → lease → metrics → rolling month window.

pub mod explode;
pub mod lease;
pub mod merge;
pub mod metrics;

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::RecordError;
use crate::types::TransactionRow;
use merge::RawDataset;

#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildStats {
    pub partitions_ok: usize,
    pub partitions_failed: usize,
    pub raw_records: usize,
    pub sub_transactions: usize,
    pub rejected_units: usize,
    pub rejected_fields: usize,
    pub rejected_contract_date: usize,
    pub rejected_tenure: usize,
    pub unit_rows: usize,
    pub outside_window: usize,
    pub retained: usize,
}

impl BuildStats {
    fn reject(&mut self, err: &RecordError) {
        match err {
            RecordError::UnitCount(_) => self.rejected_units += 1,
            RecordError::ContractDate(_) => self.rejected_contract_date += 1,
            RecordError::Tenure { .. } => self.rejected_tenure += 1,
            RecordError::MissingField(_)
            | RecordError::NotAnObject(_)
            | RecordError::InvalidNumber { .. }
            | RecordError::NonPositiveArea(_) => self.rejected_fields += 1,
        }
    }
}

/// Build the durable row set from the merged raw dataset, keeping only rows
/// whose month falls inside `window`.
pub fn build_rows(raw: &RawDataset, window: &[String]) -> (Vec<TransactionRow>, BuildStats) {
    let window: HashSet<&str> = window.iter().map(String::as_str).collect();
    let mut stats = BuildStats {
        partitions_ok: raw.partitions_ok,
        partitions_failed: raw.partitions_failed,
        raw_records: raw.records.len(),
        ..Default::default()
    };
    let mut rows = Vec::new();

    for record in &raw.records {
        for sale in explode::explode(record) {
            stats.sub_transactions += 1;
            let units = match sale {
                Ok(units) => units,
                Err(e) => {
                    debug!("[PIPELINE] dropped sale record: {e}");
                    stats.reject(&e);
                    continue;
                }
            };
            let Some(first) = units.first() else { continue };

            let tenure = match lease::parse_tenure(first.fields.tenure.as_deref(), first.fields.contract.year) {
                Ok(t) => t,
                Err(e) => {
                    debug!("[PIPELINE] dropped sale record: {e}");
                    stats.reject(&e);
                    continue;
                }
            };

            for unit in &units {
                stats.unit_rows += 1;
                let row = metrics::derive_row(unit, &tenure);
                if window.contains(row.month.as_str()) {
                    rows.push(row);
                } else {
                    stats.outside_window += 1;
                }
            }
        }
    }

    stats.retained = rows.len();
    info!(
        raw_records = stats.raw_records,
        unit_rows = stats.unit_rows,
        retained = stats.retained,
        "[PIPELINE] built {} rows from {} records ({} outside window)",
        stats.retained,
        stats.raw_records,
        stats.outside_window,
    );
    info!(
        "[PIPELINE] rejected: units={} fields={} contract_date={} tenure={}",
        stats.rejected_units,
        stats.rejected_fields,
        stats.rejected_contract_date,
        stats.rejected_tenure,
    );
    (rows, stats)
}

/// Window ending in `today`'s month, then [`build_rows`].
pub fn build_for_month(raw: &RawDataset, today: NaiveDate, window_months: u32) -> (Vec<TransactionRow>, Vec<String>, BuildStats) {
    let window = metrics::month_window(today, window_months);
    let (rows, stats) = build_rows(raw, &window);
    (rows, window, stats)
}
