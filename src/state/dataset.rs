use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::config::ALL;
use crate::pipeline::BuildStats;
use crate::types::TransactionRow;

/// The materialized row set. Built once at startup and shared read-only;
/// queries never mutate it.
#[derive(Debug, Default)]
pub struct Dataset {
    rows: Vec<TransactionRow>,
    /// Months the rows were windowed to, oldest first.
    months: Vec<String>,
    stats: BuildStats,
    options: DatasetOptions,
}

/// Choices and bounds offered to the presentation layer before any query.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DatasetOptions {
    /// Sorted, with "All" first.
    pub districts: Vec<String>,
    /// Sorted, with "All" first.
    pub regions: Vec<String>,
    pub properties: Vec<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub area_sqft_min: Option<f64>,
    pub area_sqft_max: Option<f64>,
}

impl Dataset {
    pub fn new(rows: Vec<TransactionRow>, months: Vec<String>, stats: BuildStats) -> Arc<Self> {
        let options = DatasetOptions::from_rows(&rows);
        Arc::new(Self { rows, months, stats, options })
    }

    pub fn from_rows(rows: Vec<TransactionRow>) -> Arc<Self> {
        Self::new(rows, Vec::new(), BuildStats::default())
    }

    pub fn rows(&self) -> &[TransactionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn months(&self) -> &[String] {
        &self.months
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn options(&self) -> &DatasetOptions {
        &self.options
    }
}

impl DatasetOptions {
    fn from_rows(rows: &[TransactionRow]) -> Self {
        let with_all = |values: BTreeSet<&str>| {
            std::iter::once(ALL.to_string())
                .chain(values.into_iter().map(str::to_string))
                .collect::<Vec<_>>()
        };

        let districts: BTreeSet<&str> = rows.iter().filter_map(|r| r.district.as_deref()).collect();
        let regions: BTreeSet<&str> = rows.iter().filter_map(|r| r.region.as_deref()).collect();
        let properties: BTreeSet<&str> = rows.iter().filter_map(|r| r.property.as_deref()).collect();

        let (price_min, price_max) = min_max(rows.iter().map(|r| r.price));
        let (area_min, area_max) = min_max(rows.iter().map(|r| r.area_sqft));

        Self {
            districts: with_all(districts),
            regions: with_all(regions),
            properties: properties.into_iter().map(str::to_string).collect(),
            price_min,
            price_max,
            area_sqft_min: area_min.map(round2),
            area_sqft_max: area_max.map(round2),
        }
    }
}

pub(crate) fn min_max(values: impl Iterator<Item = f64>) -> (Option<f64>, Option<f64>) {
    values.fold((None, None), |(lo, hi), v| {
        (
            Some(lo.map_or(v, |l: f64| l.min(v))),
            Some(hi.map_or(v, |h: f64| h.max(v))),
        )
    })
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::config::SQFT_PER_SQM;
    use crate::types::{FreeholdFlag, SaleSize, TransactionRow};

    /// A leasehold condo row; tweak fields with struct update syntax.
    pub fn row(district: &str, region: &str, price: f64, area_sqm: f64) -> TransactionRow {
        let area_sqft = area_sqm * SQFT_PER_SQM;
        TransactionRow {
            month: "2024-06".into(),
            sale_year: 2024,
            street: Some("ANG MO KIO AVENUE 1".into()),
            project: Some("AMO RESIDENCE".into()),
            street_project: Some("ANG MO KIO AVENUE 1 - AMO RESIDENCE".into()),
            district: Some(district.into()),
            region: Some(region.into()),
            floor: Some("11-15".into()),
            mgmt: Some("Strata".into()),
            property: Some("Condo".into()),
            sale_type: Some("1".into()),
            sales: SaleSize::Single,
            tenure: Some("99 yrs lease commencing from 2021".into()),
            freehold: FreeholdFlag::Leasehold,
            lease: Some(99),
            lease_start: Some(2021),
            lease_left: Some(96),
            price,
            area_sqm,
            area_sqft,
            price_sqm: price / area_sqm,
            price_sqft: price / area_sqft,
        }
    }
}
