use chrono::{Datelike, NaiveDate};

use crate::config::SQFT_PER_SQM;
use crate::pipeline::explode::SaleUnit;
use crate::pipeline::lease::Tenure;
use crate::types::{SaleSize, TransactionRow};

/// URA property types → display taxonomy. Exact matches only.
const PROPERTY_LABELS: &[(&str, &str)] = &[
    ("Condominium", "Condo"),
    ("Strata", "S."),
    ("Strata Semi-detached", "Semi-D"),
    ("Strata Terrace", "Terrace"),
    ("Strata Detached", "Detached"),
    ("Executive Condo", "EC"),
    ("Semi-detached", "Semi-D"),
];

pub fn normalize_property(raw: &str) -> String {
    PROPERTY_LABELS
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// The `months` most recent calendar months up to and including `today`'s,
/// oldest first, as `YYYY-MM`.
pub fn month_window(today: NaiveDate, months: u32) -> Vec<String> {
    let current = today.year() * 12 + today.month0() as i32;
    (0..months as i32)
        .rev()
        .map(|back| {
            let idx = current - back;
            format!("{:04}-{:02}", idx.div_euclid(12), idx.rem_euclid(12) + 1)
        })
        .collect()
}

/// Combine one exploded unit with its parsed tenure into a dataset row.
pub fn derive_row(unit: &SaleUnit, tenure: &Tenure) -> TransactionRow {
    let f = &unit.fields;
    let area_sqft = unit.area_sqm * SQFT_PER_SQM;

    let street_project = match (&f.street, &f.project) {
        (Some(s), Some(p)) => Some(format!("{s} - {p}")),
        _ => None,
    };

    TransactionRow {
        month: f.contract.month_key(),
        sale_year: f.contract.year,
        street: f.street.clone(),
        project: f.project.clone(),
        street_project,
        district: f.district.clone(),
        region: f.region.clone(),
        floor: f.floor.clone(),
        mgmt: f.mgmt.clone(),
        property: f.property_type.as_deref().map(normalize_property),
        sale_type: f.sale_type.clone(),
        sales: SaleSize::from_units(unit.units),
        tenure: f.tenure.clone(),
        freehold: tenure.freehold,
        lease: tenure.lease,
        lease_start: tenure.lease_start,
        lease_left: tenure.lease_left,
        price: unit.price,
        area_sqm: unit.area_sqm,
        area_sqft,
        price_sqm: unit.price / unit.area_sqm,
        price_sqft: unit.price / area_sqft,
    }
}
