use serde::{Serialize, Serializer};

use crate::error::RecordError;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// One sale record as returned by the transaction API: shared project fields
/// plus a nested `transaction` list.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// One page of API response for a single partition.
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub partition: String,
    pub records: Vec<RawRecord>,
}

// ---------------------------------------------------------------------------
// Contract date
// ---------------------------------------------------------------------------

/// Sale date as reported by URA (`MMYY`, e.g. `0124` → January 2024).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractDate {
    pub year: i32,
    pub month: u32,
}

impl ContractDate {
    pub fn parse_mmyy(s: &str) -> Result<Self, RecordError> {
        let bad = || RecordError::ContractDate(s.to_string());
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let month: u32 = s[0..2].parse().map_err(|_| bad())?;
        let yy: i32 = s[2..4].parse().map_err(|_| bad())?;
        if !(1..=12).contains(&month) {
            return Err(bad());
        }
        Ok(Self { year: 2000 + yy, month })
    }

    /// `YYYY-MM` bucket used by the rolling window.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// Categorical flags
// ---------------------------------------------------------------------------

/// Tenure class. `Unknown` is reported as null and only arises when the
/// source carries no tenure text at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeholdFlag {
    Freehold,
    Leasehold,
    Unknown,
}

impl FreeholdFlag {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            FreeholdFlag::Freehold => Some("FH"),
            FreeholdFlag::Leasehold => Some("No"),
            FreeholdFlag::Unknown => None,
        }
    }
}

impl Serialize for FreeholdFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.label() {
            Some(l) => serializer.serialize_str(l),
            None => serializer.serialize_none(),
        }
    }
}

/// Whether the reported transaction covered one unit or a bulk purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleSize {
    Single,
    Bulk,
}

impl SaleSize {
    pub fn from_units(units: u32) -> Self {
        if units == 1 {
            SaleSize::Single
        } else {
            SaleSize::Bulk
        }
    }
}

impl std::fmt::Display for SaleSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleSize::Single => write!(f, "1"),
            SaleSize::Bulk => write!(f, ">1"),
        }
    }
}

impl Serialize for SaleSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// TransactionRow
// ---------------------------------------------------------------------------

/// One unit-level sale. Built once at startup, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub month: String,
    pub sale_year: i32,
    pub street: Option<String>,
    pub project: Option<String>,
    /// `"{street} - {project}"`, absent when either part is missing.
    pub street_project: Option<String>,
    pub district: Option<String>,
    pub region: Option<String>,
    pub floor: Option<String>,
    pub mgmt: Option<String>,
    pub property: Option<String>,
    pub sale_type: Option<String>,
    pub sales: SaleSize,
    pub tenure: Option<String>,
    pub freehold: FreeholdFlag,
    pub lease: Option<i64>,
    pub lease_start: Option<i64>,
    pub lease_left: Option<i64>,
    pub price: f64,
    pub area_sqm: f64,
    pub area_sqft: f64,
    pub price_sqm: f64,
    pub price_sqft: f64,
}
