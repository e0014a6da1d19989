use std::collections::BTreeSet;

use serde::Deserialize;

use crate::config::ALL;
use crate::error::CriteriaError;
use crate::types::TransactionRow;

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaUnit {
    #[default]
    Sqft,
    Sqm,
}

impl AreaUnit {
    pub fn area(&self, row: &TransactionRow) -> f64 {
        match self {
            AreaUnit::Sqft => row.area_sqft,
            AreaUnit::Sqm => row.area_sqm,
        }
    }

    pub fn area_column(&self) -> &'static str {
        match self {
            AreaUnit::Sqft => "area_sqft",
            AreaUnit::Sqm => "area_sqm",
        }
    }

    fn parse(raw: &str) -> Result<Self, CriteriaError> {
        match raw {
            "sqft" | "area_sqft" => Ok(AreaUnit::Sqft),
            "sqm" | "area_sqm" => Ok(AreaUnit::Sqm),
            other => Err(CriteriaError::UnknownValue {
                field: "area_unit",
                value: other.to_string(),
                expected: "sqft, sqm",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceMode {
    /// Whole-unit price.
    #[default]
    Price,
    /// Price divided by area in the selected unit system.
    PerArea,
}

impl PriceMode {
    fn parse(raw: &str) -> Result<Self, CriteriaError> {
        match raw {
            "price" => Ok(PriceMode::Price),
            "price_area" => Ok(PriceMode::PerArea),
            other => Err(CriteriaError::UnknownValue {
                field: "price_mode",
                value: other.to_string(),
                expected: "price, price_area",
            }),
        }
    }
}

/// The numeric column price bounds apply to, resolved once per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceColumn {
    Price,
    PricePerSqm,
    PricePerSqft,
}

impl PriceColumn {
    pub fn resolve(mode: PriceMode, unit: AreaUnit) -> Self {
        match (mode, unit) {
            (PriceMode::Price, _) => PriceColumn::Price,
            (PriceMode::PerArea, AreaUnit::Sqft) => PriceColumn::PricePerSqft,
            (PriceMode::PerArea, AreaUnit::Sqm) => PriceColumn::PricePerSqm,
        }
    }

    pub fn value(&self, row: &TransactionRow) -> f64 {
        match self {
            PriceColumn::Price => row.price,
            PriceColumn::PricePerSqm => row.price_sqm,
            PriceColumn::PricePerSqft => row.price_sqft,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PriceColumn::Price => "price",
            PriceColumn::PricePerSqm => "price_sqm",
            PriceColumn::PricePerSqft => "price_sqft",
        }
    }
}

/// `FH` keeps freehold rows; `LH` keeps everything that is not freehold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenureSelector {
    Freehold,
    Leasehold,
}

/// Case-insensitive substring search over "street - project".
/// `|` separates alternatives; any one matching is enough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetSearch {
    terms: Vec<String>,
}

impl StreetSearch {
    pub fn parse(raw: &str) -> Option<Self> {
        let terms: Vec<String> = raw
            .split('|')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(Self { terms })
        }
    }

    pub fn matches(&self, haystack: &str) -> bool {
        let haystack = haystack.to_lowercase();
        self.terms.iter().any(|t| haystack.contains(t.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// Validated query. `None` means the criterion is not applied at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub district: Option<String>,
    pub region: Option<String>,
    pub property: Option<BTreeSet<String>>,
    pub tenure: Option<TenureSelector>,
    pub min_lease: Option<f64>,
    pub max_lease: Option<f64>,
    pub street: Option<StreetSearch>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub area_unit: AreaUnit,
    pub price_mode: PriceMode,
}

impl Criteria {
    pub fn price_column(&self) -> PriceColumn {
        PriceColumn::resolve(self.price_mode, self.area_unit)
    }
}

/// Criteria exactly as received from the presentation layer (query string).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CriteriaParams {
    pub district: Option<String>,
    pub region: Option<String>,
    /// Comma-separated property labels, or "All".
    pub property: Option<String>,
    /// "FH", "LH" or "All".
    pub freehold: Option<String>,
    pub min_lease: Option<String>,
    pub max_lease: Option<String>,
    pub street: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_area: Option<String>,
    pub max_area: Option<String>,
    pub area_unit: Option<String>,
    pub price_mode: Option<String>,
}

impl TryFrom<CriteriaParams> for Criteria {
    type Error = CriteriaError;

    fn try_from(p: CriteriaParams) -> Result<Self, Self::Error> {
        let tenure = match present(&p.freehold) {
            None | Some(ALL) => None,
            Some("FH") => Some(TenureSelector::Freehold),
            Some("LH") => Some(TenureSelector::Leasehold),
            Some(other) => {
                return Err(CriteriaError::UnknownValue {
                    field: "freehold",
                    value: other.to_string(),
                    expected: "FH, LH, All",
                })
            }
        };

        let property = match present(&p.property) {
            None | Some(ALL) => None,
            Some(list) => {
                let set: BTreeSet<String> = list
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                (!set.is_empty()).then_some(set)
            }
        };

        Ok(Self {
            district: categorical(&p.district),
            region: categorical(&p.region),
            property,
            tenure,
            min_lease: bound("min_lease", &p.min_lease)?,
            max_lease: bound("max_lease", &p.max_lease)?,
            street: present(&p.street).and_then(StreetSearch::parse),
            min_price: bound("min_price", &p.min_price)?,
            max_price: bound("max_price", &p.max_price)?,
            min_area: bound("min_area", &p.min_area)?,
            max_area: bound("max_area", &p.max_area)?,
            area_unit: present(&p.area_unit).map(AreaUnit::parse).transpose()?.unwrap_or_default(),
            price_mode: present(&p.price_mode).map(PriceMode::parse).transpose()?.unwrap_or_default(),
        })
    }
}

/// Trimmed, non-empty parameter value.
fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn categorical(v: &Option<String>) -> Option<String> {
    present(v).filter(|s| *s != ALL).map(str::to_string)
}

fn bound(field: &'static str, v: &Option<String>) -> Result<Option<f64>, CriteriaError> {
    present(v)
        .map(|s| {
            s.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| CriteriaError::NotNumeric { field, value: s.to_string() })
        })
        .transpose()
}
