use std::collections::BTreeSet;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::query::criteria::{AreaUnit, Criteria, PriceColumn, StreetSearch, TenureSelector};
use crate::state::dataset::{min_max, round2, Dataset};
use crate::types::{FreeholdFlag, SaleSize, TransactionRow};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One filter dimension. Each present criterion yields exactly one tag column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    District,
    Region,
    Property,
    Freehold,
    MinLease,
    MaxLease,
    Street,
    MinPrice,
    MaxPrice,
    MinArea,
    MaxArea,
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Criterion::District => "district_flag",
            Criterion::Region => "region_flag",
            Criterion::Property => "property_flag",
            Criterion::Freehold => "freehold_flag",
            Criterion::MinLease => "min_lease_flag",
            Criterion::MaxLease => "max_lease_flag",
            Criterion::Street => "street_flag",
            Criterion::MinPrice => "min_price_flag",
            Criterion::MaxPrice => "max_price_flag",
            Criterion::MinArea => "min_area_flag",
            Criterion::MaxArea => "max_area_flag",
        };
        write!(f, "{s}")
    }
}

/// A resolved, typed test against one row. A null in the tested column fails.
#[derive(Debug, Clone)]
enum Predicate<'a> {
    District(&'a str),
    Region(&'a str),
    Property(&'a BTreeSet<String>),
    Tenure(TenureSelector),
    LeaseAtLeast(f64),
    LeaseAtMost(f64),
    Street(&'a StreetSearch),
    PriceAtLeast(PriceColumn, f64),
    PriceAtMost(PriceColumn, f64),
    AreaAtLeast(AreaUnit, f64),
    AreaAtMost(AreaUnit, f64),
}

impl Predicate<'_> {
    fn test(&self, row: &TransactionRow) -> bool {
        match self {
            Predicate::District(d) => row.district.as_deref() == Some(*d),
            Predicate::Region(r) => row.region.as_deref() == Some(*r),
            Predicate::Property(set) => row.property.as_ref().is_some_and(|p| set.contains(p)),
            Predicate::Tenure(TenureSelector::Freehold) => row.freehold == FreeholdFlag::Freehold,
            Predicate::Tenure(TenureSelector::Leasehold) => row.freehold != FreeholdFlag::Freehold,
            Predicate::LeaseAtLeast(min) => row.lease_left.is_some_and(|l| l as f64 >= *min),
            Predicate::LeaseAtMost(max) => row.lease_left.is_some_and(|l| l as f64 <= *max),
            Predicate::Street(search) => row.street_project.as_deref().is_some_and(|s| search.matches(s)),
            Predicate::PriceAtLeast(col, min) => col.value(row) >= *min,
            Predicate::PriceAtMost(col, max) => col.value(row) <= *max,
            Predicate::AreaAtLeast(unit, min) => unit.area(row) >= *min,
            Predicate::AreaAtMost(unit, max) => unit.area(row) <= *max,
        }
    }
}

impl Criteria {
    /// Every criterion with its predicate, `None` where the caller left it unset.
    fn predicates(&self) -> [(Criterion, Option<Predicate<'_>>); 11] {
        let price = self.price_column();
        let unit = self.area_unit;
        [
            (Criterion::District, self.district.as_deref().map(Predicate::District)),
            (Criterion::Region, self.region.as_deref().map(Predicate::Region)),
            (Criterion::Property, self.property.as_ref().map(Predicate::Property)),
            (Criterion::Freehold, self.tenure.map(Predicate::Tenure)),
            (Criterion::MinLease, self.min_lease.map(Predicate::LeaseAtLeast)),
            (Criterion::MaxLease, self.max_lease.map(Predicate::LeaseAtMost)),
            (Criterion::Street, self.street.as_ref().map(Predicate::Street)),
            (Criterion::MinPrice, self.min_price.map(|v| Predicate::PriceAtLeast(price, v))),
            (Criterion::MaxPrice, self.max_price.map(|v| Predicate::PriceAtMost(price, v))),
            (Criterion::MinArea, self.min_area.map(|v| Predicate::AreaAtLeast(unit, v))),
            (Criterion::MaxArea, self.max_area.map(|v| Predicate::AreaAtMost(unit, v))),
        ]
    }
}

// ---------------------------------------------------------------------------
// Tag table
// ---------------------------------------------------------------------------

/// Boolean column for a single criterion, one entry per dataset row.
#[derive(Debug, Clone)]
pub struct TagColumn {
    pub criterion: Criterion,
    pub values: Vec<bool>,
}

/// Per-row verdicts for every present criterion. Rows are kept iff every
/// column is true; with no columns every row passes.
#[derive(Debug, Clone)]
pub struct TagTable {
    pub row_count: usize,
    pub columns: Vec<TagColumn>,
}

impl TagTable {
    pub fn kept(&self, row: usize) -> bool {
        self.columns.iter().fold(true, |keep, col| keep && col.values[row])
    }

    /// Criteria that rejected `row`, in evaluation order.
    pub fn failed(&self, row: usize) -> Vec<Criterion> {
        self.columns
            .iter()
            .filter(|col| !col.values[row])
            .map(|col| col.criterion)
            .collect()
    }

    pub fn kept_indices(&self) -> Vec<usize> {
        (0..self.row_count).filter(|&i| self.kept(i)).collect()
    }

    pub fn exclusions(&self) -> Vec<Exclusion> {
        self.columns
            .iter()
            .map(|col| Exclusion {
                criterion: col.criterion,
                rows: col.values.iter().filter(|v| !**v).count(),
            })
            .collect()
    }
}

/// How many rows one criterion failed (a row can fail several).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub criterion: Criterion,
    pub rows: usize,
}

/// Tag every row against every present criterion.
pub fn evaluate(rows: &[TransactionRow], criteria: &Criteria) -> TagTable {
    let columns = criteria
        .predicates()
        .into_iter()
        .filter_map(|(criterion, predicate)| {
            predicate.map(|p| TagColumn {
                criterion,
                values: rows.iter().map(|r| p.test(r)).collect(),
            })
        })
        .collect();
    TagTable { row_count: rows.len(), columns }
}

/// Rows satisfying every present criterion, unrounded and in dataset order.
pub fn select(rows: &[TransactionRow], criteria: &Criteria) -> Vec<TransactionRow> {
    let tags = evaluate(rows, criteria);
    tags.kept_indices().into_iter().map(|i| rows[i].clone()).collect()
}

// ---------------------------------------------------------------------------
// Presentation output
// ---------------------------------------------------------------------------

/// A kept row as handed to the presentation layer: tags stripped, only the
/// selected unit system's area columns, money and area rounded to 2 dp.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub month: String,
    pub street_project: Option<String>,
    pub property: Option<String>,
    pub region: Option<String>,
    pub district: Option<String>,
    pub floor: Option<String>,
    pub sales: SaleSize,
    pub mgmt: Option<String>,
    pub freehold: FreeholdFlag,
    pub lease_left: Option<i64>,
    pub price: f64,
    pub price_per_area: f64,
    pub area: f64,
    pub area_unit: AreaUnit,
}

impl ResultRow {
    pub fn from_row(row: &TransactionRow, unit: AreaUnit) -> Self {
        let price_per_area = match unit {
            AreaUnit::Sqft => row.price_sqft,
            AreaUnit::Sqm => row.price_sqm,
        };
        Self {
            month: row.month.clone(),
            street_project: row.street_project.clone(),
            property: row.property.clone(),
            region: row.region.clone(),
            district: row.district.clone(),
            floor: row.floor.clone(),
            sales: row.sales,
            mgmt: row.mgmt.clone(),
            freehold: row.freehold,
            lease_left: row.lease_left,
            price: round2(row.price),
            price_per_area: round2(price_per_area),
            area: round2(unit.area(row)),
            area_unit: unit,
        }
    }

    /// "FH" for freehold, otherwise the remaining lease in years.
    pub fn lease_label(&self) -> Option<String> {
        match self.freehold {
            FreeholdFlag::Freehold => Some("FH".to_string()),
            _ => self.lease_left.map(|l| l.to_string()),
        }
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (price_col, area_col) = match self.area_unit {
            AreaUnit::Sqft => ("price_sqft", "area_sqft"),
            AreaUnit::Sqm => ("price_sqm", "area_sqm"),
        };
        let mut map = serializer.serialize_map(Some(14))?;
        map.serialize_entry("month", &self.month)?;
        map.serialize_entry("street - project", &self.street_project)?;
        map.serialize_entry("property", &self.property)?;
        map.serialize_entry("region", &self.region)?;
        map.serialize_entry("district", &self.district)?;
        map.serialize_entry("floor", &self.floor)?;
        map.serialize_entry("sales", &self.sales)?;
        map.serialize_entry("mgmt", &self.mgmt)?;
        map.serialize_entry("freehold", &self.freehold)?;
        map.serialize_entry("lease_left", &self.lease_left)?;
        map.serialize_entry("lease", &self.lease_label())?;
        map.serialize_entry("price", &self.price)?;
        map.serialize_entry(price_col, &self.price_per_area)?;
        map.serialize_entry(area_col, &self.area)?;
        map.end()
    }
}

/// Range of the kept rows on the query's own price and area columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub records: usize,
    pub price_column: &'static str,
    pub price_min: f64,
    pub price_max: f64,
    pub area_column: &'static str,
    pub area_min: f64,
    pub area_max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    /// None when nothing matched.
    pub summary: Option<Summary>,
    pub exclusions: Vec<Exclusion>,
    pub rows: Vec<ResultRow>,
}

/// Evaluate `criteria` against the dataset and shape the kept rows for display.
pub fn filter(dataset: &Dataset, criteria: &Criteria) -> FilterResult {
    let rows = dataset.rows();
    let tags = evaluate(rows, criteria);
    let unit = criteria.area_unit;
    let price = criteria.price_column();

    let kept: Vec<&TransactionRow> = tags.kept_indices().into_iter().map(|i| &rows[i]).collect();
    let summary = summarize(&kept, price, unit);
    let output = kept.iter().map(|r| ResultRow::from_row(r, unit)).collect();

    FilterResult { summary, exclusions: tags.exclusions(), rows: output }
}

fn summarize(kept: &[&TransactionRow], price: PriceColumn, unit: AreaUnit) -> Option<Summary> {
    let (price_min, price_max) = min_max(kept.iter().map(|r| price.value(r)));
    let (area_min, area_max) = min_max(kept.iter().map(|r| unit.area(r)));
    Some(Summary {
        records: kept.len(),
        price_column: price.name(),
        price_min: round2(price_min?),
        price_max: round2(price_max?),
        area_column: unit.area_column(),
        area_min: round2(area_min?),
        area_max: round2(area_max?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::criteria::PriceMode;
    use crate::state::dataset::fixtures::row;

    fn sample() -> Vec<TransactionRow> {
        let mut freehold = row("10", "CCR", 4_200_000.0, 150.0);
        freehold.freehold = FreeholdFlag::Freehold;
        freehold.lease = None;
        freehold.lease_start = None;
        freehold.lease_left = None;
        freehold.street_project = Some("HOLLAND ROAD - LEEDON GREEN".into());

        let mut ec = row("19", "OCR", 1_250_000.0, 95.0);
        ec.property = Some("EC".into());
        ec.lease_left = Some(92);

        let mut old = row("15", "RCR", 1_800_000.0, 110.0);
        old.lease_left = Some(55);
        old.street_project = Some("MARINE PARADE ROAD - SEAVIEW".into());

        let mut unknown = row("19", "OCR", 900_000.0, 70.0);
        unknown.freehold = FreeholdFlag::Unknown;
        unknown.lease_left = Some(99);

        vec![
            row("20", "OCR", 1_600_000.0, 100.0),
            freehold,
            ec,
            old,
            unknown,
            row("10", "CCR", 2_500_000.0, 90.0),
        ]
    }

    fn keys(rows: &[TransactionRow]) -> Vec<(Option<String>, u64)> {
        rows.iter().map(|r| (r.district.clone(), r.price as u64)).collect()
    }

    #[test]
    fn no_criteria_passes_everything_through() {
        let rows = sample();
        let tags = evaluate(&rows, &Criteria::default());
        assert!(tags.columns.is_empty());
        assert_eq!(select(&rows, &Criteria::default()).len(), rows.len());
    }

    #[test]
    fn one_tag_column_per_present_criterion() {
        let rows = sample();
        let criteria = Criteria {
            district: Some("19".into()),
            min_price: Some(1_000_000.0),
            ..Default::default()
        };
        let tags = evaluate(&rows, &criteria);
        let names: Vec<Criterion> = tags.columns.iter().map(|c| c.criterion).collect();
        assert_eq!(names, vec![Criterion::District, Criterion::MinPrice]);
        assert_eq!(tags.kept_indices(), vec![2]);
        // The unknown-tenure row in district 19 is below the price floor.
        assert_eq!(tags.failed(4), vec![Criterion::MinPrice]);
        assert_eq!(tags.failed(0), vec![Criterion::District]);
    }

    #[test]
    fn freehold_selectors() {
        let rows = sample();
        let fh = select(&rows, &Criteria { tenure: Some(TenureSelector::Freehold), ..Default::default() });
        assert_eq!(fh.len(), 1);
        assert_eq!(fh[0].freehold, FreeholdFlag::Freehold);

        // LH is "not freehold", unknown tenure included.
        let lh = select(&rows, &Criteria { tenure: Some(TenureSelector::Leasehold), ..Default::default() });
        assert_eq!(lh.len(), 5);
        assert!(lh.iter().any(|r| r.freehold == FreeholdFlag::Unknown));
    }

    #[test]
    fn lease_bounds_are_inclusive_and_reject_nulls() {
        let rows = sample();
        let kept = select(&rows, &Criteria { min_lease: Some(55.0), max_lease: Some(92.0), ..Default::default() });
        let mut lefts: Vec<i64> = kept.iter().filter_map(|r| r.lease_left).collect();
        lefts.sort();
        assert_eq!(lefts, vec![55, 92]);
        assert!(kept.iter().all(|r| r.freehold != FreeholdFlag::Freehold));
    }

    #[test]
    fn property_set_membership() {
        let rows = sample();
        let set: BTreeSet<String> = ["EC".to_string()].into_iter().collect();
        let kept = select(&rows, &Criteria { property: Some(set), ..Default::default() });
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].property.as_deref(), Some("EC"));
    }

    #[test]
    fn street_search_with_alternatives() {
        let rows = sample();
        let kept = select(
            &rows,
            &Criteria { street: StreetSearch::parse("leedon|seaview"), ..Default::default() },
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn price_bounds_use_resolved_column() {
        let rows = sample();
        // 1_600_000 / 100 sqm = 16_000 psm; 2_500_000 / 90 = 27_777 psm.
        let criteria = Criteria {
            min_price: Some(20_000.0),
            area_unit: AreaUnit::Sqm,
            price_mode: PriceMode::PerArea,
            ..Default::default()
        };
        let kept = select(&rows, &criteria);
        assert!(kept.iter().all(|r| r.price_sqm >= 20_000.0));
        assert!(kept.iter().any(|r| r.price == 2_500_000.0));
        assert!(!kept.iter().any(|r| r.price == 1_600_000.0));

        // Raw price mode ignores the area unit.
        let criteria = Criteria { max_price: Some(1_000_000.0), area_unit: AreaUnit::Sqm, ..Default::default() };
        assert_eq!(keys(&select(&rows, &criteria)), vec![(Some("19".to_string()), 900_000u64)]);
    }

    #[test]
    fn area_bounds_follow_area_unit() {
        let rows = sample();
        let sqm = select(&rows, &Criteria { min_area: Some(100.0), area_unit: AreaUnit::Sqm, ..Default::default() });
        assert_eq!(sqm.len(), 3);
        let sqft = select(&rows, &Criteria { min_area: Some(1076.0), ..Default::default() });
        assert_eq!(keys(&sqft), keys(&sqm));
    }

    #[test]
    fn filtering_is_idempotent() {
        let rows = sample();
        let criteria = Criteria {
            tenure: Some(TenureSelector::Leasehold),
            max_price: Some(2_000_000.0),
            min_area: Some(900.0),
            ..Default::default()
        };
        let once = select(&rows, &criteria);
        let twice = select(&once, &criteria);
        assert_eq!(once, twice);
        assert!(!once.is_empty());
    }

    #[test]
    fn filters_compose() {
        let rows = sample();
        let district = Criteria { district: Some("10".into()), ..Default::default() };
        let region = Criteria { region: Some("CCR".into()), ..Default::default() };
        let both = Criteria { district: Some("10".into()), region: Some("CCR".into()), ..Default::default() };

        let stepwise = select(&select(&rows, &district), &region);
        assert_eq!(stepwise, select(&rows, &both));
        assert_eq!(stepwise.len(), 2);
    }

    #[test]
    fn empty_dataset_filters_to_empty() {
        let ds = Dataset::from_rows(Vec::new());
        let criteria = Criteria { district: Some("10".into()), min_price: Some(1.0), ..Default::default() };
        let result = filter(&ds, &criteria);
        assert!(result.rows.is_empty());
        assert!(result.summary.is_none());
        assert!(result.exclusions.iter().all(|e| e.rows == 0));
    }

    #[test]
    fn output_is_rounded_and_unit_specific() {
        let ds = Dataset::from_rows(vec![row("09", "CCR", 1_234_567.891, 77.777)]);
        let result = filter(&ds, &Criteria { area_unit: AreaUnit::Sqm, ..Default::default() });
        let out = &result.rows[0];
        assert_eq!(out.price, 1_234_567.89);
        assert_eq!(out.area, 77.78);

        let json = serde_json::to_value(out).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("price_sqm"));
        assert!(obj.contains_key("area_sqm"));
        assert!(!obj.contains_key("price_sqft"));
        assert!(!obj.contains_key("area_sqft"));
        assert!(!obj.keys().any(|k| k.ends_with("_flag")));
        assert_eq!(obj["lease"], "96");
        assert_eq!(obj["freehold"], "No");
    }

    #[test]
    fn summary_and_exclusions() {
        let ds = Dataset::from_rows(sample());
        let result = filter(&ds, &Criteria { region: Some("OCR".into()), ..Default::default() });
        let summary = result.summary.unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.price_column, "price");
        assert_eq!(summary.price_min, 900_000.0);
        assert_eq!(summary.price_max, 1_600_000.0);
        assert_eq!(summary.area_column, "area_sqft");
        assert_eq!(result.exclusions, vec![Exclusion { criterion: Criterion::Region, rows: 3 }]);
    }
}
