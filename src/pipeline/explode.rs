use crate::config::MAX_UNITS_PER_SALE;
use crate::error::RecordError;
use crate::pipeline::merge::{text_field, TRANSACTION_KEY};
use crate::types::{ContractDate, RawRecord};

/// Parent fields that never reach a row.
const DROPPED_KEYS: &[&str] = &[TRANSACTION_KEY, "x", "y"];

/// Descriptive fields shared by every unit of one reported transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleFields {
    pub street: Option<String>,
    pub project: Option<String>,
    pub district: Option<String>,
    pub region: Option<String>,
    pub floor: Option<String>,
    pub mgmt: Option<String>,
    pub property_type: Option<String>,
    pub sale_type: Option<String>,
    pub tenure: Option<String>,
    pub contract: ContractDate,
}

/// One physical unit split out of a (possibly bulk) transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleUnit {
    pub fields: SaleFields,
    /// Units covered by the originating transaction.
    pub units: u32,
    /// Per-unit price: (nett price, else list price) / units.
    pub price: f64,
    /// Per-unit area in square metres.
    pub area_sqm: f64,
}

/// Flatten a sale record's `transaction` list and split each entry into
/// per-unit rows. One result per sub-transaction so that a bad entry only
/// takes itself down; entries that are not objects are errors too.
pub fn explode(record: &RawRecord) -> Vec<Result<Vec<SaleUnit>, RecordError>> {
    let subs = match record.get(TRANSACTION_KEY).and_then(|t| t.as_array()) {
        Some(a) => a,
        None => return Vec::new(),
    };

    subs.iter()
        .map(|s| {
            let sub = s.as_object().ok_or_else(|| RecordError::NotAnObject(s.to_string()))?;
            let mut flat: RawRecord = record
                .iter()
                .filter(|(k, _)| !DROPPED_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (k, v) in sub {
                flat.insert(k.clone(), v.clone());
            }
            explode_units(&flat)
        })
        .collect()
}

/// Replicate one flattened transaction once per index in `[0, units)`.
pub fn explode_units(flat: &RawRecord) -> Result<Vec<SaleUnit>, RecordError> {
    let units_text = text_field(flat, "noOfUnits").ok_or(RecordError::MissingField("noOfUnits"))?;
    let units: u32 = units_text
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n <= MAX_UNITS_PER_SALE)
        .ok_or_else(|| RecordError::UnitCount(units_text.clone()))?;

    let contract_text =
        text_field(flat, "contractDate").ok_or(RecordError::MissingField("contractDate"))?;
    let contract = ContractDate::parse_mmyy(contract_text.trim())?;

    let total_price = match non_empty(flat, "nettPrice") {
        Some(nett) => parse_number("nettPrice", &nett)?,
        None => {
            let list = non_empty(flat, "price").ok_or(RecordError::MissingField("price"))?;
            parse_number("price", &list)?
        }
    };

    let total_area = non_empty(flat, "area").ok_or(RecordError::MissingField("area"))?;
    let total_area = parse_number("area", &total_area)?;
    if total_area <= 0.0 {
        return Err(RecordError::NonPositiveArea(total_area));
    }

    let fields = SaleFields {
        street: non_empty(flat, "street"),
        project: non_empty(flat, "project"),
        district: non_empty(flat, "district"),
        region: non_empty(flat, "marketSegment"),
        floor: non_empty(flat, "floorRange"),
        mgmt: non_empty(flat, "typeOfArea"),
        property_type: non_empty(flat, "propertyType"),
        sale_type: non_empty(flat, "typeOfSale"),
        tenure: text_field(flat, "tenure"),
        contract,
    };

    let divisor = f64::from(units);
    Ok((0..units)
        .map(|_| SaleUnit {
            fields: fields.clone(),
            units,
            price: total_price / divisor,
            area_sqm: total_area / divisor,
        })
        .collect())
}

fn non_empty(record: &RawRecord, key: &str) -> Option<String> {
    text_field(record, key).filter(|s| !s.trim().is_empty())
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, RecordError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RecordError::InvalidNumber { field, value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: serde_json::Value) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    fn sale(units: &str, price: &str, nett: Option<&str>, area: &str) -> serde_json::Value {
        let mut v = json!({
            "area": area,
            "floorRange": "06-10",
            "noOfUnits": units,
            "contractDate": "0324",
            "typeOfSale": "3",
            "price": price,
            "propertyType": "Condominium",
            "district": "15",
            "typeOfArea": "Strata",
            "tenure": "Freehold",
        });
        if let Some(n) = nett {
            v["nettPrice"] = json!(n);
        }
        v
    }

    #[test]
    fn bulk_sale_splits_into_n_units_preserving_total() {
        let r = record(json!({
            "street": "MARINE PARADE ROAD",
            "project": "SEAVIEW",
            "marketSegment": "RCR",
            "x": "1", "y": "2",
            "transaction": [sale("7", "10500000", None, "700")],
        }));

        let results = explode(&r);
        assert_eq!(results.len(), 1);
        let units = results[0].as_ref().unwrap();
        assert_eq!(units.len(), 7);

        let total: f64 = units.iter().map(|u| u.price).sum();
        assert!((total - 10_500_000.0).abs() < 1e-6, "total={total}");
        assert!(units.iter().all(|u| (u.area_sqm - 100.0).abs() < 1e-9));
        assert!(units.iter().all(|u| u.units == 7));
        assert_eq!(units[0].fields.street.as_deref(), Some("MARINE PARADE ROAD"));
        assert_eq!(units[0].fields.region.as_deref(), Some("RCR"));
    }

    #[test]
    fn total_price_round_trips_for_many_unit_counts() {
        for n in [1u32, 2, 3, 7, 13, 40] {
            let r = record(json!({"transaction": [sale(&n.to_string(), "9876543.21", None, "1234.5")]}));
            let units = explode(&r).remove(0).unwrap();
            assert_eq!(units.len() as u32, n);
            let total = units[0].price * f64::from(n);
            assert!((total - 9_876_543.21).abs() < 1e-6, "n={n} total={total}");
        }
    }

    #[test]
    fn single_unit_yields_one_unchanged_row() {
        let r = record(json!({"transaction": [sale("1", "1500000", None, "95")]}));
        let units = explode(&r).remove(0).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].price, 1_500_000.0);
        assert_eq!(units[0].area_sqm, 95.0);
    }

    #[test]
    fn nett_price_takes_precedence_over_list_price() {
        let r = record(json!({"transaction": [sale("2", "2000000", Some("1800000"), "200")]}));
        let units = explode(&r).remove(0).unwrap();
        assert_eq!(units[0].price, 900_000.0);
    }

    #[test]
    fn bad_unit_count_fails_only_its_record() {
        let r = record(json!({
            "street": "ORCHARD ROAD",
            "transaction": [sale("two", "1000000", None, "80"), sale("1", "1200000", None, "90")],
        }));
        let results = explode(&r);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Err(RecordError::UnitCount("two".to_string())));
        assert_eq!(results[1].as_ref().unwrap().len(), 1);
    }

    #[test]
    fn zero_units_yields_no_rows() {
        let r = record(json!({"transaction": [sale("0", "1000000", None, "80")]}));
        assert!(explode(&r).remove(0).unwrap().is_empty());
    }

    #[test]
    fn missing_or_empty_transaction_list_contributes_nothing() {
        assert!(explode(&record(json!({"street": "A"}))).is_empty());
        assert!(explode(&record(json!({"street": "A", "transaction": []}))).is_empty());
    }

    #[test]
    fn non_numeric_price_and_zero_area_are_rejected() {
        let r = record(json!({"transaction": [
            sale("1", "n/a", None, "80"),
            sale("1", "1000000", None, "0"),
        ]}));
        let results = explode(&r);
        assert!(matches!(results[0], Err(RecordError::InvalidNumber { field: "price", .. })));
        assert!(matches!(results[1], Err(RecordError::NonPositiveArea(_))));
    }

    #[test]
    fn non_object_sub_transactions_are_errors() {
        let r = record(json!({"transaction": ["garbage", 42, sale("1", "1000000", None, "80")]}));
        let results = explode(&r);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Err(RecordError::NotAnObject("\"garbage\"".to_string())));
        assert_eq!(results[1], Err(RecordError::NotAnObject("42".to_string())));
        assert_eq!(results[2].as_ref().unwrap().len(), 1);
    }

    #[test]
    fn unit_count_above_cap_is_rejected() {
        let r = record(json!({"transaction": [
            sale("4000000000", "1000000", None, "80"),
            sale(&MAX_UNITS_PER_SALE.to_string(), "1000000", None, "80"),
        ]}));
        let results = explode(&r);
        assert_eq!(results[0], Err(RecordError::UnitCount("4000000000".to_string())));
        assert_eq!(results[1].as_ref().unwrap().len(), MAX_UNITS_PER_SALE as usize);
    }

    #[test]
    fn numeric_json_unit_count_is_accepted() {
        let mut s = sale("1", "1000000", None, "80");
        s["noOfUnits"] = json!(3);
        let r = record(json!({"transaction": [s]}));
        assert_eq!(explode(&r).remove(0).unwrap().len(), 3);
    }
}
