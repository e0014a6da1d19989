use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DEFAULT_LEASE_LEFT;
use crate::error::RecordError;
use crate::types::FreeholdFlag;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit regex"));

/// Structured view of a tenure description such as
/// `"99 yrs lease commencing from 2011"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenure {
    pub freehold: FreeholdFlag,
    /// Lease duration in years.
    pub lease: Option<i64>,
    /// Four-digit commencement year.
    pub lease_start: Option<i64>,
    /// Years consumed as of the sale year.
    pub lease_used: Option<i64>,
    pub lease_left: Option<i64>,
}

/// Parse tenure text against the year the unit was sold in.
///
/// The first digit run is the lease length, the second its commencement
/// year. Two-digit years are widened with the sale year's century. A
/// commencement year of any other width makes the tenure malformed.
pub fn parse_tenure(text: Option<&str>, sale_year: i32) -> Result<Tenure, RecordError> {
    let freehold = match text {
        None => FreeholdFlag::Unknown,
        Some(t) if t.trim().is_empty() => FreeholdFlag::Unknown,
        Some("Freehold") => FreeholdFlag::Freehold,
        Some(_) => FreeholdFlag::Leasehold,
    };

    let runs: Vec<&str> = text
        .map(|t| DIGIT_RUN.find_iter(t).map(|m| m.as_str()).collect())
        .unwrap_or_default();

    let malformed = |reason: String| RecordError::Tenure {
        text: text.unwrap_or_default().to_string(),
        reason,
    };

    let lease = runs
        .first()
        .map(|r| r.parse::<i64>().map_err(|_| malformed(format!("lease {r} out of range"))))
        .transpose()?;

    let lease_start = runs
        .get(1)
        .map(|r| normalize_year(r, sale_year).ok_or_else(|| malformed(format!("commencement year {r} is not 2 or 4 digits"))))
        .transpose()?;

    let overflow = || malformed("lease arithmetic overflows".to_string());
    let lease_used = lease_start
        .map(|start| i64::from(sale_year).checked_sub(start).ok_or_else(overflow))
        .transpose()?;
    let mut lease_left = match (lease, lease_used) {
        (Some(l), Some(used)) => Some(l.checked_sub(used).ok_or_else(overflow)?),
        _ => None,
    };

    if freehold == FreeholdFlag::Unknown && lease_start.is_none() && lease_left.is_none() {
        lease_left = Some(DEFAULT_LEASE_LEFT);
    }

    Ok(Tenure { freehold, lease, lease_start, lease_used, lease_left })
}

fn normalize_year(run: &str, sale_year: i32) -> Option<i64> {
    let year: i64 = run.parse().ok()?;
    match run.len() {
        4 => Some(year),
        2 => {
            let sale_year = i64::from(sale_year);
            let widened = sale_year / 100 * 100 + year;
            // "commencing from 95" sold in 2024 means 1995, not 2095.
            Some(if widened > sale_year { widened - 100 } else { widened })
        }
        _ => None,
    }
}
