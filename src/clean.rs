//! Cleaning of raw heterogeneous indicator tables
//!
//! Raw tables arrive with one of two known field-naming conventions (the
//! source sometimes emits `IndicatorCode`, sometimes an already-lowercased
//! `indicator_code`). Cleaning reconciles them into the canonical
//! [`IndicatorRecord`] schema, coercing values and dropping rows that
//! cannot be repaired. Malformed rows never abort the batch.

use crate::data::{opt_f64_column, opt_i32_column, opt_str_column, IndicatorRecord};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::DataFrame;
use std::collections::HashSet;
use tracing::debug;

/// Clean a raw indicator table into canonical records.
///
/// Rows are dropped when the year is unparsable, no numeric value can be
/// resolved, the country code is not exactly 3 characters, or the
/// indicator code is empty. Exact key duplicates are dropped, not merged.
pub fn clean_records(df: &DataFrame) -> Vec<IndicatorRecord> {
    let height = df.height();

    // Prefer the already-lowercased indicator column when both exist
    let indicator = opt_str_column(df, "indicator_code")
        .or_else(|| opt_str_column(df, "IndicatorCode"))
        .unwrap_or_else(|| vec![None; height]);

    let id = opt_str_column(df, "id").unwrap_or_else(|| vec![None; height]);
    let country = opt_str_column(df, "SpatialDim").unwrap_or_else(|| vec![None; height]);
    let region_code = opt_str_column(df, "ParentLocationCode").unwrap_or_else(|| vec![None; height]);
    let region = opt_str_column(df, "ParentLocation").unwrap_or_else(|| vec![None; height]);
    let year = opt_i32_column(df, "TimeDim").unwrap_or_else(|| vec![None; height]);
    let sex = opt_str_column(df, "Dim1").unwrap_or_else(|| vec![None; height]);
    let value_text = opt_str_column(df, "Value").unwrap_or_else(|| vec![None; height]);
    let value_numeric = opt_f64_column(df, "NumericValue").unwrap_or_else(|| vec![None; height]);
    let low = opt_f64_column(df, "Low").unwrap_or_else(|| vec![None; height]);
    let high = opt_f64_column(df, "High").unwrap_or_else(|| vec![None; height]);
    let date_reported = opt_str_column(df, "Date").unwrap_or_else(|| vec![None; height]);

    let mut records = Vec::with_capacity(height);
    let mut seen: HashSet<(String, String, i32, String, String)> = HashSet::new();

    let mut dropped_value = 0usize;
    let mut dropped_year = 0usize;
    let mut dropped_iso3 = 0usize;
    let mut dropped_indicator = 0usize;
    let mut dropped_duplicate = 0usize;

    for i in 0..height {
        let indicator_code = trimmed(&indicator[i]);
        if indicator_code.is_empty() {
            dropped_indicator += 1;
            continue;
        }

        let country_iso3 = trimmed(&country[i]);
        if country_iso3.chars().count() != 3 {
            dropped_iso3 += 1;
            continue;
        }

        let year_i = match year[i] {
            Some(y) => y,
            None => {
                dropped_year += 1;
                continue;
            }
        };

        // Prefer the numeric field; fall back to the first numeric token
        // in the free-text value, e.g. "78.1 [78.1-78.2]" -> 78.1
        let value = value_numeric[i]
            .filter(|v| v.is_finite())
            .or_else(|| value_text[i].as_deref().and_then(first_numeric_token));
        let value = match value {
            Some(v) => v,
            None => {
                dropped_value += 1;
                continue;
            }
        };

        let record = IndicatorRecord {
            id: id[i].as_ref().map(|s| s.trim().to_string()),
            indicator_code,
            country_iso3,
            region_code: trimmed(&region_code[i]),
            region: trimmed(&region[i]),
            year: year_i,
            sex: trimmed(&sex[i]),
            value,
            low: low[i].filter(|v| v.is_finite()),
            high: high[i].filter(|v| v.is_finite()),
            date_reported: date_reported[i].as_deref().and_then(parse_reported_date),
        };

        if !seen.insert(record.dedup_key()) {
            dropped_duplicate += 1;
            continue;
        }

        records.push(record);
    }

    debug!(
        rows_in = height,
        rows_out = records.len(),
        dropped_indicator,
        dropped_iso3,
        dropped_year,
        dropped_value,
        dropped_duplicate,
        "cleaned raw indicator table"
    );

    records
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().unwrap_or("").trim().to_string()
}

/// Extract the first numeric token from a free-text value.
///
/// Matches an optional sign, digits with an optional fractional part, and
/// an optional exponent, anywhere in the string.
pub fn first_numeric_token(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while start < bytes.len() {
        if let Some(end) = match_number(bytes, start) {
            if let Ok(v) = text[start..end].parse::<f64>() {
                return Some(v);
            }
        }
        start += 1;
    }

    None
}

/// Match a numeric token starting at `start`, returning the exclusive end
/// index. Requires at least one digit.
fn match_number(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        let dot = i;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - dot - 1;
        if frac_digits == 0 {
            // trailing dot is not part of the token
            i = dot;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    // optional exponent
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    Some(i)
}

/// Lenient reported-date parsing; anything unparsable becomes `None`.
fn parse_reported_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    None
}
