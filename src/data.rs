//! Indicator records and raw-table loading

use crate::error::Result;
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// A single cleaned observation of a WHO indicator.
///
/// One record per (indicator_code, country_iso3, year, sex, region_code)
/// combination; never mutated after cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRecord {
    /// Opaque source identifier, if the source provided one
    pub id: Option<String>,
    /// Indicator code, e.g. "WHOSIS_000001"
    pub indicator_code: String,
    /// ISO-3166 alpha-3 country code
    pub country_iso3: String,
    /// WHO region code, e.g. "EUR"; may be empty
    pub region_code: String,
    /// WHO region display name; may be empty
    pub region: String,
    /// Reporting year
    pub year: i32,
    /// Sex dimension; empty means aggregate/both
    pub sex: String,
    /// Observed indicator value
    pub value: f64,
    /// Lower confidence bound, if reported
    pub low: Option<f64>,
    /// Upper confidence bound, if reported
    pub high: Option<f64>,
    /// Timestamp the observation was reported, if parseable
    pub date_reported: Option<NaiveDateTime>,
}

impl IndicatorRecord {
    /// Deduplication key: one surviving row per combination.
    pub fn dedup_key(&self) -> (String, String, i32, String, String) {
        (
            self.indicator_code.clone(),
            self.country_iso3.clone(),
            self.year,
            self.sex.clone(),
            self.region_code.clone(),
        )
    }
}

/// Loader for raw indicator tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a raw indicator table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let file = File::open(path)?;
        // Use polars DataFrame reader directly
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Ok(df)
    }
}

/// Extract a column as optional strings. Returns `None` when the column
/// does not exist; per-row nulls become `None` entries.
pub(crate) fn opt_str_column(df: &DataFrame, name: &str) -> Option<Vec<Option<String>>> {
    let col = df.column(name).ok()?;

    match col.dtype() {
        DataType::Utf8 => Some(
            col.utf8()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect(),
        ),
        DataType::Int64 => Some(
            col.i64()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect(),
        ),
        DataType::Int32 => Some(
            col.i32()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect(),
        ),
        DataType::Float64 => Some(
            col.f64()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect(),
        ),
        _ => Some(vec![None; df.height()]),
    }
}

/// Extract a column as optional floats. Returns `None` when the column
/// does not exist; unparsable or null entries become `None`.
pub(crate) fn opt_f64_column(df: &DataFrame, name: &str) -> Option<Vec<Option<f64>>> {
    let col = df.column(name).ok()?;

    match col.dtype() {
        DataType::Float64 => Some(col.f64().unwrap().into_iter().collect()),
        DataType::Float32 => Some(
            col.f32()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n as f64))
                .collect(),
        ),
        DataType::Int64 => Some(
            col.i64()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n as f64))
                .collect(),
        ),
        DataType::Int32 => Some(
            col.i32()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n as f64))
                .collect(),
        ),
        DataType::UInt64 => Some(
            col.u64()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n as f64))
                .collect(),
        ),
        DataType::UInt32 => Some(
            col.u32()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n as f64))
                .collect(),
        ),
        DataType::Utf8 => Some(
            col.utf8()
                .unwrap()
                .into_iter()
                .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
                .collect(),
        ),
        _ => Some(vec![None; df.height()]),
    }
}

/// Extract a column as optional integers. Returns `None` when the column
/// does not exist; unparsable or null entries become `None`.
pub(crate) fn opt_i32_column(df: &DataFrame, name: &str) -> Option<Vec<Option<i32>>> {
    let col = df.column(name).ok()?;

    match col.dtype() {
        DataType::Int64 => Some(
            col.i64()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n as i32))
                .collect(),
        ),
        DataType::Int32 => Some(col.i32().unwrap().into_iter().collect()),
        DataType::Float64 => Some(
            col.f64()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|n| n as i32))
                .collect(),
        ),
        DataType::Utf8 => Some(
            col.utf8()
                .unwrap()
                .into_iter()
                .map(|v| v.and_then(|s| s.trim().parse::<i32>().ok()))
                .collect(),
        ),
        _ => Some(vec![None; df.height()]),
    }
}
