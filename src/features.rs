//! Feature engineering over cleaned indicator records
//!
//! Rolling and lag statistics are computed independently per
//! indicator+country group, time-ordered by year; z-scores are
//! cross-sectional per indicator (global) and per indicator+year.

use crate::data::IndicatorRecord;
use chrono::NaiveDate;
use statrs::statistics::Statistics;
use std::collections::HashMap;
use tracing::debug;

/// Guard against division by zero in z-scores and quality scores
const EPS: f64 = 1e-9;
/// Upper cap on the confidence-interval quality proxy
const QUALITY_CAP: f64 = 1e6;

/// Fixed WHO region-code to continent lookup, including the O-suffixed
/// regional-office codes the source sometimes uses.
const WHO_CONTINENTS: [(&str, &str); 12] = [
    ("AFR", "Africa"),
    ("AMR", "Americas"),
    ("EMR", "Eastern Mediterranean"),
    ("EUR", "Europe"),
    ("SEAR", "South-East Asia"),
    ("WPR", "Western Pacific"),
    ("AFRO", "Africa"),
    ("AMRO", "Americas"),
    ("EMRO", "Eastern Mediterranean"),
    ("EURO", "Europe"),
    ("SEARO", "South-East Asia"),
    ("WPRO", "Western Pacific"),
];

/// Immutable region-code to continent mapping
#[derive(Debug, Clone)]
pub struct ContinentMap {
    entries: HashMap<String, String>,
}

impl Default for ContinentMap {
    fn default() -> Self {
        Self {
            entries: WHO_CONTINENTS
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
        }
    }
}

impl ContinentMap {
    /// Build a map from custom entries
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Look up the continent for a region code
    pub fn lookup(&self, region_code: &str) -> Option<&str> {
        self.entries.get(region_code).map(|s| s.as_str())
    }
}

/// An indicator record enriched with derived features.
///
/// Derived once per processing batch, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub id: Option<String>,
    pub indicator_code: String,
    pub country_iso3: String,
    /// Continent mapped from the region code, falling back to the raw
    /// region string for unrecognized codes
    pub continent: String,
    pub region_code: String,
    pub region: String,
    pub year: i32,
    pub sex: String,
    pub value: f64,
    pub low: Option<f64>,
    pub high: Option<f64>,
    /// January 1 of the reporting year
    pub date: NaiveDate,
    /// Trailing 3-point moving average within indicator+country
    pub value_roll3: f64,
    /// z-score of value within the indicator, across all countries/years
    pub value_z_global: f64,
    /// z-score of value within the indicator, restricted to the year
    pub value_z_year: f64,
    /// Percent change vs the preceding year for the same
    /// indicator+country; `None` without a prior row or on a zero prior
    pub value_pct_change: Option<f64>,
    /// Both confidence bounds present
    pub has_ci: bool,
    /// high - low, when both bounds are present
    pub ci_width: Option<f64>,
    /// Inverse of the confidence-interval width, capped
    pub quality_score: Option<f64>,
}

/// Derive features for a batch of cleaned records.
///
/// Output is sorted by (indicator_code, country_iso3, year).
pub fn engineer_features(
    records: &[IndicatorRecord],
    continents: &ContinentMap,
) -> Vec<FeatureRecord> {
    let mut sorted: Vec<&IndicatorRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        (&a.indicator_code, &a.country_iso3, a.year).cmp(&(
            &b.indicator_code,
            &b.country_iso3,
            b.year,
        ))
    });

    let global_stats = group_stats(&sorted, |r| r.indicator_code.clone());
    let yearly_stats = group_stats(&sorted, |r| (r.indicator_code.clone(), r.year));

    let mut out = Vec::with_capacity(sorted.len());
    let mut i = 0;

    while i < sorted.len() {
        // one indicator+country group, already year-ordered
        let mut j = i;
        while j < sorted.len()
            && sorted[j].indicator_code == sorted[i].indicator_code
            && sorted[j].country_iso3 == sorted[i].country_iso3
        {
            j += 1;
        }

        let group = &sorted[i..j];
        for (k, record) in group.iter().enumerate() {
            let window_start = k.saturating_sub(2);
            let window: Vec<f64> = group[window_start..=k].iter().map(|r| r.value).collect();
            let value_roll3 = window.iter().mean();

            let prev = if k > 0 { Some(group[k - 1].value) } else { None };
            let value_pct_change = prev
                .filter(|p| *p != 0.0)
                .map(|p| (record.value - p) / p * 100.0);

            let (g_mean, g_std) = global_stats[&record.indicator_code];
            let (y_mean, y_std) = yearly_stats[&(record.indicator_code.clone(), record.year)];

            let has_ci = record.low.is_some() && record.high.is_some();
            let ci_width = match (record.low, record.high) {
                (Some(low), Some(high)) => Some(high - low),
                _ => None,
            };
            let quality_score = ci_width.map(|w| (1.0 / (w.abs() + EPS)).min(QUALITY_CAP));

            let continent = continents
                .lookup(&record.region_code)
                .unwrap_or(&record.region)
                .to_string();

            out.push(FeatureRecord {
                id: record.id.clone(),
                indicator_code: record.indicator_code.clone(),
                country_iso3: record.country_iso3.clone(),
                continent,
                region_code: record.region_code.clone(),
                region: record.region.clone(),
                year: record.year,
                sex: record.sex.clone(),
                value: record.value,
                low: record.low,
                high: record.high,
                date: NaiveDate::from_ymd_opt(record.year, 1, 1).unwrap_or_default(),
                value_roll3,
                value_z_global: (record.value - g_mean) / (g_std + EPS),
                value_z_year: (record.value - y_mean) / (y_std + EPS),
                value_pct_change,
                has_ci,
                ci_width,
                quality_score,
            });
        }

        i = j;
    }

    debug!(rows = out.len(), "engineered features");

    out
}

/// Mean and population standard deviation of `value` per group key.
fn group_stats<K, F>(records: &[&IndicatorRecord], key: F) -> HashMap<K, (f64, f64)>
where
    K: std::hash::Hash + Eq,
    F: Fn(&IndicatorRecord) -> K,
{
    let mut groups: HashMap<K, Vec<f64>> = HashMap::new();
    for record in records {
        groups.entry(key(record)).or_default().push(record.value);
    }

    groups
        .into_iter()
        .map(|(k, values)| {
            let mean = values.iter().mean();
            let std = values.iter().population_std_dev();
            (k, (mean, std))
        })
        .collect()
}
