//! Descriptive summary tables for reporting
//!
//! Medians are used over means for robustness to reporting spikes. No
//! model logic lives here.

use crate::data::IndicatorRecord;
use crate::metrics::PredictionRecord;
use statrs::statistics::{Data, OrderStatistics};
use std::collections::BTreeMap;

/// Median value per indicator, country and year
#[derive(Debug, Clone, PartialEq)]
pub struct CountryYearMedian {
    pub indicator_code: String,
    pub country_iso3: String,
    pub year: i32,
    pub value_median: f64,
}

/// Per-country rollup across years
#[derive(Debug, Clone, PartialEq)]
pub struct CountrySummary {
    pub indicator_code: String,
    pub country_iso3: String,
    /// Median of the yearly medians
    pub median_value: f64,
    /// Most recent reported year
    pub last_year: i32,
}

/// Continent-level comparison of predicted vs actual values
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    pub indicator_code: String,
    pub continent: String,
    pub mean_predicted: f64,
    pub mean_actual: f64,
}

/// Median value per (indicator_code, country_iso3, year), sorted by the
/// grouping key.
pub fn aggregate_by_country_year(records: &[IndicatorRecord]) -> Vec<CountryYearMedian> {
    let mut groups: BTreeMap<(String, String, i32), Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry((
                record.indicator_code.clone(),
                record.country_iso3.clone(),
                record.year,
            ))
            .or_default()
            .push(record.value);
    }

    groups
        .into_iter()
        .map(
            |((indicator_code, country_iso3, year), values)| CountryYearMedian {
                indicator_code,
                country_iso3,
                year,
                value_median: median(values),
            },
        )
        .collect()
}

/// Per-country summary over the aggregated medians: median of yearly
/// medians plus the last reported year.
pub fn summarize_countries(aggregated: &[CountryYearMedian]) -> Vec<CountrySummary> {
    let mut groups: BTreeMap<(String, String), (Vec<f64>, i32)> = BTreeMap::new();
    for row in aggregated {
        let entry = groups
            .entry((row.indicator_code.clone(), row.country_iso3.clone()))
            .or_insert_with(|| (Vec::new(), row.year));
        entry.0.push(row.value_median);
        entry.1 = entry.1.max(row.year);
    }

    groups
        .into_iter()
        .map(
            |((indicator_code, country_iso3), (values, last_year))| CountrySummary {
                indicator_code,
                country_iso3,
                median_value: median(values),
                last_year,
            },
        )
        .collect()
}

/// Mean predicted vs mean actual value per (indicator_code, continent).
pub fn summarize_regions(predictions: &[PredictionRecord]) -> Vec<RegionSummary> {
    let mut groups: BTreeMap<(String, String), (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for prediction in predictions {
        let entry = groups
            .entry((
                prediction.indicator_code.clone(),
                prediction.continent.clone(),
            ))
            .or_default();
        entry.0.push(prediction.predicted_value);
        entry.1.push(prediction.value);
    }

    groups
        .into_iter()
        .map(
            |((indicator_code, continent), (predicted, actual))| RegionSummary {
                indicator_code,
                continent,
                mean_predicted: mean(&predicted),
                mean_actual: mean(&actual),
            },
        )
        .collect()
}

fn median(values: Vec<f64>) -> f64 {
    let mut data = Data::new(values);
    data.median()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
