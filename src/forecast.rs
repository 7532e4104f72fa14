//! Forward-looking prediction over a fixed horizon

use crate::error::Result;
use crate::features::FeatureRecord;
use crate::models::{align, build_design_matrix, TrainedModel};
use tracing::info;

/// Target years every future row is expanded into
pub const FORECAST_YEARS: [i32; 3] = [2023, 2024, 2025];

/// A future row with its ensemble prediction attached
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    /// The expanded feature row, with `year` set to the horizon year
    pub record: FeatureRecord,
    /// Ensemble mean prediction
    pub predicted_value: f64,
    /// Standard deviation of the individual tree predictions
    pub prediction_std: f64,
    /// Bounded confidence score, 1/(1+std), in (0, 1]
    pub prediction_confidence: f64,
}

/// Predict future indicator values across the fixed horizon.
///
/// Every input row is replicated once per horizon year with its year
/// field overwritten. Note this discards any year-specific signal the
/// input rows may carry.
pub fn predict_future(
    model: &TrainedModel,
    future: &[FeatureRecord],
) -> Result<Vec<ForecastRecord>> {
    let mut expanded = Vec::with_capacity(future.len() * FORECAST_YEARS.len());
    for year in FORECAST_YEARS {
        for record in future {
            let mut row = record.clone();
            row.year = year;
            expanded.push(row);
        }
    }

    let matrix = build_design_matrix(&expanded, &model.vocabularies);
    let matrix = align(&matrix, &model.columns);

    let predicted = model.forest.predict(&matrix.rows)?;
    // per-member predictions drive the disagreement-based uncertainty
    let per_member = model.forest.predict_per_member(&matrix.rows)?;

    let n_trees = per_member.len() as f64;
    let out = expanded
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let mean = predicted[i];
            let variance = per_member
                .iter()
                .map(|tree| (tree[i] - mean).powi(2))
                .sum::<f64>()
                / n_trees;
            let prediction_std = variance.sqrt();

            ForecastRecord {
                record,
                predicted_value: mean,
                prediction_std,
                prediction_confidence: confidence_from_std(prediction_std),
            }
        })
        .collect::<Vec<_>>();

    info!(rows = out.len(), "generated future predictions");

    Ok(out)
}

/// Confidence score from ensemble disagreement; strictly decreasing in
/// the standard deviation, bounded in (0, 1].
pub fn confidence_from_std(std: f64) -> f64 {
    1.0 / (1.0 + std)
}
