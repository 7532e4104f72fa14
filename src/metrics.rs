//! Model evaluation metrics and reporting
//!
//! Holdout rows are scored against the trainer's frozen schema contract;
//! the resulting `ModelInfo` is the JSON-serializable artifact the
//! presentation layer consumes.

use crate::error::{PipelineError, Result};
use crate::features::FeatureRecord;
use crate::models::{align, build_design_matrix, TrainedModel};
use serde::{Deserialize, Serialize};
use tracing::info;

/// How many features to report in the importance ranking
pub const TOP_FEATURE_COUNT: usize = 25;

/// Coefficient of determination.
///
/// Defined as 0.0 when the actual values have no variance.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return Ok(0.0);
    }

    Ok(1.0 - ss_res / ss_tot)
}

/// Root mean squared error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;

    let mse = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;

    Ok(mse.sqrt())
}

/// Mean absolute error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;

    Ok(actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64)
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(PipelineError::ValidationError(
            "Actual and predicted values must have the same non-zero length".to_string(),
        ));
    }
    Ok(())
}

/// Holdout accuracy metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Coefficient of determination
    pub r2: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Number of scored holdout rows
    pub n_test: usize,
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Evaluation Metrics:")?;
        writeln!(f, "  R2:     {:.4}", self.r2)?;
        writeln!(f, "  RMSE:   {:.4}", self.rmse)?;
        writeln!(f, "  MAE:    {:.4}", self.mae)?;
        writeln!(f, "  n_test: {}", self.n_test)?;
        Ok(())
    }
}

/// One entry of the feature-importance ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Design-matrix column name
    pub feature: String,
    /// Normalized importance weight
    pub importance: f64,
}

/// Model summary artifact for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Holdout accuracy metrics
    pub metrics: Metrics,
    /// Top features by importance, descending
    pub top_features: Vec<FeatureImportance>,
    /// Total number of design-matrix columns
    pub feature_count: usize,
}

impl ModelInfo {
    /// Serialize to the JSON artifact shape
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A scored holdout row with identifying fields for reporting
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub indicator_code: String,
    pub country_iso3: String,
    pub continent: String,
    pub year: i32,
    pub sex: String,
    /// Actual observed value
    pub value: f64,
    /// Ensemble prediction
    pub predicted_value: f64,
    /// Residual, actual - predicted
    pub error: f64,
}

/// Score holdout records against the trained model.
///
/// The holdout matrix is aligned to the training schema: unknown columns
/// dropped, missing ones zero-filled, training order preserved.
pub fn evaluate_model(
    model: &TrainedModel,
    test: &[FeatureRecord],
) -> Result<(ModelInfo, Vec<PredictionRecord>)> {
    let rows: Vec<FeatureRecord> = test
        .iter()
        .filter(|r| r.value.is_finite())
        .cloned()
        .collect();

    if rows.is_empty() {
        return Err(PipelineError::DataError(
            "Holdout set is empty".to_string(),
        ));
    }

    let matrix = build_design_matrix(&rows, &model.vocabularies);
    let matrix = align(&matrix, &model.columns);

    let actual = crate::models::target_vector(&rows);
    let predicted = model.forest.predict(&matrix.rows)?;

    let metrics = Metrics {
        r2: r2_score(&actual, &predicted)?,
        rmse: root_mean_squared_error(&actual, &predicted)?,
        mae: mean_absolute_error(&actual, &predicted)?,
        n_test: rows.len(),
    };

    let mut ranking: Vec<FeatureImportance> = model
        .columns
        .iter()
        .zip(model.forest.feature_importances())
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance: *importance,
        })
        .collect();
    ranking.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranking.truncate(TOP_FEATURE_COUNT);

    let predictions = rows
        .iter()
        .zip(predicted.iter())
        .map(|(record, &predicted_value)| PredictionRecord {
            indicator_code: record.indicator_code.clone(),
            country_iso3: record.country_iso3.clone(),
            continent: record.continent.clone(),
            year: record.year,
            sex: record.sex.clone(),
            value: record.value,
            predicted_value,
            error: record.value - predicted_value,
        })
        .collect();

    info!(r2 = metrics.r2, n_test = metrics.n_test, "evaluated model");

    Ok((
        ModelInfo {
            metrics,
            top_features: ranking,
            feature_count: model.columns.len(),
        },
        predictions,
    ))
}
