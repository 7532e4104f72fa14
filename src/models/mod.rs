//! Model-facing feature matrices and training
//!
//! The column order observed on the training set is the schema contract
//! ("model columns"): evaluation and forecasting matrices are aligned to
//! it, never regenerated from a different dataset. Categorical encoding
//! goes through per-column vocabularies fit once at training time, so an
//! unseen category maps to the zero vector instead of inventing columns.

use crate::error::{PipelineError, Result};
use crate::features::FeatureRecord;
use tracing::info;

pub mod random_forest;

use random_forest::{RandomForestRegressor, TrainedForest};

/// Numeric feature columns, in matrix order
pub const FEATURES: [&str; 7] = [
    "year",
    "value_roll3",
    "value_z_global",
    "value_z_year",
    "value_pct_change",
    "ci_width",
    "quality_score",
];

/// Categorical columns one-hot-encoded after the numeric block
pub const CAT_COLS: [&str; 4] = ["indicator_code", "continent", "country_iso3", "sex"];

/// Trees in the ensemble
pub const N_TREES: usize = 400;
/// Seed for deterministic training
pub const RANDOM_SEED: u64 = 42;

/// A dense row-major feature matrix with named, ordered columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Ordered column names
    pub columns: Vec<String>,
    /// Row-major values; every row has `columns.len()` entries
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }
}

/// Reindex a matrix to a target column list.
///
/// Columns absent from the target are dropped; target columns absent from
/// the matrix are reinstated filled with 0.0. Column order follows the
/// target exactly. Aligning a matrix to its own columns is a no-op.
pub fn align(matrix: &FeatureMatrix, target_columns: &[String]) -> FeatureMatrix {
    let source_index: Vec<Option<usize>> = target_columns
        .iter()
        .map(|name| matrix.columns.iter().position(|c| c == name))
        .collect();

    let rows = matrix
        .rows
        .iter()
        .map(|row| {
            source_index
                .iter()
                .map(|idx| idx.map_or(0.0, |i| row[i]))
                .collect()
        })
        .collect();

    FeatureMatrix {
        columns: target_columns.to_vec(),
        rows,
    }
}

/// The distinct values of one categorical column, fixed at training time
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    /// Source column name
    column: String,
    /// Sorted distinct values observed during training
    values: Vec<String>,
}

impl Vocabulary {
    /// Fit a vocabulary from observed values
    pub fn fit<'a>(column: &str, observed: impl IntoIterator<Item = &'a str>) -> Self {
        let mut values: Vec<String> = observed.into_iter().map(|v| v.to_string()).collect();
        values.sort();
        values.dedup();

        Self {
            column: column.to_string(),
            values,
        }
    }

    /// Source column name
    pub fn column(&self) -> &str {
        &self.column
    }

    /// One-hot column names, one per observed distinct value
    pub fn column_names(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| format!("{}_{}", self.column, v))
            .collect()
    }

    /// Encode a value as a one-hot vector; unseen values yield all zeros
    pub fn encode(&self, value: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.values.len()];
        if let Ok(idx) = self.values.binary_search_by(|v| v.as_str().cmp(value)) {
            row[idx] = 1.0;
        }
        row
    }
}

/// A trained ensemble plus its frozen schema contract
#[derive(Debug, Clone)]
pub struct TrainedModel {
    /// Fitted ensemble
    pub forest: TrainedForest,
    /// The exact training-time column order; single source of truth for
    /// alignment in evaluation and forecasting
    pub columns: Vec<String>,
    /// Per-categorical-column vocabularies fit on the training set
    pub vocabularies: Vec<Vocabulary>,
}

/// Fit categorical vocabularies over a set of records, in `CAT_COLS` order
pub fn fit_vocabularies(records: &[FeatureRecord]) -> Vec<Vocabulary> {
    CAT_COLS
        .iter()
        .map(|col| Vocabulary::fit(col, records.iter().map(|r| categorical_value(r, col))))
        .collect()
}

/// Build the numeric+categorical design matrix for a set of records.
///
/// Numeric features come first in `FEATURES` order with undefined entries
/// filled as 0.0, followed by one one-hot block per vocabulary.
pub fn build_design_matrix(records: &[FeatureRecord], vocabularies: &[Vocabulary]) -> FeatureMatrix {
    let mut columns: Vec<String> = FEATURES.iter().map(|c| c.to_string()).collect();
    for vocab in vocabularies {
        columns.extend(vocab.column_names());
    }

    let rows = records
        .iter()
        .map(|record| {
            let mut row = numeric_features(record);
            for vocab in vocabularies {
                row.extend(vocab.encode(categorical_value(record, vocab.column())));
            }
            row
        })
        .collect();

    FeatureMatrix { columns, rows }
}

/// Target values for a set of records
pub fn target_vector(records: &[FeatureRecord]) -> Vec<f64> {
    records.iter().map(|r| r.value).collect()
}

/// Train the ensemble on training records with a defined target.
///
/// Freezes the design-matrix column order as the model's schema contract.
pub fn train_model(train: &[FeatureRecord]) -> Result<TrainedModel> {
    let rows: Vec<FeatureRecord> = train
        .iter()
        .filter(|r| r.value.is_finite())
        .cloned()
        .collect();

    if rows.is_empty() {
        return Err(PipelineError::ModelError(
            "Training set is empty".to_string(),
        ));
    }

    let vocabularies = fit_vocabularies(&rows);
    let matrix = build_design_matrix(&rows, &vocabularies);
    let targets = target_vector(&rows);

    let forest = RandomForestRegressor::new(N_TREES, None, RANDOM_SEED)?.fit(&matrix.rows, &targets)?;

    info!(
        samples = matrix.n_rows(),
        features = matrix.n_cols(),
        trees = forest.n_trees(),
        "trained model"
    );

    Ok(TrainedModel {
        forest,
        columns: matrix.columns,
        vocabularies,
    })
}

fn numeric_features(record: &FeatureRecord) -> Vec<f64> {
    [
        record.year as f64,
        record.value_roll3,
        record.value_z_global,
        record.value_z_year,
        record.value_pct_change.unwrap_or(0.0),
        record.ci_width.unwrap_or(0.0),
        record.quality_score.unwrap_or(0.0),
    ]
    .iter()
    .map(|v| if v.is_finite() { *v } else { 0.0 })
    .collect()
}

fn categorical_value<'a>(record: &'a FeatureRecord, column: &str) -> &'a str {
    match column {
        "indicator_code" => &record.indicator_code,
        "continent" => &record.continent,
        "country_iso3" => &record.country_iso3,
        "sex" => &record.sex,
        _ => "",
    }
}
