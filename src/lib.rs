//! # Indicator Forecast
//!
//! A Rust library for cleaning, feature-engineering and forecasting WHO
//! Global Health Observatory indicator data.
//!
//! ## Features
//!
//! - Cleaning of raw heterogeneous indicator tables into a fixed schema
//! - Per-country/indicator rolling and cross-sectional feature engineering
//! - Chronological train/holdout splitting (train on past, validate later)
//! - A seeded random-forest regressor with a frozen column-schema contract
//! - Holdout evaluation (R², RMSE, MAE, feature importances)
//! - Forward predictions for 2023-2025 with ensemble-disagreement
//!   confidence scores
//! - Country/year and continent summary tables for reporting
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use indicator_forecast::clean::clean_records;
//! use indicator_forecast::data::DataLoader;
//! use indicator_forecast::features::{engineer_features, ContinentMap};
//! use indicator_forecast::forecast::predict_future;
//! use indicator_forecast::metrics::evaluate_model;
//! use indicator_forecast::models::train_model;
//! use indicator_forecast::split::split_by_year;
//!
//! # fn main() -> indicator_forecast::Result<()> {
//! // Load and clean a raw indicator table
//! let raw = DataLoader::from_csv("who_raw.csv")?;
//! let cleaned = clean_records(&raw);
//!
//! // Engineer features and split chronologically
//! let features = engineer_features(&cleaned, &ContinentMap::default());
//! let (train, test) = split_by_year(&features);
//!
//! // Train, evaluate, and predict the future window
//! let model = train_model(&train)?;
//! let (model_info, _predictions) = evaluate_model(&model, &test)?;
//! println!("{}", model_info.metrics);
//!
//! let future_raw = DataLoader::from_csv("who_future_raw.csv")?;
//! let future = engineer_features(&clean_records(&future_raw), &ContinentMap::default());
//! let forecasts = predict_future(&model, &future)?;
//! # let _ = forecasts;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod clean;
pub mod data;
pub mod error;
pub mod features;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod split;

// Re-export commonly used types
pub use crate::data::{DataLoader, IndicatorRecord};
pub use crate::error::{PipelineError, Result};
pub use crate::features::{ContinentMap, FeatureRecord};
pub use crate::forecast::ForecastRecord;
pub use crate::metrics::{ModelInfo, PredictionRecord};
pub use crate::models::TrainedModel;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
