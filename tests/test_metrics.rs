use assert_approx_eq::assert_approx_eq;
use chrono::NaiveDate;
use indicator_forecast::features::FeatureRecord;
use indicator_forecast::metrics::{
    evaluate_model, mean_absolute_error, r2_score, root_mean_squared_error, TOP_FEATURE_COUNT,
};
use indicator_forecast::models::train_model;
use indicator_forecast::PipelineError;

fn make_feature(indicator: &str, country: &str, year: i32, value: f64) -> FeatureRecord {
    FeatureRecord {
        id: None,
        indicator_code: indicator.to_string(),
        country_iso3: country.to_string(),
        continent: "Europe".to_string(),
        region_code: "EUR".to_string(),
        region: "Europe".to_string(),
        year,
        sex: "BTSX".to_string(),
        value,
        low: None,
        high: None,
        date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
        value_roll3: value,
        value_z_global: 0.0,
        value_z_year: 0.0,
        value_pct_change: None,
        has_ci: false,
        ci_width: None,
        quality_score: None,
    }
}

#[test]
fn test_perfect_prediction_metrics() {
    let actual = vec![1.0, 2.0, 3.0];

    assert_approx_eq!(r2_score(&actual, &actual).unwrap(), 1.0);
    assert_approx_eq!(root_mean_squared_error(&actual, &actual).unwrap(), 0.0);
    assert_approx_eq!(mean_absolute_error(&actual, &actual).unwrap(), 0.0);
}

#[test]
fn test_known_metric_values() {
    let actual = vec![1.0, 2.0, 3.0];
    let predicted = vec![2.0, 2.0, 2.0];

    // ss_res = 2, ss_tot = 2
    assert_approx_eq!(r2_score(&actual, &predicted).unwrap(), 0.0);
    assert_approx_eq!(mean_absolute_error(&actual, &predicted).unwrap(), 2.0 / 3.0);
    assert_approx_eq!(
        root_mean_squared_error(&actual, &predicted).unwrap(),
        (2.0f64 / 3.0).sqrt()
    );
}

#[test]
fn test_r2_on_constant_actuals() {
    let actual = vec![5.0, 5.0, 5.0];
    let predicted = vec![4.0, 5.0, 6.0];

    // no variance to explain; defined as 0.0 rather than dividing by zero
    assert_approx_eq!(r2_score(&actual, &predicted).unwrap(), 0.0);
}

#[test]
fn test_length_mismatch_is_validation_error() {
    let result = r2_score(&[1.0, 2.0], &[1.0]);
    assert!(matches!(result, Err(PipelineError::ValidationError(_))));

    let result = mean_absolute_error(&[], &[]);
    assert!(matches!(result, Err(PipelineError::ValidationError(_))));
}

#[test]
fn test_evaluate_model_end_to_end() {
    let train: Vec<FeatureRecord> = (2000..=2017)
        .flat_map(|y| {
            vec![
                make_feature("LIFE", "FRA", y, 70.0 + (y - 2000) as f64 * 0.3),
                make_feature("LIFE", "DEU", y, 68.0 + (y - 2000) as f64 * 0.4),
            ]
        })
        .collect();
    let test: Vec<FeatureRecord> = (2018..=2020)
        .map(|y| make_feature("LIFE", "FRA", y, 70.0 + (y - 2000) as f64 * 0.3))
        .collect();

    let model = train_model(&train).unwrap();
    let (info, predictions) = evaluate_model(&model, &test).unwrap();

    assert_eq!(info.metrics.n_test, 3);
    assert!(info.metrics.rmse >= 0.0);
    assert!(info.metrics.mae >= 0.0);
    assert!(info.metrics.r2.is_finite());
    assert_eq!(info.feature_count, model.columns.len());
    assert!(info.top_features.len() <= TOP_FEATURE_COUNT);

    // ranking is importance-descending
    for pair in info.top_features.windows(2) {
        assert!(pair[0].importance >= pair[1].importance);
    }

    assert_eq!(predictions.len(), 3);
    for p in &predictions {
        assert_approx_eq!(p.error, p.value - p.predicted_value, 1e-12);
        assert_eq!(p.indicator_code, "LIFE");
    }
}

#[test]
fn test_unseen_category_scores_without_error() {
    let train: Vec<FeatureRecord> = (2000..=2017)
        .map(|y| make_feature("LIFE", "FRA", y, 70.0 + (y - 2000) as f64 * 0.3))
        .collect();
    // a country the model never saw at training time
    let test = vec![make_feature("LIFE", "JPN", 2018, 84.0)];

    let model = train_model(&train).unwrap();
    let (info, predictions) = evaluate_model(&model, &test).unwrap();

    assert_eq!(info.metrics.n_test, 1);
    assert!(predictions[0].predicted_value.is_finite());
}

#[test]
fn test_empty_holdout_is_data_error() {
    let train: Vec<FeatureRecord> = (2000..=2010)
        .map(|y| make_feature("LIFE", "FRA", y, 70.0))
        .collect();

    let model = train_model(&train).unwrap();
    let result = evaluate_model(&model, &[]);

    assert!(matches!(result, Err(PipelineError::DataError(_))));
}

#[test]
fn test_model_info_serializes_to_artifact_shape() {
    let train: Vec<FeatureRecord> = (2000..=2017)
        .map(|y| make_feature("LIFE", "FRA", y, 70.0 + (y - 2000) as f64))
        .collect();
    let test = vec![make_feature("LIFE", "FRA", 2018, 88.0)];

    let model = train_model(&train).unwrap();
    let (info, _) = evaluate_model(&model, &test).unwrap();

    let json = info.to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert!(parsed["metrics"]["r2"].is_number());
    assert!(parsed["metrics"]["rmse"].is_number());
    assert!(parsed["metrics"]["mae"].is_number());
    assert_eq!(parsed["metrics"]["n_test"], 1);
    assert!(parsed["top_features"].is_array());
    assert!(parsed["feature_count"].is_number());
}
