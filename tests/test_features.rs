use assert_approx_eq::assert_approx_eq;
use chrono::NaiveDate;
use indicator_forecast::data::IndicatorRecord;
use indicator_forecast::features::{engineer_features, ContinentMap};
use rstest::rstest;

fn make_record(indicator: &str, country: &str, year: i32, value: f64) -> IndicatorRecord {
    IndicatorRecord {
        id: None,
        indicator_code: indicator.to_string(),
        country_iso3: country.to_string(),
        region_code: "EUR".to_string(),
        region: "Europe".to_string(),
        year,
        sex: "BTSX".to_string(),
        value,
        low: None,
        high: None,
        date_reported: None,
    }
}

#[test]
fn test_rolling_mean_partial_windows() {
    let records: Vec<IndicatorRecord> = [10.0, 20.0, 30.0, 40.0]
        .iter()
        .enumerate()
        .map(|(i, &v)| make_record("LIFE", "FRA", 2000 + i as i32, v))
        .collect();

    let features = engineer_features(&records, &ContinentMap::default());

    // window 3, min periods 1: the first two points use partial windows
    let rolled: Vec<f64> = features.iter().map(|f| f.value_roll3).collect();
    assert_approx_eq!(rolled[0], 10.0);
    assert_approx_eq!(rolled[1], 15.0);
    assert_approx_eq!(rolled[2], 20.0);
    assert_approx_eq!(rolled[3], 30.0);
}

#[rstest]
#[case(10.0, 20.0, Some(100.0))]
#[case(4.0, 2.0, Some(-50.0))]
#[case(0.0, 5.0, None)]
fn test_pct_change(#[case] first: f64, #[case] second: f64, #[case] expected: Option<f64>) {
    let records = vec![
        make_record("LIFE", "FRA", 2000, first),
        make_record("LIFE", "FRA", 2001, second),
    ];

    let features = engineer_features(&records, &ContinentMap::default());

    // no prior year for the first point
    assert_eq!(features[0].value_pct_change, None);
    match (features[1].value_pct_change, expected) {
        (Some(actual), Some(want)) => assert_approx_eq!(actual, want),
        (actual, want) => assert_eq!(actual, want),
    }
}

#[test]
fn test_rolling_is_per_group() {
    let mut records = vec![
        make_record("LIFE", "FRA", 2000, 10.0),
        make_record("LIFE", "FRA", 2001, 20.0),
    ];
    records.push(make_record("LIFE", "DEU", 2001, 500.0));

    let features = engineer_features(&records, &ContinentMap::default());

    // output is sorted by indicator, country, year; DEU never leaks into
    // the FRA window
    assert_eq!(features[0].country_iso3, "DEU");
    assert_approx_eq!(features[0].value_roll3, 500.0);
    assert_approx_eq!(features[1].value_roll3, 10.0);
    assert_approx_eq!(features[2].value_roll3, 15.0);
    assert_eq!(features[0].value_pct_change, None);
}

#[test]
fn test_global_z_score_centered_and_ordered() {
    let records = vec![
        make_record("LIFE", "FRA", 2000, 1.0),
        make_record("LIFE", "DEU", 2000, 2.0),
        make_record("LIFE", "ITA", 2000, 3.0),
    ];

    let features = engineer_features(&records, &ContinentMap::default());

    let z_sum: f64 = features.iter().map(|f| f.value_z_global).sum();
    assert_approx_eq!(z_sum / 3.0, 0.0, 1e-6);

    let by_value: Vec<(f64, f64)> = features
        .iter()
        .map(|f| (f.value, f.value_z_global))
        .collect();
    for pair in by_value.windows(2) {
        if pair[0].0 < pair[1].0 {
            assert!(pair[0].1 < pair[1].1);
        }
    }
}

#[test]
fn test_yearly_z_score_is_cross_sectional() {
    let records = vec![
        make_record("LIFE", "FRA", 2000, 10.0),
        make_record("LIFE", "DEU", 2000, 20.0),
        make_record("LIFE", "FRA", 2001, 100.0),
        make_record("LIFE", "DEU", 2001, 200.0),
    ];

    let features = engineer_features(&records, &ContinentMap::default());

    // within each year the lower value gets the negative z
    for year in [2000, 2001] {
        let year_rows: Vec<_> = features.iter().filter(|f| f.year == year).collect();
        let fra = year_rows.iter().find(|f| f.country_iso3 == "FRA").unwrap();
        let deu = year_rows.iter().find(|f| f.country_iso3 == "DEU").unwrap();
        assert!(fra.value_z_year < 0.0);
        assert!(deu.value_z_year > 0.0);
    }
}

#[test]
fn test_continent_mapping_and_fallback() {
    let mut known = make_record("LIFE", "FRA", 2000, 1.0);
    known.region_code = "EUR".to_string();

    let mut office_code = make_record("LIFE", "KEN", 2000, 1.0);
    office_code.region_code = "AFRO".to_string();
    office_code.region = "Africa".to_string();

    let mut unknown = make_record("LIFE", "ATL", 2000, 1.0);
    unknown.region_code = "XXX".to_string();
    unknown.region = "Atlantis".to_string();

    let features = engineer_features(
        &[known, office_code, unknown],
        &ContinentMap::default(),
    );

    let by_country = |c: &str| {
        features
            .iter()
            .find(|f| f.country_iso3 == c)
            .unwrap()
            .continent
            .clone()
    };
    assert_eq!(by_country("FRA"), "Europe");
    assert_eq!(by_country("KEN"), "Africa");
    assert_eq!(by_country("ATL"), "Atlantis");
}

#[test]
fn test_confidence_interval_features() {
    let mut with_ci = make_record("LIFE", "FRA", 2000, 70.0);
    with_ci.low = Some(69.0);
    with_ci.high = Some(71.0);

    let without_ci = make_record("LIFE", "DEU", 2000, 70.0);

    let features = engineer_features(&[with_ci, without_ci], &ContinentMap::default());

    let fra = features.iter().find(|f| f.country_iso3 == "FRA").unwrap();
    assert!(fra.has_ci);
    assert_approx_eq!(fra.ci_width.unwrap(), 2.0);
    assert_approx_eq!(fra.quality_score.unwrap(), 0.5, 1e-6);

    let deu = features.iter().find(|f| f.country_iso3 == "DEU").unwrap();
    assert!(!deu.has_ci);
    assert_eq!(deu.ci_width, None);
    assert_eq!(deu.quality_score, None);
}

#[test]
fn test_quality_score_is_capped() {
    let mut zero_width = make_record("LIFE", "FRA", 2000, 70.0);
    zero_width.low = Some(70.0);
    zero_width.high = Some(70.0);

    let features = engineer_features(&[zero_width], &ContinentMap::default());

    assert_approx_eq!(features[0].quality_score.unwrap(), 1e6);
}

#[test]
fn test_date_is_january_first() {
    let records = vec![make_record("LIFE", "FRA", 2014, 1.0)];
    let features = engineer_features(&records, &ContinentMap::default());

    assert_eq!(features[0].date, NaiveDate::from_ymd_opt(2014, 1, 1).unwrap());
}

#[test]
fn test_output_sorted_by_key() {
    let records = vec![
        make_record("MORT", "FRA", 2001, 1.0),
        make_record("LIFE", "DEU", 2000, 2.0),
        make_record("LIFE", "DEU", 1999, 3.0),
        make_record("LIFE", "ABW", 2000, 4.0),
    ];

    let features = engineer_features(&records, &ContinentMap::default());

    let keys: Vec<(String, String, i32)> = features
        .iter()
        .map(|f| (f.indicator_code.clone(), f.country_iso3.clone(), f.year))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}
