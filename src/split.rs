//! Chronological train/test partitioning
//!
//! The split is purely by year boundary, no shuffling: the model is
//! validated on a held-out later window, as a forecasting protocol
//! requires.

use crate::features::FeatureRecord;
use tracing::debug;

/// Last year included in the training set
pub const TRAIN_END_YEAR: i32 = 2017;
/// First year of the holdout window
pub const TEST_START_YEAR: i32 = 2018;
/// Last year of the holdout window
pub const TEST_END_YEAR: i32 = 2022;

/// Partition engineered records by year.
///
/// `year <= 2017` goes to training, `2018..=2022` to the holdout set.
/// Rows outside both ranges are excluded from both outputs.
pub fn split_by_year(records: &[FeatureRecord]) -> (Vec<FeatureRecord>, Vec<FeatureRecord>) {
    let mut train = Vec::new();
    let mut test = Vec::new();

    for record in records {
        if record.year <= TRAIN_END_YEAR {
            train.push(record.clone());
        } else if record.year >= TEST_START_YEAR && record.year <= TEST_END_YEAR {
            test.push(record.clone());
        }
    }

    debug!(train = train.len(), test = test.len(), "split by year");

    (train, test)
}
