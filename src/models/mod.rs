pub mod baseline;
pub mod method;
pub mod registry;
pub mod ridge;
pub mod smoothing;

use crate::error::{EngineError, Result};
use crate::features::FeatureRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use baseline::WeeklyNaiveTrend;
pub use method::{Flavor, ForecastMethod};
pub use registry::ModelRegistry;
pub use ridge::RidgeRegression;
pub use smoothing::{HoltLinear, HoltWinters, SimpleExponential};

//forecast for a single date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub date: NaiveDate,
    pub value: f64,
}

impl Prediction {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Prediction { date, value }
    }
}

//contract every forecasting method satisfies
//
//`test` rows arrive with their targets masked. the returned predictions must
//be aligned one-to-one with the dates of `test`.
pub trait ModelPort: Send + Sync {
    fn name(&self) -> &str;

    fn fit_predict(&self, train: &[FeatureRow], test: &[FeatureRow]) -> Result<Vec<Prediction>>;
}

//observed values of the training rows, in date order
pub(crate) fn train_targets(model: &str, train: &[FeatureRow]) -> Result<Vec<f64>> {
    if train.is_empty() {
        return Err(fit_error(model, "empty training window"));
    }

    train
        .iter()
        .map(|row| {
            row.target
                .ok_or_else(|| fit_error(model, &format!("training row {} has no target", row.date)))
        })
        .collect()
}

pub(crate) fn fit_error(model: &str, reason: &str) -> EngineError {
    EngineError::ModelFit {
        model: model.to_string(),
        reason: reason.to_string(),
    }
}

//pairs horizon values with the test dates
pub(crate) fn align(test: &[FeatureRow], values: Vec<f64>) -> Vec<Prediction> {
    test.iter()
        .zip(values)
        .map(|(row, value)| Prediction::new(row.date, value))
        .collect()
}
