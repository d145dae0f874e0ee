use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

//month-grain comparison of the summed forecast against the summed actual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthMetrics {
    pub actual_month: f64,
    pub forecast_month: f64,
    pub error: f64,
    pub mape_month: f64,
    pub wmape_month: f64,
    pub bias_month: f64,
}

impl MonthMetrics {
    //fails with UndefinedMetric when the month's actual total is zero
    //mape and wmape coincide at month grain: the weight is the single total
    pub fn compute(actuals: &[f64], forecasts: &[f64]) -> Result<Self> {
        let actual_month: f64 = actuals.iter().sum();
        let forecast_month: f64 = forecasts.iter().sum();

        if actual_month == 0.0 {
            return Err(EngineError::UndefinedMetric {
                metric: "WMAPE_MONTH",
            });
        }

        let error = forecast_month - actual_month;
        let ratio = error.abs() / actual_month.abs();

        Ok(MonthMetrics {
            actual_month,
            forecast_month,
            error,
            mape_month: ratio,
            wmape_month: ratio,
            bias_month: error / actual_month.abs(),
        })
    }

    //wmape rounded to 4 places, as stored in monthly backtest rows
    pub fn rounded_wmape(&self) -> f64 {
        (self.wmape_month * 10_000.0).round() / 10_000.0
    }
}
