use crate::engine::backtest::BacktestResult;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//error scores over a set of one-day backtest results
//
//wmape and bias are absent when the actuals sum to zero in absolute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub days: usize,
    pub mae: Option<f64>,
    pub wmape: Option<f64>,
    pub bias: Option<f64>,
}

impl DailyMetrics {
    pub fn from_results(results: &[BacktestResult]) -> Self {
        if results.is_empty() {
            return DailyMetrics {
                days: 0,
                mae: None,
                wmape: None,
                bias: None,
            };
        }

        let abs_errors: Vec<f64> = results.iter().map(|r| r.abs_error).collect();
        let mae = abs_errors.as_slice().mean();

        let abs_actual: f64 = results.iter().map(|r| r.actual.abs()).sum();
        let sum_abs_error: f64 = abs_errors.iter().sum();
        let sum_error: f64 = results.iter().map(|r| r.error).sum();

        let (wmape, bias) = if abs_actual > 0.0 {
            (Some(sum_abs_error / abs_actual), Some(sum_error / abs_actual))
        } else {
            (None, None)
        };

        DailyMetrics {
            days: results.len(),
            mae: Some(mae),
            wmape,
            bias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Segment;
    use chrono::{Duration, NaiveDate};

    fn results(pairs: &[(f64, f64)]) -> Vec<BacktestResult> {
        let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(actual, predicted))| {
                BacktestResult::new(
                    Segment::new("KP", "SUM_SNDS"),
                    "BASELINE_OLS",
                    start + Duration::days(i as i64),
                    actual,
                    predicted,
                )
            })
            .collect()
    }

    #[test]
    fn test_daily_metrics() {
        let m = DailyMetrics::from_results(&results(&[(100.0, 110.0), (100.0, 80.0)]));

        assert_eq!(m.days, 2);
        assert_eq!(m.mae, Some(15.0));
        assert_eq!(m.wmape, Some(0.15));
        assert_eq!(m.bias, Some(-0.05));
    }

    #[test]
    fn test_zero_actuals_are_undefined() {
        let m = DailyMetrics::from_results(&results(&[(0.0, 5.0), (0.0, 0.0)]));

        assert_eq!(m.mae, Some(2.5));
        assert!(m.wmape.is_none());
        assert!(m.bias.is_none());
    }

    #[test]
    fn test_empty_results() {
        let m = DailyMetrics::from_results(&[]);
        assert_eq!(m.days, 0);
        assert!(m.mae.is_none());
    }
}
