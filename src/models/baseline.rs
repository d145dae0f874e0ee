use crate::error::Result;
use crate::features::FeatureRow;
use crate::models::{align, train_targets, ModelPort, Prediction};
use statrs::statistics::Statistics;

//weekly naive forecast scaled by a weekly OLS trend
//
//each test date gets the mean of the training values that fall on the same
//weekday, multiplied by a trend coefficient fitted on weekly sums
#[derive(Debug, Clone)]
pub struct WeeklyNaiveTrend {
    pub min_coef: f64,
}

impl Default for WeeklyNaiveTrend {
    fn default() -> Self {
        WeeklyNaiveTrend { min_coef: 0.7 }
    }
}

impl WeeklyNaiveTrend {
    //trend_coef = 1 + slope * horizon_weeks / mean(weekly sums), floored at min_coef
    pub fn trend_coef(&self, values: &[f64], horizon_weeks: usize) -> f64 {
        let weekly: Vec<f64> = values.chunks(7).map(|week| week.iter().sum()).collect();
        if weekly.len() < 2 {
            return 1.0;
        }

        let mean_level = weekly.as_slice().mean();
        if mean_level == 0.0 {
            return 1.0;
        }

        let slope = ols_slope(&weekly);
        let coef = 1.0 + slope * horizon_weeks as f64 / mean_level;

        ((coef * 1000.0).round() / 1000.0).max(self.min_coef)
    }
}

impl ModelPort for WeeklyNaiveTrend {
    fn name(&self) -> &str {
        "Weekly Naive + OLS Trend"
    }

    fn fit_predict(&self, train: &[FeatureRow], test: &[FeatureRow]) -> Result<Vec<Prediction>> {
        let values = train_targets(self.name(), train)?;
        let overall = values.as_slice().mean();

        //mean per weekday, monday = 0
        let mut sums = [0.0; 7];
        let mut counts = [0usize; 7];
        for (row, value) in train.iter().zip(values.iter()) {
            let dow = row.calendar.day_of_week as usize;
            sums[dow] += value;
            counts[dow] += 1;
        }

        let horizon_weeks = test.len().div_ceil(7);
        let coef = self.trend_coef(&values, horizon_weeks);

        let forecasts = test
            .iter()
            .map(|row| {
                let dow = row.calendar.day_of_week as usize;
                let base = if counts[dow] > 0 {
                    sums[dow] / counts[dow] as f64
                } else {
                    overall
                };
                base * coef
            })
            .collect();

        Ok(align(test, forecasts))
    }
}

//least squares slope of values against 0..n
fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_t = (n - 1.0) / 2.0;
    let mean_y = values.mean();

    let mut num = 0.0;
    let mut den = 0.0;
    for (t, &y) in values.iter().enumerate() {
        let dt = t as f64 - mean_t;
        num += dt * (y - mean_y);
        den += dt * dt;
    }

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CalendarFeatures, NoHolidays};
    use chrono::{Duration, NaiveDate};

    fn rows(values: &[f64]) -> Vec<FeatureRow> {
        //2025-01-06 is a monday
        let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let date = start + Duration::days(i as i64);
                FeatureRow {
                    date,
                    target: Some(v),
                    lags: [0.0; 7],
                    rolling: [0.0; 4],
                    calendar: CalendarFeatures::for_date(date, &NoHolidays),
                }
            })
            .collect()
    }

    #[test]
    fn test_ols_slope() {
        assert_eq!(ols_slope(&[1.0, 2.0, 3.0, 4.0]), 1.0);
        assert_eq!(ols_slope(&[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_flat_series_has_unit_trend() {
        let model = WeeklyNaiveTrend::default();
        assert_eq!(model.trend_coef(&[10.0; 28], 5), 1.0);
        assert_eq!(model.trend_coef(&[0.0; 28], 5), 1.0);
        assert_eq!(model.trend_coef(&[10.0; 7], 5), 1.0);
    }

    #[test]
    fn test_trend_coef_is_floored() {
        let model = WeeklyNaiveTrend::default();
        let falling: Vec<f64> = (0..28).map(|i| 100.0 - 3.5 * i as f64).collect();
        assert_eq!(model.trend_coef(&falling, 5), 0.7);
    }

    #[test]
    fn test_weekday_profile_is_reproduced() {
        //weekdays 100, weekends 0, four flat weeks
        let values: Vec<f64> = (0..28)
            .map(|i| if i % 7 < 5 { 100.0 } else { 0.0 })
            .collect();
        let train = rows(&values);
        let test: Vec<FeatureRow> = rows(&[0.0; 35])[28..].iter().map(|r| r.masked()).collect();

        let preds = WeeklyNaiveTrend::default().fit_predict(&train, &test).unwrap();

        assert_eq!(preds.len(), 7);
        assert_eq!(preds[0].date, test[0].date);
        assert_eq!(preds[0].value, 100.0);
        assert_eq!(preds[5].value, 0.0);
    }
}
