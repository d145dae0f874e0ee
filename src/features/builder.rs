use crate::data::{CalendarFeatures, HolidayCalendar, SegmentSeries};
use crate::error::{EngineError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

//lag offsets in days
pub const LAGS: [usize; 7] = [1, 2, 3, 7, 14, 21, 28];

//trailing mean window lengths in days
pub const ROLLING_WINDOWS: [usize; 4] = [3, 7, 14, 28];

//days of strictly prior history a row needs before every column is defined
pub const MIN_HISTORY: usize = 28;

//model-ready row for one date
//lag and rolling columns only ever read values strictly before `date`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    //the observed value on `date`; None once handed to a model as a test row
    pub target: Option<f64>,
    pub lags: [f64; LAGS.len()],
    pub rolling: [f64; ROLLING_WINDOWS.len()],
    pub calendar: CalendarFeatures,
}

impl FeatureRow {
    pub const WIDTH: usize = LAGS.len() + ROLLING_WINDOWS.len() + CalendarFeatures::COUNT;

    //feature vector in a fixed column order: lags, rolling means, calendar
    pub fn to_vector(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(Self::WIDTH);
        values.extend_from_slice(&self.lags);
        values.extend_from_slice(&self.rolling);
        values.extend_from_slice(&self.calendar.to_values());
        values
    }

    //copy of the row with the target hidden
    pub fn masked(&self) -> FeatureRow {
        FeatureRow {
            target: None,
            ..self.clone()
        }
    }

    //carries this row's lag/rolling columns to another date with its own calendar
    pub fn carried_to(&self, date: NaiveDate, holidays: &dyn HolidayCalendar) -> FeatureRow {
        FeatureRow {
            date,
            target: None,
            lags: self.lags,
            rolling: self.rolling,
            calendar: CalendarFeatures::for_date(date, holidays),
        }
    }
}

//builds one row per date that has MIN_HISTORY days of prior values
//the earliest MIN_HISTORY dates of the series are dropped
pub fn build_features(series: &SegmentSeries, holidays: &dyn HolidayCalendar) -> Vec<FeatureRow> {
    let values: Vec<f64> = series.points().iter().map(|p| p.value).collect();

    series
        .points()
        .iter()
        .enumerate()
        .skip(MIN_HISTORY)
        .map(|(i, point)| FeatureRow {
            date: point.date,
            target: Some(point.value),
            lags: lag_columns(&values[..i]),
            rolling: rolling_columns(&values[..i]),
            calendar: CalendarFeatures::for_date(point.date, holidays),
        })
        .collect()
}

//builds the row for `date` from the values strictly before it
//`date` itself need not be in the series (e.g. the day after the last fact)
pub fn features_at(
    series: &SegmentSeries,
    date: NaiveDate,
    holidays: &dyn HolidayCalendar,
) -> Result<FeatureRow> {
    let window_start = date - Duration::days(MIN_HISTORY as i64);
    let window_end = date - Duration::days(1);

    let history = series.range(window_start, window_end).map_err(|_| {
        let available = series
            .first_date()
            .map(|first| (date - first).num_days().clamp(0, MIN_HISTORY as i64))
            .unwrap_or(0);
        EngineError::IncompleteHistory {
            segment: series.segment().clone(),
            as_of: date,
            required: MIN_HISTORY as i64,
            available,
        }
    })?;
    let prior: Vec<f64> = history.iter().map(|p| p.value).collect();

    Ok(FeatureRow {
        date,
        target: series.value_at(date),
        lags: lag_columns(&prior),
        rolling: rolling_columns(&prior),
        calendar: CalendarFeatures::for_date(date, holidays),
    })
}

//`prior` ends with the value of the day before the row
fn lag_columns(prior: &[f64]) -> [f64; LAGS.len()] {
    let mut out = [0.0; LAGS.len()];
    for (slot, &lag) in out.iter_mut().zip(LAGS.iter()) {
        *slot = prior[prior.len() - lag];
    }
    out
}

fn rolling_columns(prior: &[f64]) -> [f64; ROLLING_WINDOWS.len()] {
    let mut out = [0.0; ROLLING_WINDOWS.len()];
    for (slot, &window) in out.iter_mut().zip(ROLLING_WINDOWS.iter()) {
        let tail = &prior[prior.len() - window..];
        *slot = tail.iter().sum::<f64>() / window as f64;
    }
    out
}
