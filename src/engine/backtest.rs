use crate::data::{is_weekday, HolidayCalendar, Segment, SegmentSeries};
use crate::engine::splitter::TrainTestWindow;
use crate::error::{EngineError, Result};
use crate::metrics::DailyMetrics;
use crate::models::ForecastMethod;
use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

//what to do when a training window is shorter than requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortWindowPolicy {
    //log the cell (or day) as skipped and keep going
    #[default]
    Skip,
    //abort the whole run
    Fail,
}

//one evaluated pivot day; never mutated after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub segment: Segment,
    pub method: String,
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
    pub error: f64,
    pub abs_error: f64,
}

impl BacktestResult {
    pub fn new(
        segment: Segment,
        method: impl Into<String>,
        date: NaiveDate,
        actual: f64,
        predicted: f64,
    ) -> Self {
        let error = predicted - actual;
        BacktestResult {
            segment,
            method: method.into(),
            date,
            actual,
            predicted,
            error,
            abs_error: error.abs(),
        }
    }
}

//a pivot day that was not evaluated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDay {
    pub date: NaiveDate,
    pub reason: String,
}

//configuration for a daily rolling backtest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    //first date that is NOT evaluated; pivots lie in [start - n_months, start)
    pub start_date: NaiveDate,
    pub n_months: u32,
    pub window_days: usize,
    pub short_window: ShortWindowPolicy,
}

//result of a daily rolling backtest
#[derive(Debug, Clone)]
pub struct DailyBacktest {
    pub segment: Segment,
    pub method: String,
    pub window_days: usize,
    pub results: Vec<BacktestResult>,
    pub skipped: Vec<SkippedDay>,
    pub metrics: DailyMetrics,
}

//daily rolling backtest engine for one segment
pub struct BacktestEngine<'a> {
    config: BacktestConfig,
    series: &'a SegmentSeries,
    holidays: &'a dyn HolidayCalendar,
}

impl<'a> BacktestEngine<'a> {
    pub fn new(
        config: BacktestConfig,
        series: &'a SegmentSeries,
        holidays: &'a dyn HolidayCalendar,
    ) -> Self {
        BacktestEngine {
            config,
            series,
            holidays,
        }
    }

    //weekday pivot dates in [start - n_months, start)
    //weekends are skipped as pivots, never removed from training
    pub fn pivot_dates(&self) -> Vec<NaiveDate> {
        let end = self.config.start_date;
        let start = end
            .checked_sub_months(Months::new(self.config.n_months))
            .unwrap_or(end);

        let days = (end - start).num_days();
        (0..days)
            .map(|i| start + Duration::days(i))
            .filter(|d| is_weekday(*d))
            .collect()
    }

    //evaluates one pivot day
    pub fn backtest_one_day(
        &self,
        key: &str,
        method: &ForecastMethod,
        date: NaiveDate,
    ) -> Result<BacktestResult> {
        let window = TrainTestWindow::daily(date, self.config.window_days);

        //a pivot at or before the first fact has no training rows at all
        if self.series.first_date().map_or(true, |first| date <= first) {
            return Err(EngineError::InsufficientTrainingData {
                pivot: date,
                required: self.config.window_days,
                found: 0,
            });
        }

        //short windows must surface before the actual is read
        let predictions = method.forecast(self.series, &window, self.holidays)?;
        let actual = self.series.require(date)?;

        Ok(BacktestResult::new(
            self.series.segment().clone(),
            key,
            date,
            actual,
            predictions[0].value,
        ))
    }

    //runs the backtest over every pivot day
    pub fn run(&self, key: &str, method: &ForecastMethod) -> Result<DailyBacktest> {
        let pivots = self.pivot_dates();
        let mut results = Vec::with_capacity(pivots.len());
        let mut skipped = Vec::new();

        info!(
            segment = %self.series.segment(),
            method = key,
            pivots = pivots.len(),
            window = self.config.window_days,
            "starting daily backtest"
        );

        for date in pivots {
            match self.backtest_one_day(key, method, date) {
                Ok(result) => results.push(result),
                Err(err @ EngineError::InsufficientTrainingData { .. })
                    if self.config.short_window == ShortWindowPolicy::Skip =>
                {
                    debug!(%date, "skipping pivot: {}", err);
                    skipped.push(SkippedDay {
                        date,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let metrics = DailyMetrics::from_results(&results);

        Ok(DailyBacktest {
            segment: self.series.segment().clone(),
            method: key.to_string(),
            window_days: self.config.window_days,
            results,
            skipped,
            metrics,
        })
    }
}
