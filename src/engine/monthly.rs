use crate::data::{HolidayCalendar, Segment, SegmentSeries};
use crate::engine::splitter::TrainTestWindow;
use crate::error::EngineError;
use crate::metrics::MonthMetrics;
use crate::models::ForecastMethod;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

//steps of one monthly backtest pivot, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonthlyStage {
    SelectFactMonth,
    RunAllMethods,
    ScoreAll,
    PickWinner,
    EmitRow,
}

impl fmt::Display for MonthlyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MonthlyStage::SelectFactMonth => "select_fact_month",
            MonthlyStage::RunAllMethods => "run_all_methods",
            MonthlyStage::ScoreAll => "score_all",
            MonthlyStage::PickWinner => "pick_winner",
            MonthlyStage::EmitRow => "emit_row",
        };
        f.write_str(label)
    }
}

//failure of a monthly backtest, tagged with where it happened
#[derive(Error, Debug)]
#[error("{stage} failed for pivot {pivot}{}: {source}", .method.as_ref().map(|m| format!(" ({m})")).unwrap_or_default())]
pub struct MonthlyBacktestError {
    pub stage: MonthlyStage,
    pub pivot: NaiveDate,
    pub method: Option<String>,
    #[source]
    pub source: EngineError,
}

//one row per (segment, window, pivot month)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBacktestRow {
    pub segment: Segment,
    pub pivot: NaiveDate,
    pub window_days: usize,
    pub actual_month: f64,
    //wmape per method rounded to 4 places; None when the month total is zero
    pub scores: IndexMap<String, Option<f64>>,
    pub winner: Option<String>,
}

impl MonthlyBacktestRow {
    pub fn score(&self, method: &str) -> Option<f64> {
        self.scores.get(method).copied().flatten()
    }
}

//runs every method over the month of each pivot date
//a failing method fails the whole call; it is never left out of the comparison
pub fn run_monthly_backtests(
    series: &SegmentSeries,
    pivots: &[NaiveDate],
    window_days: usize,
    methods: &[(&str, &ForecastMethod)],
    holidays: &dyn HolidayCalendar,
) -> Result<Vec<MonthlyBacktestRow>, MonthlyBacktestError> {
    let mut rows = Vec::with_capacity(pivots.len());

    for &pivot in pivots {
        let fail = |stage: MonthlyStage, method: Option<&str>, source: EngineError| {
            MonthlyBacktestError {
                stage,
                pivot,
                method: method.map(str::to_string),
                source,
            }
        };

        //select fact month
        let window = TrainTestWindow::monthly(pivot, window_days);
        let actuals: Vec<f64> = series
            .range(window.test_start, window.test_end)
            .map_err(|e| fail(MonthlyStage::SelectFactMonth, None, e))?
            .iter()
            .map(|p| p.value)
            .collect();

        info!(
            segment = %series.segment(),
            %pivot,
            window = window_days,
            "backtest month {} -> {}",
            window.test_start,
            window.test_end
        );

        //run all methods
        let mut forecasts = Vec::with_capacity(methods.len());
        for &(key, method) in methods {
            let predictions = method
                .forecast(series, &window, holidays)
                .map_err(|e| fail(MonthlyStage::RunAllMethods, Some(key), e))?;
            let values: Vec<f64> = predictions.iter().map(|p| p.value).collect();
            forecasts.push((key, values));
        }

        //score all
        let mut scores = IndexMap::with_capacity(forecasts.len());
        for (key, values) in &forecasts {
            let score = match MonthMetrics::compute(&actuals, values) {
                Ok(metrics) => {
                    debug!(
                        method = *key,
                        actual = metrics.actual_month,
                        forecast = metrics.forecast_month,
                        wmape = metrics.wmape_month,
                        bias = metrics.bias_month,
                        "month scored"
                    );
                    Some(metrics.rounded_wmape())
                }
                Err(EngineError::UndefinedMetric { metric }) => {
                    debug!(method = *key, metric, "month actual is zero, score absent");
                    None
                }
                Err(e) => return Err(fail(MonthlyStage::ScoreAll, Some(*key), e)),
            };
            scores.insert(key.to_string(), score);
        }

        //pick winner
        let winner = pick_winner(&scores);
        if let Some(best) = &winner {
            info!(%pivot, winner = %best, "month winner");
        }

        //emit row
        rows.push(MonthlyBacktestRow {
            segment: series.segment().clone(),
            pivot,
            window_days,
            actual_month: actuals.iter().sum(),
            scores,
            winner,
        });
    }

    Ok(rows)
}

//lowest defined score; ties go to the method listed first
fn pick_winner(scores: &IndexMap<String, Option<f64>>) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (key, score) in scores {
        if let Some(score) = score {
            if best.map_or(true, |(_, current)| *score < current) {
                best = Some((key, *score));
            }
        }
    }
    best.map(|(key, _)| key.clone())
}
