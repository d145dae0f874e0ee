use crate::data::{HolidayCalendar, Segment, SeriesProvider};
use crate::engine::TrainTestWindow;
use crate::error::{EngineError, Result};
use crate::models::{ModelRegistry, Prediction};
use crate::policy::PolicyRecord;
use chrono::NaiveDate;
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

//forecast of one segment for the rest of the month
#[derive(Debug, Clone)]
pub struct SegmentForecast {
    pub segment: Segment,
    pub method: String,
    pub window_days: usize,
    pub predictions: Vec<Prediction>,
}

impl SegmentForecast {
    pub fn total(&self) -> f64 {
        self.predictions.iter().map(|p| p.value).sum()
    }
}

//a segment whose policy could not be applied
#[derive(Debug, Clone)]
pub struct ForecastFailure {
    pub segment: Segment,
    pub kind: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyForecast {
    pub forecasts: Vec<SegmentForecast>,
    pub skipped: Vec<ForecastFailure>,
}

#[derive(Debug, Serialize)]
struct ForecastRecord<'a> {
    date: String,
    channel: &'a str,
    metric: &'a str,
    method: &'a str,
    window_days: usize,
    forecast: f64,
}

//forecasts [start, month_end(start)] for every policy record
//
//every method key is resolved before any segment is fetched, so a stale key
//in the store aborts the run; data problems only skip their segment
pub fn forecast_by_policy(
    records: &[PolicyRecord],
    provider: &dyn SeriesProvider,
    registry: &ModelRegistry,
    holidays: &dyn HolidayCalendar,
    start: NaiveDate,
    lookback_days: i64,
) -> Result<PolicyForecast> {
    let methods = records
        .iter()
        .map(|r| registry.get(&r.best_method))
        .collect::<Result<Vec<_>>>()?;

    let mut out = PolicyForecast::default();

    for (record, method) in records.iter().zip(methods) {
        let segment = record.segment();
        let window = TrainTestWindow::monthly(start, record.window_days);

        info!(
            %segment,
            method = %record.best_method,
            window = record.window_days,
            "forecasting {} -> {}",
            window.test_start,
            window.test_end
        );

        let result = provider
            .fetch(&segment, start, lookback_days)
            .and_then(|series| method.forecast(&series, &window, holidays));

        match result {
            Ok(predictions) => out.forecasts.push(SegmentForecast {
                segment,
                method: record.best_method.clone(),
                window_days: record.window_days,
                predictions,
            }),
            Err(err) if err.is_recoverable() => {
                warn!(%segment, "skipping forecast: {}", err);
                out.skipped.push(ForecastFailure {
                    segment,
                    kind: err.kind(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    Ok(out)
}

impl PolicyForecast {
    //long csv: date,channel,metric,method,window_days,forecast
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;

        for f in &self.forecasts {
            for p in &f.predictions {
                writer.serialize(ForecastRecord {
                    date: p.date.format("%Y-%m-%d").to_string(),
                    channel: &f.segment.channel,
                    metric: &f.segment.metric,
                    method: &f.method,
                    window_days: f.window_days,
                    forecast: p.value,
                })?;
            }
        }

        writer.flush().map_err(EngineError::from)
    }

    //per-segment month totals
    pub fn pretty_print(&self) {
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("Channel"),
            Cell::new("Metric"),
            Cell::new("Method"),
            Cell::new("Window"),
            Cell::new("Days"),
            Cell::new("Total"),
        ]));

        for f in &self.forecasts {
            table.add_row(Row::new(vec![
                Cell::new(&f.segment.channel),
                Cell::new(&f.segment.metric),
                Cell::new(&f.method),
                Cell::new(&f.window_days.to_string()),
                Cell::new(&f.predictions.len().to_string()),
                Cell::new(&format!("{:.2}", f.total())),
            ]));
        }

        table.printstd();

        for s in &self.skipped {
            println!("skipped {}: {} ({})", s.segment, s.reason, s.kind);
        }
    }
}
