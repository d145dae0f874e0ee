use crate::data::{HolidayCalendar, SegmentSeries};
use crate::engine::splitter::TrainTestWindow;
use crate::error::Result;
use crate::features::{build_features, features_at, FeatureRow};
use crate::models::{fit_error, ModelPort, Prediction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

//how a method walks through a multi-day test interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flavor {
    Direct,
    Recursive,
}

//a model port bound to a forecasting flavor
//
//Direct fits once on the training window and predicts the whole test
//interval in one call; the lag/rolling columns of every test row are the
//ones known at the pivot date. Recursive predicts one day at a time, writes
//each prediction back into the series as if it were a fact, rebuilds the
//features and refits for the next day.
#[derive(Clone)]
pub enum ForecastMethod {
    Direct(Arc<dyn ModelPort>),
    Recursive(Arc<dyn ModelPort>),
}

impl std::fmt::Debug for ForecastMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self.flavor(), self.port().name())
    }
}

impl ForecastMethod {
    pub fn direct<M: ModelPort + 'static>(port: M) -> Self {
        ForecastMethod::Direct(Arc::new(port))
    }

    pub fn recursive<M: ModelPort + 'static>(port: M) -> Self {
        ForecastMethod::Recursive(Arc::new(port))
    }

    pub fn port(&self) -> &dyn ModelPort {
        match self {
            ForecastMethod::Direct(port) | ForecastMethod::Recursive(port) => port.as_ref(),
        }
    }

    pub fn flavor(&self) -> Flavor {
        match self {
            ForecastMethod::Direct(_) => Flavor::Direct,
            ForecastMethod::Recursive(_) => Flavor::Recursive,
        }
    }

    //forecasts every date of the window's test interval
    //only facts strictly before the test start are ever read from `series`
    pub fn forecast(
        &self,
        series: &SegmentSeries,
        window: &TrainTestWindow,
        holidays: &dyn HolidayCalendar,
    ) -> Result<Vec<Prediction>> {
        let history = series.before(window.test_start);

        match self {
            ForecastMethod::Direct(port) => forecast_direct(port.as_ref(), &history, window, holidays),
            ForecastMethod::Recursive(port) => {
                forecast_recursive(port.as_ref(), history, window, holidays)
            }
        }
    }
}

fn forecast_direct(
    port: &dyn ModelPort,
    history: &SegmentSeries,
    window: &TrainTestWindow,
    holidays: &dyn HolidayCalendar,
) -> Result<Vec<Prediction>> {
    let rows = build_features(history, holidays);
    let train = window.train_rows(&rows)?;

    //later test dates reuse the pivot's lag/rolling columns
    let pivot_row = features_at(history, window.test_start, holidays)?;
    let test: Vec<FeatureRow> = window
        .test_dates()
        .map(|date| pivot_row.carried_to(date, holidays))
        .collect();

    let predictions = port.fit_predict(&train, &test)?;
    check_alignment(port, &test, &predictions)?;

    Ok(predictions)
}

fn forecast_recursive(
    port: &dyn ModelPort,
    history: SegmentSeries,
    window: &TrainTestWindow,
    holidays: &dyn HolidayCalendar,
) -> Result<Vec<Prediction>> {
    let mut working = history;
    let mut predictions = Vec::with_capacity(window.test_len());

    for date in window.test_dates() {
        let rows = build_features(&working, holidays);
        let step = TrainTestWindow::daily(date, window.window_days);
        let train = step.train_rows(&rows)?;
        let test = [features_at(&working, date, holidays)?.masked()];

        let step_predictions = port.fit_predict(&train, &test)?;
        check_alignment(port, &test, &step_predictions)?;
        let prediction = step_predictions[0];

        trace!(%date, value = prediction.value, "substituting prediction as fact");
        working = working.with_substituted_value(date, prediction.value)?;
        predictions.push(prediction);
    }

    Ok(predictions)
}

fn check_alignment(
    port: &dyn ModelPort,
    test: &[FeatureRow],
    predictions: &[Prediction],
) -> Result<()> {
    if predictions.len() != test.len() {
        return Err(fit_error(
            port.name(),
            &format!(
                "returned {} predictions for {} test rows",
                predictions.len(),
                test.len()
            ),
        ));
    }

    for (row, prediction) in test.iter().zip(predictions.iter()) {
        if row.date != prediction.date {
            return Err(fit_error(
                port.name(),
                &format!("prediction for {} misaligned with {}", prediction.date, row.date),
            ));
        }
        if !prediction.value.is_finite() {
            return Err(fit_error(
                port.name(),
                &format!("non-finite prediction for {}", prediction.date),
            ));
        }
    }

    Ok(())
}
