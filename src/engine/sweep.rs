use crate::data::{HolidayCalendar, Segment, SeriesProvider};
use crate::engine::backtest::ShortWindowPolicy;
use crate::engine::monthly::{run_monthly_backtests, MonthlyBacktestRow, MonthlyStage};
use crate::error::{EngineError, Result};
use crate::models::{ForecastMethod, ModelRegistry};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

//configuration for a monthly sweep over windows and segments
#[derive(Debug, Clone)]
pub struct SweepConfig {
    //history is fetched as of this date
    pub as_of: NaiveDate,
    pub lookback_days: i64,
    pub windows: Vec<usize>,
    pub pivots: Vec<NaiveDate>,
    pub methods: Vec<String>,
    pub segments: Vec<Segment>,
    pub short_window: ShortWindowPolicy,
    pub parallel: bool,
}

//where inside a cell a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellStage {
    FetchHistory,
    Backtest(MonthlyStage),
}

impl fmt::Display for CellStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellStage::FetchHistory => f.write_str("fetch_history"),
            CellStage::Backtest(stage) => write!(f, "{}", stage),
        }
    }
}

//a (window, segment) cell that did not produce rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellFailure {
    pub segment: Segment,
    pub window_days: usize,
    pub stage: CellStage,
    pub kind: String,
    pub reason: String,
}

//aggregated sweep output
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub cells: usize,
    pub rows: Vec<MonthlyBacktestRow>,
    pub skipped: Vec<CellFailure>,
}

impl SweepReport {
    pub fn completed_cells(&self) -> usize {
        self.cells - self.skipped.len()
    }
}

//result of one cell, captured instead of unwinding the sweep
struct CellOutcome {
    segment: Segment,
    window_days: usize,
    result: std::result::Result<Vec<MonthlyBacktestRow>, (CellStage, EngineError)>,
}

//monthly backtest sweep: every segment under every training window
pub struct MonthlySweep<'a> {
    config: SweepConfig,
    provider: &'a dyn SeriesProvider,
    registry: &'a ModelRegistry,
    holidays: &'a dyn HolidayCalendar,
}

impl<'a> MonthlySweep<'a> {
    pub fn new(
        config: SweepConfig,
        provider: &'a dyn SeriesProvider,
        registry: &'a ModelRegistry,
        holidays: &'a dyn HolidayCalendar,
    ) -> Self {
        MonthlySweep {
            config,
            provider,
            registry,
            holidays,
        }
    }

    //runs all cells; per-cell data problems are reported, configuration
    //problems abort the run
    pub fn run(&self) -> Result<SweepReport> {
        //an unknown key must fail before any work is done
        let methods = self.registry.resolve_all(&self.config.methods)?;

        let cells: Vec<(usize, &Segment)> = self
            .config
            .windows
            .iter()
            .flat_map(|&w| self.config.segments.iter().map(move |s| (w, s)))
            .collect();

        info!(
            cells = cells.len(),
            methods = methods.len(),
            pivots = self.config.pivots.len(),
            parallel = self.config.parallel,
            "starting monthly sweep"
        );

        let mut report = SweepReport {
            cells: cells.len(),
            ..SweepReport::default()
        };

        if self.config.parallel {
            //collect keeps cell order
            let outcomes: Vec<CellOutcome> = cells
                .par_iter()
                .map(|&(window, segment)| self.run_cell(segment, window, &methods))
                .collect();
            for outcome in outcomes {
                self.absorb(outcome, &mut report)?;
            }
        } else {
            for &(window, segment) in &cells {
                let outcome = self.run_cell(segment, window, &methods);
                self.absorb(outcome, &mut report)?;
            }
        }

        info!(
            rows = report.rows.len(),
            skipped = report.skipped.len(),
            "monthly sweep finished"
        );

        Ok(report)
    }

    fn run_cell(
        &self,
        segment: &Segment,
        window_days: usize,
        methods: &[(&str, &ForecastMethod)],
    ) -> CellOutcome {
        let result = self
            .provider
            .fetch(segment, self.config.as_of, self.config.lookback_days)
            .map_err(|e| (CellStage::FetchHistory, e))
            .and_then(|series| {
                run_monthly_backtests(
                    &series,
                    &self.config.pivots,
                    window_days,
                    methods,
                    self.holidays,
                )
                .map_err(|e| (CellStage::Backtest(e.stage), e.source))
            });

        CellOutcome {
            segment: segment.clone(),
            window_days,
            result,
        }
    }

    fn absorb(&self, outcome: CellOutcome, report: &mut SweepReport) -> Result<()> {
        let CellOutcome {
            segment,
            window_days,
            result,
        } = outcome;

        match result {
            Ok(rows) => {
                info!(%segment, window = window_days, rows = rows.len(), "cell done");
                report.rows.extend(rows);
                Ok(())
            }
            Err((stage, err)) if self.aborts(&err) => {
                error!(%segment, window = window_days, %stage, "aborting sweep: {}", err);
                Err(err)
            }
            Err((stage, err)) => {
                warn!(%segment, window = window_days, %stage, "skipping cell: {}", err);
                report.skipped.push(CellFailure {
                    segment,
                    window_days,
                    stage,
                    kind: err.kind().to_string(),
                    reason: err.to_string(),
                });
                Ok(())
            }
        }
    }

    fn aborts(&self, err: &EngineError) -> bool {
        match err {
            EngineError::InsufficientTrainingData { .. } => {
                self.config.short_window == ShortWindowPolicy::Fail
            }
            other => !other.is_recoverable(),
        }
    }
}
