pub mod backtest;
pub mod monthly;
pub mod splitter;
pub mod sweep;

pub use backtest::{
    BacktestConfig, BacktestEngine, BacktestResult, DailyBacktest, ShortWindowPolicy, SkippedDay,
};
pub use monthly::{run_monthly_backtests, MonthlyBacktestError, MonthlyBacktestRow, MonthlyStage};
pub use splitter::{split, TestSpan, TrainTestWindow};
pub use sweep::{CellFailure, CellStage, MonthlySweep, SweepConfig, SweepReport};
