//monthly sales forecasting engine: backtests competing methods per segment
//and keeps a policy of which method and training window to trust

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod features;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod policy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfiguration;
    pub use crate::data::{
        load_holidays_csv, load_long_csv, HolidayCalendar, HolidaySet, InMemoryProvider,
        NoHolidays, Segment, SegmentSeries, SeriesPoint, SeriesProvider,
    };
    pub use crate::engine::{
        BacktestConfig, BacktestEngine, BacktestResult, CellFailure, DailyBacktest,
        MonthlyBacktestRow, MonthlySweep, ShortWindowPolicy, SweepConfig, SweepReport,
        TrainTestWindow,
    };
    pub use crate::error::{EngineError, Result};
    pub use crate::features::{build_features, FeatureRow};
    pub use crate::forecast::{forecast_by_policy, PolicyForecast, SegmentForecast};
    pub use crate::metrics::{DailyMetrics, MonthMetrics, SummaryTables};
    pub use crate::models::{ForecastMethod, ModelPort, ModelRegistry, Prediction};
    pub use crate::policy::{best_per_segment, select_best, stamp, PolicyRecord, PolicyStore};
}
