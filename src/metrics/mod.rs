pub mod daily;
pub mod monthly;
pub mod summary;

pub use daily::DailyMetrics;
pub use monthly::MonthMetrics;
pub use summary::SummaryTables;
