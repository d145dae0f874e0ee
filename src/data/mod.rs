pub mod calendar;
pub mod loader;
pub mod provider;
pub mod segment;

pub use calendar::{
    is_weekday, month_end, month_start, CalendarFeatures, HolidayCalendar, HolidaySet, NoHolidays,
};
pub use loader::{load_holidays_csv, load_long_csv};
pub use provider::{InMemoryProvider, SeriesProvider};
pub use segment::{Segment, SegmentSeries, SeriesPoint};
