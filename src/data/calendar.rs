use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

//source of holiday flags; only ever used to populate a feature column
pub trait HolidayCalendar: Send + Sync {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

//calendar with no holidays at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}

//fixed set of holiday dates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HolidaySet {
    dates: BTreeSet<NaiveDate>,
}

impl HolidaySet {
    pub fn new<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        HolidaySet {
            dates: dates.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl HolidayCalendar for HolidaySet {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

//first day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

//last day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|next| next - Duration::days(1))
        .unwrap_or(date)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    month_end(date).day()
}

//monday through friday
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

//calendar columns of a feature row
//weekends and holidays are flagged, never zeroed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub day_of_month: u32,
    pub month: u32,
    pub week_of_year: u32,
    pub start_of_week: bool,
    pub end_of_week: bool,
    pub start_of_month: bool,
    pub end_of_month: bool,
    pub days_left_in_month: u32,
    pub month_progress: f64,
    pub is_holiday: bool,
}

impl CalendarFeatures {
    pub const COUNT: usize = 12;

    pub fn for_date(date: NaiveDate, holidays: &dyn HolidayCalendar) -> Self {
        let day_of_week = date.weekday().num_days_from_monday();
        let day_of_month = date.day();
        let month_len = days_in_month(date);

        CalendarFeatures {
            day_of_week,
            is_weekend: day_of_week >= 5,
            day_of_month,
            month: date.month(),
            week_of_year: date.iso_week().week(),
            start_of_week: day_of_week == 0,
            end_of_week: day_of_week == 4,
            start_of_month: day_of_month == 1,
            end_of_month: day_of_month == month_len,
            days_left_in_month: month_len - day_of_month,
            month_progress: (day_of_month as f64 / month_len as f64 * 1000.0).round() / 1000.0,
            is_holiday: holidays.is_holiday(date),
        }
    }

    //numeric encoding in a fixed column order
    pub fn to_values(&self) -> [f64; Self::COUNT] {
        [
            self.day_of_week as f64,
            flag(self.is_weekend),
            self.day_of_month as f64,
            self.month as f64,
            self.week_of_year as f64,
            flag(self.start_of_week),
            flag(self.end_of_week),
            flag(self.start_of_month),
            flag(self.end_of_month),
            self.days_left_in_month as f64,
            self.month_progress,
            flag(self.is_holiday),
        ]
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_start(date(2025, 2, 17)), date(2025, 2, 1));
        assert_eq!(month_end(date(2024, 2, 10)), date(2024, 2, 29));
        assert_eq!(month_end(date(2025, 12, 3)), date(2025, 12, 31));
    }

    #[test]
    fn test_weekday() {
        //2025-03-01 is a saturday
        assert!(!is_weekday(date(2025, 3, 1)));
        assert!(!is_weekday(date(2025, 3, 2)));
        assert!(is_weekday(date(2025, 3, 3)));
    }

    #[test]
    fn test_calendar_features() {
        let holidays = HolidaySet::new([date(2025, 5, 9)]);
        let f = CalendarFeatures::for_date(date(2025, 5, 9), &holidays);

        assert_eq!(f.day_of_week, 4);
        assert!(f.end_of_week);
        assert!(!f.is_weekend);
        assert!(f.is_holiday);
        assert_eq!(f.days_left_in_month, 22);
        assert_eq!(f.month_progress, 0.29);

        let last = CalendarFeatures::for_date(date(2025, 5, 31), &NoHolidays);
        assert!(last.end_of_month);
        assert!(last.is_weekend);
        assert_eq!(last.month_progress, 1.0);
    }
}
