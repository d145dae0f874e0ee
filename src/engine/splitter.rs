use crate::data::month_end;
use crate::error::{EngineError, Result};
use crate::features::FeatureRow;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

//length of the evaluated test interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestSpan {
    //the pivot day only
    Day,
    //the pivot day through the end of its calendar month
    Month,
}

//train/test date ranges around a pivot date
//
//train_end is the day before the pivot and train_start is
//train_end - (window_days - 1), so the two intervals can never overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestWindow {
    pub window_days: usize,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

impl TrainTestWindow {
    pub fn new(pivot: NaiveDate, window_days: usize, span: TestSpan) -> Self {
        let train_end = pivot.pred_opt().unwrap_or(NaiveDate::MIN);
        //windows reaching past the calendar start at its first day
        let train_start = i64::try_from(window_days.saturating_sub(1))
            .ok()
            .and_then(Duration::try_days)
            .and_then(|span| train_end.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);
        let test_end = match span {
            TestSpan::Day => pivot,
            TestSpan::Month => month_end(pivot),
        };

        TrainTestWindow {
            window_days,
            train_start,
            train_end,
            test_start: pivot,
            test_end,
        }
    }

    pub fn daily(pivot: NaiveDate, window_days: usize) -> Self {
        Self::new(pivot, window_days, TestSpan::Day)
    }

    pub fn monthly(pivot: NaiveDate, window_days: usize) -> Self {
        Self::new(pivot, window_days, TestSpan::Month)
    }

    pub fn in_train(&self, date: NaiveDate) -> bool {
        date >= self.train_start && date <= self.train_end
    }

    pub fn in_test(&self, date: NaiveDate) -> bool {
        date >= self.test_start && date <= self.test_end
    }

    //every calendar day of the test interval, weekends and holidays included
    pub fn test_dates(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.test_start;
        let days = (self.test_end - self.test_start).num_days() + 1;
        (0..days.max(0)).map(move |i| start + Duration::days(i))
    }

    pub fn test_len(&self) -> usize {
        ((self.test_end - self.test_start).num_days() + 1).max(0) as usize
    }

    //training rows of the window; fails when fewer than window_days exist
    pub fn train_rows(&self, rows: &[FeatureRow]) -> Result<Vec<FeatureRow>> {
        let train: Vec<FeatureRow> = rows
            .iter()
            .filter(|row| self.in_train(row.date))
            .cloned()
            .collect();

        if self.window_days == 0 || train.len() < self.window_days {
            return Err(EngineError::InsufficientTrainingData {
                pivot: self.test_start,
                required: self.window_days,
                found: train.len(),
            });
        }

        Ok(train)
    }
}

//splits feature rows into the training window and the test interval
pub fn split(
    rows: &[FeatureRow],
    pivot: NaiveDate,
    window_days: usize,
    span: TestSpan,
) -> Result<(Vec<FeatureRow>, Vec<FeatureRow>)> {
    let window = TrainTestWindow::new(pivot, window_days, span);
    let train = window.train_rows(rows)?;
    let test = rows
        .iter()
        .filter(|row| window.in_test(row.date))
        .cloned()
        .collect();

    Ok((train, test))
}
