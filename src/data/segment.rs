use crate::error::{EngineError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

//identity of an independently forecast series: sales channel + metric
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Segment {
    pub channel: String,
    pub metric: String,
}

impl Segment {
    pub fn new(channel: impl Into<String>, metric: impl Into<String>) -> Self {
        Segment {
            channel: channel.into(),
            metric: metric.into(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.channel, self.metric)
    }
}

//a single daily observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        SeriesPoint { date, value }
    }
}

//dense, date-sorted daily series for one segment
//
//every calendar day between the first and last point is present, so a date
//maps to its index by day offset. the series is never mutated in place:
//substitution returns a new series.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSeries {
    segment: Segment,
    points: Vec<SeriesPoint>,
}

impl SegmentSeries {
    //creates a series, sorting the points and rejecting duplicates and gaps
    pub fn new(segment: Segment, mut points: Vec<SeriesPoint>) -> Result<Self> {
        points.sort_by(|a, b| a.date.cmp(&b.date));

        for pair in points.windows(2) {
            let step = (pair[1].date - pair[0].date).num_days();
            if step == 0 {
                return Err(EngineError::InvalidSeries {
                    segment,
                    reason: format!("duplicate date {}", pair[0].date),
                });
            }
            if step > 1 {
                return Err(EngineError::MissingDate {
                    segment,
                    date: pair[0].date + Duration::days(1),
                });
            }
        }

        Ok(SegmentSeries { segment, points })
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    //returns the index of a date inside the dense range
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let first = self.first_date()?;
        let offset = (date - first).num_days();
        if offset < 0 || offset as usize >= self.points.len() {
            return None;
        }
        Some(offset as usize)
    }

    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.index_of(date).map(|i| self.points[i].value)
    }

    //like value_at but fails loudly when the date is absent
    pub fn require(&self, date: NaiveDate) -> Result<f64> {
        self.value_at(date).ok_or_else(|| EngineError::MissingDate {
            segment: self.segment.clone(),
            date,
        })
    }

    //returns the points in [start, end], failing if any date is not covered
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> Result<&[SeriesPoint]> {
        if end < start {
            return Ok(&[]);
        }
        let from = self.index_of(start).ok_or_else(|| self.missing(start))?;
        let to = self.index_of(end).ok_or_else(|| self.missing(end))?;
        Ok(&self.points[from..=to])
    }

    //returns a series holding only the facts strictly before `date`
    pub fn before(&self, date: NaiveDate) -> SegmentSeries {
        let points = self
            .points
            .iter()
            .take_while(|p| p.date < date)
            .copied()
            .collect();

        SegmentSeries {
            segment: self.segment.clone(),
            points,
        }
    }

    //returns a new series with `value` recorded at `date`
    //an existing date is replaced; the day right after the last point is appended
    pub fn with_substituted_value(&self, date: NaiveDate, value: f64) -> Result<SegmentSeries> {
        let mut points = self.points.clone();

        if let Some(index) = self.index_of(date) {
            points[index].value = value;
        } else {
            let next = match self.last_date() {
                Some(last) => last + Duration::days(1),
                None => date,
            };
            if date != next {
                return Err(self.missing(next));
            }
            points.push(SeriesPoint::new(date, value));
        }

        Ok(SegmentSeries {
            segment: self.segment.clone(),
            points,
        })
    }

    fn missing(&self, date: NaiveDate) -> EngineError {
        EngineError::MissingDate {
            segment: self.segment.clone(),
            date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(values: &[f64]) -> SegmentSeries {
        let start = date(2025, 1, 1);
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| SeriesPoint::new(start + Duration::days(i as i64), v))
            .collect();
        SegmentSeries::new(Segment::new("KP", "SUM_SNDS"), points).unwrap()
    }

    #[test]
    fn test_new_sorts_points() {
        let points = vec![
            SeriesPoint::new(date(2025, 1, 2), 2.0),
            SeriesPoint::new(date(2025, 1, 1), 1.0),
        ];
        let s = SegmentSeries::new(Segment::new("A", "B"), points).unwrap();
        assert_eq!(s.first_date(), Some(date(2025, 1, 1)));
        assert_eq!(s.value_at(date(2025, 1, 2)), Some(2.0));
    }

    #[test]
    fn test_gap_is_rejected() {
        let points = vec![
            SeriesPoint::new(date(2025, 1, 1), 1.0),
            SeriesPoint::new(date(2025, 1, 3), 3.0),
        ];
        let err = SegmentSeries::new(Segment::new("A", "B"), points).unwrap_err();
        match err {
            EngineError::MissingDate { date: missing, .. } => assert_eq!(missing, date(2025, 1, 2)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let points = vec![
            SeriesPoint::new(date(2025, 1, 1), 1.0),
            SeriesPoint::new(date(2025, 1, 1), 3.0),
        ];
        let err = SegmentSeries::new(Segment::new("A", "B"), points).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSeries { .. }));
    }

    #[test]
    fn test_require_fails_loudly() {
        let s = series(&[1.0, 2.0]);
        assert!(s.require(date(2025, 1, 5)).is_err());
        assert_eq!(s.require(date(2025, 1, 2)).unwrap(), 2.0);
    }

    #[test]
    fn test_substitution_returns_new_series() {
        let s = series(&[1.0, 2.0, 3.0]);
        let replaced = s.with_substituted_value(date(2025, 1, 2), 9.0).unwrap();
        assert_eq!(s.value_at(date(2025, 1, 2)), Some(2.0));
        assert_eq!(replaced.value_at(date(2025, 1, 2)), Some(9.0));

        let appended = s.with_substituted_value(date(2025, 1, 4), 4.0).unwrap();
        assert_eq!(appended.len(), 4);

        assert!(s.with_substituted_value(date(2025, 1, 6), 4.0).is_err());
    }

    #[test]
    fn test_before_keeps_strictly_prior_facts() {
        let s = series(&[1.0, 2.0, 3.0, 4.0]);
        let head = s.before(date(2025, 1, 3));
        assert_eq!(head.len(), 2);
        assert_eq!(head.last_date(), Some(date(2025, 1, 2)));
    }

    #[test]
    fn test_range_requires_full_coverage() {
        let s = series(&[1.0, 2.0, 3.0]);
        assert_eq!(s.range(date(2025, 1, 1), date(2025, 1, 3)).unwrap().len(), 3);
        assert!(s.range(date(2025, 1, 2), date(2025, 1, 4)).is_err());
    }
}
