use crate::data::segment::{Segment, SegmentSeries};
use crate::error::{EngineError, Result};
use chrono::{Duration, NaiveDate};
use indexmap::IndexMap;

//source of dense per-segment history
//missing warehouse rows must already be resolved to zero by the implementor
pub trait SeriesProvider: Send + Sync {
    //returns the series covering [as_of - lookback_days, as_of - 1]
    fn fetch(&self, segment: &Segment, as_of: NaiveDate, lookback_days: i64)
        -> Result<SegmentSeries>;

    //segments the provider knows about, in a stable order
    fn segments(&self) -> Vec<Segment>;
}

//provider backed by fully loaded series
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: IndexMap<Segment, SegmentSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        InMemoryProvider::default()
    }

    pub fn insert(&mut self, series: SegmentSeries) {
        self.series.insert(series.segment().clone(), series);
    }

    pub fn get(&self, segment: &Segment) -> Option<&SegmentSeries> {
        self.series.get(segment)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl SeriesProvider for InMemoryProvider {
    fn fetch(
        &self,
        segment: &Segment,
        as_of: NaiveDate,
        lookback_days: i64,
    ) -> Result<SegmentSeries> {
        let incomplete = |available: i64| EngineError::IncompleteHistory {
            segment: segment.clone(),
            as_of,
            required: lookback_days,
            available,
        };

        let series = self.series.get(segment).ok_or_else(|| incomplete(0))?;
        let (first, last) = match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(incomplete(0)),
        };

        let end = as_of.pred_opt().ok_or_else(|| incomplete(0))?;
        let available = ((end.min(last) - first).num_days() + 1).max(0);

        //a lookback reaching past the calendar can never be satisfied
        let start = Some(lookback_days)
            .filter(|&days| days > 0)
            .and_then(Duration::try_days)
            .and_then(|lookback| as_of.checked_sub_signed(lookback))
            .ok_or_else(|| incomplete(available))?;

        //the series must reach back far enough and run up to the day before as_of
        if first > start || last < end {
            return Err(incomplete(available));
        }

        let points = series.range(start, end)?.to_vec();
        SegmentSeries::new(segment.clone(), points)
    }

    fn segments(&self) -> Vec<Segment> {
        self.series.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::segment::SeriesPoint;

    fn provider(days: i64) -> (InMemoryProvider, Segment) {
        let segment = Segment::new("TD", "SUM_PROFIT");
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let points = (0..days)
            .map(|i| SeriesPoint::new(start + Duration::days(i), i as f64))
            .collect();
        let mut provider = InMemoryProvider::new();
        provider.insert(SegmentSeries::new(segment.clone(), points).unwrap());
        (provider, segment)
    }

    #[test]
    fn test_fetch_returns_requested_window() {
        let (provider, segment) = provider(100);
        let as_of = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let series = provider.fetch(&segment, as_of, 30).unwrap();

        assert_eq!(series.len(), 30);
        assert_eq!(series.last_date(), Some(as_of - Duration::days(1)));
    }

    #[test]
    fn test_fetch_short_history_fails() {
        let (provider, segment) = provider(20);
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 21).unwrap();
        let err = provider.fetch(&segment, as_of, 60).unwrap_err();

        match err {
            EngineError::IncompleteHistory {
                required,
                available,
                ..
            } => {
                assert_eq!(required, 60);
                assert_eq!(available, 20);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fetch_out_of_range_lookback_fails() {
        let (provider, segment) = provider(100);
        let as_of = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        for lookback in [100_000_100, i64::MAX, 0, -5] {
            let err = provider.fetch(&segment, as_of, lookback).unwrap_err();
            match err {
                EngineError::IncompleteHistory {
                    required,
                    available,
                    ..
                } => {
                    assert_eq!(required, lookback);
                    assert_eq!(available, 59);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_fetch_unknown_segment_fails() {
        let (provider, _) = provider(20);
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 21).unwrap();
        assert!(provider
            .fetch(&Segment::new("X", "Y"), as_of, 5)
            .is_err());
    }
}
