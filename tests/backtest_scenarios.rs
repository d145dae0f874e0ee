use chrono::{Datelike, Duration, NaiveDate, Weekday};
use monthcast::prelude::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn is_weekend(d: NaiveDate) -> bool {
    matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

//100 on weekdays, 0 on weekends
fn weekday_series(segment: Segment, start: NaiveDate, days: i64) -> SegmentSeries {
    let points = (0..days)
        .map(|i| {
            let d = start + Duration::days(i);
            SeriesPoint::new(d, if is_weekend(d) { 0.0 } else { 100.0 })
        })
        .collect();
    SegmentSeries::new(segment, points).unwrap()
}

struct ConstantPredictor(f64);

impl ModelPort for ConstantPredictor {
    fn name(&self) -> &str {
        "constant"
    }

    fn fit_predict(&self, _train: &[FeatureRow], test: &[FeatureRow]) -> Result<Vec<Prediction>> {
        Ok(test.iter().map(|r| Prediction::new(r.date, self.0)).collect())
    }
}

#[test]
fn test_constant_predictor_on_weekday_sweep() {
    //2024-01-01 is a monday; 90 days run through 2024-03-30
    let series = weekday_series(Segment::new("KP", "SUM_SNDS"), date(2024, 1, 1), 90);
    let method = ForecastMethod::direct(ConstantPredictor(100.0));

    let engine = BacktestEngine::new(
        BacktestConfig {
            start_date: date(2024, 3, 31),
            n_months: 1,
            window_days: 60,
            short_window: ShortWindowPolicy::Skip,
        },
        &series,
        &NoHolidays,
    );
    let backtest = engine.run("CONSTANT", &method).unwrap();

    //only pivots with a full 60-day window are evaluated, the rest are reported
    assert!(!backtest.results.is_empty());
    assert!(!backtest.skipped.is_empty());
    assert!(backtest.results.iter().all(|r| !is_weekend(r.date)));

    let wmape = backtest.metrics.wmape.unwrap();
    assert!(wmape.abs() < 1e-9);
    assert_eq!(backtest.metrics.bias, Some(0.0));
}

#[test]
fn test_zero_actual_month_is_absent_not_nan() {
    let segment = Segment::new("TD", "SUM_PROFIT");
    let start = date(2024, 10, 1);
    let points = (0..182)
        .map(|i| {
            let d = start + Duration::days(i);
            //march 2025 has no sales at all
            let v = if d.month() == 3 { 0.0 } else { 25.0 };
            SeriesPoint::new(d, v)
        })
        .collect();

    let mut provider = InMemoryProvider::new();
    provider.insert(SegmentSeries::new(segment.clone(), points).unwrap());

    let registry = ModelRegistry::standard();
    let config = SweepConfig {
        as_of: date(2025, 4, 1),
        lookback_days: 150,
        windows: vec![30],
        pivots: vec![date(2025, 2, 1), date(2025, 3, 1)],
        methods: vec!["BASELINE_OLS".to_string(), "BASELINE_EXPON".to_string()],
        segments: vec![segment],
        short_window: ShortWindowPolicy::Skip,
        parallel: false,
    };

    let report = MonthlySweep::new(config, &provider, &registry, &NoHolidays)
        .run()
        .unwrap();
    assert_eq!(report.rows.len(), 2);
    assert!(report.skipped.is_empty());

    let march = &report.rows[1];
    assert_eq!(march.actual_month, 0.0);
    assert!(march.scores.values().all(|s| s.is_none()));
    assert!(march.winner.is_none());

    //the absent month never leaks into the means
    let tables = SummaryTables::from_rows(&report.rows);
    for score in &tables.overall {
        assert_eq!(score.scored, 1);
        assert!(score.mean_wmape.unwrap().is_finite());
    }

    let best = select_best(&report.rows);
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].months, 1);
}

#[test]
fn test_unknown_model_aborts_sweep() {
    let segment = Segment::new("KP", "SUM_SNDS");
    let mut provider = InMemoryProvider::new();
    provider.insert(weekday_series(segment.clone(), date(2024, 9, 1), 240));

    let registry = ModelRegistry::standard();
    let config = SweepConfig {
        as_of: date(2025, 4, 1),
        lookback_days: 180,
        windows: vec![30, 60],
        pivots: vec![date(2025, 3, 1)],
        methods: vec!["BASELINE_OLS".to_string(), "CATBOOST_RECURSIVE".to_string()],
        segments: vec![segment],
        short_window: ShortWindowPolicy::Skip,
        parallel: true,
    };

    let err = MonthlySweep::new(config, &provider, &registry, &NoHolidays)
        .run()
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownModel(ref key) if key == "CATBOOST_RECURSIVE"));
    assert!(!err.is_recoverable());
}

#[test]
fn test_recursive_and_direct_agree_on_flat_history() {
    let segment = Segment::new("KP", "SUM_SNDS");
    let points = (0..150)
        .map(|i| SeriesPoint::new(date(2024, 11, 1) + Duration::days(i), 10.0))
        .collect();
    let series = SegmentSeries::new(segment, points).unwrap();
    let window = TrainTestWindow::monthly(date(2025, 3, 1), 60);

    let registry = ModelRegistry::standard();
    let direct = registry
        .get("RIDGE_DIRECT")
        .unwrap()
        .forecast(&series, &window, &NoHolidays)
        .unwrap();
    let recursive = registry
        .get("RIDGE_RECURSIVE")
        .unwrap()
        .forecast(&series, &window, &NoHolidays)
        .unwrap();

    assert_eq!(direct.len(), 31);
    assert_eq!(recursive.len(), 31);
    for (d, r) in direct.iter().zip(&recursive) {
        assert_eq!(d.date, r.date);
        assert!((d.value - 10.0).abs() < 1e-6);
        assert!((r.value - 10.0).abs() < 1e-6);
    }
}
