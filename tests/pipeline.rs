use chrono::{Datelike, Duration, NaiveDate, Utc};
use monthcast::metrics::summary::write_rows_csv;
use monthcast::prelude::*;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

//two channels with a weekly profile; LK starts too late for the sweep
fn facts_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,channel,metric,value").unwrap();

    let start = date(2024, 9, 1);
    for i in 0..212 {
        let d = start + Duration::days(i);
        let weekday = d.weekday().num_days_from_monday() as f64;
        writeln!(file, "{},KP,SUM_SNDS,{}", d, 200.0 + 10.0 * weekday).unwrap();
        writeln!(file, "{},TD,SUM_SNDS,{}", d, 80.0 + (i % 5) as f64).unwrap();
        if d >= date(2025, 3, 1) {
            writeln!(file, "{},LK,SUM_SNDS,50", d).unwrap();
        }
    }

    file.flush().unwrap();
    file
}

#[test]
fn test_evaluate_then_forecast() {
    let facts = facts_csv();
    let dir = tempdir().unwrap();

    let config = EngineConfiguration {
        data_path: facts.path().to_path_buf(),
        metrics: vec!["SUM_SNDS".to_string()],
        train_windows: vec![30, 60],
        backtest_dates: vec![date(2025, 1, 1), date(2025, 2, 1), date(2025, 3, 1)],
        models: vec![
            "BASELINE_OLS".to_string(),
            "BASELINE_EXPON".to_string(),
            "BASELINE_HOLT_WINTERS".to_string(),
        ],
        start_forecast_date: date(2025, 4, 1),
        max_history_days: 200,
        policy_file: dir.path().join("policy.json"),
        parallel: true,
        ..EngineConfiguration::default()
    };
    config.validate().unwrap();

    let provider = load_long_csv(&config.data_path).unwrap();
    assert_eq!(provider.len(), 3);

    let registry = ModelRegistry::standard();
    let segments = config.select_segments(provider.segments());
    let report = MonthlySweep::new(
        config.sweep_config(segments),
        &provider,
        &registry,
        &NoHolidays,
    )
    .run()
    .unwrap();

    //3 segments x 2 windows; LK is skipped under both windows
    assert_eq!(report.cells, 6);
    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped.iter().all(|s| s.segment.channel == "LK"));
    assert_eq!(report.rows.len(), 2 * 2 * 3);

    let report_dir = dir.path().join("report");
    SummaryTables::from_rows(&report.rows)
        .write_csv(&report_dir)
        .unwrap();
    write_rows_csv(&report.rows, report_dir.join("monthly_backtests.csv")).unwrap();
    assert!(report_dir.join("summary_by_window.csv").exists());

    let best = best_per_segment(&select_best(&report.rows));
    assert_eq!(best.len(), 2);

    let store = PolicyStore::new(&config.policy_file);
    store.persist(&stamp(&best, Utc::now())).unwrap();

    let latest = store.load_latest().unwrap();
    assert_eq!(latest.len(), 2);

    //forecast from mid-month covers the remaining days only
    let forecast = forecast_by_policy(
        &latest,
        &provider,
        &registry,
        &NoHolidays,
        date(2025, 3, 20),
        config.max_history_days,
    )
    .unwrap();

    assert!(forecast.skipped.is_empty());
    assert_eq!(forecast.forecasts.len(), 2);
    for f in &forecast.forecasts {
        assert_eq!(f.predictions.len(), 12);
        assert_eq!(f.predictions.last().unwrap().date, date(2025, 3, 31));
        assert!(f.total() > 0.0);
    }
}

#[test]
fn test_config_file_drives_segment_selection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("monthcast.json");

    let config = EngineConfiguration {
        channels: Some(vec!["TD".to_string()]),
        ..EngineConfiguration::default()
    };
    config.to_json_file(&path).unwrap();

    let loaded = EngineConfiguration::from_json_file(&path).unwrap();
    let provider = load_long_csv(facts_csv().path()).unwrap();
    let segments = loaded.select_segments(provider.segments());

    assert_eq!(segments, vec![Segment::new("TD", "SUM_SNDS")]);
}
