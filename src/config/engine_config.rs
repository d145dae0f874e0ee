use crate::data::{month_end, month_start, Segment};
use crate::engine::{ShortWindowPolicy, SweepConfig};
use crate::features::MIN_HISTORY;
use anyhow::{bail, ensure, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

//longest history a run may request, about a century
pub const MAX_HISTORY_DAYS: i64 = 36_525;

//complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfiguration {
    //data
    pub data_path: PathBuf,
    pub holidays_path: Option<PathBuf>,
    //only these channels when set
    pub channels: Option<Vec<String>>,
    pub metrics: Vec<String>,

    //monthly backtest
    pub train_windows: Vec<usize>,
    pub backtest_dates: Vec<NaiveDate>,
    pub models: Vec<String>,
    pub short_window: ShortWindowPolicy,
    pub parallel: bool,

    //history is fetched as of this date, which is also the first forecast day
    pub start_forecast_date: NaiveDate,
    pub max_history_days: i64,

    //daily backtest depth
    pub daily_n_months: u32,

    //outputs
    pub policy_file: PathBuf,
    pub report_dir: Option<PathBuf>,
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        let date = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap_or_default();

        EngineConfiguration {
            data_path: PathBuf::from("data/facts.csv"),
            holidays_path: None,
            channels: None,
            metrics: vec![
                "SUM_SNDS".to_string(),
                "SUM_PROFIT".to_string(),
                "SUM_PROFIT_NO_KSP".to_string(),
            ],
            train_windows: vec![30, 60, 90],
            backtest_dates: vec![date(2025, 1), date(2025, 2), date(2025, 3)],
            models: vec![
                "BASELINE_OLS".to_string(),
                "BASELINE_EXPON".to_string(),
                "BASELINE_HOLT".to_string(),
                "BASELINE_HOLT_WINTERS".to_string(),
                "RIDGE_DIRECT".to_string(),
                "RIDGE_RECURSIVE".to_string(),
            ],
            short_window: ShortWindowPolicy::Skip,
            parallel: false,
            start_forecast_date: date(2025, 4),
            max_history_days: 400,
            daily_n_months: 1,
            policy_file: PathBuf::from("policy_model.json"),
            report_dir: None,
        }
    }
}

impl EngineConfiguration {
    //load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: EngineConfiguration = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config {:?}", path))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.train_windows.is_empty(), "train_windows is empty");
        ensure!(
            self.train_windows.iter().all(|&w| w > 0),
            "train window sizes must be positive"
        );
        ensure!(
            self.train_windows
                .iter()
                .all(|&w| w as u64 <= MAX_HISTORY_DAYS as u64),
            "train window sizes must not exceed {} days",
            MAX_HISTORY_DAYS
        );
        ensure!(!self.models.is_empty(), "models is empty");
        ensure!(!self.metrics.is_empty(), "metrics is empty");
        ensure!(!self.backtest_dates.is_empty(), "backtest_dates is empty");

        for &pivot in &self.backtest_dates {
            if month_start(pivot) != pivot {
                bail!("backtest date {} is not the first day of a month", pivot);
            }
            //the whole fact month must lie before the first forecast day
            if month_end(pivot) >= self.start_forecast_date {
                bail!(
                    "backtest month {} does not end before start_forecast_date {}",
                    pivot,
                    self.start_forecast_date
                );
            }
        }

        ensure!(
            (1..=MAX_HISTORY_DAYS).contains(&self.max_history_days),
            "max_history_days {} is outside 1..={}",
            self.max_history_days,
            MAX_HISTORY_DAYS
        );

        let longest = self.train_windows.iter().copied().max().unwrap_or(0);
        ensure!(
            self.max_history_days > (longest + MIN_HISTORY) as i64,
            "max_history_days {} cannot hold a {}-day window plus {} days of lags",
            self.max_history_days,
            longest,
            MIN_HISTORY
        );

        Ok(())
    }

    //segments of the data that pass the channel and metric filters
    pub fn select_segments(&self, available: Vec<Segment>) -> Vec<Segment> {
        available
            .into_iter()
            .filter(|s| self.metrics.iter().any(|m| *m == s.metric))
            .filter(|s| match &self.channels {
                Some(channels) => channels.iter().any(|c| *c == s.channel),
                None => true,
            })
            .collect()
    }

    pub fn sweep_config(&self, segments: Vec<Segment>) -> SweepConfig {
        SweepConfig {
            as_of: self.start_forecast_date,
            lookback_days: self.max_history_days,
            windows: self.train_windows.clone(),
            pivots: self.backtest_dates.clone(),
            methods: self.models.clone(),
            segments,
            short_window: self.short_window,
            parallel: self.parallel,
        }
    }
}
