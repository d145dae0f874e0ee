use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use monthcast::metrics::summary::write_rows_csv;
use monthcast::prelude::*;
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "monthcast")]
#[command(about = "Backtests monthly sales forecasting methods and keeps a per-segment policy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //write the default configuration
    InitConfig {
        #[arg(long, default_value = "monthcast.json")]
        out: PathBuf,
    },

    //run the monthly sweep, report, and persist the best policy
    Evaluate {
        #[arg(long)]
        config: PathBuf,
    },

    //daily rolling backtest of one method on one segment
    Daily {
        #[arg(long)]
        config: PathBuf,

        //sales channel
        #[arg(long)]
        channel: String,

        //metric name (eg SUM_SNDS)
        #[arg(long)]
        metric: String,

        //method key from the registry
        #[arg(long, default_value = "BASELINE_OLS")]
        model: String,

        //training window in days
        #[arg(long, default_value = "60")]
        window: usize,

        //output path for per-day results csv
        #[arg(long)]
        output_csv: Option<PathBuf>,
    },

    //forecast the month of start_forecast_date with the latest policy
    Forecast {
        #[arg(long)]
        config: PathBuf,

        //output path for the long forecast csv
        #[arg(long)]
        out: Option<PathBuf>,
    },

    //print the latest policy record per segment
    Policy {
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitConfig { out } => {
            EngineConfiguration::default().to_json_file(&out)?;
            println!("Default configuration written to {:?}", out);
            Ok(())
        }
        Commands::Evaluate { config } => evaluate(&config),
        Commands::Daily {
            config,
            channel,
            metric,
            model,
            window,
            output_csv,
        } => daily(&config, Segment::new(channel, metric), &model, window, output_csv),
        Commands::Forecast { config, out } => forecast(&config, out),
        Commands::Policy { file } => {
            let latest = PolicyStore::new(file).load_latest()?;
            print_policy(&latest);
            Ok(())
        }
    }
}

fn load_inputs(config: &EngineConfiguration) -> Result<(InMemoryProvider, HolidaySet)> {
    let provider = load_long_csv(&config.data_path)?;
    let holidays = match &config.holidays_path {
        Some(path) => load_holidays_csv(path)?,
        None => HolidaySet::new(Vec::new()),
    };
    Ok((provider, holidays))
}

fn evaluate(path: &Path) -> Result<()> {
    let config = EngineConfiguration::from_json_file(path)?;
    let (provider, holidays) = load_inputs(&config)?;
    let registry = ModelRegistry::standard();

    let segments = config.select_segments(provider.segments());
    info!(segments = segments.len(), "segments selected");

    let report = MonthlySweep::new(
        config.sweep_config(segments),
        &provider,
        &registry,
        &holidays,
    )
    .run()?;

    println!("\nMonthly Backtest Summary");
    println!("========================\n");
    let tables = SummaryTables::from_rows(&report.rows);
    tables.pretty_print();

    if let Some(dir) = &config.report_dir {
        tables.write_csv(dir)?;
        write_rows_csv(&report.rows, dir.join("monthly_backtests.csv"))?;
        println!("\nReport tables saved to {:?}", dir);
    }

    print_skipped(&report.skipped);

    let best = best_per_segment(&select_best(&report.rows));
    let records = stamp(&best, Utc::now());
    let store = PolicyStore::new(&config.policy_file);
    let total = store
        .persist(&records)
        .with_context(|| format!("Failed to update policy store {:?}", config.policy_file))?;

    println!("\nSelected Policy");
    println!("===============\n");
    print_policy(&records);
    println!(
        "\n{} records appended, {} in {:?}",
        records.len(),
        total,
        config.policy_file
    );

    Ok(())
}

#[derive(Serialize)]
struct DailyRecord<'a> {
    date: String,
    channel: &'a str,
    metric: &'a str,
    method: &'a str,
    actual: f64,
    predicted: f64,
    error: f64,
    abs_error: f64,
}

fn daily(
    path: &Path,
    segment: Segment,
    model: &str,
    window: usize,
    output_csv: Option<PathBuf>,
) -> Result<()> {
    let config = EngineConfiguration::from_json_file(path)?;
    let (provider, holidays) = load_inputs(&config)?;
    let registry = ModelRegistry::standard();
    let method = registry.get(model)?;

    let series = provider.fetch(&segment, config.start_forecast_date, config.max_history_days)?;
    let engine = BacktestEngine::new(
        BacktestConfig {
            start_date: config.start_forecast_date,
            n_months: config.daily_n_months,
            window_days: window,
            short_window: config.short_window,
        },
        &series,
        &holidays,
    );
    let backtest = engine.run(model, method)?;

    println!("Daily Backtest: {} | {} | window {}", segment, model, window);
    println!("==============\n");

    let fmt = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "n/a".into());
    let mut table = Table::new();
    table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));
    table.add_row(Row::new(vec![
        Cell::new("Days"),
        Cell::new(&backtest.metrics.days.to_string()),
    ]));
    table.add_row(Row::new(vec![Cell::new("MAE"), Cell::new(&fmt(backtest.metrics.mae))]));
    table.add_row(Row::new(vec![Cell::new("WMAPE"), Cell::new(&fmt(backtest.metrics.wmape))]));
    table.add_row(Row::new(vec![Cell::new("BIAS"), Cell::new(&fmt(backtest.metrics.bias))]));
    table.add_row(Row::new(vec![
        Cell::new("Skipped Days"),
        Cell::new(&backtest.skipped.len().to_string()),
    ]));
    table.printstd();

    if let Some(out) = output_csv {
        let mut writer = csv::Writer::from_path(&out)
            .with_context(|| format!("Failed to create {:?}", out))?;
        for r in &backtest.results {
            writer.serialize(DailyRecord {
                date: r.date.format("%Y-%m-%d").to_string(),
                channel: &r.segment.channel,
                metric: &r.segment.metric,
                method: &r.method,
                actual: r.actual,
                predicted: r.predicted,
                error: r.error,
                abs_error: r.abs_error,
            })?;
        }
        writer.flush()?;
        println!("\nResults saved to {:?}", out);
    }

    Ok(())
}

fn forecast(path: &Path, out: Option<PathBuf>) -> Result<()> {
    let config = EngineConfiguration::from_json_file(path)?;
    let (provider, holidays) = load_inputs(&config)?;
    let registry = ModelRegistry::standard();

    let records = PolicyStore::new(&config.policy_file).load_latest()?;
    if records.is_empty() {
        anyhow::bail!(
            "Policy store {:?} has no records, run evaluate first",
            config.policy_file
        );
    }

    let result = forecast_by_policy(
        &records,
        &provider,
        &registry,
        &holidays,
        config.start_forecast_date,
        config.max_history_days,
    )?;

    println!("Forecast from {}", config.start_forecast_date);
    println!("=========================\n");
    result.pretty_print();

    if let Some(out) = out {
        result.write_csv(&out)?;
        println!("\nForecast saved to {:?}", out);
    }

    Ok(())
}

fn print_policy(records: &[PolicyRecord]) {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Channel"),
        Cell::new("Metric"),
        Cell::new("Window"),
        Cell::new("Method"),
        Cell::new("Mean WMAPE"),
        Cell::new("Run"),
    ]));

    for r in records {
        table.add_row(Row::new(vec![
            Cell::new(&r.segment_channel),
            Cell::new(&r.segment_metric),
            Cell::new(&r.window_days.to_string()),
            Cell::new(&r.best_method),
            Cell::new(&format!("{:.4}", r.best_mean_wmape)),
            Cell::new(&r.run_timestamp.to_rfc3339()),
        ]));
    }

    table.printstd();
}

fn print_skipped(skipped: &[CellFailure]) {
    if skipped.is_empty() {
        return;
    }

    println!("\nSkipped Cells");
    println!("=============\n");
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Segment"),
        Cell::new("Window"),
        Cell::new("Stage"),
        Cell::new("Kind"),
        Cell::new("Reason"),
    ]));
    for s in skipped {
        table.add_row(Row::new(vec![
            Cell::new(&s.segment.to_string()),
            Cell::new(&s.window_days.to_string()),
            Cell::new(&s.stage.to_string()),
            Cell::new(&s.kind),
            Cell::new(&s.reason),
        ]));
    }
    table.printstd();
}
