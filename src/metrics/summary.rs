use crate::engine::MonthlyBacktestRow;
use crate::error::Result;
use indexmap::IndexMap;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::path::Path;
use tracing::info;

//mean monthly wmape of a method, optionally inside a group (window, channel, metric)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodScore {
    pub group: Option<String>,
    pub method: String,
    //absent when the method never had a defined score
    pub mean_wmape: Option<f64>,
    pub scored: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRate {
    pub method: String,
    pub wins: usize,
    pub decided: usize,
    pub rate: f64,
}

//report tables built from monthly backtest rows
#[derive(Debug, Clone, Default)]
pub struct SummaryTables {
    pub overall: Vec<MethodScore>,
    pub by_window: Vec<MethodScore>,
    pub by_channel: Vec<MethodScore>,
    pub by_metric: Vec<MethodScore>,
    pub win_rate: Vec<WinRate>,
}

//flat csv shape of a monthly row, one line per method
#[derive(Debug, Serialize)]
struct RowRecord<'a> {
    pivot: String,
    window_days: usize,
    channel: &'a str,
    metric: &'a str,
    actual_month: f64,
    method: &'a str,
    wmape: Option<f64>,
    winner: bool,
}

impl SummaryTables {
    pub fn from_rows(rows: &[MonthlyBacktestRow]) -> Self {
        let overall = mean_by(rows, |_| None);
        let by_window = mean_by(rows, |r| Some(r.window_days.to_string()));
        let by_channel = mean_by(rows, |r| Some(r.segment.channel.clone()));
        let by_metric = mean_by(rows, |r| Some(r.segment.metric.clone()));

        SummaryTables {
            overall,
            by_window,
            by_channel,
            by_metric,
            win_rate: win_rates(rows),
        }
    }

    //prints every table to stdout
    pub fn pretty_print(&self) {
        println!("Mean WMAPE by method");
        score_table(&self.overall, None).printstd();

        println!("\nMean WMAPE by window");
        score_table(&self.by_window, Some("Window")).printstd();

        println!("\nWin rate");
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("Method"),
            Cell::new("Wins"),
            Cell::new("Decided"),
            Cell::new("Win Rate"),
        ]));
        for w in &self.win_rate {
            table.add_row(Row::new(vec![
                Cell::new(&w.method),
                Cell::new(&w.wins.to_string()),
                Cell::new(&w.decided.to_string()),
                Cell::new(&format!("{:.2}%", w.rate * 100.0)),
            ]));
        }
        table.printstd();

        println!("\nMean WMAPE by channel");
        score_table(&self.by_channel, Some("Channel")).printstd();

        println!("\nMean WMAPE by metric");
        score_table(&self.by_metric, Some("Metric")).printstd();
    }

    //writes every table as its own csv file inside `dir`
    pub fn write_csv<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        write_records(&dir.join("summary_overall.csv"), &self.overall)?;
        write_records(&dir.join("summary_by_window.csv"), &self.by_window)?;
        write_records(&dir.join("summary_by_channel.csv"), &self.by_channel)?;
        write_records(&dir.join("summary_by_metric.csv"), &self.by_metric)?;
        write_records(&dir.join("summary_win_rate.csv"), &self.win_rate)?;

        info!(dir = %dir.display(), "summary tables written");
        Ok(())
    }
}

//writes the raw monthly rows in long form
pub fn write_rows_csv<P: AsRef<Path>>(rows: &[MonthlyBacktestRow], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    for row in rows {
        for (method, wmape) in &row.scores {
            writer.serialize(RowRecord {
                pivot: row.pivot.format("%Y-%m-%d").to_string(),
                window_days: row.window_days,
                channel: &row.segment.channel,
                metric: &row.segment.metric,
                actual_month: row.actual_month,
                method,
                wmape: *wmape,
                winner: row.winner.as_deref() == Some(method.as_str()),
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

//mean of the defined scores per (group, method), ascending inside each group
//methods keep first-seen order on equal means
fn mean_by<F>(rows: &[MonthlyBacktestRow], group_of: F) -> Vec<MethodScore>
where
    F: Fn(&MonthlyBacktestRow) -> Option<String>,
{
    let mut groups: IndexMap<Option<String>, IndexMap<String, Vec<f64>>> = IndexMap::new();

    for row in rows {
        let methods = groups.entry(group_of(row)).or_default();
        for (method, score) in &row.scores {
            let values = methods.entry(method.clone()).or_default();
            if let Some(score) = score {
                values.push(*score);
            }
        }
    }

    let mut out = Vec::new();
    for (group, methods) in groups {
        let mut scores: Vec<MethodScore> = methods
            .into_iter()
            .map(|(method, values)| MethodScore {
                group: group.clone(),
                method,
                mean_wmape: (!values.is_empty()).then(|| values.as_slice().mean()),
                scored: values.len(),
            })
            .collect();

        //absent means sort last
        scores.sort_by(|a, b| match (a.mean_wmape, b.mean_wmape) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        out.extend(scores);
    }

    out
}

fn win_rates(rows: &[MonthlyBacktestRow]) -> Vec<WinRate> {
    let mut wins: IndexMap<String, usize> = IndexMap::new();
    for row in rows {
        for method in row.scores.keys() {
            wins.entry(method.clone()).or_insert(0);
        }
    }

    let decided = rows.iter().filter(|r| r.winner.is_some()).count();
    for winner in rows.iter().filter_map(|r| r.winner.as_ref()) {
        *wins.entry(winner.clone()).or_insert(0) += 1;
    }

    let mut rates: Vec<WinRate> = wins
        .into_iter()
        .map(|(method, wins)| WinRate {
            method,
            wins,
            decided,
            rate: if decided > 0 {
                wins as f64 / decided as f64
            } else {
                0.0
            },
        })
        .collect();

    rates.sort_by(|a, b| b.wins.cmp(&a.wins));
    rates
}

fn score_table(scores: &[MethodScore], group_label: Option<&str>) -> Table {
    let mut table = Table::new();

    let mut header = Vec::new();
    if let Some(label) = group_label {
        header.push(Cell::new(label));
    }
    header.extend([Cell::new("Method"), Cell::new("Mean WMAPE"), Cell::new("Months")]);
    table.add_row(Row::new(header));

    for s in scores {
        let mut cells = Vec::new();
        if group_label.is_some() {
            cells.push(Cell::new(s.group.as_deref().unwrap_or("")));
        }
        cells.push(Cell::new(&s.method));
        cells.push(Cell::new(
            &s.mean_wmape
                .map(|m| format!("{:.4}", m))
                .unwrap_or_else(|| "n/a".to_string()),
        ));
        cells.push(Cell::new(&s.scored.to_string()));
        table.add_row(Row::new(cells));
    }

    table
}
