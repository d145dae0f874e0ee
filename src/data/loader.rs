use crate::data::calendar::HolidaySet;
use crate::data::provider::InMemoryProvider;
use crate::data::segment::{Segment, SegmentSeries, SeriesPoint};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct LongRecord {
    date: String,
    channel: String,
    metric: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct HolidayRecord {
    date: String,
}

fn parse_date(raw: &str, line: usize) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .context(format!("Failed to parse date '{}' at line {}", raw, line))
}

//loads a long-format csv (date,channel,metric,value) into per-segment series
//the file is expected to be dense already; gaps are reported, not filled
pub fn load_long_csv<P: AsRef<Path>>(path: P) -> Result<InMemoryProvider> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let mut grouped: IndexMap<Segment, Vec<SeriesPoint>> = IndexMap::new();

    for (index, result) in reader.deserialize().enumerate() {
        let record: LongRecord =
            result.context(format!("Failed to parse CSV record at line {}", index + 2))?;
        let date = parse_date(&record.date, index + 2)?;

        grouped
            .entry(Segment::new(record.channel, record.metric))
            .or_default()
            .push(SeriesPoint::new(date, record.value));
    }

    let mut provider = InMemoryProvider::new();
    for (segment, points) in grouped {
        let label = segment.to_string();
        let series = SegmentSeries::new(segment, points)
            .context(format!("Invalid series for segment {}", label))?;
        provider.insert(series);
    }

    info!(segments = provider.len(), path = ?path, "loaded segment series");

    Ok(provider)
}

//loads a one-column csv of holiday dates
pub fn load_holidays_csv<P: AsRef<Path>>(path: P) -> Result<HolidaySet> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let mut dates = Vec::new();
    for (index, result) in reader.deserialize().enumerate() {
        let record: HolidayRecord =
            result.context(format!("Failed to parse CSV record at line {}", index + 2))?;
        dates.push(parse_date(&record.date, index + 2)?);
    }

    Ok(HolidaySet::new(dates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::calendar::HolidayCalendar;
    use std::io::Write;

    #[test]
    fn test_load_long_csv_groups_segments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,channel,metric,value").unwrap();
        writeln!(file, "2025-01-02,KP,SUM_SNDS,20").unwrap();
        writeln!(file, "2025-01-01,KP,SUM_SNDS,10").unwrap();
        writeln!(file, "2025-01-01,TD,SUM_SNDS,5").unwrap();

        let provider = load_long_csv(file.path()).unwrap();
        assert_eq!(provider.len(), 2);

        let kp = provider.get(&Segment::new("KP", "SUM_SNDS")).unwrap();
        assert_eq!(kp.len(), 2);
        assert_eq!(kp.points()[0].value, 10.0);
    }

    #[test]
    fn test_load_long_csv_rejects_gaps() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,channel,metric,value").unwrap();
        writeln!(file, "2025-01-01,KP,SUM_SNDS,10").unwrap();
        writeln!(file, "2025-01-05,KP,SUM_SNDS,10").unwrap();

        assert!(load_long_csv(file.path()).is_err());
    }

    #[test]
    fn test_load_holidays() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date").unwrap();
        writeln!(file, "2025-05-09").unwrap();

        let holidays = load_holidays_csv(file.path()).unwrap();
        assert!(holidays.is_holiday(NaiveDate::from_ymd_opt(2025, 5, 9).unwrap()));
    }
}
