use chrono::{DateTime, NaiveDate};
use ironbark_domain::errors::DataError;
use ironbark_domain::repositories::market_data::BarRepository;
use ironbark_domain::value_objects::bar::Bar;
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

/// One `<symbol>.csv` per symbol under a base directory, columns
/// `timestamp,open,high,low,close,volume`. Timestamps may be epoch seconds,
/// RFC3339 or YYYY-MM-DD.
#[derive(Debug, Clone)]
pub struct CsvBarRepository {
    base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl CsvBarRepository {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.base_dir.join(format!("{symbol}.csv"))
    }
}

impl BarRepository for CsvBarRepository {
    fn get_bars(&self, symbol: &str, start: i64, end: i64) -> Result<Vec<Bar>, DataError> {
        let span = tracing::info_span!("infra.csv.get_bars", symbol = %symbol);
        let _enter = span.enter();
        let load_start = Instant::now();

        let path = self.symbol_path(symbol);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DataError::NotFound {
                    symbol: symbol.to_string(),
                    start,
                    end,
                });
            }
            Err(err) => {
                return Err(DataError::Storage {
                    symbol: symbol.to_string(),
                    message: format!("failed to open {}: {err}", path.display()),
                });
            }
        };

        let mut reader = csv::Reader::from_reader(file);
        let mut bars = Vec::new();
        for result in reader.deserialize::<BarRecord>() {
            let record = result.map_err(|err| DataError::Storage {
                symbol: symbol.to_string(),
                message: format!("failed to parse CSV row: {err}"),
            })?;
            let timestamp =
                parse_timestamp(&record.timestamp).map_err(|message| DataError::Storage {
                    symbol: symbol.to_string(),
                    message,
                })?;
            if timestamp < start || timestamp > end {
                continue;
            }
            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            });
        }
        bars.sort_by_key(|bar| bar.timestamp);

        metrics::histogram!("ironbark.infra.csv.get_bars_ms")
            .record(load_start.elapsed().as_millis() as f64);
        if bars.is_empty() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        tracing::debug!(rows = bars.len(), "loaded bars from CSV");
        Ok(bars)
    }
}

fn parse_timestamp(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    if let Ok(secs) = trimmed.parse::<i64>() {
        return Ok(secs);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    Err(format!("invalid timestamp in CSV: {trimmed}"))
}

#[cfg(test)]
mod tests {
    use super::CsvBarRepository;
    use ironbark_domain::errors::DataError;
    use ironbark_domain::repositories::market_data::BarRepository;
    use std::io::Write;

    fn write_csv(dir: &std::path::Path, symbol: &str, rows: &str) {
        let mut file = std::fs::File::create(dir.join(format!("{symbol}.csv"))).unwrap();
        writeln!(file, "timestamp,open,high,low,close,volume").unwrap();
        write!(file, "{rows}").unwrap();
    }

    #[test]
    fn loads_and_filters_by_range() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "BHP",
            "86400,10,11,9,10.5,1000\n172800,10.5,12,10,11.5,1200\n259200,11.5,12,11,12,900\n",
        );

        let repo = CsvBarRepository::new(dir.path());
        let bars = repo.get_bars("BHP", 86_400, 172_800).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, 86_400);
        assert_eq!(bars[1].close, 11.5);
        assert_eq!(bars[0].volume, 1_000);
    }

    #[test]
    fn accepts_date_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "CSL", "1970-01-02,10,11,9,10.5,1000\n");

        let repo = CsvBarRepository::new(dir.path());
        let bars = repo.get_bars("CSL", 0, 1_000_000).unwrap();
        assert_eq!(bars[0].timestamp, 86_400);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = CsvBarRepository::new(dir.path());
        let err = repo.get_bars("FMG", 0, 10).unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
    }

    #[test]
    fn malformed_rows_are_storage_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "BHP", "86400,ten,11,9,10.5,1000\n");

        let repo = CsvBarRepository::new(dir.path());
        let err = repo.get_bars("BHP", 0, 1_000_000).unwrap_err();
        assert!(matches!(err, DataError::Storage { .. }));
    }
}
