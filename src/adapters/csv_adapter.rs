//! CSV bar import adapter.
//!
//! Reads `timestamp,open,high,low,close,volume` rows for one instrument and
//! timeframe. Timestamps are UTC, either `YYYY-MM-DD HH:MM:SS` or a bare
//! date (read as midnight).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fs;
use std::path::Path;

use crate::domain::bar::Bar;
use crate::domain::error::FxforgeError;
use crate::domain::instrument::Timeframe;

pub struct CsvBarAdapter;

impl CsvBarAdapter {
    pub fn load_bars(
        path: &Path,
        instrument_id: i64,
        timeframe: Timeframe,
    ) -> Result<Vec<Bar>, FxforgeError> {
        let file = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| FxforgeError::DataImport {
            file: file.clone(),
            reason: format!("failed to read file: {}", e),
        })?;

        let import_err = |reason: String| FxforgeError::DataImport {
            file: file.clone(),
            reason,
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| import_err(format!("CSV parse error: {}", e)))?;

            let timestamp_str = record
                .get(0)
                .ok_or_else(|| import_err("missing timestamp column".into()))?;
            let timestamp = parse_timestamp(timestamp_str)
                .ok_or_else(|| import_err(format!("invalid timestamp: {}", timestamp_str)))?;

            let open: f64 = record
                .get(1)
                .ok_or_else(|| import_err("missing open column".into()))?
                .parse()
                .map_err(|e| import_err(format!("invalid open value: {}", e)))?;

            let high: f64 = record
                .get(2)
                .ok_or_else(|| import_err("missing high column".into()))?
                .parse()
                .map_err(|e| import_err(format!("invalid high value: {}", e)))?;

            let low: f64 = record
                .get(3)
                .ok_or_else(|| import_err("missing low column".into()))?
                .parse()
                .map_err(|e| import_err(format!("invalid low value: {}", e)))?;

            let close: f64 = record
                .get(4)
                .ok_or_else(|| import_err("missing close column".into()))?
                .parse()
                .map_err(|e| import_err(format!("invalid close value: {}", e)))?;

            let volume: f64 = record
                .get(5)
                .ok_or_else(|| import_err("missing volume column".into()))?
                .parse()
                .map_err(|e| import_err(format!("invalid volume value: {}", e)))?;

            bars.push(Bar {
                instrument_id,
                timeframe,
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
