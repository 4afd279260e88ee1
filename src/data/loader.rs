use super::{DataError, Result};
use crate::types::{Instrument, InstrumentKind, OhlcColumns, PriceRecord, PriceSeries};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column name (lowercased) -> field position.
struct HeaderIndex(HashMap<String, usize>);

impl HeaderIndex {
    fn new(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.trim().to_lowercase(), i))
                .collect(),
        )
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.0.get(&column.to_lowercase()).copied()
    }

    fn require(&self, column: &str) -> Result<usize> {
        self.position(column)
            .ok_or_else(|| DataError::MissingColumn(column.to_string()))
    }
}

fn field(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_price(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

// Volume columns written by dataframe tools often carry a trailing ".0".
fn parse_volume(raw: Option<&str>) -> Option<u64> {
    let raw = raw?;
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
    })
}

fn open_reader<P: AsRef<Path>>(path: P) -> Result<csv::Reader<std::fs::File>> {
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?)
}

pub struct DataLoader;

impl DataLoader {
    /// Reads the reference table of tradable instruments (`Symbol`, `Security Name`, `ETF`).
    pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<Vec<Instrument>> {
        let mut rdr = open_reader(&path)?;
        let index = HeaderIndex::new(rdr.headers()?);
        let symbol_idx = index.require("Symbol")?;
        let name_idx = index.require("Security Name")?;
        let etf_idx = index.require("ETF")?;

        let mut instruments = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let Some(symbol) = field(&record, Some(symbol_idx)) else {
                continue;
            };
            instruments.push(Instrument {
                symbol: symbol.to_string(),
                security_name: field(&record, Some(name_idx)).unwrap_or_default().to_string(),
                kind: InstrumentKind::from_flag(field(&record, Some(etf_idx)).unwrap_or_default()),
            });
        }

        info!(
            "Loaded {} instruments from {}",
            instruments.len(),
            path.as_ref().display()
        );
        Ok(instruments)
    }

    /// Loads one instrument's daily history, sorted ascending with one record per date.
    ///
    /// `Date` and `Close` are required; `Open`, `High`, `Low` and `Volume` are picked up
    /// when their headers are present. Rows with an unreadable date or close are skipped.
    pub fn load_price_series<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
        let mut rdr = open_reader(&path)?;

        // Verify required columns; optional ones are detected by header presence
        let index = HeaderIndex::new(rdr.headers()?);
        let date_idx = index.require("Date")?;
        let close_idx = index.require("Close")?;
        let open_idx = index.position("Open");
        let high_idx = index.position("High");
        let low_idx = index.position("Low");
        let volume_idx = index.position("Volume");

        let columns = OhlcColumns {
            open: open_idx.is_some(),
            high: high_idx.is_some(),
            low: low_idx.is_some(),
            volume: volume_idx.is_some(),
        };

        // Parse rows, skipping any without a usable date or close
        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            let date = field(&record, Some(date_idx)).and_then(parse_date);
            let close = parse_price(field(&record, Some(close_idx)));
            let (Some(date), Some(close)) = (date, close) else {
                debug!("Skipping row {}: unreadable date or close", row + 1);
                skipped += 1;
                continue;
            };
            records.push(PriceRecord {
                date,
                open: parse_price(field(&record, open_idx)),
                high: parse_price(field(&record, high_idx)),
                low: parse_price(field(&record, low_idx)),
                close,
                volume: parse_volume(field(&record, volume_idx)),
            });
        }

        if skipped > 0 {
            warn!(
                "Skipped {} unreadable rows in {}",
                skipped,
                path.as_ref().display()
            );
        }

        // Sort by date and drop repeated dates (keep-first)
        let parsed = records.len();
        let series = PriceSeries::new(records, columns);
        if series.len() < parsed {
            warn!(
                "Dropped {} duplicate dates in {}",
                parsed - series.len(),
                path.as_ref().display()
            );
        }

        info!(
            "Loaded {} records from {} (OHLC: {})",
            series.len(),
            path.as_ref().display(),
            columns.has_ohlc()
        );
        Ok(series)
    }
}

/// `{root}/etfs/{SYMBOL}.csv` for ETFs, `{root}/stocks/{SYMBOL}.csv` otherwise.
pub fn resolve_price_path(root: &Path, instrument: &Instrument) -> PathBuf {
    root.join(instrument.kind.folder())
        .join(format!("{}.csv", instrument.symbol))
}

pub fn find_instrument<'a>(instruments: &'a [Instrument], symbol: &str) -> Result<&'a Instrument> {
    instruments
        .iter()
        .find(|instrument| instrument.symbol == symbol)
        .ok_or_else(|| DataError::UnknownInstrument(symbol.to_string()))
}
