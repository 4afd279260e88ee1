use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::DataError;

/// Which optional price columns the source file carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcColumns {
    pub open: bool,
    pub high: bool,
    pub low: bool,
    pub volume: bool,
}

impl OhlcColumns {
    pub fn all() -> Self {
        Self {
            open: true,
            high: true,
            low: true,
            volume: true,
        }
    }

    pub fn close_only() -> Self {
        Self::default()
    }

    /// Open, High and Low are all present (Close is always required).
    pub fn has_ohlc(&self) -> bool {
        self.open && self.high && self.low
    }
}

/// A single trading day's observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<u64>,
}

impl PriceRecord {
    pub fn close_only(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }
}

/// Date-ordered price history for one instrument, at most one record per date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    records: Vec<PriceRecord>,
    columns: OhlcColumns,
}

impl PriceSeries {
    /// Sorts by date and drops later records that repeat an earlier date.
    pub fn new(mut records: Vec<PriceRecord>, columns: OhlcColumns) -> Self {
        records.sort_by_key(|record| record.date);
        records.dedup_by_key(|record| record.date);
        Self { records, columns }
    }

    /// Accepts records that are already strictly ascending by date.
    pub fn from_sorted(records: Vec<PriceRecord>, columns: OhlcColumns) -> Result<Self, DataError> {
        if let Some(pair) = records.windows(2).find(|pair| pair[1].date <= pair[0].date) {
            return Err(DataError::OutOfOrder {
                previous: pair[0].date,
                current: pair[1].date,
            });
        }
        Ok(Self { records, columns })
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> OhlcColumns {
        self.columns
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|record| record.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|record| record.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|record| record.date)
    }

    pub(crate) fn retain_dates(&self, keep: impl Fn(NaiveDate) -> bool) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|record| keep(record.date))
                .cloned()
                .collect(),
            columns: self.columns,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Stock,
    Etf,
}

impl InstrumentKind {
    /// Reads the metadata `ETF` flag: `Y` (any case, padded) is an ETF, anything else a stock.
    pub fn from_flag(flag: &str) -> Self {
        if flag.trim().eq_ignore_ascii_case("y") {
            InstrumentKind::Etf
        } else {
            InstrumentKind::Stock
        }
    }

    /// Dataset sub-directory holding this kind's price files.
    pub fn folder(&self) -> &'static str {
        match self {
            InstrumentKind::Stock => "stocks",
            InstrumentKind::Etf => "etfs",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Stock => write!(f, "Stock"),
            InstrumentKind::Etf => write!(f, "ETF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub security_name: String,
    pub kind: InstrumentKind,
}

impl Instrument {
    pub fn display_label(&self) -> String {
        format!("{} - {}", self.symbol, self.security_name)
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DataError> {
        if start > end {
            return Err(DataError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_new_sorts_and_keeps_first_duplicate() {
        let records = vec![
            PriceRecord::close_only(d(2020, 1, 3), 3.0),
            PriceRecord::close_only(d(2020, 1, 1), 1.0),
            PriceRecord::close_only(d(2020, 1, 3), 99.0),
            PriceRecord::close_only(d(2020, 1, 2), 2.0),
        ];
        let series = PriceSeries::new(records, OhlcColumns::close_only());

        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.first_date(), Some(d(2020, 1, 1)));
        assert_eq!(series.last_date(), Some(d(2020, 1, 3)));
    }

    #[test]
    fn test_from_sorted_rejects_repeated_date() {
        let records = vec![
            PriceRecord::close_only(d(2020, 1, 1), 1.0),
            PriceRecord::close_only(d(2020, 1, 1), 2.0),
        ];
        let err = PriceSeries::from_sorted(records, OhlcColumns::close_only()).unwrap_err();
        assert!(matches!(err, DataError::OutOfOrder { .. }));
    }

    #[test]
    fn test_instrument_kind_flag() {
        assert_eq!(InstrumentKind::from_flag(" y "), InstrumentKind::Etf);
        assert_eq!(InstrumentKind::from_flag("Y"), InstrumentKind::Etf);
        assert_eq!(InstrumentKind::from_flag("N"), InstrumentKind::Stock);
        assert_eq!(InstrumentKind::from_flag(""), InstrumentKind::Stock);
        assert_eq!(InstrumentKind::Etf.folder(), "etfs");
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(d(2020, 2, 1), d(2020, 1, 1)).is_err());
        let range = DateRange::new(d(2020, 1, 1), d(2020, 1, 1)).unwrap();
        assert!(range.contains(d(2020, 1, 1)));
        assert!(!range.contains(d(2020, 1, 2)));
    }
}
