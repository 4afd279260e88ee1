//! Per-day derived fields over a price series: daily return, cumulative return and
//! simple moving averages of the close.
//!
//! Values that cannot be computed yet (the first return, the moving average before a
//! full window) are `None`, never zero or NaN.

use crate::analysis::summary::{compute_summary, SummaryStats};
use crate::types::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("Cannot summarise an empty series")]
    EmptySeries,
    #[error("Invalid moving average window {window}: must be at least 1")]
    InvalidWindow { window: usize },
    #[error("Histogram needs at least one bin")]
    InvalidBins,
}

pub type Result<T> = std::result::Result<T, MetricsError>;

/// Short and long moving-average window lengths, both at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Windows {
    short: usize,
    long: usize,
}

impl Windows {
    pub fn new(short: usize, long: usize) -> Result<Self> {
        for window in [short, long] {
            if window == 0 {
                return Err(MetricsError::InvalidWindow { window });
            }
        }
        Ok(Self { short, long })
    }

    pub fn short(&self) -> usize {
        self.short
    }

    pub fn long(&self) -> usize {
        self.long
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecord {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(rename = "return")]
    pub ret: Option<f64>,
    pub cumulative_return: f64,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
}

/// Derived fields aligned index-for-index with the source `PriceSeries`.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    windows: Windows,
    records: Vec<DerivedRecord>,
}

impl DerivedSeries {
    pub fn windows(&self) -> Windows {
        self.windows
    }

    pub fn records(&self) -> &[DerivedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn returns(&self) -> Vec<Option<f64>> {
        self.records.iter().map(|record| record.ret).collect()
    }

    pub fn last(&self) -> Option<&DerivedRecord> {
        self.records.last()
    }
}

/// Day-over-day fractional change of the close; `None` for the first record.
pub fn compute_returns(series: &PriceSeries) -> Vec<Option<f64>> {
    returns_from_closes(&series.closes())
}

/// A zero or non-finite prior close leaves that position undefined.
pub fn returns_from_closes(closes: &[f64]) -> Vec<Option<f64>> {
    if closes.is_empty() {
        return Vec::new();
    }

    let mut returns = Vec::with_capacity(closes.len());
    returns.push(None);
    returns.extend(closes.windows(2).map(|pair| {
        let (prev, current) = (pair[0], pair[1]);
        if prev == 0.0 || !prev.is_finite() || !current.is_finite() {
            None
        } else {
            Some(current / prev - 1.0)
        }
    }));
    returns
}

/// Compounded growth of one unit minus one. The first position is 0; undefined
/// returns carry the previous value forward.
pub fn compute_cumulative_return(returns: &[Option<f64>]) -> Vec<f64> {
    let mut growth = 1.0;
    returns
        .iter()
        .enumerate()
        .map(|(i, ret)| {
            if i == 0 {
                return 0.0;
            }
            if let Some(r) = ret {
                growth *= 1.0 + r;
            }
            growth - 1.0
        })
        .collect()
}

/// Trailing mean over `window` values; `None` until `window` values are available.
pub fn compute_moving_average(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(MetricsError::InvalidWindow { window });
    }
    Ok(trailing_mean(values, window))
}

// `window` is at least 1.
fn trailing_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    for i in (window - 1)..values.len() {
        let start = i + 1 - window;
        let sum: f64 = values[start..=i].iter().sum();
        result[i] = Some(sum / window as f64);
    }
    result
}

/// One rendering pass of the metrics: pure over its inputs, so repeated runs on the
/// same series give identical output.
#[derive(Debug, Clone, Copy)]
pub struct MetricsEngine {
    windows: Windows,
}

impl MetricsEngine {
    pub fn new(windows: Windows) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> Windows {
        self.windows
    }

    pub fn derive(&self, series: &PriceSeries) -> DerivedSeries {
        let closes = series.closes();
        let returns = returns_from_closes(&closes);
        let cumulative = compute_cumulative_return(&returns);
        // Windows are validated on construction
        let ma_short = trailing_mean(&closes, self.windows.short);
        let ma_long = trailing_mean(&closes, self.windows.long);

        let records = series
            .iter()
            .enumerate()
            .map(|(i, record)| DerivedRecord {
                date: record.date,
                close: record.close,
                ret: returns[i],
                cumulative_return: cumulative[i],
                ma_short: ma_short[i],
                ma_long: ma_long[i],
            })
            .collect();

        DerivedSeries {
            windows: self.windows,
            records,
        }
    }

    pub fn run(&self, series: &PriceSeries) -> Result<(DerivedSeries, SummaryStats)> {
        let derived = self.derive(series);
        debug!(
            "Derived {} rows with windows {}/{}",
            derived.len(),
            self.windows.short,
            self.windows.long
        );
        let summary = compute_summary(&derived)?;
        Ok((derived, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OhlcColumns, PriceRecord};
    use approx::assert_relative_eq;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let records = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                PriceRecord::close_only(start + chrono::Duration::days(i as i64), close)
            })
            .collect();
        PriceSeries::new(records, OhlcColumns::close_only())
    }

    #[test]
    fn test_returns_three_days() {
        let returns = compute_returns(&series(&[100.0, 110.0, 121.0]));

        assert_eq!(returns.len(), 3);
        assert!(returns[0].is_none());
        assert_relative_eq!(returns[1].unwrap(), 0.10, epsilon = 1e-9);
        assert_relative_eq!(returns[2].unwrap(), 0.10, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_prior_close_is_undefined() {
        let returns = returns_from_closes(&[10.0, 0.0, 5.0, 6.0]);

        assert_relative_eq!(returns[1].unwrap(), -1.0, epsilon = 1e-12);
        assert!(returns[2].is_none());
        assert_relative_eq!(returns[3].unwrap(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_cumulative_carries_over_gaps() {
        let cumulative = compute_cumulative_return(&[None, Some(0.1), None, Some(0.1)]);

        assert_eq!(cumulative[0], 0.0);
        assert_relative_eq!(cumulative[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(cumulative[2], 0.1, epsilon = 1e-12);
        assert_relative_eq!(cumulative[3], 0.21, epsilon = 1e-12);
    }

    #[test]
    fn test_moving_average_window_two() {
        let ma = compute_moving_average(&[100.0, 110.0, 121.0], 2).unwrap();
        assert_eq!(ma, vec![None, Some(105.0), Some(115.5)]);
    }

    #[test]
    fn test_window_longer_than_series() {
        let ma = compute_moving_average(&[1.0, 2.0], 5).unwrap();
        assert_eq!(ma, vec![None, None]);
    }

    #[test]
    fn test_windows_rejects_zero() {
        assert_eq!(
            Windows::new(0, 50),
            Err(MetricsError::InvalidWindow { window: 0 })
        );
        assert!(Windows::new(20, 0).is_err());
        assert!(Windows::new(1, 1).is_ok());
    }

    #[test]
    fn test_engine_aligns_rows() {
        let engine = MetricsEngine::new(Windows::new(1, 2).unwrap());
        let derived = engine.derive(&series(&[100.0, 110.0, 121.0]));

        assert_eq!(derived.len(), 3);
        let last = derived.last().unwrap();
        assert_eq!(last.ma_short, Some(121.0));
        assert_eq!(last.ma_long, Some(115.5));
        assert_relative_eq!(last.cumulative_return, 0.21, epsilon = 1e-9);
    }
}
