pub mod cache;
pub mod filter;
pub mod loader;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Records out of order: {current} follows {previous}")]
    OutOfOrder {
        previous: NaiveDate,
        current: NaiveDate,
    },
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

pub type Result<T> = std::result::Result<T, DataError>;
