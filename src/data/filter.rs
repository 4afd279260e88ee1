use crate::types::{DateRange, PriceSeries};
use tracing::info;

/// Keeps records whose date falls inside `range`, both ends inclusive.
///
/// The result may be empty; callers show an empty state instead of summarising it.
pub fn filter_by_date_range(series: &PriceSeries, range: &DateRange) -> PriceSeries {
    let filtered = series.retain_dates(|date| range.contains(date));
    info!(
        "Date range {}..={} kept {} of {} records",
        range.start(),
        range.end(),
        filtered.len(),
        series.len()
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OhlcColumns, PriceRecord};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, day).unwrap()
    }

    fn series() -> PriceSeries {
        let records = (1..=5)
            .map(|day| PriceRecord::close_only(d(day), day as f64))
            .collect();
        PriceSeries::new(records, OhlcColumns::all())
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let range = DateRange::new(d(2), d(4)).unwrap();
        let filtered = filter_by_date_range(&series(), &range);

        assert_eq!(filtered.closes(), vec![2.0, 3.0, 4.0]);
        assert_eq!(filtered.columns(), OhlcColumns::all());
    }

    #[test]
    fn test_range_outside_data_is_empty() {
        let range = DateRange::new(d(20), d(25)).unwrap();
        let filtered = filter_by_date_range(&series(), &range);
        assert!(filtered.is_empty());
    }
}
