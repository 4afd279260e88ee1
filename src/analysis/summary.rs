use super::metrics::{DerivedSeries, MetricsError, Result};
use ndarray::Array1;
use serde::Serialize;

/// Scalar snapshot of a derived series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub latest_close: f64,
    /// Mean of the defined daily returns; `None` when there are none.
    pub mean_return: Option<f64>,
    /// Sample standard deviation (n - 1) of the defined daily returns; `None` below two.
    pub return_std: Option<f64>,
    pub cumulative_return: f64,
    /// Number of defined daily returns behind the mean and deviation.
    pub observations: usize,
}

pub fn compute_summary(derived: &DerivedSeries) -> Result<SummaryStats> {
    let last = derived.last().ok_or(MetricsError::EmptySeries)?;

    let returns: Array1<f64> = derived
        .records()
        .iter()
        .filter_map(|record| record.ret)
        .collect();

    let return_std = if returns.len() >= 2 {
        Some(returns.std(1.0))
    } else {
        None
    };

    Ok(SummaryStats {
        latest_close: last.close,
        mean_return: returns.mean(),
        return_std,
        cumulative_return: last.cumulative_return,
        observations: returns.len(),
    })
}
