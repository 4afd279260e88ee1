use super::metrics::{MetricsError, Result};
use ndarray::Array1;
use ndarray_stats::QuantileExt;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width distribution of the defined daily returns.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReturnHistogram {
    bins: Vec<HistogramBin>,
}

impl ReturnHistogram {
    /// Undefined returns are left out. If every return is the same value, all of them
    /// land in a single zero-width bin.
    pub fn from_returns(returns: &[Option<f64>], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(MetricsError::InvalidBins);
        }

        let values: Array1<f64> = returns
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .collect();

        let (Ok(&min), Ok(&max)) = (values.min(), values.max()) else {
            return Ok(Self::default());
        };

        if min == max {
            return Ok(Self {
                bins: vec![HistogramBin {
                    lower: min,
                    upper: max,
                    count: values.len(),
                }],
            });
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for &v in values.iter() {
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(Self {
            bins: counts
                .into_iter()
                .enumerate()
                .map(|(i, count)| HistogramBin {
                    lower: min + width * i as f64,
                    upper: if i + 1 == bins {
                        max
                    } else {
                        min + width * (i + 1) as f64
                    },
                    count,
                })
                .collect(),
        })
    }

    pub fn bins(&self) -> &[HistogramBin] {
        &self.bins
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|bin| bin.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|bin| bin.count).max().unwrap_or(0)
    }
}
