pub mod histogram;
pub mod metrics;
pub mod summary;

pub use metrics::{
    compute_cumulative_return, compute_moving_average, compute_returns, DerivedRecord,
    DerivedSeries, MetricsEngine, MetricsError, Windows,
};
pub use summary::{compute_summary, SummaryStats};
