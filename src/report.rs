//! Terminal report and CSV export for one instrument's metrics.

use crate::analysis::histogram::ReturnHistogram;
use crate::analysis::{DerivedSeries, MetricsEngine, MetricsError, SummaryStats};
use crate::config::Config;
use crate::data::filter::filter_by_date_range;
use crate::types::{DateRange, Instrument, PriceSeries};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const OHLC_UNAVAILABLE: &str = "OHLC data is not available for this ticker.";
const HISTOGRAM_BAR_WIDTH: usize = 40;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

pub type Result<T> = std::result::Result<T, ReportError>;

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "n/a".to_string(),
    }
}

pub fn render_title(instrument: &Instrument, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "{} ({})", instrument.display_label(), instrument.kind)?;
    writeln!(out, "{}", "=".repeat(60))?;
    Ok(())
}

pub fn render_summary(stats: &SummaryStats, out: &mut impl Write) -> Result<()> {
    writeln!(out, "\nSummary Statistics")?;
    writeln!(out, "{:-<50}", "")?;
    writeln!(out, "{:<36} {:.4}", "Latest Close Price", stats.latest_close)?;
    writeln!(
        out,
        "{:<36} {}",
        "Mean Daily Return",
        fmt_opt(stats.mean_return, 6)
    )?;
    writeln!(
        out,
        "{:<36} {}",
        "Daily Return Std Dev (Volatility)",
        fmt_opt(stats.return_std, 6)
    )?;
    writeln!(
        out,
        "{:<36} {:.4}",
        "Cumulative Return", stats.cumulative_return
    )?;
    Ok(())
}

/// First `rows` derived records, the data-sample preview.
pub fn render_sample(derived: &DerivedSeries, rows: usize, out: &mut impl Write) -> Result<()> {
    let windows = derived.windows();
    writeln!(out, "\nData Sample")?;
    writeln!(
        out,
        "{:<12} {:>12} {:>10} {:>10} {:>12} {:>12}",
        "Date",
        "Close",
        "Return",
        "CumReturn",
        format!("MA({})", windows.short()),
        format!("MA({})", windows.long())
    )?;
    writeln!(out, "{:-<73}", "")?;
    for record in derived.records().iter().take(rows) {
        writeln!(
            out,
            "{:<12} {:>12.4} {:>10} {:>10.4} {:>12} {:>12}",
            record.date.to_string(),
            record.close,
            fmt_opt(record.ret, 4),
            record.cumulative_return,
            fmt_opt(record.ma_short, 4),
            fmt_opt(record.ma_long, 4)
        )?;
    }
    Ok(())
}

/// Candlestick view: the OHLC range when the source had Open/High/Low, a notice otherwise.
pub fn render_candlestick_notice(series: &PriceSeries, out: &mut impl Write) -> Result<()> {
    writeln!(out, "\nCandlestick")?;
    if !series.columns().has_ohlc() {
        writeln!(out, "{}", OHLC_UNAVAILABLE)?;
        return Ok(());
    }

    let low = series
        .iter()
        .filter_map(|record| record.low)
        .fold(f64::INFINITY, f64::min);
    let high = series
        .iter()
        .filter_map(|record| record.high)
        .fold(f64::NEG_INFINITY, f64::max);

    match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) if low.is_finite() && high.is_finite() => writeln!(
            out,
            "{} sessions {}..{}: low {:.4}, high {:.4}",
            series.len(),
            first,
            last,
            low,
            high
        )?,
        _ => writeln!(out, "{}", OHLC_UNAVAILABLE)?,
    }
    Ok(())
}

pub fn render_histogram(hist: &ReturnHistogram, out: &mut impl Write) -> Result<()> {
    writeln!(out, "\nDaily Returns Histogram")?;
    if hist.is_empty() {
        writeln!(out, "No daily returns to plot.")?;
        return Ok(());
    }

    let max_count = hist.max_count().max(1);
    for bin in hist.bins() {
        let bar = bin.count * HISTOGRAM_BAR_WIDTH / max_count;
        writeln!(
            out,
            "[{:>9.4}, {:>9.4}] {:<width$} {}",
            bin.lower,
            bin.upper,
            "#".repeat(bar),
            bin.count,
            width = HISTOGRAM_BAR_WIDTH
        )?;
    }
    Ok(())
}

pub fn render_empty_state(range: &DateRange, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "\nNo records between {} and {}; summary statistics are unavailable.",
        range.start(),
        range.end()
    )?;
    Ok(())
}

/// One report for `instrument`: narrows `series` to `range`, then prints either the empty
/// state or the full report. Returns the derived series when metrics were computed.
pub fn render_pass(
    instrument: &Instrument,
    series: &PriceSeries,
    range: Option<&DateRange>,
    config: &Config,
    out: &mut impl Write,
) -> Result<Option<DerivedSeries>> {
    render_title(instrument, out)?;

    // Apply the date selection before any metrics
    let filtered = range.map(|range| filter_by_date_range(series, range));
    let series = filtered.as_ref().unwrap_or(series);

    // Nothing to summarise: say so instead of running the engine
    if series.is_empty() {
        match range {
            Some(range) => render_empty_state(range, out)?,
            None => writeln!(out, "\nNo price records for {}.", instrument.symbol)?,
        }
        return Ok(None);
    }

    let engine = MetricsEngine::new(config.windows()?);
    let (derived, summary) = engine.run(series)?;
    let histogram =
        ReturnHistogram::from_returns(&derived.returns(), config.analysis.histogram_bins)?;

    render_summary(&summary, out)?;
    render_candlestick_notice(series, out)?;
    render_histogram(&histogram, out)?;
    render_sample(&derived, config.analysis.sample_rows, out)?;

    Ok(Some(derived))
}

/// Writes `date,close,return,cumulative_return,ma_short,ma_long`; undefined values are
/// left as empty fields.
pub fn write_derived_csv<W: Write>(derived: &DerivedSeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in derived.records() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_derived_csv<P: AsRef<Path>>(derived: &DerivedSeries, path: P) -> Result<()> {
    let file = std::fs::File::create(&path)?;
    write_derived_csv(derived, file)?;
    info!(
        "Exported {} derived rows to {}",
        derived.len(),
        path.as_ref().display()
    );
    Ok(())
}
