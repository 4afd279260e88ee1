use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ticker_metrics::config::{Config, ConfigOverrides};
use ticker_metrics::data::cache::DataSource;
use ticker_metrics::data::loader::{find_instrument, DataLoader};
use ticker_metrics::report;
use ticker_metrics::types::DateRange;

#[derive(Parser, Debug)]
#[command(author, version, about = "Price metrics for a single stock or ETF")]
struct Args {
    /// Ticker symbol to analyse
    ticker: Option<String>,

    /// YAML settings file
    #[arg(short, long, default_value = "config/dashboard.yaml")]
    config: PathBuf,

    /// Dataset root (overrides the config file)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Short moving average window (days)
    #[arg(long)]
    short: Option<usize>,

    /// Long moving average window (days)
    #[arg(long)]
    long: Option<usize>,

    /// First date to include (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,

    /// Number of histogram bins
    #[arg(long)]
    bins: Option<usize>,

    /// Rows shown in the data sample
    #[arg(long)]
    sample_rows: Option<usize>,

    /// Write the derived series to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// List the instruments in the metadata table and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    // Settings file first, then command-line overrides; reject bad values before any work
    let overrides = ConfigOverrides {
        dataset_root: args.dataset.clone(),
        short_window: args.short,
        long_window: args.long,
        histogram_bins: args.bins,
        sample_rows: args.sample_rows,
    };
    let config = Config::load_or_default(&args.config)
        .and_then(|config| config.apply(overrides))
        .with_context(|| format!("loading {}", args.config.display()))?;

    let range = match (args.start, args.end) {
        (Some(start), Some(end)) => Some(DateRange::new(start, end)?),
        _ => None,
    };

    let instruments = DataLoader::load_metadata(config.metadata_path())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.list {
        for instrument in &instruments {
            writeln!(out, "{}", instrument.display_label())?;
        }
        return Ok(());
    }

    let Some(ticker) = args.ticker.as_deref() else {
        bail!("no ticker given (use --list to see available instruments)");
    };
    let instrument = find_instrument(&instruments, ticker)?;

    // Load (or reuse) the price history and render one pass over it
    let mut source = DataSource::new(&config.dataset.root);
    let series = source.load(instrument)?;
    let derived = report::render_pass(instrument, series, range.as_ref(), &config, &mut out)?;

    if let (Some(path), Some(derived)) = (&args.export, &derived) {
        report::export_derived_csv(derived, path)?;
    }

    Ok(())
}
