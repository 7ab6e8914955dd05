//! SmartMarket: campaign KPI dashboard
//!
//! Entry point that wires dataset loading, KPI derivation, the printed
//! dashboard and chart rendering together.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use smartmarket::cli::{Aggregation, DashboardArgs, GroupArgs, Page};
use smartmarket::dashboard::{format_measure, render_summary};
use smartmarket::{
    derive_metrics, group_mean, group_sum, reference, viz, Args, DashboardData, DataSourceError,
    DatasetCache,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut cache = DatasetCache::new(&args.input);

    match args.page() {
        Page::Dashboard(opts) => run_dashboard(&mut cache, &opts)?,
        Page::Kpis => print!("{}", reference::render_page()),
        Page::Group(opts) => run_group(&mut cache, &opts)?,
    }

    Ok(())
}

/// Logs go to stderr so the printed pages stay clean on stdout
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "smartmarket=debug" } else { "smartmarket=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Log the failing dataset and wrap the error for the page that needed it
fn unavailable(err: DataSourceError, action: &str) -> anyhow::Error {
    let path = err.path().display().to_string();
    error!(path = %path, "dataset unavailable");
    anyhow::Error::new(err).context(format!("cannot {} from {}", action, path))
}

/// Dashboard page: headline KPIs, chart datasets, PNG charts
fn run_dashboard(cache: &mut DatasetCache, opts: &DashboardArgs) -> Result<()> {
    let start_time = Instant::now();

    let table = cache
        .get()
        .map_err(|err| unavailable(err, "build the dashboard"))?;

    let kpis = derive_metrics(table);
    let data = DashboardData::build(&kpis);
    debug!(
        rows = kpis.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "dashboard data computed"
    );

    print!("{}", render_summary(&data, &opts.period));

    if opts.no_charts {
        return Ok(());
    }

    let viz_start = Instant::now();
    let written = viz::generate_dashboard_charts(&data, &opts.output_dir)?;
    info!(
        charts = written.len(),
        dir = %opts.output_dir.display(),
        elapsed_ms = viz_start.elapsed().as_millis() as u64,
        "charts rendered"
    );
    println!("\nCharts saved to: {}", opts.output_dir.display());

    Ok(())
}

/// Ad hoc grouped aggregation of one measure
fn run_group(cache: &mut DatasetCache, opts: &GroupArgs) -> Result<()> {
    let table = cache
        .get()
        .map_err(|err| unavailable(err, "aggregate"))?;
    let kpis = derive_metrics(table);

    println!("=== {} of {} by {} ===", opts.agg, opts.value, opts.by);

    let rows: Vec<(String, Option<f64>)> = match opts.agg {
        Aggregation::Sum => group_sum(&kpis, opts.by, opts.value)
            .into_iter()
            .map(|(group, total)| (group, Some(total)))
            .collect(),
        Aggregation::Mean => group_mean(&kpis, opts.by, opts.value).into_iter().collect(),
    };

    if rows.is_empty() {
        println!("(no rows)");
    }
    for (group, value) in rows {
        println!("  {:<20} {:>12}", group, format_measure(opts.value, value));
    }

    Ok(())
}
