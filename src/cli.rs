//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::aggregate::Measure;
use crate::data::Dimension;

pub const DEFAULT_DATASET: &str = "data/smartmarket_dashboard_data.csv";
pub const DEFAULT_CHART_DIR: &str = "charts";
pub const DEFAULT_PERIOD: &str = "Septembre 2025";

/// Marketing performance dashboard over a campaign CSV dataset
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the campaign CSV file
    #[arg(short, long, env = "SMARTMARKET_DATA", default_value = DEFAULT_DATASET, global = true)]
    pub input: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Page to display (defaults to the dashboard)
    #[command(subcommand)]
    pub page: Option<Page>,
}

impl Args {
    /// Selected page, the dashboard when none was given
    pub fn page(&self) -> Page {
        self.page
            .clone()
            .unwrap_or_else(|| Page::Dashboard(DashboardArgs::default()))
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Page {
    /// Headline KPIs, chart datasets and PNG charts
    Dashboard(DashboardArgs),
    /// KPI definitions and business interpretation
    Kpis,
    /// Aggregate any measure by a categorical column
    Group(GroupArgs),
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct DashboardArgs {
    /// Directory receiving the chart images
    #[arg(short, long, default_value = DEFAULT_CHART_DIR)]
    pub output_dir: PathBuf,

    /// Print the figures only, without rendering charts
    #[arg(long)]
    pub no_charts: bool,

    /// Reporting period shown under the title
    #[arg(long, default_value = DEFAULT_PERIOD)]
    pub period: String,
}

impl Default for DashboardArgs {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_CHART_DIR),
            no_charts: false,
            period: DEFAULT_PERIOD.to_string(),
        }
    }
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct GroupArgs {
    /// Categorical column to group by
    #[arg(long, value_enum)]
    pub by: Dimension,

    /// Measure to aggregate
    #[arg(long, value_enum)]
    pub value: Measure,

    /// Aggregation applied within each group
    #[arg(long, value_enum, default_value_t = Aggregation::Sum)]
    pub agg: Aggregation,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
        })
    }
}
