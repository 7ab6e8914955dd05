//! SmartMarket: marketing performance dashboard for advertising campaign data
//!
//! Loads a campaign CSV, derives the standard marketing KPIs (CTR, conversion
//! rate, CPC, CPA) and produces the headline summaries and grouped datasets
//! behind the dashboard charts.

pub mod aggregate;
pub mod cli;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod kpi;
pub mod reference;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{group_compose, group_mean, group_sum, share_of, Measure};
pub use cli::Args;
pub use dashboard::DashboardData;
pub use data::{load, CampaignRecord, DatasetCache, Dimension, RecordSource, Table};
pub use error::DataSourceError;
pub use kpi::{derive_metrics, summarize, DerivedMetrics, KpiTable, Metric};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
