//! Dashboard page: headline indicators and the chart-ready datasets

use std::collections::BTreeMap;

use crate::aggregate::{group_compose, group_mean, group_sum, share_of, Measure};
use crate::data::Dimension;
use crate::kpi::{summarize, KpiTable, Metric};

pub const TITLE: &str = "SmartMarket - Marketing Performance Dashboard";

/// Shown wherever a KPI cannot be computed
pub const UNDEFINED: &str = "n/a";

/// The four headline indicators (mean over rows where each is defined)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Headline {
    pub ctr: Option<f64>,
    pub conversion_rate: Option<f64>,
    pub cpc: Option<f64>,
    pub cpa: Option<f64>,
}

impl Headline {
    pub fn from_table(table: &KpiTable) -> Self {
        Self {
            ctr: summarize(table, Metric::Ctr),
            conversion_rate: summarize(table, Metric::ConversionRate),
            cpc: summarize(table, Metric::Cpc),
            cpa: summarize(table, Metric::Cpa),
        }
    }

    /// Label and display value of each indicator, in dashboard order
    pub fn indicators(&self) -> [(&'static str, String); 4] {
        [
            ("CTR moyen", format_percent(self.ctr)),
            ("Taux de conversion", format_percent(self.conversion_rate)),
            ("CPC moyen (€)", format_amount(self.cpc)),
            ("CPA moyen (€)", format_amount(self.cpa)),
        ]
    }
}

/// One point of the cost / conversions scatter plot
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub channel: Option<String>,
    pub cost: f64,
    pub conversions: u64,
    /// Drives the marker size
    pub clicks: u64,
}

/// Everything the dashboard page displays, computed from one KPI table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardData {
    pub headline: Headline,
    pub conversions_by_channel: BTreeMap<String, f64>,
    pub ctr_by_channel: BTreeMap<String, Option<f64>>,
    pub cost_vs_conversions: Vec<ScatterPoint>,
    /// (region, status) -> row count
    pub status_by_region: BTreeMap<(String, String), u64>,
    pub conversions_by_sector: BTreeMap<String, f64>,
}

impl DashboardData {
    pub fn build(table: &KpiTable) -> Self {
        Self {
            headline: Headline::from_table(table),
            conversions_by_channel: group_sum(table, Dimension::Channel, Measure::Conversions),
            ctr_by_channel: group_mean(table, Dimension::Channel, Measure::Ctr),
            cost_vs_conversions: table
                .rows()
                .iter()
                .map(|row| ScatterPoint {
                    channel: row.record.channel.clone(),
                    cost: row.record.cost,
                    conversions: row.record.conversions,
                    clicks: row.record.clicks,
                })
                .collect(),
            status_by_region: group_compose(table, Dimension::Region, Dimension::Status),
            conversions_by_sector: share_of(table, Dimension::Sector, Measure::Conversions),
        }
    }
}

/// Ratio as a percentage with two decimals, e.g. `0.1234` -> `12.34%`
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => UNDEFINED.to_string(),
    }
}

/// Monetary amount with two decimals
pub fn format_amount(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => UNDEFINED.to_string(),
    }
}

/// Display a value of any aggregatable measure: ratios as percentages,
/// money with two decimals, counts as integers
pub fn format_measure(measure: Measure, value: Option<f64>) -> String {
    match measure {
        Measure::Ctr | Measure::ConversionRate => format_percent(value),
        Measure::Cost | Measure::Cpc | Measure::Cpa => format_amount(value),
        Measure::Impressions | Measure::Clicks | Measure::Conversions => match value {
            Some(v) => format!("{:.0}", v),
            None => UNDEFINED.to_string(),
        },
    }
}

/// Normalize absolute totals into fractions of their sum.
/// Empty when the total is zero, since no share is meaningful then.
pub fn shares(totals: &BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let total: f64 = totals.values().sum();
    if total <= 0.0 {
        return Vec::new();
    }
    totals
        .iter()
        .map(|(key, value)| (key.clone(), value / total))
        .collect()
}

/// Plain-text rendering of the dashboard page
pub fn render_summary(data: &DashboardData, period: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", TITLE));
    out.push_str(&format!("Analyse des performances marketing - {}\n\n", period));

    out.push_str("Indicateurs clés\n");
    for (label, value) in data.headline.indicators() {
        out.push_str(&format!("  {:<20} {:>10}\n", label, value));
    }

    out.push_str("\nConversions par canal\n");
    for (channel, total) in &data.conversions_by_channel {
        out.push_str(&format!("  {:<20} {:>10.0}\n", channel, total));
    }

    out.push_str("\nCTR moyen par canal\n");
    for (channel, ctr) in &data.ctr_by_channel {
        out.push_str(&format!("  {:<20} {:>10}\n", channel, format_percent(*ctr)));
    }

    out.push_str("\nRelation coût / conversions par canal\n");
    out.push_str(&format!("  {} points\n", data.cost_vs_conversions.len()));

    out.push_str("\nRépartition des statuts CRM par région\n");
    for ((region, status), count) in &data.status_by_region {
        out.push_str(&format!("  {:<12} {:<12} {:>6}\n", region, status, count));
    }

    out.push_str("\nPart des conversions par secteur\n");
    for (sector, share) in shares(&data.conversions_by_sector) {
        out.push_str(&format!("  {:<20} {:>10}\n", sector, format_percent(Some(share))));
    }

    out
}
