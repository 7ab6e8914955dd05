//! Grouped aggregations over the derived KPI table
//!
//! Every grouping returns a `BTreeMap`, so keys come out in sorted order.
//! Rows without a value for the grouping key are left out, and undefined
//! ratios never contribute to a sum or a mean.

use std::collections::BTreeMap;
use std::fmt;

use crate::data::Dimension;
use crate::kpi::{mean, stable_sum, KpiRow, KpiTable, Metric};

/// Numeric column that can be aggregated: raw counts or derived ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Measure {
    Impressions,
    Clicks,
    Conversions,
    Cost,
    Ctr,
    ConversionRate,
    Cpc,
    Cpa,
}

impl Measure {
    /// Value of this measure on a row, `None` for an undefined ratio
    pub fn value(self, row: &KpiRow) -> Option<f64> {
        let record = &row.record;
        match self {
            Self::Impressions => Some(record.impressions as f64),
            Self::Clicks => Some(record.clicks as f64),
            Self::Conversions => Some(record.conversions as f64),
            Self::Cost => Some(record.cost),
            Self::Ctr => row.metrics.ctr,
            Self::ConversionRate => row.metrics.conversion_rate,
            Self::Cpc => row.metrics.cpc,
            Self::Cpa => row.metrics.cpa,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Impressions => "impressions",
            Self::Clicks => "clicks",
            Self::Conversions => "conversions",
            Self::Cost => "cost",
            Self::Ctr => Metric::Ctr.name(),
            Self::ConversionRate => Metric::ConversionRate.name(),
            Self::Cpc => Metric::Cpc.name(),
            Self::Cpa => Metric::Cpa.name(),
        }
    }
}

impl From<Metric> for Measure {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Ctr => Self::Ctr,
            Metric::ConversionRate => Self::ConversionRate,
            Metric::Cpc => Self::Cpc,
            Metric::Cpa => Self::Cpa,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Defined values of `value` bucketed by the `key` column
fn bucket(table: &KpiTable, key: Dimension, value: Measure) -> BTreeMap<String, Vec<f64>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in table.rows() {
        let Some(group) = row.record.dimension(key) else {
            continue;
        };
        let values = groups.entry(group.to_string()).or_default();
        if let Some(v) = value.value(row) {
            values.push(v);
        }
    }
    groups
}

/// Sum of `value` per distinct `key`.
/// A group whose values are all undefined sums to zero.
pub fn group_sum(table: &KpiTable, key: Dimension, value: Measure) -> BTreeMap<String, f64> {
    bucket(table, key, value)
        .into_iter()
        .map(|(group, values)| (group, stable_sum(values)))
        .collect()
}

/// Mean of `value` per distinct `key`, over defined values only.
/// A group whose values are all undefined maps to `None`.
pub fn group_mean(
    table: &KpiTable,
    key: Dimension,
    value: Measure,
) -> BTreeMap<String, Option<f64>> {
    bucket(table, key, value)
        .into_iter()
        .map(|(group, values)| (group, mean(values)))
        .collect()
}

/// Row counts for every observed `(key, color)` combination.
/// Combinations that never occur are absent.
pub fn group_compose(
    table: &KpiTable,
    key: Dimension,
    color: Dimension,
) -> BTreeMap<(String, String), u64> {
    let mut counts = BTreeMap::new();
    for row in table.rows() {
        if let (Some(k), Some(c)) = (row.record.dimension(key), row.record.dimension(color)) {
            *counts.entry((k.to_string(), c.to_string())).or_insert(0) += 1;
        }
    }
    counts
}

/// Absolute totals of `value` per `category`, meant for share-of-total display.
/// Normalizing to percentages is left to the caller.
pub fn share_of(
    table: &KpiTable,
    category: Dimension,
    value: Measure,
) -> BTreeMap<String, f64> {
    group_sum(table, category, value)
}
