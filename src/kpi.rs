//! Per-row KPI derivation and headline summaries

use std::fmt;

use tracing::{debug, warn};

use crate::data::{CampaignRecord, RecordSource};

/// The four ratios derived for every campaign row.
///
/// `None` marks an undefined ratio (zero denominator). Undefined values are
/// excluded from every mean and sum instead of being carried as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedMetrics {
    /// clicks / impressions
    pub ctr: Option<f64>,
    /// conversions / clicks
    pub conversion_rate: Option<f64>,
    /// cost / clicks
    pub cpc: Option<f64>,
    /// cost / conversions
    pub cpa: Option<f64>,
}

impl DerivedMetrics {
    /// Compute the ratios of a single record
    pub fn compute(record: &CampaignRecord) -> Self {
        let orphan = has_orphan_conversions(record);
        Self {
            ctr: ratio(record.clicks as f64, record.impressions),
            conversion_rate: ratio(record.conversions as f64, record.clicks),
            cpc: ratio(record.cost, record.clicks),
            // Conversions without clicks cannot be attributed to a cost
            cpa: if orphan {
                None
            } else {
                ratio(record.cost, record.conversions)
            },
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Ctr => self.ctr,
            Metric::ConversionRate => self.conversion_rate,
            Metric::Cpc => self.cpc,
            Metric::Cpa => self.cpa,
        }
    }
}

fn ratio(numerator: f64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator / denominator as f64)
}

/// Conversions recorded on a row that has no clicks to convert from
fn has_orphan_conversions(record: &CampaignRecord) -> bool {
    record.clicks == 0 && record.conversions > 0
}

/// Derived KPI selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Metric {
    Ctr,
    ConversionRate,
    Cpc,
    Cpa,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Ctr, Metric::ConversionRate, Metric::Cpc, Metric::Cpa];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ctr => "CTR",
            Self::ConversionRate => "ConversionRate",
            Self::Cpc => "CPC",
            Self::Cpa => "CPA",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A campaign record together with its derived ratios
#[derive(Debug, Clone, PartialEq)]
pub struct KpiRow {
    pub record: CampaignRecord,
    pub metrics: DerivedMetrics,
}

/// Campaign table augmented with the derived KPI columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiTable {
    rows: Vec<KpiRow>,
}

impl KpiTable {
    pub fn rows(&self) -> &[KpiRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one derived column in row order
    pub fn metric_values(&self, metric: Metric) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(move |row| row.metrics.get(metric))
    }
}

impl RecordSource for KpiTable {
    fn records(&self) -> impl Iterator<Item = &CampaignRecord> {
        self.rows.iter().map(|row| &row.record)
    }
}

/// Augment every record with its derived metrics.
///
/// Always recomputes from the raw counts, so deriving an already derived
/// table yields the same columns.
pub fn derive_metrics<S: RecordSource>(source: &S) -> KpiTable {
    let mut orphans = 0usize;
    let rows: Vec<KpiRow> = source
        .records()
        .enumerate()
        .map(|(idx, record)| {
            if has_orphan_conversions(record) {
                orphans += 1;
                warn!(
                    row = idx,
                    conversions = record.conversions,
                    "conversions recorded without clicks, conversion ratios left undefined"
                );
            }
            KpiRow {
                metrics: DerivedMetrics::compute(record),
                record: record.clone(),
            }
        })
        .collect();

    debug!(rows = rows.len(), orphans, "derived KPI columns");
    KpiTable { rows }
}

/// Mean of one derived metric over all rows where it is defined
pub fn summarize(table: &KpiTable, metric: Metric) -> Option<f64> {
    mean(table.metric_values(metric).flatten())
}

/// Sum of finite values, independent of input order.
///
/// Values are summed in sorted order so permuting the rows cannot change
/// the floating-point result.
pub(crate) fn stable_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.into_iter().collect();
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

/// Arithmetic mean, `None` when there is nothing to average
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = values.into_iter().collect();
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    Some(stable_sum(values) / n as f64)
}
