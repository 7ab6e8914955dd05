//! Integration tests for SmartMarket

use std::io::Write;

use smartmarket::dashboard::render_summary;
use smartmarket::{
    derive_metrics, group_compose, group_mean, group_sum, load, share_of, summarize,
    DashboardData, DataSourceError, DatasetCache, Dimension, Measure, Metric,
};
use tempfile::NamedTempFile;

const HEADER: &str = "channel,region,sector,status,impressions,clicks,conversions,cost";

/// Create a test CSV file with sample campaign rows
fn create_test_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}

fn sample_csv() -> NamedTempFile {
    create_test_csv(&[
        "social,EU,retail,won,100,10,2,5.0",
        "search,EU,finance,won,400,40,3,60.0",
        "search,US,finance,lost,200,20,7,20.0",
        "email,US,retail,lead,0,0,0,0",
    ])
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_end_to_end_pipeline() {
    let file = sample_csv();

    let table = load(file.path()).unwrap();
    assert_eq!(table.len(), 4);

    let kpis = derive_metrics(&table);
    let social = &kpis.rows()[0].metrics;
    assert!(close(social.ctr.unwrap(), 0.10));
    assert!(close(social.conversion_rate.unwrap(), 0.20));
    assert!(close(social.cpc.unwrap(), 0.50));
    assert!(close(social.cpa.unwrap(), 2.50));

    // The all-zero email row is undefined everywhere and ignored by the means
    let email = &kpis.rows()[3].metrics;
    for metric in Metric::ALL {
        assert_eq!(email.get(metric), None);
    }
    assert!(close(summarize(&kpis, Metric::Ctr).unwrap(), 0.10));
    assert!(close(summarize(&kpis, Metric::Cpc).unwrap(), (0.5 + 1.5 + 1.0) / 3.0));

    let conversions = group_sum(&kpis, Dimension::Channel, Measure::Conversions);
    assert_eq!(conversions["search"], 10.0);
    assert_eq!(conversions.values().sum::<f64>(), 12.0);

    let ctr = group_mean(&kpis, Dimension::Channel, Measure::Ctr);
    assert!(close(ctr["search"].unwrap(), 0.10));
    assert_eq!(ctr["email"], None);

    let statuses = group_compose(&kpis, Dimension::Region, Dimension::Status);
    assert_eq!(statuses[&("EU".to_string(), "won".to_string())], 2);
    assert_eq!(statuses[&("US".to_string(), "lost".to_string())], 1);
    assert_eq!(statuses[&("US".to_string(), "lead".to_string())], 1);
    assert_eq!(statuses.len(), 3);

    let sectors = share_of(&kpis, Dimension::Sector, Measure::Conversions);
    assert_eq!(sectors["finance"], 10.0);
    assert_eq!(sectors["retail"], 2.0);
}

#[test]
fn test_dashboard_summary_from_file() {
    let file = sample_csv();
    let kpis = derive_metrics(&load(file.path()).unwrap());
    let data = DashboardData::build(&kpis);

    assert_eq!(data.cost_vs_conversions.len(), 4);

    let text = render_summary(&data, "Septembre 2025");
    assert!(text.contains("CTR moyen"));
    assert!(text.contains("10.00%"));
    assert!(text.contains("Part des conversions par secteur"));
}

#[test]
fn test_derive_twice_is_stable() {
    let file = sample_csv();
    let once = derive_metrics(&load(file.path()).unwrap());
    let twice = derive_metrics(&once);
    assert_eq!(once, twice);
}

#[test]
fn test_missing_columns_is_fatal() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "channel,region,impressions,clicks,conversions,cost").unwrap();
    writeln!(file, "social,EU,100,10,2,5.0").unwrap();

    let err = load(file.path()).unwrap_err();
    match err {
        DataSourceError::MissingColumns { ref columns, .. } => {
            assert_eq!(columns, &vec!["sector".to_string(), "status".to_string()]);
        }
        ref other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().contains("sector, status"));
}

#[test]
fn test_malformed_row_does_not_abort() {
    let file = create_test_csv(&[
        "social,EU,retail,won,100,10,2,5.0",
        "social,EU,retail,won,oops,10,2,5.0",
        "search,US,retail,lost,200,20,4,10.0",
    ]);
    let table = load(file.path()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.skipped_rows(), 1);

    let kpis = derive_metrics(&table);
    assert!(close(summarize(&kpis, Metric::Ctr).unwrap(), 0.10));
}

/// Rows past the first hundred must not be judged by the types seen earlier
fn long_csv(tail: &str) -> NamedTempFile {
    let good = "social,EU,retail,won,100,10,2,5";
    let mut rows = vec![good; 150];
    rows.push(tail);
    create_test_csv(&rows)
}

#[test]
fn test_late_decimal_cost_loads() {
    let file = long_csv("search,US,finance,lost,200,20,4,5.25");
    let table = load(file.path()).unwrap();

    assert_eq!(table.len(), 151);
    assert_eq!(table.skipped_rows(), 0);
    assert!(close(table.rows()[150].cost, 5.25));
}

#[test]
fn test_late_malformed_row_is_skipped() {
    let file = long_csv("search,US,finance,lost,oops,20,4,5.0");
    let table = load(file.path()).unwrap();

    assert_eq!(table.len(), 150);
    assert_eq!(table.skipped_rows(), 1);
}

#[test]
fn test_late_fractional_count_is_skipped() {
    let file = long_csv("search,US,finance,lost,100.9,20,4,5.0");
    let table = load(file.path()).unwrap();

    assert_eq!(table.len(), 150);
    assert_eq!(table.skipped_rows(), 1);
}

#[test]
fn test_cached_dataset_reused() {
    let file = sample_csv();
    let mut cache = DatasetCache::new(file.path());

    let first = cache.get().unwrap().clone();
    let second = cache.get().unwrap();
    assert_eq!(&first, second);
}

#[test]
fn test_shipped_sample_dataset_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/smartmarket_dashboard_data.csv");
    let table = load(path).unwrap();
    assert!(!table.is_empty());
    assert_eq!(table.skipped_rows(), 0);

    let data = DashboardData::build(&derive_metrics(&table));
    assert!(data.headline.ctr.is_some());
    assert!(!data.conversions_by_channel.is_empty());
}
