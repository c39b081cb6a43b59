//! Unit tests for metrics.rs module

use std::time::Duration;

use disaster_etl::error::EtlError;
use disaster_etl::metrics::MetricsCollector;
use disaster_etl::normalizer::NormalizeReport;

#[test]
fn test_metric_names_are_prefixed() {
    let collector = MetricsCollector::default();
    let names = [
        collector.rows_loaded_total,
        collector.rows_joined_total,
        collector.rows_written_total,
        collector.duplicates_removed_total,
        collector.out_of_range_values_total,
        collector.rows_dropped_total,
        collector.category_columns,
        collector.stage_duration,
        collector.errors_total,
    ];
    assert!(names.iter().all(|n| n.starts_with("disaster_etl_")));
}

#[test]
fn test_record_without_recorder_does_not_panic() {
    let collector = MetricsCollector::default();
    collector.record_rows_loaded("messages", 10);
    collector.record_rows_written("disaster_messages_tbl", 9);
    collector.record_stage("save", Duration::from_millis(12));
    collector.record_normalize(&NormalizeReport {
        categories: vec!["related".to_string()],
        rows_in: 10,
        duplicates_removed: 1,
        rows_out: 9,
        ..NormalizeReport::default()
    });
    collector.record_error("clean", &EtlError::Schema("bad layout".to_string()));
}

#[test]
fn test_error_kinds_are_stable() {
    assert_eq!(EtlError::Schema(String::new()).kind(), "schema");
    assert_eq!(EtlError::InvalidConfig(String::new()).kind(), "invalid_config");
}
