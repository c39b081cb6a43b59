use std::time::Duration;

use metrics::{counter, gauge, histogram};

use crate::error::EtlError;
use crate::normalizer::NormalizeReport;

/// Metric names emitted by the pipeline
pub struct MetricsCollector {
    pub rows_loaded_total: &'static str,
    pub rows_joined_total: &'static str,
    pub rows_written_total: &'static str,
    pub duplicates_removed_total: &'static str,
    pub out_of_range_values_total: &'static str,
    pub rows_dropped_total: &'static str,
    pub category_columns: &'static str,
    pub stage_duration: &'static str,
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            rows_loaded_total: "disaster_etl_rows_loaded_total",
            rows_joined_total: "disaster_etl_rows_joined_total",
            rows_written_total: "disaster_etl_rows_written_total",
            duplicates_removed_total: "disaster_etl_duplicates_removed_total",
            out_of_range_values_total: "disaster_etl_out_of_range_values_total",
            rows_dropped_total: "disaster_etl_rows_dropped_total",
            category_columns: "disaster_etl_category_columns",
            stage_duration: "disaster_etl_stage_duration_seconds",
            errors_total: "disaster_etl_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Record the rows read from one input file
    pub fn record_rows_loaded(&self, source: &str, count: usize) {
        counter!(self.rows_loaded_total, "source" => source.to_string()).increment(count as u64);
    }

    /// Record the size of the joined table
    pub fn record_join(&self, count: usize) {
        counter!(self.rows_joined_total).increment(count as u64);
    }

    /// Record the outcome of a normalization pass
    pub fn record_normalize(&self, report: &NormalizeReport) {
        counter!(self.duplicates_removed_total).increment(report.duplicates_removed as u64);
        counter!(self.out_of_range_values_total).increment(report.out_of_range_values as u64);
        counter!(self.rows_dropped_total).increment(report.rows_dropped as u64);
        gauge!(self.category_columns).set(report.categories.len() as f64);
    }

    /// Record rows persisted to the destination
    pub fn record_rows_written(&self, table: &str, count: usize) {
        counter!(self.rows_written_total, "table" => table.to_string()).increment(count as u64);
    }

    /// Record how long a stage took
    pub fn record_stage(&self, stage: &'static str, duration: Duration) {
        histogram!(self.stage_duration, "stage" => stage).record(duration.as_secs_f64());
    }

    /// Record a failed stage
    pub fn record_error(&self, stage: &'static str, error: &EtlError) {
        counter!(self.errors_total, "stage" => stage, "kind" => error.kind()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.rows_written_total, "disaster_etl_rows_written_total");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let collector = MetricsCollector::default();
        collector.record_join(3);
        collector.record_stage("load", Duration::from_millis(5));
        collector.record_normalize(&NormalizeReport::default());
    }
}
