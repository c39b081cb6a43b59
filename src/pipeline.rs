//! Load → normalize → write, wired together.

use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::error;

use crate::db::{SqliteSink, TableSink, WriteOptions};
use crate::error::Result;
use crate::loader;
pub use crate::loader::LoadStats;
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::Table;
use crate::normalizer::{NormalizeOptions, NormalizeReport, Normalizer};

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// When loading started
    pub started_at: DateTime<Local>,
    /// When the write committed
    pub finished_at: DateTime<Local>,
    /// Rows in the messages input
    pub messages_rows: usize,
    /// Rows in the categories input
    pub categories_rows: usize,
    /// Rows after the inner join
    pub joined_rows: usize,
    /// Normalizer counters
    pub normalize: NormalizeReport,
    /// Output relation name
    pub table_name: String,
    /// Rows written to the relation
    pub rows_written: usize,
}

/// Stage about to start, passed to the `run_with` observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage<'a> {
    /// Reading and joining both inputs
    Loading {
        /// Messages input
        messages: &'a Path,
        /// Categories input
        categories: &'a Path,
    },
    /// Decoding categories and removing duplicates
    Cleaning,
    /// Writing the relation
    Saving {
        /// Destination store
        destination: &'a Path,
    },
    /// The write committed
    Saved,
}

/// The three-stage batch transform
pub struct Pipeline {
    normalizer: Normalizer,
    write_options: WriteOptions,
    metrics: MetricsCollector,
}

impl Pipeline {
    /// Create a pipeline from stage options
    #[must_use]
    pub fn new(normalize_options: NormalizeOptions, write_options: WriteOptions) -> Self {
        Self {
            normalizer: Normalizer::new(normalize_options),
            write_options,
            metrics: MetricsCollector::default(),
        }
    }

    /// Read both inputs and inner-join them on the configured key.
    pub fn load(&self, messages: &Path, categories: &Path) -> Result<(Table, LoadStats)> {
        let timer = OperationTimer::new("load");
        let key = self.normalizer.options().key_column.as_str();
        let result = loader::load_data(messages, categories, key);
        self.finish_stage("load", timer, &result);

        let (table, stats) = result?;
        self.metrics.record_rows_loaded("messages", stats.messages_rows);
        self.metrics.record_rows_loaded("categories", stats.categories_rows);
        self.metrics.record_join(stats.joined_rows);
        Ok((table, stats))
    }

    /// Decode the category column and drop duplicate rows.
    pub fn clean(&self, table: Table) -> Result<(Table, NormalizeReport)> {
        let timer = OperationTimer::new("clean");
        let result = self.normalizer.normalize(table);
        self.finish_stage("clean", timer, &result);
        let (table, report) = result?;
        self.metrics.record_normalize(&report);
        Ok((table, report))
    }

    /// Write the table into the destination store.
    pub fn save(&self, table: &Table, destination: &Path) -> Result<usize> {
        let timer = OperationTimer::new("save");
        let result = SqliteSink::open(destination).and_then(|mut sink| self.save_to(&mut sink, table));
        self.finish_stage("save", timer, &result);
        result
    }

    /// Write the table into any sink.
    pub fn save_to(&self, sink: &mut dyn TableSink, table: &Table) -> Result<usize> {
        let written = sink.write_table(table, &self.write_options)?;
        self.metrics.record_rows_written(&self.write_options.table_name, written);
        Ok(written)
    }

    /// Run every stage once.
    pub fn run(&self, messages: &Path, categories: &Path, destination: &Path) -> Result<PipelineReport> {
        self.run_with(messages, categories, destination, |_| {})
    }

    /// Run every stage once, telling `on_stage` before each one starts and
    /// after the write commits.
    pub fn run_with<F>(
        &self,
        messages: &Path,
        categories: &Path,
        destination: &Path,
        mut on_stage: F,
    ) -> Result<PipelineReport>
    where
        F: FnMut(Stage<'_>),
    {
        let started_at = Local::now();

        on_stage(Stage::Loading { messages, categories });
        let (joined, stats) = self.load(messages, categories)?;

        on_stage(Stage::Cleaning);
        let (cleaned, normalize) = self.clean(joined)?;

        on_stage(Stage::Saving { destination });
        let rows_written = self.save(&cleaned, destination)?;
        on_stage(Stage::Saved);

        Ok(PipelineReport {
            started_at,
            finished_at: Local::now(),
            messages_rows: stats.messages_rows,
            categories_rows: stats.categories_rows,
            joined_rows: stats.joined_rows,
            normalize,
            table_name: self.write_options.table_name.clone(),
            rows_written,
        })
    }

    fn finish_stage<T>(&self, stage: &'static str, timer: OperationTimer, result: &Result<T>) {
        self.metrics.record_stage(stage, timer.elapsed());
        if let Err(e) = result {
            error!(stage, kind = e.kind(), "Stage failed: {}", e);
            self.metrics.record_error(stage, e);
        }
        timer.finish();
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(NormalizeOptions::default(), WriteOptions::default())
    }
}
