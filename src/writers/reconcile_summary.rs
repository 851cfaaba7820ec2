use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::sample_metadata::SampleMetadata;
use crate::reconciler::SampleSummary;

/// Caller label used for the per-sample status row
pub const ALL_CALLERS: &str = "all";

/// Final state of a sample
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SampleStatus {
    Completed,
    Failed
}

/// Collects the outcome of every sample and writes them as one table
#[derive(Default)]
pub struct ReconcileSummaryWriter {
    rows: Vec<ReconcileSummaryRow>
}

/// Contains all the data written to each row of our summary file
#[derive(Clone, Debug, PartialEq, Serialize)]
struct ReconcileSummaryRow {
    sample: String,
    library_name: String,
    /// Caller name, or "all" for the sample status row
    caller: String,
    status: SampleStatus,
    /// Records loaded from the caller file(s)
    records_loaded: usize,
    /// Variants the caller contributed to, or all reconciled variants on the status row
    variants: usize,
    /// Error message for failed samples
    error: String
}

impl ReconcileSummaryWriter {
    /// Adds the rows of a completed sample: one status row followed by one row per caller
    pub fn add_completed(&mut self, summary: &SampleSummary) {
        self.rows.push(ReconcileSummaryRow {
            sample: summary.sample.clone(),
            library_name: summary.library_name.clone(),
            caller: ALL_CALLERS.to_string(),
            status: SampleStatus::Completed,
            records_loaded: summary.records_loaded.values().sum(),
            variants: summary.num_variants,
            error: String::new()
        });

        for (caller, &records_loaded) in summary.records_loaded.iter() {
            self.rows.push(ReconcileSummaryRow {
                sample: summary.sample.clone(),
                library_name: summary.library_name.clone(),
                caller: caller.to_string(),
                status: SampleStatus::Completed,
                records_loaded,
                variants: summary.caller_calls.get(caller).copied().unwrap_or(0),
                error: String::new()
            });
        }
    }

    /// Adds the status row of a failed sample
    pub fn add_failed(&mut self, metadata: &SampleMetadata, error: &anyhow::Error) {
        self.rows.push(ReconcileSummaryRow {
            sample: metadata.sample.clone(),
            library_name: metadata.library_name.clone(),
            caller: ALL_CALLERS.to_string(),
            status: SampleStatus::Failed,
            records_loaded: 0,
            variants: 0,
            error: format!("{error:#}")
        });
    }

    /// Number of samples recorded with the given status
    pub fn num_samples(&self, status: SampleStatus) -> usize {
        self.rows.iter()
            .filter(|r| r.caller == ALL_CALLERS && r.status == status)
            .count()
    }

    /// Will write the summary out to the given file path
    /// # Arguments
    /// * `filename` - the filename for the output (tsv/csv)
    pub fn write_summary(&self, filename: &Path) -> csv::Result<()> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;

        for row in self.rows.iter() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
