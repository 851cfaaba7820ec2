/*!
# Caller record store
Holds every caller's raw records for one sample, partitioned by caller and keyed by `GenomicKey`.
The store is built once per sample and then only read while the annotated stream is reconciled.
*/
use log::{debug, trace};
use rustc_hash::FxHashMap as HashMap;

use crate::data_types::callers::{CallerName, CallerSet};
use crate::data_types::caller_record::CallerRecord;
use crate::data_types::genomic_key::GenomicKey;
use crate::errors::ReconcileError;

/// Mapping of caller name to (genomic key to caller record) for a single sample
#[derive(Debug)]
pub struct CallerRecordStore {
    /// Sample the records belong to, used for error context
    sample: String,
    /// The callers this store accepts
    caller_set: CallerSet,
    /// One partition per caller of `caller_set`
    partitions: HashMap<CallerName, HashMap<GenomicKey, CallerRecord>>
}

impl CallerRecordStore {
    /// Creates an empty store with one partition per caller in the set
    /// # Arguments
    /// * `sample` - the sample these records belong to
    /// * `caller_set` - the closed set of callers this store accepts
    pub fn new(sample: &str, caller_set: CallerSet) -> Self {
        let partitions = caller_set.callers().iter()
            .map(|&c| (c, HashMap::default()))
            .collect();
        Self {
            sample: sample.to_string(),
            caller_set,
            partitions
        }
    }

    /// Adds all records from one caller's parsed file.
    /// A key that is already present for this caller is replaced by the later record.
    /// # Arguments
    /// * `caller` - the caller that produced the records
    /// * `records` - the records to add, keyed by genomic key
    /// # Errors
    /// * if the caller is not part of the configured caller set
    pub fn ingest<I>(&mut self, caller: CallerName, records: I) -> Result<usize, ReconcileError>
    where
        I: IntoIterator<Item = (GenomicKey, CallerRecord)>
    {
        let partition = self.partitions.get_mut(&caller)
            .ok_or_else(|| ReconcileError::UnknownCaller {
                sample: self.sample.clone(),
                caller: caller.to_string(),
                context: "caller is not enabled for this run".to_string()
            })?;

        let mut num_ingested = 0;
        for (key, record) in records {
            if let Some(previous) = partition.insert(key, record) {
                debug!("{}: replaced earlier {caller} record {previous:?}", self.sample);
            }
            num_ingested += 1;
        }
        trace!("{}: ingested {num_ingested} {caller} records", self.sample);
        Ok(num_ingested)
    }

    /// Returns the record a caller reported at the given key.
    /// # Errors
    /// * `UnknownCaller` if the caller is not part of the store
    /// * `MissingCallerRecord` if the caller has no record at that key
    pub fn lookup(&self, caller: CallerName, key: &GenomicKey) -> Result<&CallerRecord, ReconcileError> {
        let partition = self.partitions.get(&caller)
            .ok_or_else(|| ReconcileError::UnknownCaller {
                sample: self.sample.clone(),
                caller: caller.to_string(),
                context: format!("looked up at {key}")
            })?;

        partition.get(key)
            .ok_or_else(|| ReconcileError::MissingCallerRecord {
                sample: self.sample.clone(),
                key: key.clone(),
                caller
            })
    }

    /// Number of records for a caller, 0 for callers outside the set
    pub fn num_records(&self, caller: CallerName) -> usize {
        self.partitions.get(&caller).map(|p| p.len()).unwrap_or(0)
    }

    // getters
    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn caller_set(&self) -> &CallerSet {
        &self.caller_set
    }
}
