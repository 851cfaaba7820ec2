/*!
# Aggregation engine
Resolves the caller records that contributed to one annotated variant and summarizes their allele fraction and depth.
Any listed caller without a record, or with a malformed measurement, fails the variant rather than being skipped.
*/
use itertools::Itertools;

use crate::caller_store::CallerRecordStore;
use crate::data_types::aggregate_stats::AggregateStatistics;
use crate::data_types::callers::CallerName;
use crate::data_types::caller_record::{CallerRecord, InvalidField};
use crate::data_types::genomic_key::GenomicKey;
use crate::errors::ReconcileError;

/// Result of aggregating the callers of a single variant
#[derive(Debug)]
pub struct CallerAggregate<'a> {
    /// The contributing callers, duplicates removed, in reported order
    callers: Vec<CallerName>,
    /// The record of each contributing caller, same order as `callers`
    records: Vec<&'a CallerRecord>,
    /// Summary statistics over `records`
    statistics: AggregateStatistics
}

impl<'a> CallerAggregate<'a> {
    /// Looks up the record of a contributing caller
    pub fn record(&self, caller: CallerName) -> Option<&'a CallerRecord> {
        self.callers.iter()
            .position(|&c| c == caller)
            .map(|i| self.records[i])
    }

    // getters
    pub fn callers(&self) -> &[CallerName] {
        &self.callers
    }

    pub fn statistics(&self) -> AggregateStatistics {
        self.statistics
    }
}

/// Computes the aggregate statistics for a variant from the callers that reported it.
/// # Arguments
/// * `store` - all caller records of the sample
/// * `key` - the genomic key of the variant
/// * `callers` - the callers that reported the variant; an empty list yields unknown statistics
/// # Errors
/// * `MissingCallerRecord` if a listed caller has no record at `key`
/// * `MalformedCallerField` if a record's allele fraction or depth is not numeric
pub fn aggregate_callers<'a>(
    store: &'a CallerRecordStore, key: &GenomicKey, callers: &[CallerName]
) -> Result<CallerAggregate<'a>, ReconcileError> {
    let callers: Vec<CallerName> = callers.iter().copied().unique().collect();
    let mut records = Vec::with_capacity(callers.len());
    let mut statistics = AggregateStatistics::default();

    for &caller in callers.iter() {
        let record = store.lookup(caller, key)?;
        let malformed = |e: InvalidField| ReconcileError::MalformedCallerField {
            sample: store.sample().to_string(),
            key: key.clone(),
            caller,
            field: e.field.to_string(),
            value: e.value,
            expected: e.expected
        };

        let allele_fraction = record.allele_fraction().map_err(&malformed)?;
        let depth = record.depth().map_err(&malformed)?;
        statistics.add_observation(allele_fraction, depth);
        records.push(record);
    }

    Ok(CallerAggregate {
        callers,
        records,
        statistics
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;
    use crate::data_types::callers::CallerSet;

    fn build_store(entries: Vec<(CallerName, Vec<(&str, &str)>)>) -> (CallerRecordStore, GenomicKey) {
        let key = GenomicKey::new("chr1", 100, 101, "A", "T");
        let mut store = CallerRecordStore::new("S1", CallerSet::new(true));
        for (caller, fields) in entries.into_iter() {
            let record: CallerRecord = fields.into_iter().collect();
            store.ingest(caller, vec![(key.clone(), record)]).unwrap();
        }
        (store, key)
    }

    #[test]
    fn test_single_caller() {
        let (store, key) = build_store(vec![(CallerName::Mutect, vec![("AAF", "0.35"), ("DP", "80")])]);
        let aggregate = aggregate_callers(&store, &key, &[CallerName::Mutect]).unwrap();
        let stats = aggregate.statistics();
        assert_approx_eq!(stats.max_allele_fraction().unwrap(), 0.35);
        assert_eq!(stats.min_depth(), Some(80));
        assert_eq!(stats.max_depth(), Some(80));
        assert!(aggregate.record(CallerName::Mutect).is_some());
        assert!(aggregate.record(CallerName::Vardict).is_none());
    }

    #[test]
    fn test_two_callers() {
        let (store, key) = build_store(vec![
            (CallerName::Mutect, vec![("AAF", "0.35"), ("DP", "80")]),
            (CallerName::Vardict, vec![("AAF", "0.40"), ("DP", "120")]),
        ]);
        let stats = aggregate_callers(&store, &key, &[CallerName::Mutect, CallerName::Vardict])
            .unwrap()
            .statistics();
        assert_approx_eq!(stats.max_allele_fraction().unwrap(), 0.40);
        assert_eq!(stats.min_depth(), Some(80));
        assert_eq!(stats.max_depth(), Some(120));
    }

    #[test]
    fn test_no_callers_is_unknown() {
        let (store, key) = build_store(vec![]);
        let aggregate = aggregate_callers(&store, &key, &[]).unwrap();
        assert_eq!(aggregate.statistics(), AggregateStatistics::default());
        assert!(aggregate.callers().is_empty());
    }

    #[test]
    fn test_callers_without_depth() {
        let (store, key) = build_store(vec![
            (CallerName::Scalpel, vec![("AD", "10,5")]),
            (CallerName::Pindel, vec![("AAF", "0.2")]),
        ]);
        let stats = aggregate_callers(&store, &key, &[CallerName::Scalpel, CallerName::Pindel])
            .unwrap()
            .statistics();
        assert_eq!(stats.min_depth(), None);
        assert_eq!(stats.max_depth(), None);
        assert_eq!(stats.max_allele_fraction(), Some(0.2));
    }

    #[test]
    fn test_monotonic_fraction() {
        let (store, key) = build_store(vec![
            (CallerName::Mutect, vec![("AAF", "0.30"), ("DP", "50")]),
            (CallerName::Freebayes, vec![("AAF", "0.10"), ("DP", "40")]),
            (CallerName::Vardict, vec![("AAF", "0.45"), ("DP", "70")]),
            (CallerName::Platypus, vec![("DP", "90")]),
        ]);
        let order = [CallerName::Mutect, CallerName::Freebayes, CallerName::Vardict, CallerName::Platypus];

        let mut previous = f64::NEG_INFINITY;
        for n in 1..=order.len() {
            let stats = aggregate_callers(&store, &key, &order[..n]).unwrap().statistics();
            let current = stats.max_allele_fraction().unwrap();
            assert!(current >= previous);
            assert!(stats.min_depth().unwrap() <= stats.max_depth().unwrap());
            previous = current;
        }
    }

    #[test]
    fn test_duplicate_callers_collapsed() {
        let (store, key) = build_store(vec![(CallerName::Mutect, vec![("AAF", "0.35"), ("DP", "80")])]);
        let aggregate = aggregate_callers(&store, &key, &[CallerName::Mutect, CallerName::Mutect]).unwrap();
        assert_eq!(aggregate.callers(), &[CallerName::Mutect]);
    }

    #[test]
    fn test_missing_record() {
        let (store, key) = build_store(vec![(CallerName::Mutect, vec![("AAF", "0.35"), ("DP", "80")])]);
        let err = aggregate_callers(&store, &key, &[CallerName::Mutect, CallerName::Pindel]).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingCallerRecord { caller: CallerName::Pindel, .. }));
    }

    #[test]
    fn test_malformed_depth() {
        let (store, key) = build_store(vec![(CallerName::Freebayes, vec![("AAF", "0.35"), ("DP", "many")])]);
        let err = aggregate_callers(&store, &key, &[CallerName::Freebayes]).unwrap_err();
        match err {
            ReconcileError::MalformedCallerField { sample, caller, field, value, .. } => {
                assert_eq!(sample, "S1");
                assert_eq!(caller, CallerName::Freebayes);
                assert_eq!(field, "DP");
                assert_eq!(value, "many");
            },
            e => panic!("unexpected error: {e}")
        }
    }
}
