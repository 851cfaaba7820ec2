/*!
# Caller parsers
Each variant caller reports allele fraction and depth in its own way.
A `CallerParser` turns one record of a caller's normalized VCF into a `CallerRecord` with the shared `AAF` and `DP` fields filled in, plus the caller specific raw fields.
*/
use anyhow::Context;
use log::{debug, info};
use noodles::vcf::variant::RecordBuf;
use std::path::Path;

use crate::caller_store::CallerRecordStore;
use crate::data_types::caller_record::{CallerRecord, FIELD_ALLELE_FRACTION, FIELD_DEPTH};
use crate::data_types::callers::CallerName;
use crate::data_types::genomic_key::GenomicKey;
use crate::parsing::noodles_helper::{
    filter_string, info_number, info_string, open_vcf, read_all_records, record_genomic_key,
    sample_numbers, sample_string
};

/// Field holding the FILTER column
pub const FIELD_FILTER: &str = "FILTER";

/// Converts one record of a caller's VCF into the caller's measurements
pub trait CallerParser: Send + Sync {
    /// The caller this parser handles
    fn caller(&self) -> CallerName;

    /// Extracts the measurements of the first ALT allele of `record`
    fn parse_record(&self, record: &RecordBuf) -> CallerRecord;
}

/// Returns the parser for a caller's VCF flavor
pub fn parser_for(caller: CallerName) -> Box<dyn CallerParser> {
    match caller {
        CallerName::Mutect => Box::new(MutectParser),
        CallerName::Freebayes => Box::new(FreebayesParser),
        CallerName::Vardict => Box::new(VardictParser),
        CallerName::Scalpel => Box::new(AlleleDepthParser { caller: CallerName::Scalpel }),
        CallerName::Platypus => Box::new(PlatypusParser),
        CallerName::Pindel => Box::new(AlleleDepthParser { caller: CallerName::Pindel }),
        CallerName::Manta => Box::new(MantaParser)
    }
}

/// Parses every record of a caller VCF and loads it into the store
/// # Arguments
/// * `vcf_path` - the caller's normalized VCF
/// * `caller` - the caller that produced the file
/// * `store` - the sample's caller record store
/// # Errors
/// * if the VCF cannot be read or a record has no ALT allele
/// * if the caller is not enabled for the run
pub fn load_caller_vcf(vcf_path: &Path, caller: CallerName, store: &mut CallerRecordStore) -> anyhow::Result<usize> {
    debug!("Loading {caller} records from {vcf_path:?}...");
    let (mut reader, header) = open_vcf(vcf_path)?;
    let records = read_all_records(&mut reader, &header)
        .with_context(|| format!("Error while parsing records from {vcf_path:?}:"))?;

    let parser = parser_for(caller);
    let parsed: Vec<(GenomicKey, CallerRecord)> = records.iter()
        .map(|record| {
            let key = record_genomic_key(record)?;
            Ok((key, parser.parse_record(record)))
        })
        .collect::<anyhow::Result<_>>()
        .with_context(|| format!("Error while converting records from {vcf_path:?}:"))?;

    let num_loaded = store.ingest(caller, parsed)?;
    info!("Loaded {num_loaded} {caller} records for {}", store.sample());
    Ok(num_loaded)
}

/// Renders a derived fraction, None when the denominator is not positive
fn fraction(numerator: Option<f64>, denominator: Option<f64>) -> Option<String> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => Some((n / d).to_string()),
        _ => None
    }
}

/// Renders a count, which VCF fields carry as integers even when we read them as reals
fn count(value: Option<f64>) -> Option<String> {
    value.map(|v| (v.round() as u64).to_string())
}

/// Fields shared by every caller
fn base_record(record: &RecordBuf) -> CallerRecord {
    let mut caller_record = CallerRecord::default();
    caller_record.insert(FIELD_FILTER, filter_string(record));
    caller_record
}

/// MuTect: FORMAT/FA is the allele fraction, FORMAT/DP the depth (tumor sample first)
struct MutectParser;

impl CallerParser for MutectParser {
    fn caller(&self) -> CallerName {
        CallerName::Mutect
    }

    fn parse_record(&self, record: &RecordBuf) -> CallerRecord {
        let mut caller_record = base_record(record);
        caller_record.insert_opt(FIELD_ALLELE_FRACTION, sample_string(record, 0, "FA"));
        caller_record.insert_opt(FIELD_DEPTH, sample_string(record, 0, "DP"));
        caller_record.insert_opt("AD", sample_string(record, 0, "AD"));
        caller_record
    }
}

/// FreeBayes: AAF is derived as AO / DP from the INFO fields
struct FreebayesParser;

impl CallerParser for FreebayesParser {
    fn caller(&self) -> CallerName {
        CallerName::Freebayes
    }

    fn parse_record(&self, record: &RecordBuf) -> CallerRecord {
        let depth = info_number(record, "DP");
        let alt_obs = info_number(record, "AO");

        let mut caller_record = base_record(record);
        caller_record.insert_opt(FIELD_ALLELE_FRACTION, fraction(alt_obs, depth));
        caller_record.insert_opt(FIELD_DEPTH, count(depth));
        caller_record.insert_opt("AO", info_string(record, "AO"));
        caller_record.insert_opt("RO", info_string(record, "RO"));
        caller_record
    }
}

/// VarDict: INFO/AF and INFO/DP are reported directly
struct VardictParser;

impl CallerParser for VardictParser {
    fn caller(&self) -> CallerName {
        CallerName::Vardict
    }

    fn parse_record(&self, record: &RecordBuf) -> CallerRecord {
        let mut caller_record = base_record(record);
        caller_record.insert_opt(FIELD_ALLELE_FRACTION, info_string(record, "AF"));
        caller_record.insert_opt(FIELD_DEPTH, info_string(record, "DP"));
        caller_record.insert_opt("VD", info_string(record, "VD"));
        caller_record
    }
}

/// Platypus: AAF is derived as TR / TC, TC being the total coverage
struct PlatypusParser;

impl CallerParser for PlatypusParser {
    fn caller(&self) -> CallerName {
        CallerName::Platypus
    }

    fn parse_record(&self, record: &RecordBuf) -> CallerRecord {
        let depth = info_number(record, "TC");
        let alt_reads = info_number(record, "TR");

        let mut caller_record = base_record(record);
        caller_record.insert_opt(FIELD_ALLELE_FRACTION, fraction(alt_reads, depth));
        caller_record.insert_opt(FIELD_DEPTH, count(depth));
        caller_record.insert_opt("TR", info_string(record, "TR"));
        caller_record.insert_opt("TC", info_string(record, "TC"));
        caller_record
    }
}

/// Callers that only report FORMAT/AD as (ref, alt) read counts, e.g. Scalpel and Pindel.
/// DP is ref + alt and AAF is alt / DP.
struct AlleleDepthParser {
    caller: CallerName
}

impl CallerParser for AlleleDepthParser {
    fn caller(&self) -> CallerName {
        self.caller
    }

    fn parse_record(&self, record: &RecordBuf) -> CallerRecord {
        let allele_depths = sample_numbers(record, 0, "AD");
        let (depth, alt_reads) = match allele_depths.as_slice() {
            [Some(ref_reads), Some(alt_reads), ..] => (Some(ref_reads + alt_reads), Some(*alt_reads)),
            _ => (None, None)
        };

        let mut caller_record = base_record(record);
        caller_record.insert_opt(FIELD_ALLELE_FRACTION, fraction(alt_reads, depth));
        caller_record.insert_opt(FIELD_DEPTH, count(depth));
        caller_record.insert_opt("AD", sample_string(record, 0, "AD"));
        if self.caller == CallerName::Pindel {
            caller_record.insert_opt("SVTYPE", info_string(record, "SVTYPE"));
            caller_record.insert_opt("SVLEN", info_string(record, "SVLEN"));
        }
        caller_record
    }
}

/// Manta: FORMAT/PR (paired reads) and FORMAT/SR (split reads), each as (ref, alt).
/// DP sums all supporting reads and AAF is the alt share.
struct MantaParser;

impl CallerParser for MantaParser {
    fn caller(&self) -> CallerName {
        CallerName::Manta
    }

    fn parse_record(&self, record: &RecordBuf) -> CallerRecord {
        let mut ref_reads = None;
        let mut alt_reads = None;
        for field in ["PR", "SR"] {
            if let [Some(r), Some(a), ..] = sample_numbers(record, 0, field).as_slice() {
                ref_reads = Some(ref_reads.unwrap_or(0.0) + r);
                alt_reads = Some(alt_reads.unwrap_or(0.0) + a);
            }
        }
        let depth = match (ref_reads, alt_reads) {
            (Some(r), Some(a)) => Some(r + a),
            _ => None
        };

        let mut caller_record = base_record(record);
        caller_record.insert_opt(FIELD_ALLELE_FRACTION, fraction(alt_reads, depth));
        caller_record.insert_opt(FIELD_DEPTH, count(depth));
        caller_record.insert_opt("PR", sample_string(record, 0, "PR"));
        caller_record.insert_opt("SR", sample_string(record, 0, "SR"));
        caller_record.insert_opt("SVTYPE", info_string(record, "SVTYPE"));
        caller_record
    }
}
