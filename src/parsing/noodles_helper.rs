use anyhow::{Context, anyhow};
use noodles::vcf;
use noodles::vcf::variant::record_buf::info::field::{value::Array as InfoArray, Value as InfoValue};
use noodles::vcf::variant::record_buf::samples::sample::{value::Array as SampleArray, value::Genotype, Value as SampleValue};
use noodles::vcf::variant::RecordBuf;
use std::io::BufRead;
use std::path::Path;

use crate::data_types::genomic_key::GenomicKey;

/// VCF missing value marker
pub const MISSING: &str = ".";

/// Reader type returned by `open_vcf`, handles both plain and bgzipped VCF
pub type VcfReader = vcf::io::Reader<Box<dyn BufRead>>;

/// Opens a VCF (.vcf or .vcf.gz) and parses the header
/// # Arguments
/// * `filename` - the VCF to open
/// # Errors
/// * if the file cannot be opened or the header is invalid
pub fn open_vcf(filename: &Path) -> anyhow::Result<(VcfReader, vcf::Header)> {
    let mut reader = vcf::io::reader::Builder::default()
        .build_from_path(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;
    let header = reader.read_header()
        .with_context(|| format!("Error while reading header of {filename:?}:"))?;
    Ok((reader, header))
}

/// Reads every record of an open VCF into memory, in file order
/// # Errors
/// * if any record fails to parse
pub fn read_all_records(reader: &mut VcfReader, header: &vcf::Header) -> anyhow::Result<Vec<RecordBuf>> {
    let mut records = vec![];
    let mut record = RecordBuf::default();
    while reader.read_record_buf(header, &mut record)? > 0 {
        records.push(record.clone());
    }
    Ok(records)
}

/// Builds the genomic key of a record from its first ALT allele
/// # Errors
/// * if the record has no position or no ALT allele
pub fn record_genomic_key(record: &RecordBuf) -> anyhow::Result<GenomicKey> {
    let position = record.variant_start()
        .ok_or(anyhow!("Missing POS"))?; // 1-based
    let alt = record.alternate_bases().as_ref().first()
        .ok_or(anyhow!("Missing ALT at {}:{position}", record.reference_sequence_name()))?;
    Ok(GenomicKey::from_vcf_position(
        record.reference_sequence_name(), position.get(), record.reference_bases(), alt
    ))
}

/// Renders the FILTER column, "." if unset
pub fn filter_string(record: &RecordBuf) -> String {
    let filters = record.filters().as_ref();
    if filters.is_empty() {
        MISSING.to_string()
    } else {
        filters.iter().map(|f| f.as_str()).collect::<Vec<&str>>().join(";")
    }
}

/// Returns an INFO field rendered as it would appear in the VCF; arrays are comma-joined.
/// Returns None if the key is absent or the value is missing.
pub fn info_string(record: &RecordBuf, key: &str) -> Option<String> {
    match record.info().get(key) {
        Some(Some(value)) => Some(render_info_value(value)),
        _ => None
    }
}

/// Returns an INFO field as a list of strings, one per comma separated entry.
/// Works whether the header declares the field as a single string or an array.
pub fn info_strings(record: &RecordBuf, key: &str) -> Vec<String> {
    match record.info().get(key) {
        Some(Some(InfoValue::String(s))) => s.split(',').map(|v| v.to_string()).collect(),
        Some(Some(InfoValue::Array(InfoArray::String(values)))) => {
            values.iter()
                .flatten()
                .flat_map(|s| s.split(','))
                .map(|v| v.to_string())
                .collect()
        },
        Some(Some(other)) => vec![render_info_value(other)],
        _ => vec![]
    }
}

/// Returns the numeric values of an INFO field, one entry per value, None where missing or non-numeric
pub fn info_numbers(record: &RecordBuf, key: &str) -> Vec<Option<f64>> {
    match record.info().get(key) {
        Some(Some(InfoValue::Integer(v))) => vec![Some(*v as f64)],
        Some(Some(InfoValue::Float(v))) => vec![Some(widen(*v))],
        Some(Some(InfoValue::String(s))) => s.split(',').map(|v| v.trim().parse().ok()).collect(),
        Some(Some(InfoValue::Array(InfoArray::Integer(values)))) => values.iter().map(|v| v.map(|x| x as f64)).collect(),
        Some(Some(InfoValue::Array(InfoArray::Float(values)))) => values.iter().map(|v| v.map(widen)).collect(),
        _ => vec![]
    }
}

/// First numeric value of an INFO field
pub fn info_number(record: &RecordBuf, key: &str) -> Option<f64> {
    info_numbers(record, key).into_iter().next().flatten()
}

/// Returns a FORMAT field of one sample rendered as it would appear in the VCF
pub fn sample_string(record: &RecordBuf, sample_index: usize, key: &str) -> Option<String> {
    let sample = record.samples().get_index(sample_index)?;
    match sample.get(key) {
        Some(Some(value)) => Some(render_sample_value(value)),
        _ => None
    }
}

/// Returns the numeric values of a FORMAT field of one sample, None where missing or non-numeric
pub fn sample_numbers(record: &RecordBuf, sample_index: usize, key: &str) -> Vec<Option<f64>> {
    let Some(sample) = record.samples().get_index(sample_index) else {
        return vec![];
    };
    match sample.get(key) {
        Some(Some(SampleValue::Integer(v))) => vec![Some(*v as f64)],
        Some(Some(SampleValue::Float(v))) => vec![Some(widen(*v))],
        Some(Some(SampleValue::String(s))) => s.split(',').map(|v| v.trim().parse().ok()).collect(),
        Some(Some(SampleValue::Array(SampleArray::Integer(values)))) => values.iter().map(|v| v.map(|x| x as f64)).collect(),
        Some(Some(SampleValue::Array(SampleArray::Float(values)))) => values.iter().map(|v| v.map(widen)).collect(),
        _ => vec![]
    }
}

/// First numeric value of a FORMAT field
pub fn sample_number(record: &RecordBuf, sample_index: usize, key: &str) -> Option<f64> {
    sample_numbers(record, sample_index, key).into_iter().next().flatten()
}

/// Widens a VCF float through its shortest decimal form, so 0.02 stays 0.02 instead of 0.019999999552965164
fn widen(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(value as f64)
}

fn render_info_value(value: &InfoValue) -> String {
    match value {
        InfoValue::Integer(v) => v.to_string(),
        InfoValue::Float(v) => v.to_string(),
        InfoValue::Flag => "true".to_string(),
        InfoValue::Character(c) => c.to_string(),
        InfoValue::String(s) => s.clone(),
        InfoValue::Array(InfoArray::Integer(values)) => join_optional(values),
        InfoValue::Array(InfoArray::Float(values)) => join_optional(values),
        InfoValue::Array(InfoArray::Character(values)) => join_optional(values),
        InfoValue::Array(InfoArray::String(values)) => join_optional(values)
    }
}

fn render_sample_value(value: &SampleValue) -> String {
    match value {
        SampleValue::Integer(v) => v.to_string(),
        SampleValue::Float(v) => v.to_string(),
        SampleValue::Character(c) => c.to_string(),
        SampleValue::String(s) => s.clone(),
        SampleValue::Genotype(gt) => render_genotype(gt),
        SampleValue::Array(SampleArray::Integer(values)) => join_optional(values),
        SampleValue::Array(SampleArray::Float(values)) => join_optional(values),
        SampleValue::Array(SampleArray::Character(values)) => join_optional(values),
        SampleValue::Array(SampleArray::String(values)) => join_optional(values)
    }
}

/// Renders a genotype back into VCF form, e.g. "0/1" or "1|0"
fn render_genotype(genotype: &Genotype) -> String {
    use vcf::variant::record::samples::series::value::genotype::Phasing;

    let mut rendered = String::new();
    for (i, allele) in genotype.as_ref().iter().enumerate() {
        if i > 0 {
            rendered.push(if allele.phasing() == Phasing::Phased { '|' } else { '/' });
        }
        match allele.position() {
            Some(p) => rendered.push_str(&p.to_string()),
            None => rendered.push_str(MISSING)
        }
    }
    rendered
}

fn join_optional<T: ToString>(values: &[Option<T>]) -> String {
    values.iter()
        .map(|v| v.as_ref().map(|x| x.to_string()).unwrap_or_else(|| MISSING.to_string()))
        .collect::<Vec<String>>()
        .join(",")
}
