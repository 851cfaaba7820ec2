/*!
# Reconciler
Drives one sample end to end: load every caller's records into a store, stream the annotated variants, aggregate and assemble both documents for each, then flush the whole batch.
The flush only happens once the entire stream reconciled, so a failing sample never leaves partial documents behind.

# Example usage
```rust
use callsync::data_types::callers::{CallerName, CallerSet};
use callsync::data_types::caller_record::CallerRecord;
use callsync::data_types::annotated_variant::AnnotatedVariant;
use callsync::data_types::genomic_key::GenomicKey;
use callsync::data_types::sample_metadata::SampleMetadata;
use callsync::caller_store::CallerRecordStore;
use callsync::identity::IdentityRegistry;
use callsync::reconciler::{ReconcileConfigBuilder, reconcile_variants};

let config = ReconcileConfigBuilder::default()
    .genome_build("GRCh37.75")
    .build().unwrap();
let metadata = SampleMetadata { sample: "S1".to_string(), library_name: "L1".to_string(), ..Default::default() };

let mut store = CallerRecordStore::new("S1", CallerSet::default());
let record: CallerRecord = [("AAF", "0.35"), ("DP", "80")].into_iter().collect();
store.ingest(CallerName::Mutect, vec![(GenomicKey::new("chr1", 100, 101, "A", "T"), record)]).unwrap();

let variant = AnnotatedVariant {
    chrom: "chr1".to_string(), start: 100, end: 101,
    ref_allele: "A".to_string(), alt_allele: "T".to_string(),
    callers: vec!["mutect".to_string()],
    ..Default::default()
};
let registry = IdentityRegistry::default();
let (emitter, summary) = reconcile_variants(&metadata, &store, vec![Ok(variant)], &config, &registry).unwrap();
assert_eq!(emitter.len(), 1);
assert_eq!(summary.num_variants, 1);
```
*/
use anyhow::{Context, bail};
use derive_builder::Builder;
use indexmap::IndexMap;
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::aggregation::aggregate_callers;
use crate::assembler::{build_library_variant_document, build_variant_document};
use crate::caller_store::CallerRecordStore;
use crate::data_types::annotated_variant::AnnotatedVariant;
use crate::data_types::callers::{CallerName, CallerSet};
use crate::data_types::sample_metadata::{SampleManifest, SampleMetadata};
use crate::emitter::BatchEmitter;
use crate::errors::ReconcileError;
use crate::identity::{genomic_key, library_variant_identity, variant_identity, IdentityFormat, IdentityRegistry};
use crate::parsing::annotation::AnnotatedVariantReader;
use crate::parsing::caller_parsers::load_caller_vcf;
use crate::writers::document_store::DocumentStore;

/// Run level settings shared by every sample worker
#[derive(Builder, Clone, Debug, Default)]
#[builder(default)]
pub struct ReconcileConfig {
    /// Genome build label used in every identity
    #[builder(setter(into))]
    genome_build: String,
    /// Plain or hashed identities
    identity_format: IdentityFormat,
    /// The closed caller set of the run
    caller_set: CallerSet,
    /// Folder holding the default-named input VCFs
    #[builder(setter(into))]
    input_folder: PathBuf
}

impl ReconcileConfig {
    // getters
    pub fn genome_build(&self) -> &str {
        &self.genome_build
    }

    pub fn identity_format(&self) -> IdentityFormat {
        self.identity_format
    }

    pub fn caller_set(&self) -> &CallerSet {
        &self.caller_set
    }

    pub fn input_folder(&self) -> &Path {
        &self.input_folder
    }
}

/// Outcome of reconciling one sample
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SampleSummary {
    pub sample: String,
    pub library_name: String,
    /// Number of annotated variants reconciled
    pub num_variants: usize,
    /// Number of records loaded from each caller's file
    pub records_loaded: IndexMap<CallerName, usize>,
    /// Number of variants each caller contributed to
    pub caller_calls: IndexMap<CallerName, usize>
}

impl SampleSummary {
    fn new(metadata: &SampleMetadata, caller_set: &CallerSet) -> Self {
        let zeroes: IndexMap<CallerName, usize> = caller_set.callers().iter()
            .map(|&c| (c, 0))
            .collect();
        Self {
            sample: metadata.sample.clone(),
            library_name: metadata.library_name.clone(),
            num_variants: 0,
            records_loaded: zeroes.clone(),
            caller_calls: zeroes
        }
    }
}

/// Reconciles an annotated variant stream against a loaded caller store.
/// Nothing is written here; the returned emitter holds every document in stream order.
/// # Arguments
/// * `metadata` - sample and library metadata
/// * `store` - the caller records of the sample
/// * `variants` - the annotated variant stream
/// * `config` - run level settings
/// * `registry` - run-scoped identity registry
/// # Errors
/// * if the stream fails to parse
/// * `UnknownCaller` if a variant lists a caller outside the caller set
/// * `MissingCallerRecord` or `MalformedCallerField` from aggregation
/// * `IdentityCollision` if a derived identity was already used by a different variant
pub fn reconcile_variants<I>(
    metadata: &SampleMetadata,
    store: &CallerRecordStore,
    variants: I,
    config: &ReconcileConfig,
    registry: &IdentityRegistry
) -> anyhow::Result<(BatchEmitter, SampleSummary)>
where
    I: IntoIterator<Item = anyhow::Result<AnnotatedVariant>>
{
    let caller_set = config.caller_set();
    let mut emitter = BatchEmitter::new(metadata.batch_label());
    let mut summary = SampleSummary::new(metadata, caller_set);
    for &caller in caller_set.callers().iter() {
        summary.records_loaded.insert(caller, store.num_records(caller));
    }

    for variant in variants {
        let variant = variant?;
        let key = genomic_key(&variant);
        trace!("{}: reconciling {key}", metadata.sample);

        let callers: Vec<CallerName> = variant.callers.iter()
            .map(|label| {
                caller_set.resolve(label)
                    .ok_or_else(|| ReconcileError::UnknownCaller {
                        sample: metadata.sample.clone(),
                        caller: label.clone(),
                        context: format!("listed at {key}")
                    })
            })
            .collect::<Result<_, _>>()?;

        let aggregate = aggregate_callers(store, &key, &callers)?;

        let vid = variant_identity(config.genome_build(), &key, config.identity_format());
        let lvid = library_variant_identity(config.genome_build(), &metadata.library_name, &key, config.identity_format());
        registry.register_variant(&vid, &key)?;
        registry.register_library_variant(&lvid, &metadata.library_name, &key)?;

        let variant_doc = build_variant_document(vid, config.genome_build(), &key, &variant);
        let library_doc = build_library_variant_document(
            lvid, config.genome_build(), &key, &variant, &aggregate, metadata, caller_set
        );

        for &caller in aggregate.callers().iter() {
            *summary.caller_calls.entry(caller).or_insert(0) += 1;
        }
        summary.num_variants += 1;
        emitter.push(variant_doc, library_doc);
    }

    Ok((emitter, summary))
}

/// Finds the normalized VCF of one caller, either from the manifest or by the default naming.
/// Returns None if no file exists for the caller.
/// # Arguments
/// * `input_folder` - folder holding the default-named files
/// * `sample` - the manifest entry of the sample
/// * `caller` - the caller to look up
/// # Errors
/// * if the manifest names a file that does not exist
pub fn resolve_caller_vcf(input_folder: &Path, sample: &SampleManifest, caller: CallerName) -> anyhow::Result<Option<PathBuf>> {
    let manifest_path = sample.caller_vcfs.iter()
        .find(|(label, _path)| CallerName::from_str(label.trim()).ok() == Some(caller))
        .map(|(_label, path)| path);
    if let Some(path) = manifest_path {
        if !path.exists() {
            bail!("{caller} VCF for sample {} does not exist: {path:?}", sample.sample);
        }
        return Ok(Some(path.clone()));
    }

    let stem = format!("{}.{caller}.normalized", sample.sample);
    Ok(find_default_vcf(input_folder, &stem))
}

/// Finds the annotated VCF of a sample, either from the manifest or by the default naming
/// # Errors
/// * if no annotated VCF exists for the sample
pub fn resolve_annotated_vcf(input_folder: &Path, sample: &SampleManifest, genome_build: &str) -> anyhow::Result<PathBuf> {
    if let Some(path) = sample.annotated_vcf.as_ref() {
        if !path.exists() {
            bail!("Annotated VCF for sample {} does not exist: {path:?}", sample.sample);
        }
        return Ok(path.clone());
    }

    let stem = format!("{}.vcfanno.snpEff.{genome_build}", sample.sample);
    match find_default_vcf(input_folder, &stem) {
        Some(path) => Ok(path),
        None => bail!("No annotated VCF found for sample {} at {:?}", sample.sample, input_folder.join(format!("{stem}.vcf")))
    }
}

/// Checks for `{stem}.vcf.gz` then `{stem}.vcf`
fn find_default_vcf(input_folder: &Path, stem: &str) -> Option<PathBuf> {
    ["vcf.gz", "vcf"].iter()
        .map(|ext| input_folder.join(format!("{stem}.{ext}")))
        .find(|p| p.exists())
}

/// Loads every caller file of a sample into a new store.
/// A caller without a file contributes no records; any variant listing it will fail the sample.
/// # Errors
/// * if the manifest lists an unknown or disabled caller
/// * if a caller file cannot be parsed
pub fn load_caller_store(sample: &SampleManifest, config: &ReconcileConfig) -> anyhow::Result<CallerRecordStore> {
    let caller_set = config.caller_set();
    for label in sample.caller_vcfs.keys() {
        if caller_set.resolve(label).is_none() {
            return Err(ReconcileError::UnknownCaller {
                sample: sample.sample.clone(),
                caller: label.clone(),
                context: "listed in the manifest".to_string()
            }.into());
        }
    }

    let mut store = CallerRecordStore::new(&sample.sample, caller_set.clone());
    for &caller in caller_set.callers().iter() {
        match resolve_caller_vcf(config.input_folder(), sample, caller)? {
            Some(path) => {
                load_caller_vcf(&path, caller, &mut store)?;
            },
            None => warn!("{}: no {caller} VCF found, no records loaded for it", sample.sample)
        };
    }
    Ok(store)
}

/// Processes one sample end to end and writes its documents to the store
/// # Arguments
/// * `sample` - the manifest entry with any file overrides
/// * `metadata` - resolved sample and library metadata
/// * `config` - run level settings
/// * `registry` - run-scoped identity registry
/// * `document_store` - where both document batches go
/// # Errors
/// * any loading, reconciliation or store failure, wrapped with the sample name
pub fn process_sample(
    sample: &SampleManifest,
    metadata: &SampleMetadata,
    config: &ReconcileConfig,
    registry: &IdentityRegistry,
    document_store: &dyn DocumentStore
) -> anyhow::Result<SampleSummary> {
    let label = metadata.batch_label();
    debug!("Processing {label}...");

    let store = load_caller_store(sample, config)
        .with_context(|| format!("Error while loading caller records for sample {}:", metadata.sample))?;

    let annotated_vcf = resolve_annotated_vcf(config.input_folder(), sample, config.genome_build())?;
    let variants = AnnotatedVariantReader::from_path(&annotated_vcf)?;
    let (emitter, summary) = reconcile_variants(metadata, &store, variants, config, registry)
        .with_context(|| format!("Error while reconciling sample {}:", metadata.sample))?;

    let flushed = emitter.flush(document_store)
        .with_context(|| format!("Error while writing documents for sample {}:", metadata.sample))?;
    info!("{label}: wrote {} variant and {} library variant documents", flushed.variants, flushed.library_variants);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::caller_record::CallerRecord;
    use crate::data_types::genomic_key::GenomicKey;
    use crate::writers::document_store::{Collection, MemoryDocumentStore};
    use serde_json::json;

    fn test_config(input_folder: &Path) -> ReconcileConfig {
        ReconcileConfigBuilder::default()
            .genome_build("GRCh37.75")
            .input_folder(input_folder)
            .build().unwrap()
    }

    fn test_metadata() -> SampleMetadata {
        SampleMetadata {
            sample: "S1".to_string(),
            library_name: "L1".to_string(),
            run_id: "R1".to_string(),
            ..Default::default()
        }
    }

    fn test_variant(chrom: &str, callers: &[&str]) -> AnnotatedVariant {
        AnnotatedVariant {
            chrom: chrom.to_string(),
            start: 100,
            end: 101,
            ref_allele: "A".to_string(),
            alt_allele: "T".to_string(),
            callers: callers.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn store_with(records: Vec<(CallerName, Vec<(&str, &str)>)>) -> CallerRecordStore {
        let mut store = CallerRecordStore::new("S1", CallerSet::default());
        for (caller, fields) in records {
            let record: CallerRecord = fields.into_iter().collect();
            store.ingest(caller, vec![(GenomicKey::new("chr1", 100, 101, "A", "T"), record)]).unwrap();
        }
        store
    }

    #[test]
    fn test_single_caller() {
        let config = test_config(Path::new("."));
        let store = store_with(vec![(CallerName::Mutect, vec![("AAF", "0.35"), ("DP", "80")])]);
        let registry = IdentityRegistry::default();
        let (emitter, summary) = reconcile_variants(
            &test_metadata(), &store, vec![Ok(test_variant("chr1", &["mutect"]))], &config, &registry
        ).unwrap();

        assert_eq!(summary.num_variants, 1);
        assert_eq!(summary.caller_calls[&CallerName::Mutect], 1);
        assert_eq!(summary.caller_calls[&CallerName::Vardict], 0);

        let doc = serde_json::to_value(&emitter.library_variants()[0]).unwrap();
        assert_eq!(doc["_id"], "GRCh37.75_L1_1_100_A_T");
        assert_eq!(doc["max_som_aaf"], 0.35);
        assert_eq!(doc["min_depth"], 80);
        assert_eq!(doc["max_depth"], 80);
        assert_eq!(doc["caller_data"]["mutect"], json!({"AAF": "0.35", "DP": "80"}));
        assert_eq!(doc["caller_data"]["vardict"], json!({}));
        assert_eq!(emitter.variants()[0].id, "GRCh37.75_1_100_A_T");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_two_callers() {
        let config = test_config(Path::new("."));
        let store = store_with(vec![
            (CallerName::Mutect, vec![("AAF", "0.35"), ("DP", "80")]),
            (CallerName::Vardict, vec![("AAF", "0.40"), ("DP", "120")]),
        ]);
        let (emitter, _summary) = reconcile_variants(
            &test_metadata(), &store, vec![Ok(test_variant("1", &["mutect", "vardict"]))],
            &config, &IdentityRegistry::default()
        ).unwrap();

        let stats = emitter.library_variants()[0].aggregates;
        assert_eq!(stats.max_allele_fraction(), Some(0.40));
        assert_eq!(stats.min_depth(), Some(80));
        assert_eq!(stats.max_depth(), Some(120));
    }

    #[test]
    fn test_no_callers() {
        let config = test_config(Path::new("."));
        let store = store_with(vec![]);
        let (emitter, _summary) = reconcile_variants(
            &test_metadata(), &store, vec![Ok(test_variant("1", &[]))], &config, &IdentityRegistry::default()
        ).unwrap();
        let doc = serde_json::to_value(&emitter.library_variants()[0]).unwrap();
        assert_eq!(doc["max_som_aaf"], -1);
        assert_eq!(doc["min_depth"], -1);
        assert_eq!(doc["max_depth"], -1);
    }

    #[test]
    fn test_missing_record() {
        let config = test_config(Path::new("."));
        let store = store_with(vec![(CallerName::Mutect, vec![("AAF", "0.35"), ("DP", "80")])]);
        let err = reconcile_variants(
            &test_metadata(), &store, vec![Ok(test_variant("1", &["mutect", "pindel"]))],
            &config, &IdentityRegistry::default()
        ).unwrap_err();
        match err.downcast_ref::<ReconcileError>() {
            Some(ReconcileError::MissingCallerRecord { caller, .. }) => assert_eq!(*caller, CallerName::Pindel),
            other => panic!("unexpected error: {other:?}")
        }
    }

    #[test]
    fn test_unknown_caller() {
        let config = test_config(Path::new("."));
        let store = store_with(vec![]);
        for label in ["gatk", "manta"] {
            let err = reconcile_variants(
                &test_metadata(), &store, vec![Ok(test_variant("1", &[label]))], &config, &IdentityRegistry::default()
            ).unwrap_err();
            assert!(matches!(err.downcast_ref::<ReconcileError>(), Some(ReconcileError::UnknownCaller { .. })));
        }
    }

    #[test]
    fn test_malformed_field() {
        let config = test_config(Path::new("."));
        let store = store_with(vec![(CallerName::Mutect, vec![("AAF", "n/a"), ("DP", "80")])]);
        let err = reconcile_variants(
            &test_metadata(), &store, vec![Ok(test_variant("1", &["mutect"]))], &config, &IdentityRegistry::default()
        ).unwrap_err();
        assert!(matches!(err.downcast_ref::<ReconcileError>(), Some(ReconcileError::MalformedCallerField { .. })));
    }

    #[test]
    fn test_stream_error() {
        let config = test_config(Path::new("."));
        let store = store_with(vec![]);
        let variants = vec![Ok(test_variant("1", &[])), Err(anyhow::anyhow!("truncated record"))];
        let result = reconcile_variants(&test_metadata(), &store, variants, &config, &IdentityRegistry::default());
        assert!(result.is_err());
    }

    const CALLER_HEADER: &str = "\
##fileformat=VCFv4.2
##FORMAT=<ID=FA,Number=A,Type=Float,Description=\"Allele fraction\">
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele fraction\">
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
";

    fn write_inputs(folder: &Path, annotated_callers: &str) {
        std::fs::write(folder.join("S1.mutect.normalized.vcf"), format!(
            "{CALLER_HEADER}#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tTUMOR\nchr1\t101\t.\tA\tT\t.\tPASS\t.\tFA:DP\t0.35:80\n"
        )).unwrap();
        std::fs::write(folder.join("S1.vardict.normalized.vcf"), format!(
            "{CALLER_HEADER}#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n1\t101\t.\tA\tT\t.\tPASS\tAF=0.40;DP=120\n"
        )).unwrap();
        std::fs::write(folder.join("S1.vcfanno.snpEff.GRCh37.75.vcf"), format!(
            "##fileformat=VCFv4.2\n##INFO=<ID=CALLERS,Number=.,Type=String,Description=\"Callers\">\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n1\t101\t.\tA\tT\t.\tPASS\tCALLERS={annotated_callers}\n"
        )).unwrap();
    }

    fn test_sample() -> SampleManifest {
        SampleManifest {
            sample: "S1".to_string(),
            library_name: "L1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_process_sample() {
        let tmp = tempfile::tempdir().unwrap();
        write_inputs(tmp.path(), "mutect,vardict");
        let config = test_config(tmp.path());
        let document_store = MemoryDocumentStore::default();

        let summary = process_sample(
            &test_sample(), &test_metadata(), &config, &IdentityRegistry::default(), &document_store
        ).unwrap();
        assert_eq!(summary.num_variants, 1);
        assert_eq!(summary.records_loaded[&CallerName::Mutect], 1);
        assert_eq!(summary.records_loaded[&CallerName::Pindel], 0);
        assert_eq!(document_store.num_batches(), 1);

        let docs = document_store.documents(Collection::LibraryVariant);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["max_som_aaf"], 0.4);
        assert_eq!(docs[0]["min_depth"], 80);
        assert_eq!(docs[0]["max_depth"], 120);
        assert_eq!(docs[0]["callers"], json!(["mutect", "vardict"]));
        assert_eq!(document_store.documents(Collection::Variant)[0]["_id"], "GRCh37.75_1_100_A_T");
    }

    #[test]
    fn test_process_sample_nothing_flushed_on_failure() {
        let tmp = tempfile::tempdir().unwrap();
        write_inputs(tmp.path(), "mutect,pindel");
        let config = test_config(tmp.path());
        let document_store = MemoryDocumentStore::default();

        let err = process_sample(
            &test_sample(), &test_metadata(), &config, &IdentityRegistry::default(), &document_store
        ).unwrap_err();
        assert!(format!("{err:#}").contains("S1"));
        assert!(matches!(err.downcast_ref::<ReconcileError>(), Some(ReconcileError::MissingCallerRecord { .. })));
        assert_eq!(document_store.num_batches(), 0);
    }

    #[test]
    fn test_manifest_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let mut sample = test_sample();
        assert!(resolve_annotated_vcf(tmp.path(), &sample, "GRCh37.75").is_err());
        assert_eq!(resolve_caller_vcf(tmp.path(), &sample, CallerName::Mutect).unwrap(), None);

        let custom = tmp.path().join("custom_mutect.vcf");
        std::fs::write(&custom, "").unwrap();
        sample.caller_vcfs.insert("MuTect".to_string(), custom.clone());
        assert_eq!(resolve_caller_vcf(tmp.path(), &sample, CallerName::Mutect).unwrap(), Some(custom));

        sample.caller_vcfs.insert("gatk".to_string(), tmp.path().join("gatk.vcf"));
        let err = load_caller_store(&sample, &config).unwrap_err();
        assert!(matches!(err.downcast_ref::<ReconcileError>(), Some(ReconcileError::UnknownCaller { .. })));
    }
}
