/*!
# Document assembler
Pure transformations from an annotated variant, its caller aggregate and the sample metadata into the two output documents.
*/
use indexmap::IndexMap;

use crate::aggregation::CallerAggregate;
use crate::data_types::annotated_variant::AnnotatedVariant;
use crate::data_types::callers::CallerSet;
use crate::data_types::caller_record::CallerRecord;
use crate::data_types::documents::{LibraryVariantDocument, VariantDocument};
use crate::data_types::genomic_key::GenomicKey;
use crate::data_types::sample_metadata::SampleMetadata;

/// Builds the genome-wide document for a variant.
/// Gene, transcript and consequence fields come from the highest impact effect only.
/// # Arguments
/// * `identity` - the variant identity, used as the document id
/// * `genome_build` - genome build label
/// * `key` - the genomic key of the variant
/// * `variant` - the annotated variant
pub fn build_variant_document(
    identity: String, genome_build: &str, key: &GenomicKey, variant: &AnnotatedVariant
) -> VariantDocument {
    let top_effect = variant.top_effect();
    let clinical = &variant.clinical;

    VariantDocument {
        id: identity,
        reference_genome: genome_build.to_string(),
        chrom: key.chrom().to_string(),
        start: key.start(),
        end: key.end(),
        ref_allele: key.ref_allele().to_string(),
        alt_allele: key.alt_allele().to_string(),
        rs_ids: variant.rs_ids.clone(),
        cosmic_ids: clinical.cosmic_ids.clone(),
        gene: top_effect.and_then(|e| e.gene.clone()),
        gene_id: top_effect.and_then(|e| e.gene_id.clone()),
        transcript: top_effect.and_then(|e| e.feature_id.clone()),
        exon: top_effect.and_then(|e| e.rank.clone()),
        codon_change: top_effect.and_then(|e| e.hgvs_c.clone()),
        aa_change: top_effect.and_then(|e| e.hgvs_p.clone()),
        biotype: top_effect.and_then(|e| e.biotype.clone()),
        consequence: top_effect.map(|e| e.consequence.clone()),
        impact: top_effect.map(|e| e.impact),
        in_clinvar: clinical.in_clinvar(),
        clinvar_significance: clinical.clinvar_significance.clone(),
        clinvar_disease: clinical.clinvar_disease.clone(),
        in_cosmic: clinical.in_cosmic(),
        is_pathogenic: clinical.is_pathogenic(),
        population_freqs: variant.population_freqs.clone(),
        max_maf_all: variant.population_freqs.max_frequency()
    }
}

/// Builds the library specific document for a variant.
/// Every caller of `caller_set` gets a `caller_data` entry; callers absent from `aggregate` get an empty record.
/// # Arguments
/// * `identity` - the library-variant identity, used as the document id
/// * `genome_build` - genome build label
/// * `key` - the genomic key of the variant
/// * `variant` - the annotated variant
/// * `aggregate` - the resolved callers and their statistics
/// * `metadata` - sample and library metadata
/// * `caller_set` - the closed caller set of the run
pub fn build_library_variant_document(
    identity: String,
    genome_build: &str,
    key: &GenomicKey,
    variant: &AnnotatedVariant,
    aggregate: &CallerAggregate,
    metadata: &SampleMetadata,
    caller_set: &CallerSet
) -> LibraryVariantDocument {
    let caller_data: IndexMap<_, _> = caller_set.callers().iter()
        .map(|&caller| {
            let record = aggregate.record(caller)
                .cloned()
                .unwrap_or_else(CallerRecord::default);
            (caller, record)
        })
        .collect();

    LibraryVariantDocument {
        id: identity,
        reference_genome: genome_build.to_string(),
        sample: metadata.sample.clone(),
        library_name: metadata.library_name.clone(),
        run_id: metadata.run_id.clone(),
        panel_name: metadata.panel.clone(),
        target_pool: metadata.target_pool.clone(),
        sequencer: metadata.sequencer.clone(),
        chrom: key.chrom().to_string(),
        start: key.start(),
        end: key.end(),
        ref_allele: key.ref_allele().to_string(),
        alt_allele: key.alt_allele().to_string(),
        callers: aggregate.callers().to_vec(),
        amplicon_data: variant.amplicon.clone(),
        aggregates: aggregate.statistics(),
        caller_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate_callers;
    use crate::caller_store::CallerRecordStore;
    use crate::data_types::annotated_variant::{Effect, Impact};
    use crate::data_types::callers::CallerName;
    use crate::identity::genomic_key;

    fn test_variant() -> AnnotatedVariant {
        let mut variant = AnnotatedVariant {
            chrom: "chr1".to_string(),
            start: 100,
            end: 101,
            ref_allele: "A".to_string(),
            alt_allele: "T".to_string(),
            callers: vec!["mutect".to_string()],
            rs_ids: vec!["rs123".to_string()],
            effects: vec![
                Effect {
                    allele: "T".to_string(),
                    consequence: "missense_variant".to_string(),
                    impact: Impact::Moderate,
                    gene: Some("KRAS".to_string()),
                    feature_id: Some("ENST00000256078".to_string()),
                    hgvs_p: Some("p.Gly12Asp".to_string()),
                    ..Default::default()
                },
                Effect {
                    allele: "T".to_string(),
                    consequence: "upstream_gene_variant".to_string(),
                    impact: Impact::Modifier,
                    gene: Some("OTHER".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        variant.population_freqs.set("1kg_all", 0.001);
        variant.clinical.cosmic_ids = vec!["COSM521".to_string()];
        variant
    }

    #[test]
    fn test_variant_document() {
        let variant = test_variant();
        let key = genomic_key(&variant);
        let doc = build_variant_document("vid".to_string(), "GRCh37.75", &key, &variant);
        assert_eq!(doc.id, "vid");
        assert_eq!(doc.chrom, "1");
        assert_eq!(doc.gene.as_deref(), Some("KRAS"));
        assert_eq!(doc.transcript.as_deref(), Some("ENST00000256078"));
        assert_eq!(doc.aa_change.as_deref(), Some("p.Gly12Asp"));
        assert_eq!(doc.impact, Some(Impact::Moderate));
        assert!(doc.in_cosmic);
        assert!(!doc.in_clinvar);
        assert_eq!(doc.max_maf_all, 0.001);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_id"], "vid");
        assert_eq!(value["ref"], "A");
        assert_eq!(value["impact"], "MODERATE");
        assert_eq!(value["population_freqs"]["esp_ea"], -1.0);
    }

    #[test]
    fn test_variant_document_without_effects() {
        let mut variant = test_variant();
        variant.effects.clear();
        let key = genomic_key(&variant);
        let doc = build_variant_document("vid".to_string(), "GRCh37.75", &key, &variant);
        assert_eq!(doc.gene, None);
        assert_eq!(doc.consequence, None);
        assert_eq!(doc.impact, None);
    }

    #[test]
    fn test_library_document_shape() {
        let variant = test_variant();
        let key = genomic_key(&variant);
        let mutect: CallerRecord = [("AAF", "0.35"), ("DP", "80")].into_iter().collect();

        let caller_set = CallerSet::new(true);
        let mut store = CallerRecordStore::new("S1", caller_set.clone());
        store.ingest(CallerName::Mutect, vec![(key.clone(), mutect.clone())]).unwrap();
        let aggregate = aggregate_callers(&store, &key, &[CallerName::Mutect]).unwrap();

        let metadata = SampleMetadata {
            sample: "S1".to_string(),
            library_name: "L1".to_string(),
            run_id: "R1".to_string(),
            ..Default::default()
        };
        let doc = build_library_variant_document(
            "lid".to_string(), "GRCh37.75", &key, &variant, &aggregate, &metadata, &caller_set
        );
        assert_eq!(doc.caller_data.len(), 7);
        assert_eq!(doc.caller_data[&CallerName::Mutect], mutect);
        assert!(doc.caller_data[&CallerName::Manta].is_empty());
        assert_eq!(doc.callers, vec![CallerName::Mutect]);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["max_som_aaf"], 0.35);
        assert_eq!(value["min_depth"], 80);
        assert_eq!(value["max_depth"], 80);
        assert_eq!(value["callers"], serde_json::json!(["mutect"]));
        assert_eq!(value["caller_data"]["mutect"], serde_json::json!({"AAF": "0.35", "DP": "80"}));
        for caller in ["freebayes", "vardict", "scalpel", "platypus", "pindel", "manta"] {
            assert_eq!(value["caller_data"][caller], serde_json::json!({}));
        }
        assert_eq!(value["amplicon_data"]["amplicon"], "None");
    }
}
