use indexmap::IndexMap;
use serde::Serialize;

use crate::data_types::aggregate_stats::AggregateStatistics;
use crate::data_types::annotated_variant::{AmpliconData, Impact, PopulationFrequencies};
use crate::data_types::callers::CallerName;
use crate::data_types::caller_record::CallerRecord;

/// Genome-wide record, one per distinct genomic key per genome build
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VariantDocument {
    /// Variant identity, the primary key in the store
    #[serde(rename = "_id")]
    pub id: String,
    pub reference_genome: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    #[serde(rename = "ref")]
    pub ref_allele: String,
    #[serde(rename = "alt")]
    pub alt_allele: String,
    pub rs_ids: Vec<String>,
    pub cosmic_ids: Vec<String>,

    // summary of the highest impact effect
    pub gene: Option<String>,
    pub gene_id: Option<String>,
    pub transcript: Option<String>,
    pub exon: Option<String>,
    pub codon_change: Option<String>,
    pub aa_change: Option<String>,
    pub biotype: Option<String>,
    pub consequence: Option<String>,
    pub impact: Option<Impact>,

    // clinical flags
    pub in_clinvar: bool,
    pub clinvar_significance: Option<String>,
    pub clinvar_disease: Option<String>,
    pub in_cosmic: bool,
    pub is_pathogenic: bool,

    pub population_freqs: PopulationFrequencies,
    /// Maximum population frequency, -1 if no population reported one
    pub max_maf_all: f64
}

/// Per sample/library record of how the callers saw one variant
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LibraryVariantDocument {
    /// Library-variant identity, the primary key in the store
    #[serde(rename = "_id")]
    pub id: String,
    pub reference_genome: String,
    pub sample: String,
    pub library_name: String,
    pub run_id: String,
    pub panel_name: String,
    pub target_pool: String,
    pub sequencer: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    #[serde(rename = "ref")]
    pub ref_allele: String,
    #[serde(rename = "alt")]
    pub alt_allele: String,
    /// Callers that reported this variant, in reported order
    pub callers: Vec<CallerName>,
    pub amplicon_data: AmpliconData,
    #[serde(flatten)]
    pub aggregates: AggregateStatistics,
    /// One entry per caller of the configured set; callers that did not report the variant are empty
    pub caller_data: IndexMap<CallerName, CallerRecord>
}
