/*!
# Annotated stream reader
Streams the annotated, effect-decorated VCF of a sample as `AnnotatedVariant` values.
Effects come from the snpEff `ANN` field, whose column layout is read from the header description.
*/
use anyhow::Context;
use log::{trace, warn};
use noodles::vcf;
use noodles::vcf::variant::RecordBuf;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::data_types::annotated_variant::{
    AmpliconData, AnnotatedVariant, ClinicalFlags, Effect, Impact, PopulationFrequencies, POPULATION_FREQUENCY_KEYS
};
use crate::parsing::noodles_helper::{info_number, info_string, info_strings, open_vcf, VcfReader};

/// INFO key listing the callers that reported the variant
pub const INFO_CALLERS: &str = "CALLERS";
/// INFO key of the snpEff effect predictions
pub const INFO_ANN: &str = "ANN";
/// Prefix of the population frequency INFO keys
pub const POPULATION_PREFIX: &str = "aaf_";

/// Default snpEff ANN layout, used when the header does not describe it
pub const DEFAULT_ANN_KEYS: [&str; 16] = [
    "Allele", "Annotation", "Annotation_Impact", "Gene_Name", "Gene_ID", "Feature_Type", "Feature_ID",
    "Transcript_BioType", "Rank", "HGVS.c", "HGVS.p", "cDNA.pos / cDNA.length", "CDS.pos / CDS.length",
    "AA.pos / AA.length", "Distance", "ERRORS / WARNINGS / INFO"
];

/// Reads the ANN column names from the header description, e.g.
/// `Functional annotations: 'Allele | Annotation | Annotation_Impact | ...'`
pub fn parse_ann_keys(header: &vcf::Header) -> Vec<String> {
    let description = header.infos()
        .get(INFO_ANN)
        .map(|info| info.description());

    let keys: Vec<String> = match description.and_then(|d| d.split_once(':')) {
        Some((_label, layout)) => {
            layout.trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .split('|')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect()
        },
        None => vec![]
    };

    if keys.is_empty() {
        DEFAULT_ANN_KEYS.iter().map(|k| k.to_string()).collect()
    } else {
        keys
    }
}

/// Parses the ANN entries of a record, ranked by impact with the original order kept within an impact level
/// # Arguments
/// * `record` - the annotated record
/// * `ann_keys` - column layout of each ANN entry
pub fn parse_effects(record: &RecordBuf, ann_keys: &[String]) -> Vec<Effect> {
    let column = |name: &str| ann_keys.iter().position(|k| k == name);
    let allele_col = column("Allele");
    let consequence_col = column("Annotation");
    let impact_col = column("Annotation_Impact");
    let gene_col = column("Gene_Name");
    let gene_id_col = column("Gene_ID");
    let feature_type_col = column("Feature_Type");
    let feature_id_col = column("Feature_ID");
    let biotype_col = column("Transcript_BioType");
    let rank_col = column("Rank");
    let hgvs_c_col = column("HGVS.c");
    let hgvs_p_col = column("HGVS.p");

    let mut effects: Vec<Effect> = info_strings(record, INFO_ANN).iter()
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let values: Vec<&str> = entry.split('|').map(|v| v.trim()).collect();
            let get = |col: Option<usize>| -> Option<String> {
                col.and_then(|i| values.get(i))
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string())
            };

            let impact = match get(impact_col) {
                Some(raw) => Impact::from_str(&raw).unwrap_or_else(|_e| {
                    trace!("Unrecognized impact {raw:?}, treating as {}", Impact::Modifier);
                    Impact::Modifier
                }),
                None => Impact::Modifier
            };

            Effect {
                allele: get(allele_col).unwrap_or_default(),
                consequence: get(consequence_col).unwrap_or_default(),
                impact,
                gene: get(gene_col),
                gene_id: get(gene_id_col),
                feature_type: get(feature_type_col),
                feature_id: get(feature_id_col),
                biotype: get(biotype_col),
                rank: get(rank_col),
                hgvs_c: get(hgvs_c_col),
                hgvs_p: get(hgvs_p_col)
            }
        })
        .collect();

    // stable, so ties keep the predictor's order
    effects.sort_by_key(|e| e.impact);
    effects
}

/// Reads the `aaf_*` population frequencies.
/// A reported frequency of 0 is kept as 0; only absent or non-numeric values stay at the -1 sentinel.
/// Loaders that treat every falsy value as missing would store -1 for those zeros instead, so values
/// from such pipelines are not directly comparable for never-observed alleles.
pub fn parse_population_frequencies(record: &RecordBuf) -> PopulationFrequencies {
    let mut frequencies = PopulationFrequencies::default();
    for key in POPULATION_FREQUENCY_KEYS.iter() {
        if let Some(value) = info_number(record, &format!("{POPULATION_PREFIX}{key}")) {
            frequencies.set(key, value);
        }
    }
    frequencies
}

/// Splits the ID column into dbSNP and COSMIC identifiers
pub fn parse_identifiers(record: &RecordBuf) -> (Vec<String>, Vec<String>) {
    let mut rs_ids = vec![];
    let mut cosmic_ids = vec![];
    for id in record.ids().as_ref().iter().flat_map(|i| i.split(';')) {
        if id.starts_with("rs") {
            rs_ids.push(id.to_string());
        } else if id.starts_with("COS") {
            cosmic_ids.push(id.to_string());
        }
    }
    (rs_ids, cosmic_ids)
}

/// Converts one annotated record into an `AnnotatedVariant`
/// # Arguments
/// * `record` - the annotated record
/// * `ann_keys` - the ANN column layout from the header
/// # Errors
/// * if the record has no position or no ALT allele
pub fn annotated_variant_from_record(record: &RecordBuf, ann_keys: &[String]) -> anyhow::Result<AnnotatedVariant> {
    let chrom = record.reference_sequence_name().to_string();
    let position = record.variant_start()
        .with_context(|| format!("Missing POS on {chrom}"))?;
    let alternate_bases = record.alternate_bases().as_ref();
    let alt_allele = alternate_bases.first()
        .with_context(|| format!("Missing ALT at {chrom}:{position}"))?;
    if alternate_bases.len() > 1 {
        warn!("{chrom}:{position} has {} ALT alleles, only the first is reconciled", alternate_bases.len());
    }

    let ref_allele = record.reference_bases().to_string();
    let start = (position.get() - 1) as u64;
    let end = start + ref_allele.len() as u64;

    let callers: Vec<String> = info_strings(record, INFO_CALLERS).iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let (rs_ids, cosmic_ids) = parse_identifiers(record);
    let clinical = ClinicalFlags {
        clinvar_significance: info_string(record, "clinvar_sig"),
        clinvar_disease: info_string(record, "clinvar_disease_name"),
        cosmic_ids
    };

    let default_amplicon = AmpliconData::default();
    let amplicon = AmpliconData {
        amplicon: info_string(record, "amplicon_target").unwrap_or(default_amplicon.amplicon),
        panel_amplicon: info_string(record, "panel_target").unwrap_or(default_amplicon.panel_amplicon),
        intersect: info_string(record, "amplicon_intersect").unwrap_or(default_amplicon.intersect)
    };

    Ok(AnnotatedVariant {
        chrom,
        start,
        end,
        ref_allele,
        alt_allele: alt_allele.clone(),
        callers,
        rs_ids,
        effects: parse_effects(record, ann_keys),
        population_freqs: parse_population_frequencies(record),
        clinical,
        amplicon
    })
}

/// Iterator over the annotated variants of one VCF, in file order
pub struct AnnotatedVariantReader {
    /// Source file, for error messages
    vcf_path: PathBuf,
    reader: VcfReader,
    header: vcf::Header,
    /// ANN column layout
    ann_keys: Vec<String>,
    /// Reusable record buffer
    record: RecordBuf,
    /// Set once the end of file or an error was reached
    finished: bool
}

impl AnnotatedVariantReader {
    /// Opens an annotated VCF
    /// # Errors
    /// * if the file cannot be opened or its header is invalid
    pub fn from_path(vcf_path: &Path) -> anyhow::Result<Self> {
        let (reader, header) = open_vcf(vcf_path)?;
        let ann_keys = parse_ann_keys(&header);
        trace!("ANN layout for {vcf_path:?}: {ann_keys:?}");
        Ok(Self {
            vcf_path: vcf_path.to_path_buf(),
            reader,
            header,
            ann_keys,
            record: RecordBuf::default(),
            finished: false
        })
    }

    // getters
    pub fn ann_keys(&self) -> &[String] {
        &self.ann_keys
    }
}

impl Iterator for AnnotatedVariantReader {
    type Item = anyhow::Result<AnnotatedVariant>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_record_buf(&self.header, &mut self.record) {
            Ok(0) => {
                self.finished = true;
                None
            },
            Ok(_) => {
                let result = annotated_variant_from_record(&self.record, &self.ann_keys)
                    .with_context(|| format!("Error while converting record from {:?}:", self.vcf_path));
                if result.is_err() {
                    self.finished = true;
                }
                Some(result)
            },
            Err(e) => {
                self.finished = true;
                Some(Err(e).with_context(|| format!("Error while reading record from {:?}:", self.vcf_path)))
            }
        }
    }
}
