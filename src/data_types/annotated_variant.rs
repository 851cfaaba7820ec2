use indexmap::IndexMap;
use serde::Serialize;
use strum_macros::EnumString;

/// Sentinel written for population frequencies that the annotation did not provide
pub const MISSING_FREQUENCY: f64 = -1.0;
/// Placeholder written for amplicon fields that the annotation did not provide
pub const MISSING_AMPLICON: &str = "None";

/// Population frequency keys, in output order; the INFO field for each is `aaf_{key}`
pub const POPULATION_FREQUENCY_KEYS: [&str; 18] = [
    "esp_ea", "esp_aa", "esp_all",
    "1kg_amr", "1kg_eas", "1kg_sas", "1kg_afr", "1kg_eur", "1kg_all",
    "exac_all",
    "adj_exac_all", "adj_exac_afr", "adj_exac_amr", "adj_exac_eas",
    "adj_exac_fin", "adj_exac_nfe", "adj_exac_oth", "adj_exac_sas"
];

/// Putative impact categories from the effect predictor, most severe first
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, strum_macros::Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Impact {
    High=0,
    Moderate,
    Low,
    #[default]
    Modifier
}

/// A single functional effect prediction for one transcript
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Effect {
    /// The allele this prediction applies to
    pub allele: String,
    /// Sequence ontology consequence(s), e.g. "missense_variant"
    pub consequence: String,
    /// Putative impact category
    pub impact: Impact,
    pub gene: Option<String>,
    pub gene_id: Option<String>,
    pub feature_type: Option<String>,
    /// Usually the transcript identifier
    pub feature_id: Option<String>,
    pub biotype: Option<String>,
    /// Exon or intron rank, e.g. "3/11"
    pub rank: Option<String>,
    pub hgvs_c: Option<String>,
    pub hgvs_p: Option<String>
}

/// Clinical and pathogenicity annotations
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClinicalFlags {
    /// ClinVar clinical significance, if the variant is in ClinVar
    pub clinvar_significance: Option<String>,
    /// ClinVar disease name(s)
    pub clinvar_disease: Option<String>,
    /// COSMIC identifiers from the ID column
    pub cosmic_ids: Vec<String>
}

impl ClinicalFlags {
    pub fn in_clinvar(&self) -> bool {
        self.clinvar_significance.is_some()
    }

    pub fn in_cosmic(&self) -> bool {
        !self.cosmic_ids.is_empty()
    }

    /// True if ClinVar reports a pathogenic (or likely pathogenic) significance.
    /// Mixed reports that also mention "benign" are not flagged.
    pub fn is_pathogenic(&self) -> bool {
        match self.clinvar_significance.as_deref() {
            Some(sig) => {
                let sig = sig.to_ascii_lowercase();
                sig.contains("pathogenic") && !sig.contains("benign")
            },
            None => false
        }
    }
}

/// Amplicon and panel intersection data
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AmpliconData {
    pub amplicon: String,
    pub panel_amplicon: String,
    pub intersect: String
}

impl Default for AmpliconData {
    fn default() -> Self {
        Self {
            amplicon: MISSING_AMPLICON.to_string(),
            panel_amplicon: MISSING_AMPLICON.to_string(),
            intersect: MISSING_AMPLICON.to_string()
        }
    }
}

/// Population frequency snapshot with a fixed key set
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PopulationFrequencies {
    frequencies: IndexMap<String, f64>
}

impl Default for PopulationFrequencies {
    /// Every key is present and set to the missing sentinel
    fn default() -> Self {
        Self {
            frequencies: POPULATION_FREQUENCY_KEYS.iter()
                .map(|&k| (k.to_string(), MISSING_FREQUENCY))
                .collect()
        }
    }
}

impl PopulationFrequencies {
    /// Sets a value for one of the known keys, unknown keys are ignored and return false
    pub fn set(&mut self, key: &str, value: f64) -> bool {
        match self.frequencies.get_mut(key) {
            Some(entry) => {
                *entry = value;
                true
            },
            None => false
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.frequencies.get(key).copied()
    }

    /// Maximum reported frequency across all populations, or the sentinel if none were reported
    pub fn max_frequency(&self) -> f64 {
        self.frequencies.values()
            .copied()
            .filter(|&f| f != MISSING_FREQUENCY)
            .fold(MISSING_FREQUENCY, f64::max)
    }
}

/// One entry of the annotated, effect-decorated variant stream.
/// Coordinates follow the same conventions as `GenomicKey`: 0-based start, exclusive end.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotatedVariant {
    /// Chromosome as written in the annotated file
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub ref_allele: String,
    /// First alternate allele
    pub alt_allele: String,
    /// Raw caller labels from the annotation, not yet validated
    pub callers: Vec<String>,
    /// dbSNP identifiers from the ID column
    pub rs_ids: Vec<String>,
    /// Effects ranked most severe first
    pub effects: Vec<Effect>,
    pub population_freqs: PopulationFrequencies,
    pub clinical: ClinicalFlags,
    pub amplicon: AmpliconData
}

impl AnnotatedVariant {
    /// The highest impact effect, which is the first one in the ranked list
    pub fn top_effect(&self) -> Option<&Effect> {
        self.effects.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_impact_order() {
        assert!(Impact::High < Impact::Moderate);
        assert!(Impact::Low < Impact::Modifier);
        assert_eq!(Impact::from_str("moderate").unwrap(), Impact::Moderate);
        assert_eq!(Impact::High.to_string(), "HIGH");
    }

    #[test]
    fn test_population_defaults() {
        let mut freqs = PopulationFrequencies::default();
        assert_eq!(freqs.get("esp_ea"), Some(MISSING_FREQUENCY));
        assert_eq!(freqs.max_frequency(), MISSING_FREQUENCY);

        assert!(freqs.set("1kg_all", 0.02));
        assert!(freqs.set("exac_all", 0.0));
        assert!(!freqs.set("gnomad_all", 0.5));
        assert_eq!(freqs.max_frequency(), 0.02);

        let value = serde_json::to_value(&freqs).unwrap();
        assert_eq!(value.as_object().unwrap().len(), POPULATION_FREQUENCY_KEYS.len());
    }

    #[test]
    fn test_clinical_flags() {
        let mut flags = ClinicalFlags::default();
        assert!(!flags.in_clinvar());
        assert!(!flags.is_pathogenic());

        flags.clinvar_significance = Some("Likely_pathogenic".to_string());
        assert!(flags.in_clinvar());
        assert!(flags.is_pathogenic());

        flags.clinvar_significance = Some("Benign/Likely_benign".to_string());
        assert!(!flags.is_pathogenic());

        flags.clinvar_significance = Some("Conflicting_interpretations:Pathogenic,Benign".to_string());
        assert!(!flags.is_pathogenic());
    }
}
