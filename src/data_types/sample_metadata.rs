use anyhow::bail;
use indexmap::IndexMap;
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Run manifest describing every sample to reconcile.
/// Loaded from JSON, values are opaque to the reconciliation itself.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RunManifest {
    /// Genome build label used in every identity, e.g. "GRCh37.75"
    pub genome_build: String,
    /// Default sequencing run identifier for all samples
    #[serde(default)]
    pub run_id: String,
    /// All the samples in the run
    pub samples: Vec<SampleManifest>
}

/// One sample entry of the manifest
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SampleManifest {
    pub sample: String,
    pub library_name: String,
    /// Overrides the run level identifier
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub panel: String,
    #[serde(default)]
    pub target_pool: String,
    #[serde(default)]
    pub sequencer: String,
    /// Caller name to normalized VCF path, overriding the default naming
    #[serde(default)]
    pub caller_vcfs: IndexMap<String, PathBuf>,
    /// Annotated VCF path, overriding the default naming
    #[serde(default)]
    pub annotated_vcf: Option<PathBuf>
}

impl RunManifest {
    /// Resolves the metadata for every sample, applying run level defaults
    pub fn sample_metadata(&self) -> Vec<SampleMetadata> {
        self.samples.iter()
            .map(|s| SampleMetadata {
                sample: s.sample.clone(),
                library_name: s.library_name.clone(),
                run_id: s.run_id.clone().unwrap_or_else(|| self.run_id.clone()),
                panel: s.panel.clone(),
                target_pool: s.target_pool.clone(),
                sequencer: s.sequencer.clone()
            })
            .collect()
    }

    /// Verifies that every sample entry writes its own batch.
    /// Entries are keyed by `SampleMetadata::batch_label`, so an exact duplicate and two entries whose `.` join coincide are both rejected.
    /// # Errors
    /// * if a sample or library name is empty
    /// * if two entries resolve to the same batch label
    pub fn check_batch_labels(&self) -> anyhow::Result<()> {
        let mut seen: HashMap<String, usize> = Default::default();
        for (index, metadata) in self.sample_metadata().iter().enumerate() {
            if metadata.sample.is_empty() || metadata.library_name.is_empty() {
                bail!("Manifest entry {index} must provide both a sample and a library_name");
            }

            let label = metadata.batch_label();
            if let Some(previous) = seen.insert(label.clone(), index) {
                bail!(
                    "Manifest entries {previous} ({}, {}) and {index} ({}, {}) both resolve to batch {label:?}",
                    self.samples[previous].sample, self.samples[previous].library_name,
                    metadata.sample, metadata.library_name
                );
            }
        }
        Ok(())
    }
}

/// Sample and library metadata copied into each library-variant document
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SampleMetadata {
    pub sample: String,
    pub library_name: String,
    pub run_id: String,
    pub panel: String,
    pub target_pool: String,
    pub sequencer: String
}

impl SampleMetadata {
    /// Label used for batches and log messages
    pub fn batch_label(&self) -> String {
        format!("{}.{}", self.sample, self.library_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_defaults() {
        let manifest: RunManifest = serde_json::from_str(r#"{
            "genome_build": "GRCh37.75",
            "run_id": "RUN42",
            "samples": [
                {"sample": "S1", "library_name": "L1", "panel": "onco", "sequencer": "miseq"},
                {"sample": "S2", "library_name": "L2", "run_id": "RUN43",
                 "caller_vcfs": {"mutect": "/data/S2.mutect.vcf"}}
            ]
        }"#).unwrap();

        let metadata = manifest.sample_metadata();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0].run_id, "RUN42");
        assert_eq!(metadata[0].panel, "onco");
        assert_eq!(metadata[0].batch_label(), "S1.L1");
        assert_eq!(metadata[1].run_id, "RUN43");
        assert_eq!(metadata[1].target_pool, "");
        assert_eq!(manifest.samples[1].caller_vcfs["mutect"], PathBuf::from("/data/S2.mutect.vcf"));
    }

    fn manifest_with(entries: &[(&str, &str)]) -> RunManifest {
        RunManifest {
            genome_build: "GRCh37.75".to_string(),
            run_id: "RUN42".to_string(),
            samples: entries.iter()
                .map(|(sample, library)| SampleManifest {
                    sample: sample.to_string(),
                    library_name: library.to_string(),
                    ..Default::default()
                })
                .collect()
        }
    }

    #[test]
    fn test_unique_batch_labels() {
        assert!(manifest_with(&[("S1", "L1"), ("S1", "L2"), ("S2", "L1")]).check_batch_labels().is_ok());
        assert!(manifest_with(&[]).check_batch_labels().is_ok());
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let err = manifest_with(&[("S1", "L1"), ("S2", "L2"), ("S1", "L1")]).check_batch_labels().unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("entries 0"));
        assert!(message.contains("\"S1.L1\""));
    }

    #[test]
    fn test_ambiguous_labels_rejected() {
        // different (sample, library) pairs that render the same label
        let manifest = manifest_with(&[("S1.L", "1"), ("S1", "L.1")]);
        assert_eq!(manifest.sample_metadata()[0].batch_label(), manifest.sample_metadata()[1].batch_label());
        let err = manifest.check_batch_labels().unwrap_err();
        assert!(format!("{err:#}").contains("\"S1.L.1\""));
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(manifest_with(&[("S1", "")]).check_batch_labels().is_err());
        assert!(manifest_with(&[("", "L1")]).check_batch_labels().is_err());
    }
}
