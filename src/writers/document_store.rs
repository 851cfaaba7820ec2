use anyhow::Context;
use log::{debug, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::util::json_io::save_json;

/// The two collections documents are written to
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display)]
pub enum Collection {
    /// Genome-wide variant documents
    #[strum(serialize = "variant")]
    Variant,
    /// Library specific variant documents
    #[strum(serialize = "library_variant")]
    LibraryVariant
}

/// Persistence collaborator that accepts finished documents in bulk.
/// Implementations must tolerate concurrent calls from different sample workers.
pub trait DocumentStore: Sync {
    /// Inserts the documents of one sample/library into both collections.
    /// Either both collections receive their batch or neither does.
    /// # Arguments
    /// * `batch_label` - identifies the sample/library the batch belongs to
    /// * `variants` - the serialized variant documents, in order
    /// * `library_variants` - the serialized library-variant documents, in order
    /// # Errors
    /// * if either collection cannot be written, in which case nothing is visible
    fn insert_batch(&self, batch_label: &str, variants: Vec<Value>, library_variants: Vec<Value>) -> anyhow::Result<()>;
}

/// Writes each batch to `{root}/{collection}/{batch_label}.json.gz` as a JSON array.
/// Both files are staged under a temporary name and only renamed into place once both are fully written.
pub struct JsonDocumentStore {
    /// Output root folder
    root: PathBuf
}

impl JsonDocumentStore {
    /// Creates the collection folders under `root`
    /// # Errors
    /// * if the folders cannot be created
    pub fn new(root: &Path) -> anyhow::Result<Self> {
        for collection in [Collection::Variant, Collection::LibraryVariant] {
            let folder = root.join(collection.to_string());
            std::fs::create_dir_all(&folder)
                .with_context(|| format!("Error while creating collection folder {folder:?}:"))?;
        }
        Ok(Self {
            root: root.to_path_buf()
        })
    }

    /// Final location of a batch
    pub fn batch_path(&self, collection: Collection, batch_label: &str) -> PathBuf {
        self.root.join(collection.to_string()).join(format!("{batch_label}.json.gz"))
    }

    /// Staging location of a batch before it is committed
    fn staging_path(&self, collection: Collection, batch_label: &str) -> PathBuf {
        self.root.join(collection.to_string()).join(format!(".{batch_label}.tmp.gz"))
    }
}

/// Removes files left by a failed batch, a missing file is fine
fn discard_files(paths: &[&Path]) {
    for path in paths.iter() {
        match std::fs::remove_file(path) {
            Ok(()) => {},
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => warn!("Error while removing {path:?}: {e}")
        }
    }
}

/// Moves a previously committed file back into place after a failed commit
fn restore_previous(backup: Option<&Path>, final_path: &Path) {
    if let Some(backup) = backup {
        if let Err(e) = std::fs::rename(backup, final_path) {
            warn!("Error while restoring {final_path:?} from {backup:?}: {e}");
        }
    }
}

impl DocumentStore for JsonDocumentStore {
    fn insert_batch(&self, batch_label: &str, variants: Vec<Value>, library_variants: Vec<Value>) -> anyhow::Result<()> {
        let variant_final = self.batch_path(Collection::Variant, batch_label);
        let variant_tmp = self.staging_path(Collection::Variant, batch_label);
        let variant_backup = self.root.join(Collection::Variant.to_string()).join(format!(".{batch_label}.prev.gz"));
        let library_final = self.batch_path(Collection::LibraryVariant, batch_label);
        let library_tmp = self.staging_path(Collection::LibraryVariant, batch_label);

        // stage both collections
        debug!("Staging {} variant and {} library variant documents for {batch_label}...", variants.len(), library_variants.len());
        let staged = save_json(&variants, &variant_tmp)
            .and_then(|()| save_json(&library_variants, &library_tmp));
        if let Err(e) = staged {
            discard_files(&[&variant_tmp, &library_tmp]);
            return Err(e.context(format!("Error while staging batch {batch_label}:")));
        }

        // a batch committed by an earlier run is set aside until the new pair is in place
        let backup = if variant_final.is_file() {
            if let Err(e) = std::fs::rename(&variant_final, &variant_backup) {
                discard_files(&[&variant_tmp, &library_tmp]);
                return Err(anyhow::Error::new(e)
                    .context(format!("Error while moving {variant_final:?} to {variant_backup:?}:")));
            }
            Some(variant_backup.as_path())
        } else {
            None
        };

        // commit, undoing the first rename if the second one fails
        if let Err(e) = std::fs::rename(&variant_tmp, &variant_final) {
            restore_previous(backup, &variant_final);
            discard_files(&[&variant_tmp, &library_tmp]);
            return Err(anyhow::Error::new(e)
                .context(format!("Error while moving {variant_tmp:?} to {variant_final:?}:")));
        }
        if let Err(e) = std::fs::rename(&library_tmp, &library_final) {
            discard_files(&[&variant_final, &library_tmp]);
            restore_previous(backup, &variant_final);
            return Err(anyhow::Error::new(e)
                .context(format!("Error while moving {library_tmp:?} to {library_final:?}:")));
        }

        if let Some(backup) = backup {
            discard_files(&[backup]);
        }
        debug!("Committed {variant_final:?} and {library_final:?}");
        Ok(())
    }
}

/// One committed batch held by the memory store
type MemoryBatch = (String, Vec<Value>, Vec<Value>);

/// Keeps every inserted batch in memory, mostly useful for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    batches: Mutex<Vec<MemoryBatch>>
}

impl MemoryDocumentStore {
    /// All documents inserted into a collection, in insertion order
    pub fn documents(&self, collection: Collection) -> Vec<Value> {
        self.batches.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .flat_map(|(_label, variants, library_variants)| match collection {
                Collection::Variant => variants.iter().cloned(),
                Collection::LibraryVariant => library_variants.iter().cloned()
            })
            .collect()
    }

    /// Number of `insert_batch` calls received
    pub fn num_batches(&self) -> usize {
        self.batches.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn insert_batch(&self, batch_label: &str, variants: Vec<Value>, library_variants: Vec<Value>) -> anyhow::Result<()> {
        self.batches.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((batch_label.to_string(), variants, library_variants));
        Ok(())
    }
}
