/*!
# Batch emitter
Buffers the assembled documents of one sample/library and hands them to a `DocumentStore` as one batch covering both collections.
*/
use anyhow::Context;
use log::debug;
use serde_json::Value;

use crate::data_types::documents::{LibraryVariantDocument, VariantDocument};
use crate::writers::document_store::DocumentStore;

/// Counts from a completed flush
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FlushSummary {
    pub variants: usize,
    pub library_variants: usize
}

/// Ordered document buffers for one sample/library
#[derive(Debug)]
pub struct BatchEmitter {
    /// Label used for the batch in the store
    batch_label: String,
    /// Genome-wide documents, in stream order
    variants: Vec<VariantDocument>,
    /// Library documents, in stream order
    library_variants: Vec<LibraryVariantDocument>
}

impl BatchEmitter {
    /// Constructor
    /// # Arguments
    /// * `batch_label` - identifies the sample/library in the store
    pub fn new(batch_label: String) -> Self {
        Self {
            batch_label,
            variants: vec![],
            library_variants: vec![]
        }
    }

    /// Adds the pair of documents assembled for one variant
    pub fn push(&mut self, variant: VariantDocument, library_variant: LibraryVariantDocument) {
        self.variants.push(variant);
        self.library_variants.push(library_variant);
    }

    /// Hands both document sequences to the store, consuming the emitter.
    /// Every document is serialized before the store is called, so a serialization failure never reaches the store.
    /// # Arguments
    /// * `store` - the persistence collaborator
    /// # Errors
    /// * if serialization fails or the store rejects the batch, in which case neither collection was written
    pub fn flush(self, store: &dyn DocumentStore) -> anyhow::Result<FlushSummary> {
        let variant_values: Vec<Value> = self.variants.iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .with_context(|| format!("Error while serializing variant documents for {}:", self.batch_label))?;
        let library_values: Vec<Value> = self.library_variants.iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .with_context(|| format!("Error while serializing library variant documents for {}:", self.batch_label))?;

        let summary = FlushSummary {
            variants: variant_values.len(),
            library_variants: library_values.len()
        };

        debug!("Flushing {} with {summary:?}", self.batch_label);
        store.insert_batch(&self.batch_label, variant_values, library_values)
            .with_context(|| format!("Error while inserting documents for {}:", self.batch_label))?;
        Ok(summary)
    }

    // getters
    pub fn batch_label(&self) -> &str {
        &self.batch_label
    }

    pub fn variants(&self) -> &[VariantDocument] {
        &self.variants
    }

    pub fn library_variants(&self) -> &[LibraryVariantDocument] {
        &self.library_variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
