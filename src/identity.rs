/*!
# Key derivation
Pure functions deriving the join key and the two document identities.
Identities are deterministic so re-running a sample produces the same primary keys, which the store treats as upserts.
*/
use log::trace;
use rustc_hash::FxHashMap as HashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::sync::Mutex;
use strum_macros::EnumString;

use crate::data_types::annotated_variant::AnnotatedVariant;
use crate::data_types::genomic_key::GenomicKey;
use crate::errors::ReconcileError;

/// Separator between the fields of an identity
pub const IDENTITY_SEPARATOR: &str = "_";
/// Prefix escaping a separator or another escape inside a field
pub const IDENTITY_ESCAPE: char = '\\';

/// How identities are rendered
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum IdentityFormat {
    /// Human readable concatenation of the fields
    #[default]
    #[strum(ascii_case_insensitive, serialize = "plain")]
    #[clap(name = "plain")]
    Plain,
    /// Fixed-width SHA-256 hex digest of the escaped plain form
    #[strum(ascii_case_insensitive, serialize = "sha256")]
    #[clap(name = "sha256")]
    Sha256
}

/// Derives the join key of an annotated variant.
/// This goes through the same constructor as caller records, so both sides share one chromosome convention.
pub fn genomic_key(variant: &AnnotatedVariant) -> GenomicKey {
    GenomicKey::new(
        &variant.chrom, variant.start, variant.end,
        &variant.ref_allele, &variant.alt_allele
    )
}

/// Genome-wide identity of a variant
/// # Arguments
/// * `genome_build` - the genome build label, e.g. "GRCh37.75"
/// * `key` - the genomic key of the variant
/// * `format` - plain or hashed rendering
pub fn variant_identity(genome_build: &str, key: &GenomicKey, format: IdentityFormat) -> String {
    let plain = join_fields(&[
        genome_build, key.chrom(), &key.start().to_string(), key.ref_allele(), key.alt_allele()
    ]);
    render_identity(plain, format)
}

/// Library specific identity of a variant
/// # Arguments
/// * `genome_build` - the genome build label, e.g. "GRCh37.75"
/// * `library_name` - the sequencing library
/// * `key` - the genomic key of the variant
/// * `format` - plain or hashed rendering
pub fn library_variant_identity(genome_build: &str, library_name: &str, key: &GenomicKey, format: IdentityFormat) -> String {
    let plain = join_fields(&[
        genome_build, library_name, key.chrom(), &key.start().to_string(), key.ref_allele(), key.alt_allele()
    ]);
    render_identity(plain, format)
}

/// Escapes the separator and the escape character inside one field.
/// Fields without either are returned untouched, so common identities stay readable.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(IDENTITY_SEPARATOR) || field.contains(IDENTITY_ESCAPE) {
        let mut escaped = String::with_capacity(field.len() + 4);
        for c in field.chars() {
            if c == IDENTITY_ESCAPE || IDENTITY_SEPARATOR.starts_with(c) {
                escaped.push(IDENTITY_ESCAPE);
            }
            escaped.push(c);
        }
        Cow::Owned(escaped)
    } else {
        Cow::Borrowed(field)
    }
}

/// Joins escaped fields with the separator; distinct field lists always give distinct strings
fn join_fields(fields: &[&str]) -> String {
    fields.iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(IDENTITY_SEPARATOR)
}

fn render_identity(plain: String, format: IdentityFormat) -> String {
    match format {
        IdentityFormat::Plain => plain,
        IdentityFormat::Sha256 => format!("{:x}", Sha256::digest(plain.as_bytes()))
    }
}

/// The entity an identity was derived for
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct IdentityOwner {
    /// None for genome-wide identities
    library_name: Option<String>,
    key: GenomicKey
}

impl std::fmt::Display for IdentityOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.library_name.as_ref() {
            Some(library) => write!(f, "{} in library {library}", self.key),
            None => write!(f, "{}", self.key)
        }
    }
}

/// Run-scoped record of every identity handed out, used to detect two different variants sharing one primary key.
/// Safe to share between sample workers.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    assigned: Mutex<HashMap<String, IdentityOwner>>
}

impl IdentityRegistry {
    /// Registers a genome-wide identity
    /// # Errors
    /// * if the identity was previously derived from a different genomic key
    pub fn register_variant(&self, identity: &str, key: &GenomicKey) -> Result<(), ReconcileError> {
        self.register(identity, IdentityOwner { library_name: None, key: key.clone() })
    }

    /// Registers a library-variant identity
    /// # Errors
    /// * if the identity was previously derived from a different library or genomic key
    pub fn register_library_variant(&self, identity: &str, library_name: &str, key: &GenomicKey) -> Result<(), ReconcileError> {
        self.register(identity, IdentityOwner { library_name: Some(library_name.to_string()), key: key.clone() })
    }

    fn register(&self, identity: &str, owner: IdentityOwner) -> Result<(), ReconcileError> {
        // a poisoned lock only means another worker panicked, the map itself is still consistent
        let mut assigned = self.assigned.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match assigned.get(identity) {
            Some(existing) if existing != &owner => {
                Err(ReconcileError::IdentityCollision {
                    identity: identity.to_string(),
                    existing: existing.to_string(),
                    incoming: owner.to_string()
                })
            },
            Some(_) => {
                trace!("Identity {identity} re-derived for the same variant");
                Ok(())
            },
            None => {
                assigned.insert(identity.to_string(), owner);
                Ok(())
            }
        }
    }

    /// Number of distinct identities handed out so far
    pub fn len(&self) -> usize {
        self.assigned.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
