
/// Summary statistics over the callers of a variant
pub mod aggregate_stats;
/// Annotated variants with effects, population frequencies and clinical flags
pub mod annotated_variant;
/// Raw measurements of one caller at one variant
pub mod caller_record;
/// The closed set of variant callers
pub mod callers;
/// The two output document shapes
pub mod documents;
/// Canonical join key shared by caller records and annotated variants
pub mod genomic_key;
/// Run manifest and per-sample metadata
pub mod sample_metadata;
