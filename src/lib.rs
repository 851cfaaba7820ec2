/*!
# callsync
Reconciles the per-caller records of a sequencing sample with its annotated variant stream, producing one genome-wide variant document and one library-variant document per variant.
*/
/// Folds the caller records of one variant into summary statistics
pub mod aggregation;
/// Pure document construction from a variant and its aggregate
pub mod assembler;
/// Per-sample store of caller records keyed by genomic position
pub mod caller_store;
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Buffers documents and flushes them in bulk
pub mod emitter;
/// Error taxonomy for reconciliation failures
pub mod errors;
/// Join keys and document identities
pub mod identity;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Drives one sample from input files to flushed documents
pub mod reconciler;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
