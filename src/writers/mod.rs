/*!
# Writers module
Contains the logic for writing the documents and the run summary.
*/
/// Bulk document persistence
pub mod document_store;
/// Generates the per-sample summary file
pub mod reconcile_summary;
