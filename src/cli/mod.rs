/*!
# CLI module
Command line interface functionality that is specific to callsync.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// The reconcile CLI subcommand
pub mod reconcile;
