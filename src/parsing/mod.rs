/*!
# Parsing module
Contains the logic for parsing input files into meaningful structs / data.
*/
/// Streams the annotated, effect-decorated VCF
pub mod annotation;
/// One parser per variant caller VCF flavor
pub mod caller_parsers;
/// Helper functions for noodles
pub mod noodles_helper;
