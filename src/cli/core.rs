use anyhow::bail;
use clap::{Parser, Subcommand};
use chrono::Datelike;
use lazy_static::lazy_static;
use std::path::Path;

use crate::cli::reconcile::ReconcileSettings;

lazy_static! {
    /// Stores the full version string we plan to use, which is generated in build.rs
    /// # Examples
    /// * `0.3.1-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.1-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));

    /// Shared after help string containing the legalese.
    pub static ref AFTER_HELP: String = format!("Copyright (C) 2016-{}     The callsync authors.
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year());
}

#[derive(Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = &**AFTER_HELP)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

/// callsync, reconciles the calls of multiple variant callers with an annotated variant stream.
/// Select a subcommand to see more usage information:
#[derive(Subcommand)]
pub enum Commands {
    /// Builds variant and library-variant documents for every sample of a run
    Reconcile(Box<ReconcileSettings>)
}

pub fn get_cli() -> Cli {
    Cli::parse()
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
pub fn check_required_filename(filename: &Path, label: &str) -> anyhow::Result<()> {
    if !filename.exists() {
        bail!("{} does not exist: \"{}\"", label, filename.display());
    }

    // file exists
    Ok(())
}

/// Checks if a folder exists and is a directory
/// # Arguments
/// * `folder` - the folder path to check for
/// * `label` - the label to use for error messages
pub fn check_required_folder(folder: &Path, label: &str) -> anyhow::Result<()> {
    if !folder.is_dir() {
        bail!("{} is not a folder: \"{}\"", label, folder.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_required_paths() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(check_required_folder(tmp.path(), "Input folder").is_ok());
        assert!(check_required_filename(&tmp.path().join("missing.json"), "Manifest").is_err());
        let err = check_required_folder(&tmp.path().join("missing"), "Input folder").unwrap_err();
        assert!(err.to_string().starts_with("Input folder is not a folder"));
    }
}
