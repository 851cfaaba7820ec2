use anyhow::ensure;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_required_filename, check_required_folder, AFTER_HELP, FULL_VERSION};
use crate::identity::IdentityFormat;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct ReconcileSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    callsync_version: String,

    /// Run manifest describing the samples to reconcile (JSON)
    #[clap(required = true)]
    #[clap(short = 'm')]
    #[clap(long = "manifest")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub manifest_filename: PathBuf,

    /// Folder containing the normalized caller VCFs and annotated VCFs
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_folder: PathBuf,

    /// Output document store folder
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Output summary file (CSV/TSV)
    #[clap(long = "output-summary")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_summary_filename: Option<PathBuf>,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// Overrides the genome build label from the manifest
    #[clap(long = "genome-build")]
    #[clap(value_name = "BUILD")]
    #[clap(help_heading = Some("Reconcile parameters"))]
    pub genome_build: Option<String>,

    /// Rendering of the document identities
    #[clap(long = "identity-format")]
    #[clap(value_name = "FORMAT")]
    #[clap(help_heading = Some("Reconcile parameters"))]
    #[clap(default_value = "plain")]
    pub identity_format: IdentityFormat,

    /// Adds manta to the caller set
    #[clap(long = "enable-manta")]
    #[clap(help_heading = Some("Reconcile parameters"))]
    pub enable_manta: bool,

    /// Number of samples to process in parallel
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn check_reconcile_settings(mut settings: ReconcileSettings) -> anyhow::Result<ReconcileSettings> {
    // hard code the version in
    settings.callsync_version = FULL_VERSION.clone();
    info!("callsync version: {:?}", &settings.callsync_version);
    info!("Sub-command: reconcile");
    info!("Inputs:");

    check_required_filename(&settings.manifest_filename, "Run manifest")?;
    info!("\tManifest: {:?}", &settings.manifest_filename);
    check_required_folder(&settings.input_folder, "Input folder")?;
    info!("\tInput folder: {:?}", &settings.input_folder);

    // outputs
    info!("Outputs:");
    info!("\tDocument folder: {:?}", &settings.output_folder);
    info!("\tSummary: {:?}", &settings.output_summary_filename);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    info!("Reconcile parameters:");
    if let Some(genome_build) = settings.genome_build.as_ref() {
        ensure!(!genome_build.is_empty(), "--genome-build cannot be empty");
        info!("\tGenome build: {genome_build:?}");
    } else {
        info!("\tGenome build: from manifest");
    }
    info!("\tIdentity format: {}", settings.identity_format);
    info!("\tManta: {}", if settings.enable_manta { "ENABLED" } else { "DISABLED" });

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}
