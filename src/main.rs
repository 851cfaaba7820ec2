use indicatif::ParallelProgressIterator;
use log::{LevelFilter, error, info};
use rayon::prelude::*;
use std::time::Instant;

use callsync::cli::core::{Commands, get_cli};
use callsync::cli::reconcile::{ReconcileSettings, check_reconcile_settings};
use callsync::data_types::callers::CallerSet;
use callsync::data_types::sample_metadata::{RunManifest, SampleMetadata};
use callsync::identity::IdentityRegistry;
use callsync::reconciler::{ReconcileConfigBuilder, SampleSummary, process_sample};
use callsync::util::json_io::{load_json, save_json};
use callsync::util::progress_bar::get_progress_style;
use callsync::writers::document_store::JsonDocumentStore;
use callsync::writers::reconcile_summary::{ReconcileSummaryWriter, SampleStatus};

fn run_reconcile(settings: ReconcileSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let settings = match check_reconcile_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // set up the number of threads for rayon
    match rayon::ThreadPoolBuilder::new().num_threads(settings.threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };

    // create a debug folder if specified
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("Creating debug folder at {debug_folder:?}...");
        match std::fs::create_dir_all(debug_folder) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while creating debug folder: {e}");
                std::process::exit(exitcode::IOERR);
            }
        }

        // save the CLI options
        let cli_json = debug_folder.join("cli_settings.json");
        info!("Saving CLI options to {cli_json:?}...");
        if let Err(e) = save_json(&settings, &cli_json) {
            error!("Error while saving CLI options: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // load the run manifest
    info!("Loading run manifest...");
    let manifest: RunManifest = match load_json(&settings.manifest_filename) {
        Ok(m) => m,
        Err(e) => {
            error!("Error while loading run manifest: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    if let Err(e) = manifest.check_batch_labels() {
        error!("Error while validating run manifest: {e:#}");
        std::process::exit(exitcode::CONFIG);
    }
    let genome_build = settings.genome_build.clone().unwrap_or_else(|| manifest.genome_build.clone());
    if genome_build.is_empty() {
        error!("No genome build provided by the manifest or --genome-build");
        std::process::exit(exitcode::CONFIG);
    }
    info!("Loaded {} samples for genome build {genome_build:?}", manifest.samples.len());

    // build our configuration
    let reconcile_config = match ReconcileConfigBuilder::default()
        .genome_build(genome_build)
        .identity_format(settings.identity_format)
        .caller_set(CallerSet::new(settings.enable_manta))
        .input_folder(settings.input_folder.clone())
        .build() {
        Ok(rc) => rc,
        Err(e) => {
            error!("Error while building reconcile config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Creating document store at {:?}...", settings.output_folder);
    let document_store = match JsonDocumentStore::new(&settings.output_folder) {
        Ok(ds) => ds,
        Err(e) => {
            error!("Error while creating document store: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    // each sample is reconciled independently; only the identity registry is shared
    let registry = IdentityRegistry::default();
    let all_metadata = manifest.sample_metadata();
    let style = get_progress_style();
    info!("Reconciling samples...");
    let all_results: Vec<(SampleMetadata, anyhow::Result<SampleSummary>)> = manifest.samples.par_iter()
        .zip(all_metadata.into_par_iter())
        .map(|(sample, metadata)| {
            let result = process_sample(sample, &metadata, &reconcile_config, &registry, &document_store);
            if let Err(e) = result.as_ref() {
                error!("Error while reconciling {}: {e:#}", metadata.batch_label());
            }
            (metadata, result)
        })
        .progress_with_style(style)
        .collect();

    let mut summary_writer = ReconcileSummaryWriter::default();
    for (metadata, result) in all_results.iter() {
        match result {
            Ok(summary) => summary_writer.add_completed(summary),
            Err(e) => summary_writer.add_failed(metadata, e)
        };
    }

    let completed = summary_writer.num_samples(SampleStatus::Completed);
    let failed = summary_writer.num_samples(SampleStatus::Failed);
    info!("Distinct identities: {}", registry.len());
    info!("Completed:failed samples: {completed} : {failed}");

    if let Some(summary_fn) = settings.output_summary_filename.as_ref() {
        info!("Saving output summary to {summary_fn:?}...");
        if let Err(e) = summary_writer.write_summary(summary_fn) {
            error!("Error while saving summary file: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Reconciliation completed in {} seconds.", start_time.elapsed().as_secs_f64());
    if failed > 0 {
        std::process::exit(exitcode::DATAERR);
    }
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Reconcile(settings) => {
            run_reconcile(*settings);
        }
    }
    info!("Process finished successfully.");
}
