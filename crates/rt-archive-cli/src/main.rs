mod commands;
mod logging;
mod progress;

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use rt_archive_core::local::{LocalLibrary, LocalStatus};
use rt_archive_core::sources::{CatalogSource, HttpCatalog};
use rt_archive_core::{AppConfig, Materializer, ProgressReporter, TrackerEngine};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger(args.verbose);

    let config = match rt_archive_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match args.command {
        Some(Commands::Update { dry_run }) => {
            if let Err(err) = run_update(&config, dry_run) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Some(Commands::CheckLocal { root }) => {
            if let Err(err) = run_check_local(&config, root) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_update(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let engine = TrackerEngine::new(config.clone())?;
    let reporter = CliReporter::new();
    let run = engine.run(&reporter)?;

    let global = &run.rollup.global;
    println!();
    info!(
        "Fetch: {}, Reconcile: {}",
        format!("{:.2}s", run.fetch_duration.as_secs_f64()).green(),
        format!("{:.2}s", run.reconcile_duration.as_secs_f64()).green(),
    );
    info!(
        "{} catalog items across {} shows, {} mirror records",
        format!("{}", global.count).cyan(),
        format!("{}", run.rollup.groups.len()).cyan(),
        format!("{}", run.mirror_total).cyan(),
    );
    info!(
        "{} complete, {} incomplete, {} missing ({:.2}%), {} removed",
        format!("{}", global.complete).green(),
        format!("{}", global.incomplete).yellow(),
        format!("{}", global.missing).red(),
        global.percent_missing(),
        format!("{}", global.removed).magenta(),
    );

    let stats = &run.ledger.stats;
    if stats.unmatched_mirror_records > 0 || stats.inconsistent_removals > 0 {
        info!(
            "{} mirror records outside the catalog, {} removed ids not in the mirror",
            stats.unmatched_mirror_records, stats.inconsistent_removals
        );
    }
    let dropped = run.catalog.invalid + stats.invalid_records;
    if dropped > 0 {
        info!("{} invalid catalog records dropped", format!("{}", dropped).red());
    }

    if dry_run {
        info!("Dry run, no artifacts written");
        return Ok(());
    }

    Materializer::new(config)
        .write(&run, &reporter)
        .context("writing artifacts")?;

    Ok(())
}

fn run_check_local(config: &AppConfig, root: Option<PathBuf>) -> anyhow::Result<()> {
    let Some(root) = root.or_else(|| config.local.root.clone()) else {
        bail!("no local library root given (use --root or set local.root)");
    };

    let reporter = CliReporter::new();
    let catalog = HttpCatalog::new(config)?.fetch(&reporter)?;

    reporter.on_local_scan_start(catalog.items.len());
    let start = Instant::now();
    let library = LocalLibrary::new(
        &root,
        &config.local.required_extensions,
        &config.exclusions.id_prefix,
    );
    let results = library
        .scan(&catalog.items)
        .with_context(|| format!("reading local library {}", root.display()))?;
    let absent: Vec<_> = results
        .iter()
        .filter(|r| r.status != LocalStatus::Present)
        .collect();
    reporter.on_local_scan_complete(absent.len(), start.elapsed().as_secs_f64());

    for result in &absent {
        match &result.status {
            LocalStatus::Incomplete(path) => println!(
                "{} {} ({}) {}",
                "incomplete".yellow(),
                result.canonical_id,
                result.title,
                path.display()
            ),
            LocalStatus::Unchecked => println!(
                "{} {} ({}) has no season or episode number",
                "unchecked".dimmed(),
                result.canonical_id,
                result.title
            ),
            _ => println!(
                "{} {} ({})",
                "missing".red(),
                result.canonical_id,
                result.title
            ),
        }
    }

    info!(
        "{} of {} items present locally",
        format!("{}", results.len() - absent.len()).green(),
        results.len()
    );
    Ok(())
}
