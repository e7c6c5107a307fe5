use crate::aggregate::{aggregate_by_show, Rollup};
use crate::completeness::CompletenessRequirement;
use crate::config::AppConfig;
use crate::error::Error;
use crate::model::Ledger;
use crate::normalize::IdFilter;
use crate::progress::ProgressReporter;
use crate::reconcile::{MirrorInventory, Reconciler, RemovedSet};
use crate::slugs::ShowSlugs;
use crate::sources::{
    CatalogSnapshot, CatalogSource, CsvRemovedSource, HttpCatalog, HttpMirror, MirrorSource,
    RemovedSource,
};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Runs one full pass: fetch every source, reconcile, aggregate.
pub struct TrackerEngine {
    config: AppConfig,
    catalog: Box<dyn CatalogSource>,
    mirror: Box<dyn MirrorSource>,
    removed: Box<dyn RemovedSource>,
    episodes: Option<Box<dyn CatalogSource>>,
    slugs: Option<ShowSlugs>,
}

#[derive(Debug)]
pub struct RunOutput {
    pub catalog: CatalogSnapshot,
    /// Secondary listing, mirrored but not reconciled.
    pub episodes: Option<CatalogSnapshot>,
    /// Mirror records that survived the exclusion filter.
    pub mirror_total: usize,
    pub mirror_requests: u32,
    pub removed_total: usize,
    pub ledger: Ledger,
    pub rollup: Rollup,
    /// Show name to slug, in rollup group order.
    pub show_slugs: Vec<(String, String)>,
    pub fetch_duration: Duration,
    pub reconcile_duration: Duration,
}

impl TrackerEngine {
    /// Engine wired to the live HTTP sources and the configured CSV files.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let catalog = HttpCatalog::new(&config)?;
        let mirror = HttpMirror::new(&config)?;
        let removed = CsvRemovedSource::new(&config.paths.removed_csv, &config.mirror.details_url);
        let episodes = HttpCatalog::episodes(&config)?;
        let engine = Self::with_sources(
            config,
            Box::new(catalog),
            Box::new(mirror),
            Box::new(removed),
        );
        Ok(match episodes {
            Some(episodes) => engine.with_episodes(Box::new(episodes)),
            None => engine,
        })
    }

    pub fn with_sources(
        config: AppConfig,
        catalog: Box<dyn CatalogSource>,
        mirror: Box<dyn MirrorSource>,
        removed: Box<dyn RemovedSource>,
    ) -> Self {
        Self {
            config,
            catalog,
            mirror,
            removed,
            episodes: None,
            slugs: None,
        }
    }

    pub fn with_episodes(mut self, episodes: Box<dyn CatalogSource>) -> Self {
        self.episodes = Some(episodes);
        self
    }

    /// Use an in-memory slug table instead of reading `paths.shows_csv`.
    pub fn with_slugs(mut self, slugs: ShowSlugs) -> Self {
        self.slugs = Some(slugs);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fetch just the catalog, for adapters that need it without a full run.
    pub fn fetch_catalog(&self, reporter: &dyn ProgressReporter) -> Result<CatalogSnapshot, Error> {
        self.catalog.fetch(reporter)
    }

    /// Every source is fetched to completion before anything is reconciled; a
    /// failure in any of them aborts the run.
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunOutput, Error> {
        let filter = IdFilter::new(&self.config.exclusions)?;
        let slugs = match &self.slugs {
            Some(slugs) => slugs.clone(),
            None => ShowSlugs::from_csv(&self.config.paths.shows_csv)?,
        };

        info!("Fetching sources...");
        let fetch_start = Instant::now();
        let catalog = self.catalog.fetch(reporter)?;
        let mirror_snapshot = self.mirror.fetch(reporter)?;
        let removed: RemovedSet = self.removed.fetch()?.into_iter().collect();
        let episodes = match &self.episodes {
            Some(source) => Some(source.fetch(reporter)?),
            None => None,
        };
        let fetch_duration = fetch_start.elapsed();
        debug!(
            "Fetched {} catalog items, {} mirror records, {} removed ids in {:.2}s",
            catalog.items.len(),
            mirror_snapshot.records.len(),
            removed.len(),
            fetch_duration.as_secs_f64()
        );

        info!("Reconciling...");
        let reconcile_start = Instant::now();
        let inventory = MirrorInventory::from_records(mirror_snapshot.records, &filter);
        let reconciler = Reconciler::new(
            CompletenessRequirement::from(&self.config.completeness),
            &self.config.exclusions.id_prefix,
        )
        .with_filter(filter);
        let ledger = reconciler.reconcile(&catalog.items, &inventory, &removed);
        let rollup = aggregate_by_show(&ledger);
        let show_slugs = slugs.resolve(rollup.groups.iter().map(|g| g.key.as_str()))?;
        let reconcile_duration = reconcile_start.elapsed();
        reporter.on_reconcile_complete(ledger.len(), reconcile_duration.as_secs_f64());

        info!(
            "{} items: {} complete, {} incomplete, {} missing, {} removed",
            rollup.global.count,
            rollup.global.complete,
            rollup.global.incomplete,
            rollup.global.missing,
            rollup.global.removed
        );

        Ok(RunOutput {
            catalog,
            episodes,
            mirror_total: inventory.len(),
            mirror_requests: mirror_snapshot.requests,
            removed_total: removed.len(),
            ledger,
            rollup,
            show_slugs,
            fetch_duration,
            reconcile_duration,
        })
    }
}
