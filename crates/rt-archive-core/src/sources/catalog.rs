use super::http::JsonClient;
use super::retry::RetryPolicy;
use super::{CatalogSnapshot, CatalogSource};
use crate::config::AppConfig;
use crate::error::Error;
use crate::model::{CanonicalId, CatalogItem, ItemKind};
use crate::normalize::{normalize, IdFilter};
use crate::progress::ProgressReporter;
use ahash::AHashSet;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const SOURCE: &str = "catalog";
const EPISODES: &str = "episodes";

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    id: Value,
    #[serde(rename = "type", default)]
    kind: String,
    canonical_links: Links,
    attributes: Attributes,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(rename = "self")]
    self_link: String,
}

#[derive(Debug, Deserialize)]
struct Attributes {
    title: String,
    #[serde(default)]
    show_title: Option<String>,
    #[serde(default)]
    parent_content_title: Option<String>,
    original_air_date: String,
    #[serde(default)]
    is_sponsors_only: bool,
    #[serde(default)]
    season_number: Option<u32>,
    #[serde(default)]
    number: Option<u32>,
}

pub(crate) fn parse_air_date(raw: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.fZ")
        .map(|dt| dt.date())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Convert one raw listing object into a catalog item.
pub fn parse_item(value: &Value, site_url: &str) -> Result<CatalogItem, Error> {
    let api: ApiItem = serde_json::from_value(value.clone())
        .map_err(|e| Error::invalid(SOURCE, format!("unexpected item shape: {}", e)))?;

    let native_id = match &api.id {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(Error::invalid(SOURCE, format!("unusable id {}", other))),
    };
    if native_id.is_empty() {
        return Err(Error::invalid(SOURCE, "empty id"));
    }

    let kind = ItemKind::from_api(&api.kind);
    let attrs = api.attributes;
    let show = match kind {
        ItemKind::BonusFeature => attrs.parent_content_title,
        ItemKind::Episode => attrs.show_title,
    }
    .unwrap_or_default();

    let air_date = parse_air_date(&attrs.original_air_date).ok_or_else(|| {
        Error::invalid(
            SOURCE,
            format!("item {}: unparseable air date '{}'", native_id, attrs.original_air_date),
        )
    })?;

    Ok(CatalogItem {
        native_id,
        kind,
        title: attrs.title.trim().to_string(),
        show_name: show.trim().to_string(),
        air_date,
        season: attrs.season_number,
        episode_number: attrs.number,
        is_restricted: attrs.is_sponsors_only,
        url: format!("{}{}", site_url, api.canonical_links.self_link),
    })
}

/// Accumulates listing pages into a snapshot: invalid records are dropped and
/// counted, excluded ids are filtered, and the first item per id wins.
pub struct CatalogCollector<'a> {
    filter: &'a IdFilter,
    id_prefix: &'a str,
    site_url: &'a str,
    seen: AHashSet<CanonicalId>,
    snapshot: CatalogSnapshot,
}

impl<'a> CatalogCollector<'a> {
    pub fn new(filter: &'a IdFilter, id_prefix: &'a str, site_url: &'a str) -> Self {
        Self {
            filter,
            id_prefix,
            site_url,
            seen: AHashSet::new(),
            snapshot: CatalogSnapshot::default(),
        }
    }

    pub fn push_page(&mut self, data: Vec<Value>) {
        self.snapshot.requests += 1;
        for value in data {
            let parsed = parse_item(&value, self.site_url).and_then(|item| {
                normalize(&item.native_id, item.kind, self.id_prefix).map(|id| (item, id))
            });
            let (item, id) = match parsed {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("{}", e);
                    self.snapshot.invalid += 1;
                    continue;
                }
            };

            if let Some(reason) = self.filter.check(id.as_str()) {
                warn!("Excluding catalog item {} ({:?})", id, reason);
                self.snapshot.excluded += 1;
                continue;
            }
            if !self.seen.insert(id) {
                self.snapshot.duplicates += 1;
                continue;
            }
            self.snapshot.items.push(item);
            self.snapshot.raw.push(value);
        }
    }

    /// Count an empty terminating page.
    pub fn push_terminator(&mut self) {
        self.snapshot.requests += 1;
    }

    pub fn len(&self) -> usize {
        self.snapshot.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.items.is_empty()
    }

    pub fn finish(self) -> CatalogSnapshot {
        self.snapshot
    }
}

/// Paged catalog listing: `?per_page=N&page=P` until an empty page.
pub struct HttpCatalog {
    name: &'static str,
    client: JsonClient,
    endpoint: String,
    site_url: String,
    per_page: u32,
    max_pages: u32,
    id_prefix: String,
    filter: IdFilter,
}

impl HttpCatalog {
    /// The primary listing, the one the ledger is built from.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        Self::listing(config, SOURCE, &config.catalog.endpoint)
    }

    /// The secondary episodes listing, if one is configured. It is mirrored
    /// verbatim and never reconciled.
    pub fn episodes(config: &AppConfig) -> Result<Option<Self>, Error> {
        match &config.catalog.episodes_endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => {
                Self::listing(config, EPISODES, endpoint).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn listing(config: &AppConfig, name: &'static str, endpoint: &str) -> Result<Self, Error> {
        let client = JsonClient::new(
            name,
            Duration::from_secs(config.catalog.timeout_secs),
            RetryPolicy::from(&config.retry),
        )?;
        Ok(Self {
            name,
            client,
            endpoint: endpoint.to_string(),
            site_url: config.catalog.site_url.clone(),
            per_page: config.catalog.per_page,
            max_pages: config.catalog.max_pages,
            id_prefix: config.exclusions.id_prefix.clone(),
            filter: IdFilter::new(&config.exclusions)?,
        })
    }
}

impl CatalogSource for HttpCatalog {
    fn fetch(&self, reporter: &dyn ProgressReporter) -> Result<CatalogSnapshot, Error> {
        info!("Fetching {} from {}", self.name, self.endpoint);
        reporter.on_fetch_start(self.name);
        let start = Instant::now();
        let mut collector = CatalogCollector::new(&self.filter, &self.id_prefix, &self.site_url);

        let mut page = 1u32;
        loop {
            if page > self.max_pages {
                return Err(Error::fetch(
                    self.name,
                    format!("pagination did not terminate within {} pages", self.max_pages),
                ));
            }
            let query = [("per_page", self.per_page.to_string()), ("page", page.to_string())];
            let body: Page = self.client.get_json(&self.endpoint, &query)?;
            if body.data.is_empty() {
                collector.push_terminator();
                break;
            }
            collector.push_page(body.data);
            reporter.on_fetch_page(self.name, page, collector.len());
            page += 1;
        }

        let snapshot = collector.finish();
        let duration = start.elapsed().as_secs_f64();
        info!(
            "Identified {} unique {} items across {} requests",
            snapshot.items.len(),
            self.name,
            snapshot.requests
        );
        debug!(
            "{}: {} invalid, {} excluded, {} duplicates ({:.2}s)",
            self.name, snapshot.invalid, snapshot.excluded, snapshot.duplicates, duration
        );
        reporter.on_fetch_complete(
            self.name,
            snapshot.items.len(),
            snapshot.requests,
            duration,
        );
        Ok(snapshot)
    }
}
