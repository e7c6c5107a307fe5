use super::http::JsonClient;
use super::retry::RetryPolicy;
use super::{MirrorSnapshot, MirrorSource};
use crate::config::AppConfig;
use crate::error::Error;
use crate::model::{CanonicalId, MirrorRecord};
use crate::progress::ProgressReporter;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const SOURCE: &str = "mirror";

#[derive(Debug, Deserialize)]
struct ScrapePage {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct ScrapeItem {
    identifier: String,
    #[serde(default)]
    format: Option<OneOrMany>,
    #[serde(default)]
    item_size: Option<u64>,
    #[serde(default)]
    addeddate: Option<String>,
}

/// Convert one scrape result into a mirror record.
pub fn parse_record(value: &Value) -> Result<MirrorRecord, Error> {
    let item: ScrapeItem = serde_json::from_value(value.clone())
        .map_err(|e| Error::invalid(SOURCE, format!("unexpected item shape: {}", e)))?;

    let identifier = item.identifier.trim();
    if identifier.is_empty() {
        return Err(Error::invalid(SOURCE, "empty identifier"));
    }

    let present_formats = match item.format {
        Some(OneOrMany::One(tag)) => std::iter::once(tag).collect(),
        Some(OneOrMany::Many(tags)) => tags.into_iter().collect(),
        None => Default::default(),
    };

    Ok(MirrorRecord {
        canonical_id: CanonicalId::new(identifier),
        present_formats,
        size: item.item_size,
        added_at: item.addeddate,
    })
}

/// Cursor-paged scrape of the mirror collection. Stops when the response
/// carries no cursor.
pub struct HttpMirror {
    client: JsonClient,
    scrape_url: String,
    query: String,
    fields: String,
    page_size: u32,
    max_pages: u32,
}

impl HttpMirror {
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        let client = JsonClient::new(
            SOURCE,
            Duration::from_secs(config.mirror.timeout_secs),
            RetryPolicy::from(&config.retry),
        )?;
        Ok(Self {
            client,
            scrape_url: config.mirror.scrape_url.clone(),
            query: config.mirror.query.clone(),
            fields: config.mirror.fields.clone(),
            page_size: config.mirror.page_size,
            max_pages: config.mirror.max_pages,
        })
    }
}

impl MirrorSource for HttpMirror {
    fn fetch(&self, reporter: &dyn ProgressReporter) -> Result<MirrorSnapshot, Error> {
        info!("Scraping mirror inventory for {}", self.query);
        reporter.on_fetch_start(SOURCE);
        let start = Instant::now();
        let mut snapshot = MirrorSnapshot::default();
        let mut cursor: Option<String> = None;

        loop {
            if snapshot.requests >= self.max_pages {
                return Err(Error::fetch(
                    SOURCE,
                    format!("cursor did not terminate within {} requests", self.max_pages),
                ));
            }

            let mut query = vec![
                ("q", self.query.clone()),
                ("fields", self.fields.clone()),
                ("count", self.page_size.to_string()),
            ];
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }

            let page: ScrapePage = self.client.get_json(&self.scrape_url, &query)?;
            snapshot.requests += 1;

            for value in &page.items {
                match parse_record(value) {
                    Ok(record) => snapshot.records.push(record),
                    Err(e) => {
                        warn!("{}", e);
                        snapshot.invalid += 1;
                    }
                }
            }
            reporter.on_fetch_page(SOURCE, snapshot.requests, snapshot.records.len());

            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        let duration = start.elapsed().as_secs_f64();
        info!(
            "Identified {} mirror records across {} requests",
            snapshot.records.len(),
            snapshot.requests
        );
        debug!("Mirror: {} invalid records ({:.2}s)", snapshot.invalid, duration);
        reporter.on_fetch_complete(SOURCE, snapshot.records.len(), snapshot.requests, duration);
        Ok(snapshot)
    }
}
