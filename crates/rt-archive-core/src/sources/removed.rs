use super::RemovedSource;
use crate::error::Error;
use crate::model::CanonicalId;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SOURCE: &str = "removed";

/// Curated CSV of purged mirror items: `archive_url,rt_url` with a header row.
pub struct CsvRemovedSource {
    path: PathBuf,
    details_url: String,
}

impl CsvRemovedSource {
    pub fn new(path: &Path, details_url: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            details_url: details_url.to_string(),
        }
    }
}

impl RemovedSource for CsvRemovedSource {
    fn fetch(&self) -> Result<Vec<CanonicalId>, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| Error::fetch(SOURCE, format!("{}: {}", self.path.display(), e)))?;

        let mut ids = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(|e| Error::fetch(SOURCE, e.to_string()))?;
            let raw = row.get(0).unwrap_or("").trim();
            let id = raw.strip_prefix(&self.details_url).unwrap_or(raw);
            if id.is_empty() {
                warn!("Skipping empty removed-items row {}", line + 2);
                continue;
            }
            ids.push(CanonicalId::new(id));
        }

        debug!("Loaded {} removed ids from {}", ids.len(), self.path.display());
        Ok(ids)
    }
}
