//! Adapters producing the closed, fully-fetched snapshots the reconciler
//! consumes. Each fetch either runs to exhaustion or fails the whole run.

pub mod catalog;
pub mod http;
pub mod mirror;
pub mod removed;
pub mod retry;

use crate::error::Error;
use crate::model::{CanonicalId, CatalogItem, MirrorRecord};
use crate::progress::ProgressReporter;

pub use catalog::HttpCatalog;
pub use mirror::HttpMirror;
pub use removed::CsvRemovedSource;

#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Fetch order, deduplicated by canonical id.
    pub items: Vec<CatalogItem>,
    /// Raw API objects for the items kept, for the API mirror artifact.
    pub raw: Vec<serde_json::Value>,
    pub requests: u32,
    pub invalid: usize,
    pub excluded: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MirrorSnapshot {
    pub records: Vec<MirrorRecord>,
    pub requests: u32,
    pub invalid: usize,
}

pub trait CatalogSource {
    fn fetch(&self, reporter: &dyn ProgressReporter) -> Result<CatalogSnapshot, Error>;
}

pub trait MirrorSource {
    fn fetch(&self, reporter: &dyn ProgressReporter) -> Result<MirrorSnapshot, Error>;
}

pub trait RemovedSource {
    fn fetch(&self) -> Result<Vec<CanonicalId>, Error>;
}
