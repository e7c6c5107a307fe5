pub mod aggregate;
pub mod completeness;
pub mod config;
pub mod engine;
pub mod error;
pub mod local;
pub mod model;
pub mod normalize;
pub mod output;
pub mod progress;
pub mod reconcile;
pub mod slugs;
pub mod sources;

pub use aggregate::{aggregate, aggregate_by_show, Rollup, Summary};
pub use completeness::CompletenessRequirement;
pub use crate::config::AppConfig;
pub use engine::{RunOutput, TrackerEngine};
pub use error::Error;
pub use model::{CanonicalId, CatalogItem, ItemKind, Ledger, LedgerEntry, MirrorRecord, Status};
pub use normalize::{normalize, IdFilter};
pub use output::Materializer;
pub use progress::{ProgressReporter, SilentReporter};
pub use reconcile::{MirrorInventory, Reconciler, RemovedSet};
