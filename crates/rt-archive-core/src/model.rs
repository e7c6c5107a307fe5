use ahash::AHashSet;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Catalog item type as reported by the catalog source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Episode,
    BonusFeature,
}

impl ItemKind {
    pub fn from_api(value: &str) -> Self {
        match value {
            "bonus_feature" => ItemKind::BonusFeature,
            _ => ItemKind::Episode,
        }
    }
}

/// Identifier joining catalog items to mirror records, e.g. `roosterteeth-1234-bonus`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn new(value: impl Into<String>) -> Self {
        CanonicalId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id with `<prefix>-` removed, as used in the checklist's `rt_id` column.
    pub fn short_id<'a>(&'a self, prefix: &str) -> &'a str {
        self.0
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub native_id: String,
    pub kind: ItemKind,
    pub title: String,
    /// Trimmed at ingestion.
    pub show_name: String,
    pub air_date: NaiveDate,
    pub season: Option<u32>,
    pub episode_number: Option<u32>,
    /// Subscriber-only ("FIRST") content.
    pub is_restricted: bool,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct MirrorRecord {
    pub canonical_id: CanonicalId,
    pub present_formats: AHashSet<String>,
    pub size: Option<u64>,
    pub added_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Missing,
    Incomplete,
    Complete,
    Removed,
}

/// Flattened encoding of [`Status`] used by the checklist artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusFlags {
    pub is_uploaded: bool,
    pub is_complete_upload: bool,
    pub is_removed: bool,
}

impl Status {
    pub fn flags(self) -> StatusFlags {
        let (is_uploaded, is_complete_upload, is_removed) = match self {
            Status::Missing => (false, false, false),
            Status::Incomplete => (true, false, false),
            Status::Complete => (true, true, false),
            Status::Removed => (false, false, true),
        };
        StatusFlags {
            is_uploaded,
            is_complete_upload,
            is_removed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub item: CatalogItem,
    pub canonical_id: CanonicalId,
    pub status: Status,
}

/// Diagnostics gathered while reconciling. Never affect classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub catalog_items: usize,
    pub mirror_records: usize,
    /// Mirror records with no catalog item.
    pub unmatched_mirror_records: usize,
    /// Removed ids never seen in the mirror inventory.
    pub inconsistent_removals: usize,
    /// Removed ids with no catalog item.
    pub removed_outside_catalog: usize,
    pub invalid_records: usize,
    /// Catalog items rejected by the exclusion filter.
    pub excluded_items: usize,
    pub duplicate_ids: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub entries: Vec<LedgerEntry>,
    pub stats: ReconcileStats,
}

impl Ledger {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn with_status(&self, status: Status) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.status == status)
    }
}
