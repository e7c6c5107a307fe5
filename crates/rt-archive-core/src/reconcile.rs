use crate::completeness::CompletenessRequirement;
use crate::model::{
    CanonicalId, CatalogItem, Ledger, LedgerEntry, MirrorRecord, ReconcileStats, Status,
};
use crate::normalize::{normalize, IdFilter};
use ahash::{AHashMap, AHashSet};
use tracing::{debug, warn};

/// Mirror records keyed by canonical id, built through the exclusion filter.
#[derive(Debug, Default)]
pub struct MirrorInventory {
    records: AHashMap<CanonicalId, MirrorRecord>,
    order: Vec<CanonicalId>,
    pub excluded: usize,
    pub duplicates: usize,
}

impl MirrorInventory {
    /// First-seen record wins; later observations of the same id are dropped.
    pub fn from_records(records: Vec<MirrorRecord>, filter: &IdFilter) -> Self {
        let mut inventory = MirrorInventory::default();

        for record in records {
            if let Some(reason) = filter.check(record.canonical_id.as_str()) {
                debug!("Excluding mirror record {} ({:?})", record.canonical_id, reason);
                inventory.excluded += 1;
                continue;
            }
            if inventory.records.contains_key(&record.canonical_id) {
                inventory.duplicates += 1;
                continue;
            }
            inventory.order.push(record.canonical_id.clone());
            inventory.records.insert(record.canonical_id.clone(), record);
        }

        if inventory.excluded > 0 || inventory.duplicates > 0 {
            warn!(
                "Mirror inventory: {} records excluded, {} duplicate observations ignored",
                inventory.excluded, inventory.duplicates
            );
        }
        inventory
    }

    pub fn get(&self, id: &CanonicalId) -> Option<&MirrorRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &CanonicalId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in observation order.
    pub fn ids(&self) -> impl Iterator<Item = &CanonicalId> {
        self.order.iter()
    }
}

/// Identifiers purged from the mirror after upload.
#[derive(Debug, Clone, Default)]
pub struct RemovedSet(AHashSet<CanonicalId>);

impl RemovedSet {
    pub fn contains(&self, id: &CanonicalId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalId> {
        self.0.iter()
    }
}

impl FromIterator<CanonicalId> for RemovedSet {
    fn from_iter<I: IntoIterator<Item = CanonicalId>>(iter: I) -> Self {
        RemovedSet(iter.into_iter().collect())
    }
}

/// Classifies every catalog item against the mirror and removal sets.
#[derive(Debug, Clone)]
pub struct Reconciler {
    requirement: CompletenessRequirement,
    id_prefix: String,
    filter: Option<IdFilter>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(CompletenessRequirement::default(), "roosterteeth")
    }
}

impl Reconciler {
    pub fn new(requirement: CompletenessRequirement, id_prefix: &str) -> Self {
        Self {
            requirement,
            id_prefix: id_prefix.to_string(),
            filter: None,
        }
    }

    /// Reject catalog items whose canonical id the filter excludes, whatever
    /// source produced them.
    pub fn with_filter(mut self, filter: IdFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn classify(
        &self,
        id: &CanonicalId,
        mirror: &MirrorInventory,
        removed: &RemovedSet,
    ) -> Status {
        if removed.contains(id) {
            return Status::Removed;
        }
        match mirror.get(id) {
            None => Status::Missing,
            Some(record) if self.requirement.is_satisfied_by(&record.present_formats) => {
                Status::Complete
            }
            Some(_) => Status::Incomplete,
        }
    }

    /// Build the ledger: one entry per valid catalog item, in catalog order.
    ///
    /// Items whose id cannot be normalized, or that the exclusion filter
    /// rejects, are dropped and counted. Mirror records without a catalog item
    /// are counted but never enter the ledger.
    pub fn reconcile(
        &self,
        catalog: &[CatalogItem],
        mirror: &MirrorInventory,
        removed: &RemovedSet,
    ) -> Ledger {
        let mut stats = ReconcileStats {
            catalog_items: catalog.len(),
            mirror_records: mirror.len(),
            ..ReconcileStats::default()
        };
        let mut entries = Vec::with_capacity(catalog.len());
        let mut seen: AHashSet<CanonicalId> = AHashSet::with_capacity(catalog.len());

        for item in catalog {
            let canonical_id = match normalize(&item.native_id, item.kind, &self.id_prefix) {
                Ok(id) => id,
                Err(e) => {
                    warn!("Dropping catalog item '{}': {}", item.title, e);
                    stats.invalid_records += 1;
                    continue;
                }
            };
            let excluded = self
                .filter
                .as_ref()
                .and_then(|f| f.check(canonical_id.as_str()));
            if let Some(reason) = excluded {
                debug!("Excluding catalog item {} ({:?})", canonical_id, reason);
                stats.excluded_items += 1;
                continue;
            }
            if !seen.insert(canonical_id.clone()) {
                warn!("Catalog id {} appears more than once", canonical_id);
                stats.duplicate_ids += 1;
            }

            let status = self.classify(&canonical_id, mirror, removed);
            entries.push(LedgerEntry {
                item: item.clone(),
                canonical_id,
                status,
            });
        }

        stats.unmatched_mirror_records = mirror.ids().filter(|id| !seen.contains(*id)).count();
        stats.inconsistent_removals = removed.iter().filter(|id| !mirror.contains(id)).count();
        stats.removed_outside_catalog = removed.iter().filter(|id| !seen.contains(*id)).count();

        if stats.inconsistent_removals > 0 {
            warn!(
                "{} removed ids never appeared in the mirror inventory",
                stats.inconsistent_removals
            );
        }
        debug!(
            "Reconciled {} catalog items against {} mirror records ({} unmatched)",
            entries.len(),
            stats.mirror_records,
            stats.unmatched_mirror_records
        );

        Ledger { entries, stats }
    }
}
