use crate::model::{Ledger, LedgerEntry, Status};
use ahash::AHashMap;
use serde::Serialize;

/// Per-status tallies. Every counted entry lands in exactly one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub missing: u64,
    pub incomplete: u64,
    pub complete: u64,
    pub removed: u64,
}

impl StatusCounts {
    pub fn add(&mut self, status: Status) {
        match status {
            Status::Missing => self.missing += 1,
            Status::Incomplete => self.incomplete += 1,
            Status::Complete => self.complete += 1,
            Status::Removed => self.removed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.missing + self.incomplete + self.complete + self.removed
    }
}

/// Rollup published for a show or for the whole catalog.
///
/// `uploaded` counts everything that reached the mirror at some point, so
/// removed items count as uploaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub count: u64,
    pub uploaded: u64,
    pub missing: u64,
    pub incomplete: u64,
    pub complete: u64,
    pub removed: u64,
}

impl From<StatusCounts> for Summary {
    fn from(counts: StatusCounts) -> Self {
        Summary {
            count: counts.total(),
            uploaded: counts.incomplete + counts.complete + counts.removed,
            missing: counts.missing,
            incomplete: counts.incomplete,
            complete: counts.complete,
            removed: counts.removed,
        }
    }
}

impl Summary {
    pub fn percent_uploaded(&self) -> f64 {
        percent(self.uploaded, self.count)
    }

    pub fn percent_missing(&self) -> f64 {
        percent(self.missing, self.count)
    }
}

pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub key: String,
    pub summary: Summary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rollup {
    pub global: Summary,
    /// First-seen order.
    pub groups: Vec<GroupSummary>,
}

impl Rollup {
    pub fn group(&self, key: &str) -> Option<&Summary> {
        self.groups
            .iter()
            .find(|g| g.key == key)
            .map(|g| &g.summary)
    }
}

/// Fold the ledger into a global summary plus one summary per group key.
///
/// Groups only come into existence from an observed entry, so no group has a
/// zero count.
pub fn aggregate<F>(ledger: &Ledger, group_key: F) -> Rollup
where
    F: Fn(&LedgerEntry) -> &str,
{
    let mut global = StatusCounts::default();
    let mut index: AHashMap<&str, usize> = AHashMap::new();
    let mut groups: Vec<(&str, StatusCounts)> = Vec::new();

    for entry in &ledger.entries {
        global.add(entry.status);

        let key = group_key(entry);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, StatusCounts::default()));
            groups.len() - 1
        });
        groups[slot].1.add(entry.status);
    }

    Rollup {
        global: global.into(),
        groups: groups
            .into_iter()
            .map(|(key, counts)| GroupSummary {
                key: key.to_string(),
                summary: counts.into(),
            })
            .collect(),
    }
}

/// Group by show name, the conventional rollup.
pub fn aggregate_by_show(ledger: &Ledger) -> Rollup {
    aggregate(ledger, |entry| entry.item.show_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_identity() {
        let counts = StatusCounts {
            missing: 3,
            incomplete: 2,
            complete: 7,
            removed: 1,
        };
        let s = Summary::from(counts);
        assert_eq!(s.count, 13);
        assert_eq!(s.uploaded, 10);
        assert_eq!(s.count, s.missing + s.incomplete + s.complete + s.removed);
        assert_eq!(s.missing, s.count - s.uploaded);
        assert_eq!(s.incomplete, s.uploaded - s.complete - s.removed);
    }

    #[test]
    fn test_percent_of_empty() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}
