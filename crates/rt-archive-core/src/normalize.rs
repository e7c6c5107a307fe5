use crate::config::ExclusionConfig;
use crate::error::Error;
use crate::model::{CanonicalId, ItemKind};
use ahash::AHashSet;
use glob::Pattern;

pub const BONUS_SUFFIX: &str = "-bonus";

/// Map a catalog item's native id to the identifier its mirror upload uses.
///
/// Bonus features carry a `-bonus` suffix so they never collide with the
/// episode sharing their native id.
pub fn normalize(native_id: &str, kind: ItemKind, prefix: &str) -> Result<CanonicalId, Error> {
    let native_id = native_id.trim();
    if native_id.is_empty() {
        return Err(Error::invalid("catalog", "empty native id"));
    }

    let mut id = format!("{}-{}", prefix, native_id);
    if kind == ItemKind::BonusFeature {
        id.push_str(BONUS_SUFFIX);
    }
    Ok(CanonicalId::new(id))
}

/// Why an identifier was excluded at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    ForeignPrefix,
    Pattern,
    KnownBad,
}

/// Exclusion predicate applied once, where records enter the pipeline.
#[derive(Debug, Clone)]
pub struct IdFilter {
    prefix: String,
    patterns: Vec<Pattern>,
    known_bad: AHashSet<String>,
}

impl IdFilter {
    pub fn new(config: &ExclusionConfig) -> Result<Self, Error> {
        let patterns = config
            .patterns
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            prefix: format!("{}-", config.id_prefix),
            patterns,
            known_bad: config.ids.iter().cloned().collect(),
        })
    }

    pub fn check(&self, id: &str) -> Option<Exclusion> {
        if !id.starts_with(&self.prefix) {
            Some(Exclusion::ForeignPrefix)
        } else if self.known_bad.contains(id) {
            Some(Exclusion::KnownBad)
        } else if self.patterns.iter().any(|p| p.matches(id)) {
            Some(Exclusion::Pattern)
        } else {
            None
        }
    }

    pub fn is_excluded(&self, id: &str) -> bool {
        self.check(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_and_bonus_do_not_collide() {
        let episode = normalize("1", ItemKind::Episode, "roosterteeth").unwrap();
        let bonus = normalize("1", ItemKind::BonusFeature, "roosterteeth").unwrap();
        assert_eq!(episode.as_str(), "roosterteeth-1");
        assert_eq!(bonus.as_str(), "roosterteeth-1-bonus");
        assert_ne!(episode, bonus);
    }

    #[test]
    fn test_empty_id_is_invalid_record() {
        let err = normalize("  ", ItemKind::Episode, "roosterteeth").unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { .. }));
    }

    #[test]
    fn test_default_filter() {
        let filter = IdFilter::new(&ExclusionConfig::default()).unwrap();
        assert_eq!(filter.check("roosterteeth-42"), None);
        assert_eq!(filter.check("roosterteeth-42-bonus"), None);
        assert_eq!(filter.check("roosterteeth-test-7"), Some(Exclusion::Pattern));
        assert_eq!(
            filter.check("roosterteeth-42-bonus-bonus"),
            Some(Exclusion::Pattern)
        );
        assert_eq!(filter.check("some-other-item"), Some(Exclusion::ForeignPrefix));
    }

    #[test]
    fn test_known_bad_id() {
        let config = ExclusionConfig {
            ids: vec!["roosterteeth-999".to_string()],
            ..ExclusionConfig::default()
        };
        let filter = IdFilter::new(&config).unwrap();
        assert_eq!(filter.check("roosterteeth-999"), Some(Exclusion::KnownBad));
        assert!(!filter.is_excluded("roosterteeth-9999"));
    }
}
