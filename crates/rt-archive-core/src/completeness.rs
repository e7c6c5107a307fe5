use crate::config::CompletenessConfig;
use ahash::AHashSet;

/// Format tags a mirror upload needs before it counts as complete.
#[derive(Debug, Clone)]
pub struct CompletenessRequirement {
    mandatory: Vec<String>,
    images: Vec<String>,
}

impl CompletenessRequirement {
    pub fn new(mandatory: Vec<String>, images: Vec<String>) -> Self {
        Self { mandatory, images }
    }

    /// Superset of every mandatory tag, and at least one allowed image tag.
    pub fn is_satisfied_by(&self, formats: &AHashSet<String>) -> bool {
        self.mandatory.iter().all(|tag| formats.contains(tag))
            && self.images.iter().any(|tag| formats.contains(tag))
    }

    /// Mandatory tags absent from `formats`, for diagnostics.
    pub fn missing_tags<'a>(&'a self, formats: &AHashSet<String>) -> Vec<&'a str> {
        let mut missing: Vec<&str> = self
            .mandatory
            .iter()
            .filter(|tag| !formats.contains(*tag))
            .map(String::as_str)
            .collect();
        if !self.images.iter().any(|tag| formats.contains(tag)) {
            missing.push("<image>");
        }
        missing
    }
}

impl From<&CompletenessConfig> for CompletenessRequirement {
    fn from(config: &CompletenessConfig) -> Self {
        Self::new(
            config.mandatory_formats.clone(),
            config.image_formats.clone(),
        )
    }
}

impl Default for CompletenessRequirement {
    fn default() -> Self {
        Self::from(&CompletenessConfig::default())
    }
}
