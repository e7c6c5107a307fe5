use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub mirror: MirrorConfig,
    pub retry: RetrySettings,
    pub completeness: CompletenessConfig,
    pub exclusions: ExclusionConfig,
    pub paths: PathsConfig,
    pub local: LocalConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Paged listing endpoint.
    pub endpoint: String,
    /// Second listing mirrored as-is to `api/v1/episodes.json`; unset to skip.
    pub episodes_endpoint: Option<String>,
    /// Prepended to each item's canonical link to form its public url.
    pub site_url: String,
    /// Stripped from public urls to form per-episode slugs on the site.
    pub watch_prefix: String,
    pub per_page: u32,
    pub max_pages: u32,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://svod-be.roosterteeth.com/api/v1/watch".to_string(),
            episodes_endpoint: Some("https://svod-be.roosterteeth.com/api/v1/episodes".to_string()),
            site_url: "https://roosterteeth.com".to_string(),
            watch_prefix: "https://roosterteeth.com/watch/".to_string(),
            per_page: 1000,
            max_pages: 500,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub scrape_url: String,
    /// Scopes the scrape to the mirror's collection for this catalog.
    pub query: String,
    pub fields: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub timeout_secs: u64,
    pub details_url: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            scrape_url: "https://archive.org/services/search/v1/scrape".to_string(),
            query: "scanner:\"Roosterteeth Website Mirror\"".to_string(),
            fields: "identifier,addeddate,item_size,format".to_string(),
            page_size: 10000,
            max_pages: 200,
            timeout_secs: 120,
            details_url: "https://archive.org/details/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletenessConfig {
    /// Every one of these must be present (video container, info json, description).
    pub mandatory_formats: Vec<String>,
    /// At least one of these must be present.
    pub image_formats: Vec<String>,
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        Self {
            mandatory_formats: vec!["MPEG4".into(), "JSON".into(), "Unknown".into()],
            image_formats: vec![
                "JPEG".into(),
                "PNG".into(),
                "Animated GIF".into(),
                "JPEG 2000".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExclusionConfig {
    /// Canonical id prefix, also required of every mirror identifier.
    pub id_prefix: String,
    /// Glob patterns for synthetic or test identifiers.
    pub patterns: Vec<String>,
    /// Known bad identifiers that must never count as data points.
    pub ids: Vec<String>,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            id_prefix: "roosterteeth".to_string(),
            patterns: vec!["roosterteeth-test*".into(), "*-bonus-bonus*".into()],
            ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub removed_csv: PathBuf,
    pub shows_csv: PathBuf,
    pub output_dir: PathBuf,
    pub readme: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            removed_csv: PathBuf::from("data/dark.csv"),
            shows_csv: PathBuf::from("data/shows.csv"),
            output_dir: PathBuf::from("."),
            readme: Some(PathBuf::from("README.md")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalConfig {
    pub root: Option<PathBuf>,
    pub required_extensions: Vec<String>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: None,
            required_extensions: vec![
                ".description".into(),
                ".info.json".into(),
                ".mp4".into(),
                ".png".into(),
            ],
        }
    }
}

/// Load `Config.toml` (optional) overlaid with `RT_ARCHIVE__*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("RT_ARCHIVE").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_uses_defaults() {
        let config: AppConfig = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.catalog.per_page, 1000);
        assert_eq!(config.exclusions.id_prefix, "roosterteeth");
        assert_eq!(config.completeness.mandatory_formats.len(), 3);
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("catalog.per_page", 50)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.catalog.per_page, 50);
        assert_eq!(config.catalog.max_pages, 500);
        assert_eq!(
            config.catalog.episodes_endpoint.as_deref(),
            Some("https://svod-be.roosterteeth.com/api/v1/episodes")
        );
        assert_eq!(config.mirror.page_size, 10000);
    }
}
