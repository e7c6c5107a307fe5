use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A source could not produce a complete snapshot. Aborts the run.
    #[error("Fetch from {source_name} failed: {message}")]
    SourceFetch {
        source_name: String,
        message: String,
    },

    #[error("Invalid record from {source_name}: {reason}")]
    InvalidRecord {
        source_name: String,
        reason: String,
    },

    /// Distinct raw show names collapse onto one slug-table key.
    #[error("Ambiguous show key for slug '{slug}': {names:?}")]
    GroupKeyAmbiguity { slug: String, names: Vec<String> },

    #[error("No slug configured for show '{0}'")]
    UnknownShow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid exclusion pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn fetch(source_name: &str, message: impl Into<String>) -> Self {
        Error::SourceFetch {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid(source_name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidRecord {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}
