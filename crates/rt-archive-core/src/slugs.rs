use crate::error::Error;
use ahash::AHashMap;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SlugRow {
    title: String,
    slug: String,
}

/// Show title to site slug table. The table is the source of truth: observed
/// show names must match a title exactly.
#[derive(Debug, Clone, Default)]
pub struct ShowSlugs {
    exact: AHashMap<String, String>,
    folded: AHashMap<String, String>,
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ShowSlugs {
    pub fn from_csv(path: &Path) -> Result<Self, Error> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut table = ShowSlugs::default();
        for row in reader.deserialize() {
            let row: SlugRow = row?;
            table.insert(&row.title, &row.slug);
        }
        debug!("Loaded {} show slugs from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn insert(&mut self, title: &str, slug: &str) {
        self.exact.insert(title.to_string(), slug.to_string());
        self.folded.insert(fold(title), title.to_string());
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.exact.get(title).map(String::as_str)
    }

    /// Map each observed show name to its slug, in the given order.
    ///
    /// A name that only matches after trimming or case-folding, two names that
    /// fold together, or two names sharing one slug, is a configuration defect
    /// and is reported rather than guessed. Each slug names exactly one page.
    pub fn resolve<'a, I>(&self, names: I) -> Result<Vec<(String, String)>, Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut by_fold: AHashMap<String, &str> = AHashMap::new();
        let mut by_slug: AHashMap<&str, &str> = AHashMap::new();
        let mut resolved = Vec::new();

        for name in names {
            let folded = fold(name);
            if let Some(previous) = by_fold.insert(folded.clone(), name) {
                if previous != name {
                    return Err(Error::GroupKeyAmbiguity {
                        slug: self.slug_for_fold(&folded).unwrap_or_default(),
                        names: vec![previous.to_string(), name.to_string()],
                    });
                }
            }

            match self.exact.get(name) {
                Some(slug) => {
                    if let Some(previous) = by_slug.insert(slug.as_str(), name) {
                        if previous != name {
                            return Err(Error::GroupKeyAmbiguity {
                                slug: slug.clone(),
                                names: vec![previous.to_string(), name.to_string()],
                            });
                        }
                    }
                    resolved.push((name.to_string(), slug.clone()));
                }
                None => match self.folded.get(&folded) {
                    Some(title) => {
                        return Err(Error::GroupKeyAmbiguity {
                            slug: self.exact.get(title).cloned().unwrap_or_default(),
                            names: vec![title.clone(), name.to_string()],
                        })
                    }
                    None => return Err(Error::UnknownShow(name.to_string())),
                },
            }
        }

        Ok(resolved)
    }

    fn slug_for_fold(&self, folded: &str) -> Option<String> {
        self.folded
            .get(folded)
            .and_then(|title| self.exact.get(title))
            .cloned()
    }
}
