//! Presence check against a local download library.
//!
//! Layout: `<root>/<channel>/<show>/Season <n>/<date> - (<id>)/` holding
//! `<date> - S<n>E<m> - <title> (<id>)<ext>` for every required extension.

use crate::error::Error;
use crate::model::{CanonicalId, CatalogItem};
use crate::normalize::normalize;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Full-width look-alikes for characters that are reserved in file names.
const RESERVED: [(char, char); 9] = [
    ('<', '\u{ff1c}'),
    ('>', '\u{ff1e}'),
    (':', '\u{ff1a}'),
    ('"', '\u{ff02}'),
    ('/', '\u{ff0f}'),
    ('\\', '\u{ff3c}'),
    ('|', '\u{ff5c}'),
    ('?', '\u{ff1f}'),
    ('*', '\u{ff0a}'),
];

pub fn to_lookalikes(text: &str) -> String {
    text.chars()
        .map(|c| {
            RESERVED
                .iter()
                .find(|(reserved, _)| *reserved == c)
                .map(|(_, lookalike)| *lookalike)
                .unwrap_or(c)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalStatus {
    Present,
    /// Directory found but one or more files absent.
    Incomplete(PathBuf),
    NotFound,
    /// No season or episode number, so the item has no derivable path.
    Unchecked,
}

#[derive(Debug, Clone)]
pub struct LocalResult {
    pub canonical_id: CanonicalId,
    pub title: String,
    pub status: LocalStatus,
}

pub struct LocalLibrary {
    root: PathBuf,
    extensions: Vec<String>,
    id_prefix: String,
}

impl LocalLibrary {
    pub fn new(root: &Path, extensions: &[String], id_prefix: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            extensions: extensions.to_vec(),
            id_prefix: id_prefix.to_string(),
        }
    }

    /// Check every item in parallel; results keep catalog order. An unreadable
    /// root fails the scan instead of reporting everything as absent.
    pub fn scan(&self, items: &[CatalogItem]) -> Result<Vec<LocalResult>, Error> {
        let channels = self.channels()?;
        debug!(
            "Scanning {} items across {} channel directories",
            items.len(),
            channels.len()
        );

        let results = items
            .par_iter()
            .filter_map(|item| {
                let id = normalize(&item.native_id, item.kind, &self.id_prefix).ok()?;
                let status = self.check(item, &id, &channels);
                Some(LocalResult {
                    canonical_id: id,
                    title: item.title.clone(),
                    status,
                })
            })
            .collect();
        Ok(results)
    }

    fn channels(&self) -> Result<Vec<PathBuf>, Error> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.root)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }

    fn check(&self, item: &CatalogItem, id: &CanonicalId, channels: &[PathBuf]) -> LocalStatus {
        let (Some(season), Some(episode)) = (item.season, item.episode_number) else {
            return LocalStatus::Unchecked;
        };
        let short_id = id.short_id(&self.id_prefix);
        let date = item.air_date.format("%Y-%m-%d").to_string();

        let episode_dir = format!("{} - ({})", date, short_id);
        let found = channels.iter().find_map(|channel| {
            let path = channel
                .join(&item.show_name)
                .join(format!("Season {}", season))
                .join(&episode_dir);
            path.is_dir().then_some(path)
        });

        let Some(dir) = found else {
            return LocalStatus::NotFound;
        };

        let stem = format!(
            "{} - S{}E{} - {} ({})",
            date,
            season,
            episode,
            to_lookalikes(&item.title),
            short_id
        );
        let complete = self
            .extensions
            .iter()
            .all(|ext| dir.join(format!("{}{}", stem, ext)).is_file());

        if complete {
            LocalStatus::Present
        } else {
            LocalStatus::Incomplete(dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemKind;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn item(id: &str, title: &str) -> CatalogItem {
        CatalogItem {
            native_id: id.to_string(),
            kind: ItemKind::Episode,
            title: title.to_string(),
            show_name: "RWBY".to_string(),
            air_date: NaiveDate::from_ymd_opt(2013, 7, 18).unwrap(),
            season: Some(1),
            episode_number: Some(2),
            is_restricted: false,
            url: format!("https://roosterteeth.com/watch/{}", id),
        }
    }

    #[test]
    fn test_lookalikes() {
        assert_eq!(to_lookalikes("What? A: B"), "What\u{ff1f} A\u{ff1a} B");
        assert_eq!(to_lookalikes("plain"), "plain");
    }

    #[test]
    fn test_scan_statuses() {
        let tmp = tempdir().unwrap();
        let extensions: Vec<String> = [".mp4", ".info.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let dir = tmp.path().join("Channel").join("RWBY").join("Season 1");
        let full = dir.join("2013-07-18 - (10)");
        let partial = dir.join("2013-07-18 - (11)");
        fs::create_dir_all(&full).unwrap();
        fs::create_dir_all(&partial).unwrap();
        for ext in &extensions {
            fs::write(
                full.join(format!("2013-07-18 - S1E2 - Red\u{ff1a} Trailer (10){}", ext)),
                b"x",
            )
            .unwrap();
        }
        fs::write(partial.join("2013-07-18 - S1E2 - Other (11).mp4"), b"x").unwrap();

        let library = LocalLibrary::new(tmp.path(), &extensions, "roosterteeth");
        let mut unnumbered = item("13", "Behind the Scenes");
        unnumbered.season = None;
        let results = library
            .scan(&[
                item("10", "Red: Trailer"),
                item("11", "Other"),
                item("12", "Absent"),
                unnumbered,
            ])
            .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].status, LocalStatus::Present);
        assert_eq!(results[1].status, LocalStatus::Incomplete(partial));
        assert_eq!(results[2].status, LocalStatus::NotFound);
        assert_eq!(results[3].status, LocalStatus::Unchecked);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = tempdir().unwrap();
        let library = LocalLibrary::new(
            &tmp.path().join("no-such-library"),
            &[".mp4".to_string()],
            "roosterteeth",
        );
        let err = library.scan(&[item("10", "Red: Trailer")]).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_missing_episode_number_is_unchecked() {
        let tmp = tempdir().unwrap();
        let library = LocalLibrary::new(tmp.path(), &[".mp4".to_string()], "roosterteeth");
        let mut no_episode = item("10", "Red: Trailer");
        no_episode.episode_number = None;
        let results = library.scan(&[no_episode]).unwrap();
        assert_eq!(results[0].status, LocalStatus::Unchecked);
    }
}
