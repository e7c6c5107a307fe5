//! Serializes a run's ledger and rollups to the published artifacts.
//!
//! Everything is rendered in memory first, then staged to temp files beside
//! each target, then renamed into place. A failure before the rename phase
//! leaves every existing artifact untouched.

use crate::aggregate::{percent, Summary};
use crate::config::AppConfig;
use crate::engine::RunOutput;
use crate::error::Error;
use crate::model::{LedgerEntry, Status};
use crate::progress::ProgressReporter;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct ChecklistRow<'a> {
    title: &'a str,
    rt_id: &'a str,
    rt_url: &'a str,
    show: &'a str,
    date: String,
    is_first: bool,
    is_uploaded: bool,
    is_complete_upload: bool,
    is_removed: bool,
}

#[derive(Debug, Serialize)]
struct EpisodeRow<'a> {
    title: &'a str,
    id: &'a str,
    slug: &'a str,
    date: String,
    is_first: bool,
    is_uploaded: bool,
    is_complete_upload: bool,
    is_removed: bool,
}

#[derive(Debug, Serialize)]
struct ShowPage<'a> {
    show: &'a str,
    slug: &'a str,
    summary: Summary,
    data: Vec<EpisodeRow<'a>>,
}

#[derive(Debug, Serialize)]
struct ShowRow<'a> {
    show: &'a str,
    slug: &'a str,
    #[serde(flatten)]
    summary: Summary,
}

#[derive(Debug, Serialize)]
struct IndexPage<'a> {
    summary: Summary,
    data: Vec<ShowRow<'a>>,
}

#[derive(Debug, Serialize)]
struct MissingRow<'a> {
    title: &'a str,
    slug: &'a str,
    date: String,
    is_first: bool,
    show: &'a str,
    show_slug: &'a str,
}

#[derive(Debug, Serialize)]
struct Listing<T: Serialize> {
    count: usize,
    data: Vec<T>,
}

pub struct Materializer {
    root: PathBuf,
    readme: Option<PathBuf>,
    id_prefix: String,
    details_url: String,
    watch_prefix: String,
}

impl Materializer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            root: config.paths.output_dir.clone(),
            readme: config.paths.readme.clone(),
            id_prefix: config.exclusions.id_prefix.clone(),
            details_url: config.mirror.details_url.clone(),
            watch_prefix: config.catalog.watch_prefix.clone(),
        }
    }

    pub fn write(&self, run: &RunOutput, reporter: &dyn ProgressReporter) -> Result<usize, Error> {
        let start = Instant::now();
        let artifacts = self.render(run)?;
        reporter.on_write_start(artifacts.len());
        let written = commit(&artifacts)?;
        let duration = start.elapsed().as_secs_f64();
        info!("Wrote {} artifacts under {}", written, self.root.display());
        reporter.on_write_complete(written, duration);
        Ok(written)
    }

    pub fn render(&self, run: &RunOutput) -> Result<Vec<Artifact>, Error> {
        let entries = &run.ledger.entries;
        let mut artifacts = Vec::new();

        artifacts.push(self.artifact("data/checklist.csv", self.checklist_csv(entries)?));
        artifacts.push(self.artifact(
            "data/rt_urls.txt",
            lines(entries.iter().map(|e| e.item.url.clone())),
        ));
        artifacts.push(self.artifact(
            "data/archive_urls.txt",
            lines(entries.iter().map(|e| self.archive_url(e))),
        ));

        let missing: Vec<&LedgerEntry> = run.ledger.with_status(Status::Missing).collect();
        let incomplete: Vec<&LedgerEntry> = run.ledger.with_status(Status::Incomplete).collect();

        let missing_urls = lines(missing.iter().map(|e| e.item.url.clone()));
        artifacts.push(self.artifact("data/missing.txt", missing_urls.clone()));
        artifacts.push(self.artifact("docs/missing/missing.txt", missing_urls));

        let incomplete_csv = self.incomplete_csv(&incomplete)?;
        artifacts.push(self.artifact("data/incomplete_urls.csv", incomplete_csv));
        artifacts.push(self.artifact(
            "data/incomplete_rt_urls.txt",
            lines(incomplete.iter().map(|e| e.item.url.clone())),
        ));
        artifacts.push(self.artifact(
            "data/incomplete_archive_urls.txt",
            lines(incomplete.iter().map(|e| self.archive_url(e))),
        ));

        let api = Listing {
            count: run.catalog.raw.len(),
            data: run.catalog.raw.clone(),
        };
        artifacts.push(self.artifact("api/v1/watch.json", serde_json::to_vec(&api)?));
        if let Some(episodes) = &run.episodes {
            let api = Listing {
                count: episodes.raw.len(),
                data: episodes.raw.clone(),
            };
            artifacts.push(self.artifact("api/v1/episodes.json", serde_json::to_vec(&api)?));
        }

        artifacts.extend(self.site_pages(run, &missing)?);

        if let Some(readme) = self.readme_report(run)? {
            artifacts.push(readme);
        }

        debug!("Rendered {} artifacts", artifacts.len());
        Ok(artifacts)
    }

    fn artifact(&self, relative: &str, contents: Vec<u8>) -> Artifact {
        Artifact {
            path: self.root.join(relative),
            contents,
        }
    }

    fn archive_url(&self, entry: &LedgerEntry) -> String {
        format!("{}{}", self.details_url, entry.canonical_id)
    }

    fn episode_slug<'a>(&self, entry: &'a LedgerEntry) -> &'a str {
        entry
            .item
            .url
            .strip_prefix(self.watch_prefix.as_str())
            .unwrap_or(&entry.item.url)
    }

    fn checklist_csv(&self, entries: &[LedgerEntry]) -> Result<Vec<u8>, Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record([
            "title",
            "rt_id",
            "rt_url",
            "show",
            "date",
            "is_first",
            "is_uploaded",
            "is_complete_upload",
            "is_removed",
        ])?;
        for entry in entries {
            let flags = entry.status.flags();
            writer.serialize(ChecklistRow {
                title: &entry.item.title,
                rt_id: entry.canonical_id.short_id(&self.id_prefix),
                rt_url: &entry.item.url,
                show: &entry.item.show_name,
                date: entry.item.air_date.format("%Y-%m-%d").to_string(),
                is_first: entry.item.is_restricted,
                is_uploaded: flags.is_uploaded,
                is_complete_upload: flags.is_complete_upload,
                is_removed: flags.is_removed,
            })?;
        }
        finish_csv(writer)
    }

    fn incomplete_csv(&self, entries: &[&LedgerEntry]) -> Result<Vec<u8>, Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["archive_url", "rt_url"])?;
        for entry in entries {
            writer.write_record([self.archive_url(entry).as_str(), entry.item.url.as_str()])?;
        }
        finish_csv(writer)
    }

    fn site_pages(
        &self,
        run: &RunOutput,
        missing: &[&LedgerEntry],
    ) -> Result<Vec<Artifact>, Error> {
        let mut artifacts = Vec::new();

        for group in &run.rollup.groups {
            let slug = slug_for(run, &group.key)?;
            let data = run
                .ledger
                .entries
                .iter()
                .filter(|e| e.item.show_name == group.key)
                .map(|e| self.episode_row(e))
                .collect();
            let page = ShowPage {
                show: &group.key,
                slug,
                summary: group.summary,
                data,
            };
            artifacts.push(self.artifact(&format!("docs/{}/data.json", slug), pretty_json(&page)?));
        }

        let mut shows = run
            .rollup
            .groups
            .iter()
            .map(|g| {
                Ok(ShowRow {
                    show: &g.key,
                    slug: slug_for(run, &g.key)?,
                    summary: g.summary,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        shows.sort_by_key(|row| row.show.to_lowercase());
        let index = IndexPage {
            summary: run.rollup.global,
            data: shows,
        };
        artifacts.push(self.artifact("docs/data.json", pretty_json(&index)?));

        let missing_rows = missing
            .iter()
            .map(|e| {
                Ok(MissingRow {
                    title: &e.item.title,
                    slug: self.episode_slug(e),
                    date: e.item.air_date.format("%Y-%m-%d").to_string(),
                    is_first: e.item.is_restricted,
                    show: &e.item.show_name,
                    show_slug: slug_for(run, &e.item.show_name)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let listing = Listing {
            count: missing_rows.len(),
            data: missing_rows,
        };
        artifacts.push(self.artifact("docs/missing/data.json", pretty_json(&listing)?));

        Ok(artifacts)
    }

    fn episode_row<'a>(&self, entry: &'a LedgerEntry) -> EpisodeRow<'a> {
        let flags = entry.status.flags();
        EpisodeRow {
            title: &entry.item.title,
            id: entry.canonical_id.short_id(&self.id_prefix),
            slug: self.episode_slug(entry),
            date: entry.item.air_date.format("%Y-%m-%d").to_string(),
            is_first: entry.item.is_restricted,
            is_uploaded: flags.is_uploaded,
            is_complete_upload: flags.is_complete_upload,
            is_removed: flags.is_removed,
        }
    }

    /// Rewrite the headline metric lines of the README, if one is configured.
    fn readme_report(&self, run: &RunOutput) -> Result<Option<Artifact>, Error> {
        let path = match &self.readme {
            Some(path) if path.is_file() => path,
            Some(path) => {
                debug!("README {} not found, skipping report", path.display());
                return Ok(None);
            }
            None => return Ok(None),
        };

        let readme = fs::read_to_string(path)?;
        let updated = update_report(&readme, &run.rollup.global, run.mirror_total as u64)?;
        Ok(Some(Artifact {
            path: path.clone(),
            contents: updated.into_bytes(),
        }))
    }
}

/// Substitute the headline counts into the README's metric lines.
pub fn update_report(
    readme: &str,
    global: &Summary,
    mirror_total: u64,
) -> Result<String, Error> {
    let replacements = [
        (r"(\* Rooster Teeth Videos: )[\d,]+", thousands(global.count)),
        (
            r"(\* Items on Internet Archive: )[\d, (.%)]+",
            format!(
                "{} ({:.2}%)",
                thousands(mirror_total),
                percent(mirror_total, global.count)
            ),
        ),
        (
            r"(\* Items Missing from Internet Archive: )[\d, (.%)]+",
            format!(
                "{} ({:.2}%)",
                thousands(global.missing),
                global.percent_missing()
            ),
        ),
        (
            r"(\* Incomplete Items on Internet Archive: )[\d,]+",
            thousands(global.incomplete),
        ),
    ];

    let mut text = readme.to_string();
    for (pattern, value) in replacements {
        let re = Regex::new(pattern).map_err(|e| Error::Other(e.to_string()))?;
        text = re
            .replace_all(&text, |caps: &regex::Captures| format!("{}{}", &caps[1], value))
            .into_owned();
    }
    Ok(text)
}

/// `1234567` -> `1,234,567`
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn slug_for<'a>(run: &'a RunOutput, show: &str) -> Result<&'a str, Error> {
    run.show_slugs
        .iter()
        .find(|(name, _)| name == show)
        .map(|(_, slug)| slug.as_str())
        .ok_or_else(|| Error::UnknownShow(show.to_string()))
}

fn lines<I: IntoIterator<Item = String>>(items: I) -> Vec<u8> {
    let mut out = String::new();
    for item in items {
        out.push_str(&item);
        out.push('\n');
    }
    out.into_bytes()
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, Error> {
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

fn pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn staging_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Stage every artifact beside its target, then rename them all into place.
pub fn commit(artifacts: &[Artifact]) -> Result<usize, Error> {
    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let dir = staging_dir(&artifact.path);
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&artifact.contents)?;
        tmp.as_file().sync_all()?;
        staged.push((tmp, &artifact.path));
    }

    let count = staged.len();
    for (tmp, path) in staged {
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_update_report() {
        let readme = "# Progress\n\
                      * Rooster Teeth Videos: 10\n\
                      * Items on Internet Archive: 5 (50.00%)\n\
                      * Items Missing from Internet Archive: 5 (50.00%)\n\
                      * Incomplete Items on Internet Archive: 0\n";
        let global = Summary {
            count: 2000,
            uploaded: 1500,
            missing: 500,
            incomplete: 20,
            complete: 1470,
            removed: 10,
        };
        let updated = update_report(readme, &global, 1490).unwrap();
        assert!(updated.contains("* Rooster Teeth Videos: 2,000\n"));
        assert!(updated.contains("* Items on Internet Archive: 1,490 (74.50%)\n"));
        assert!(updated.contains("* Items Missing from Internet Archive: 500 (25.00%)\n"));
        assert!(updated.contains("* Incomplete Items on Internet Archive: 20\n"));
        assert!(updated.starts_with("# Progress\n"));
    }
}
