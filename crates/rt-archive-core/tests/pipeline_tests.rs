use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rt_archive_core::slugs::ShowSlugs;
use rt_archive_core::sources::{
    CatalogSnapshot, CatalogSource, MirrorSnapshot, MirrorSource, RemovedSource,
};
use rt_archive_core::{
    AppConfig, CanonicalId, CatalogItem, Error, ItemKind, Materializer, MirrorRecord,
    ProgressReporter, SilentReporter, Status, TrackerEngine,
};
use serde_json::{json, Value};
use tempfile::tempdir;

struct FakeCatalog(Vec<CatalogItem>);

impl CatalogSource for FakeCatalog {
    fn fetch(&self, _reporter: &dyn ProgressReporter) -> Result<CatalogSnapshot, Error> {
        Ok(CatalogSnapshot {
            items: self.0.clone(),
            raw: self.0.iter().map(|i| json!({ "id": i.native_id })).collect(),
            requests: 2,
            ..CatalogSnapshot::default()
        })
    }
}

struct FakeMirror(Vec<(&'static str, Vec<&'static str>)>);

impl MirrorSource for FakeMirror {
    fn fetch(&self, _reporter: &dyn ProgressReporter) -> Result<MirrorSnapshot, Error> {
        Ok(MirrorSnapshot {
            records: self
                .0
                .iter()
                .map(|(id, formats)| MirrorRecord {
                    canonical_id: CanonicalId::new(*id),
                    present_formats: formats.iter().map(|f| f.to_string()).collect(),
                    size: None,
                    added_at: None,
                })
                .collect(),
            requests: 1,
            invalid: 0,
        })
    }
}

struct BrokenMirror;

impl MirrorSource for BrokenMirror {
    fn fetch(&self, _reporter: &dyn ProgressReporter) -> Result<MirrorSnapshot, Error> {
        Err(Error::fetch("mirror", "cursor did not terminate within 3 requests"))
    }
}

struct FakeRemoved(Vec<&'static str>);

impl RemovedSource for FakeRemoved {
    fn fetch(&self) -> Result<Vec<CanonicalId>, Error> {
        Ok(self.0.iter().map(|id| CanonicalId::new(*id)).collect())
    }
}

fn item(id: &str, kind: ItemKind, show: &str, title: &str) -> CatalogItem {
    CatalogItem {
        native_id: id.to_string(),
        kind,
        title: title.to_string(),
        show_name: show.to_string(),
        air_date: NaiveDate::from_ymd_opt(2014, 6, 1).unwrap(),
        season: Some(1),
        episode_number: Some(1),
        is_restricted: id == "2",
        url: format!("https://roosterteeth.com/watch/{}", title.to_lowercase().replace(' ', "-")),
    }
}

fn catalog() -> Vec<CatalogItem> {
    vec![
        item("1", ItemKind::Episode, "RWBY", "Red Trailer"),
        item("2", ItemKind::Episode, "Red vs. Blue", "Why Are We Here"),
        item("1", ItemKind::BonusFeature, "RWBY", "Red Trailer Bonus"),
        item("3", ItemKind::Episode, "RWBY", "White Trailer"),
        item("4", ItemKind::Episode, "Red vs. Blue", "Last One Out"),
    ]
}

fn mirror() -> FakeMirror {
    FakeMirror(vec![
        ("roosterteeth-1", vec!["MPEG4", "JSON", "Unknown", "JPEG"]),
        ("roosterteeth-1-bonus", vec!["MPEG4", "JSON"]),
        ("roosterteeth-4", vec!["MPEG4", "JSON", "Unknown", "PNG"]),
        ("roosterteeth-test-1", vec!["MPEG4"]),
    ])
}

fn slugs() -> ShowSlugs {
    let mut slugs = ShowSlugs::default();
    slugs.insert("RWBY", "rwby");
    slugs.insert("Red vs. Blue", "red-vs-blue");
    slugs
}

fn config_for(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.paths.output_dir = root.to_path_buf();
    config.paths.readme = Some(root.join("README.md"));
    config
}

fn engine(config: AppConfig) -> TrackerEngine {
    TrackerEngine::with_sources(
        config,
        Box::new(FakeCatalog(catalog())),
        Box::new(mirror()),
        Box::new(FakeRemoved(vec!["roosterteeth-4"])),
    )
    .with_slugs(slugs())
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

#[test]
fn test_full_pipeline_classifies_and_rolls_up() {
    let tmp = tempdir().unwrap();
    let run = engine(config_for(tmp.path())).run(&SilentReporter).unwrap();

    let statuses: Vec<Status> = run.ledger.entries.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            Status::Complete,
            Status::Missing,
            Status::Incomplete,
            Status::Missing,
            Status::Removed,
        ]
    );
    assert_eq!(run.mirror_total, 3);
    assert_eq!(run.removed_total, 1);

    let global = run.rollup.global;
    assert_eq!(global.count, 5);
    assert_eq!(global.uploaded, 3);
    assert_eq!(global.missing, 2);
    assert_eq!(global.incomplete, 1);
    assert_eq!(global.removed, 1);

    assert_eq!(
        run.show_slugs,
        vec![
            ("RWBY".to_string(), "rwby".to_string()),
            ("Red vs. Blue".to_string(), "red-vs-blue".to_string()),
        ]
    );
}

#[test]
fn test_materialized_artifacts() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::write(
        root.join("README.md"),
        "* Rooster Teeth Videos: 0\n* Incomplete Items on Internet Archive: 0\n",
    )
    .unwrap();

    let config = config_for(root);
    let run = engine(config.clone()).run(&SilentReporter).unwrap();
    let written = Materializer::new(&config).write(&run, &SilentReporter).unwrap();
    assert!(written >= 14);

    let checklist = read(root, "data/checklist.csv");
    let mut lines = checklist.lines();
    assert_eq!(
        lines.next().unwrap(),
        "title,rt_id,rt_url,show,date,is_first,is_uploaded,is_complete_upload,is_removed"
    );
    assert_eq!(
        lines.next().unwrap(),
        "Red Trailer,1,https://roosterteeth.com/watch/red-trailer,RWBY,2014-06-01,false,true,true,false"
    );
    assert!(checklist.contains("Red Trailer Bonus,1-bonus,"));
    assert!(checklist.contains(",2014-06-01,false,false,false,true\n"));

    assert_eq!(
        read(root, "data/missing.txt"),
        "https://roosterteeth.com/watch/why-are-we-here\n\
         https://roosterteeth.com/watch/white-trailer\n"
    );
    assert_eq!(
        read(root, "data/incomplete_archive_urls.txt"),
        "https://archive.org/details/roosterteeth-1-bonus\n"
    );
    assert_eq!(
        read(root, "data/incomplete_urls.csv"),
        "archive_url,rt_url\n\
         https://archive.org/details/roosterteeth-1-bonus,https://roosterteeth.com/watch/red-trailer-bonus\n"
    );

    let index: Value = serde_json::from_str(&read(root, "docs/data.json")).unwrap();
    assert_eq!(index["summary"]["count"], 5);
    assert_eq!(index["data"][0]["show"], "Red vs. Blue");
    assert_eq!(index["data"][1]["slug"], "rwby");
    assert_eq!(index["data"][1]["count"], 3);

    let show: Value = serde_json::from_str(&read(root, "docs/rwby/data.json")).unwrap();
    assert_eq!(show["show"], "RWBY");
    assert_eq!(show["summary"]["incomplete"], 1);
    assert_eq!(show["data"][0]["slug"], "red-trailer");
    assert_eq!(show["data"][2]["id"], "3");
    assert!(show["data"][0].get("show").is_none());

    let missing: Value = serde_json::from_str(&read(root, "docs/missing/data.json")).unwrap();
    assert_eq!(missing["count"], 2);
    assert_eq!(missing["data"][0]["show_slug"], "red-vs-blue");
    assert_eq!(missing["data"][0]["is_first"], true);

    let api: Value = serde_json::from_str(&read(root, "api/v1/watch.json")).unwrap();
    assert_eq!(api["count"], 5);
    assert!(!root.join("api/v1/episodes.json").exists());

    let readme = read(root, "README.md");
    assert!(readme.contains("* Rooster Teeth Videos: 5\n"));
    assert!(readme.contains("* Incomplete Items on Internet Archive: 1\n"));
}

#[test]
fn test_source_failure_aborts_before_anything_is_written() {
    let tmp = tempdir().unwrap();
    let engine = TrackerEngine::with_sources(
        config_for(tmp.path()),
        Box::new(FakeCatalog(catalog())),
        Box::new(BrokenMirror),
        Box::new(FakeRemoved(vec![])),
    )
    .with_slugs(slugs());

    let err = engine.run(&SilentReporter).unwrap_err();
    assert!(matches!(err, Error::SourceFetch { .. }));
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_unknown_show_fails_the_run() {
    let tmp = tempdir().unwrap();
    let mut partial = ShowSlugs::default();
    partial.insert("RWBY", "rwby");
    let engine = engine(config_for(tmp.path())).with_slugs(partial);

    let err = engine.run(&SilentReporter).unwrap_err();
    assert!(matches!(err, Error::UnknownShow(name) if name == "Red vs. Blue"));
}

#[test]
fn test_untrimmed_show_name_is_ambiguous() {
    let tmp = tempdir().unwrap();
    let mut items = catalog();
    items[3].show_name = "rwby".to_string();
    let engine = TrackerEngine::with_sources(
        config_for(tmp.path()),
        Box::new(FakeCatalog(items)),
        Box::new(mirror()),
        Box::new(FakeRemoved(vec![])),
    )
    .with_slugs(slugs());

    let err = engine.run(&SilentReporter).unwrap_err();
    assert!(matches!(err, Error::GroupKeyAmbiguity { .. }));
}

#[test]
fn test_rerun_writes_identical_artifacts() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();

    for root in [first.path(), second.path()] {
        let mut config = config_for(root);
        config.paths.readme = None;
        let run = engine(config.clone()).run(&SilentReporter).unwrap();
        Materializer::new(&config).write(&run, &SilentReporter).unwrap();
    }

    for relative in [
        "data/checklist.csv",
        "docs/data.json",
        "docs/rwby/data.json",
        "docs/missing/data.json",
        "api/v1/watch.json",
    ] {
        assert_eq!(
            fs::read(first.path().join(relative)).unwrap(),
            fs::read(second.path().join(relative)).unwrap(),
            "{} differs between runs",
            relative
        );
    }
}

#[test]
fn test_shows_csv_loaded_when_no_table_injected() {
    let tmp = tempdir().unwrap();
    let shows = tmp.path().join("shows.csv");
    fs::write(&shows, "title,slug\nRWBY,rwby\nRed vs. Blue,red-vs-blue\n").unwrap();

    let mut config = config_for(tmp.path());
    config.paths.shows_csv = shows;
    let engine = TrackerEngine::with_sources(
        config,
        Box::new(FakeCatalog(catalog())),
        Box::new(mirror()),
        Box::new(FakeRemoved(vec![])),
    );

    let run = engine.run(&SilentReporter).unwrap();
    assert_eq!(run.show_slugs.len(), 2);
}

#[test]
fn test_injected_catalog_goes_through_exclusions() {
    let tmp = tempdir().unwrap();
    let mut config = config_for(tmp.path());
    config.exclusions.ids = vec!["roosterteeth-999".to_string()];
    let engine = TrackerEngine::with_sources(
        config,
        Box::new(FakeCatalog(vec![
            item("test-5", ItemKind::Episode, "RWBY", "Test Upload"),
            item("999", ItemKind::Episode, "RWBY", "Known Bad"),
            item("1", ItemKind::Episode, "RWBY", "Red Trailer"),
        ])),
        Box::new(mirror()),
        Box::new(FakeRemoved(vec![])),
    )
    .with_slugs(slugs());

    let run = engine.run(&SilentReporter).unwrap();
    let ids: Vec<&str> = run.ledger.entries.iter().map(|e| e.canonical_id.as_str()).collect();
    assert_eq!(ids, vec!["roosterteeth-1"]);
    assert_eq!(run.ledger.stats.excluded_items, 2);
    assert_eq!(run.rollup.global.count, 1);
}

#[test]
fn test_two_shows_sharing_a_slug_fail_the_run() {
    let tmp = tempdir().unwrap();
    let mut table = ShowSlugs::default();
    table.insert("Red vs Blue", "rvb");
    table.insert("Red vs. Blue", "rvb");
    let engine = TrackerEngine::with_sources(
        config_for(tmp.path()),
        Box::new(FakeCatalog(vec![
            item("1", ItemKind::Episode, "Red vs Blue", "Why Are We Here"),
            item("2", ItemKind::Episode, "Red vs. Blue", "Last One Out"),
        ])),
        Box::new(mirror()),
        Box::new(FakeRemoved(vec![])),
    )
    .with_slugs(table);

    let err = engine.run(&SilentReporter).unwrap_err();
    assert!(matches!(err, Error::GroupKeyAmbiguity { ref slug, .. } if slug == "rvb"));
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_episodes_listing_is_mirrored() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let mut config = config_for(root);
    config.paths.readme = None;
    let episodes = vec![
        item("1", ItemKind::Episode, "RWBY", "Red Trailer"),
        item("7", ItemKind::Episode, "RWBY", "Ruby Rose"),
    ];
    let run = engine(config.clone())
        .with_episodes(Box::new(FakeCatalog(episodes)))
        .run(&SilentReporter)
        .unwrap();
    assert_eq!(run.ledger.len(), 5);

    Materializer::new(&config).write(&run, &SilentReporter).unwrap();
    let api: Value = serde_json::from_str(&read(root, "api/v1/episodes.json")).unwrap();
    assert_eq!(api["count"], 2);
    assert_eq!(api["data"][1]["id"], "7");
}
