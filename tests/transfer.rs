mod common;

use std::fs;
use std::path::PathBuf;

use common::{
    hg38,
    list_files,
    TestStore,
    SEED_BED,
};
use roistore::io::session::{
    add_track,
    summarize,
};
use roistore::prelude::*;
use rstest::{
    fixture,
    rstest,
};

/// A store holding dataset `peaks` with two versions and an exported
/// archive of it in the scratch directory.
struct Exported {
    store:   TestStore,
    archive: PathBuf,
    regions: Vec<Region>,
    entries: Vec<String>,
}

#[fixture]
fn exported() -> Exported {
    let store = TestStore::new();
    let source = store.source("seed.bed", SEED_BED);
    let archive = store.scratch.path().join("peaks.zip");
    let (regions, entries) = {
        let mut registry = store.open().unwrap();
        registry
            .add_dataset("peaks", Some(&source), Some("chip"))
            .unwrap();
        registry.add_version("peaks", None, Some("ver1")).unwrap();
        registry
            .insert_region(Region::new("chr2", 100, 200).with_name("late"))
            .unwrap();
        let regions = registry.active_regions().unwrap();
        let entries = registry
            .export_datasets(&["peaks"], &archive)
            .unwrap();
        (regions, entries)
    };
    Exported {
        store,
        archive,
        regions,
        entries,
    }
}

#[rstest]
fn archive_lists_every_file(exported: Exported) {
    let mut entries = exported.entries.clone();
    entries.sort();
    assert_eq!(entries, vec![
        "GIE.dataset.json",
        "peaks_ver1.session.xml",
        "peaks_ver1_main.roi.bed",
        "peaks_ver2.session.xml",
        "peaks_ver2_main.roi.bed",
    ]);
}

#[rstest]
fn round_trip_into_another_home(exported: Exported) -> anyhow::Result<()> {
    let target = TestStore::new();
    let mut registry = target.open()?;
    let imported = registry.import_datasets(&exported.archive)?;
    assert_eq!(imported, vec!["peaks"]);

    let dataset = registry.dataset("peaks").unwrap();
    assert_eq!(dataset.version_tags(), vec!["ver1", "ver2"]);
    assert_eq!(dataset.active_version_tag(), "ver2");
    assert_eq!(dataset.category(), Some("chip"));
    for file in dataset.files() {
        assert!(file.starts_with(registry.home()), "{}", file.display());
        assert!(file.is_file(), "{}", file.display());
    }

    let session = fs::read_to_string(target.home.path().join("peaks_ver2.session.xml"))?;
    let new_home = registry.home().to_string_lossy().into_owned();
    let old_home = fs::canonicalize(exported.store.home.path())?
        .to_string_lossy()
        .into_owned();
    assert!(session.contains(&format!("{new_home}/peaks_ver2_main.roi.bed")));
    assert!(!session.contains(&old_home));

    registry.select_dataset("peaks")?;
    assert_eq!(registry.active_regions()?, exported.regions);
    Ok(())
}

#[rstest]
fn import_refuses_taken_names(exported: Exported) -> anyhow::Result<()> {
    let mut registry = exported.store.open()?;
    let before = exported.store.home_files();
    let res = registry.import_datasets(&exported.archive);
    assert!(matches!(res, Err(StoreError::Conflict(_))));
    assert_eq!(registry.dataset_names(), vec!["peaks"]);
    assert_eq!(exported.store.home_files(), before);
    Ok(())
}

#[rstest]
fn import_refuses_existing_files(exported: Exported) -> anyhow::Result<()> {
    let target = TestStore::new();
    fs::write(target.home.path().join("peaks_ver2_main.roi.bed"), "stale\n")?;
    let mut registry = target.open()?;

    let res = registry.import_datasets(&exported.archive);
    assert!(matches!(res, Err(StoreError::Conflict(_))));
    assert!(registry.dataset_names().is_empty());
    assert_eq!(target.home_files(), vec!["GIE.lock", "peaks_ver2_main.roi.bed"]);
    Ok(())
}

#[rstest]
fn unknown_genome_is_substituted(exported: Exported) -> anyhow::Result<()> {
    let target = TestStore::with_prompt(AutoPrompt::new().with_genome("mm10"));
    let mut registry =
        target.open_with(StaticGenomeCatalog::new().with_genome("mm10", [("chr1", 10_000)]))?;
    registry.import_datasets(&exported.archive)?;

    let session = fs::read_to_string(target.home.path().join("peaks_ver1.session.xml"))?;
    assert!(session.contains("genome=\"mm10\""));
    assert!(!session.contains("hg38"));
    Ok(())
}

#[rstest]
fn declined_genome_aborts_before_writing(exported: Exported) -> anyhow::Result<()> {
    let target = TestStore::new();
    let mut registry =
        target.open_with(StaticGenomeCatalog::new().with_genome("mm10", [("chr1", 10_000)]))?;

    let res = registry.import_datasets(&exported.archive);
    assert!(matches!(res, Err(StoreError::UserAborted(_))));
    assert!(registry.dataset_names().is_empty());
    assert_eq!(list_files(target.home.path()), vec!["GIE.lock"]);
    assert!(!target.prompt.state().asked.is_empty());
    Ok(())
}

#[test]
fn broken_external_links_are_remapped() -> anyhow::Result<()> {
    let source = TestStore::new();
    let archive = source.scratch.path().join("peaks.zip");
    {
        let mut registry = source.open()?;
        registry.add_dataset("peaks", None, None)?;
        let session = source.home.path().join("peaks_ver1.session.xml");
        let xml = fs::read_to_string(&session)?;
        fs::write(&session, add_track(&xml, "/nonexistent/data/x.bw", "signal")?)?;
        registry.export_datasets(&["peaks"], &archive)?;
    }

    let target = TestStore::with_prompt(
        AutoPrompt::new().with_link("/nonexistent/data/", "/srv/real/"),
    );
    let mut registry = target.open()?;
    registry.import_datasets(&archive)?;

    assert_eq!(target.prompt.state().asked, vec!["fix 1 broken links"]);
    let xml = fs::read_to_string(target.home.path().join("peaks_ver1.session.xml"))?;
    let paths = summarize(&xml)?.paths;
    let new_home = registry.home().to_string_lossy().into_owned();
    assert!(paths.contains(&"/srv/real/x.bw".to_owned()));
    assert!(paths.contains(&format!("{new_home}/peaks_ver1_main.roi.bed")));
    assert!(!xml.contains("/nonexistent/"));
    Ok(())
}

#[rstest]
fn export_unknown_dataset(exported: Exported) -> anyhow::Result<()> {
    let mut registry = exported.store.open_with(hg38())?;
    let dest = exported.store.scratch.path().join("none.zip");
    let res = registry.export_datasets(&["peaks", "missing"], &dest);
    assert!(matches!(res, Err(StoreError::NotFound(_))));
    assert!(!dest.exists());
    Ok(())
}
