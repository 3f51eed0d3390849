mod common;

use std::fs;

use common::{
    span,
    spans,
    TestStore,
    SEED_BED,
};
use roistore::prelude::*;
use rstest::{
    fixture,
    rstest,
};

#[fixture]
fn store() -> TestStore {
    TestStore::new()
}

#[rstest]
fn seed_resolves_overlaps_in_file_order(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("seed.bed", SEED_BED);
    let mut registry = store.open()?;

    let outcome = registry.add_dataset("peaks", Some(&source), None)?;
    assert_eq!(outcome, Some(ImportOutcome::Complete(3)));
    assert_eq!(registry.active_dataset_name(), Some("peaks"));

    let expected = vec![
        span("1", 100, 150, Some("a")),
        span("1", 150, 250, Some("b")),
        span("2", 10, 20, Some("c")),
    ];
    assert_eq!(spans(&registry.active_regions()?), expected);
    let displayed = store.viewer.state().displayed.clone().unwrap_or_default();
    assert_eq!(spans(&displayed), expected);
    Ok(())
}

#[rstest]
fn vcf_seed(store: TestStore) -> anyhow::Result<()> {
    let source = store.source(
        "calls.vcf",
        "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
         chr1\t100\trs1\tA\tATT\t50\tPASS\t.\n\
         chr1\t500\trs2\tACGT\tA\t50\tq10\t.\n",
    );
    let mut registry = store.open()?;
    registry.add_dataset("calls", Some(&source), Some("variants"))?;

    let regions = registry.active_regions()?;
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].range(), 100..103);
    assert_eq!(regions[1].range(), 500..501);
    assert_eq!(regions[0].score(), Some("1000"));
    assert_eq!(regions[1].score(), Some("0"));
    assert_eq!(registry.categories().get("variants"), Some(&vec!["calls"]));
    Ok(())
}

#[rstest]
fn duplicate_dataset_is_refused(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("seed.bed", SEED_BED);
    let mut registry = store.open()?;
    registry.add_dataset("peaks", Some(&source), None)?;
    let files = store.home_files();

    let res = registry.add_dataset("peaks", None, None);
    assert!(matches!(res, Err(StoreError::Conflict(_))));
    assert_eq!(registry.dataset_names(), vec!["peaks"]);
    assert_eq!(store.home_files(), files);
    assert!(!store.prompt.state().messages.is_empty());
    Ok(())
}

#[rstest]
fn malformed_seed_leaves_no_files(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("bad.bed", "chr1\t10\t20\nchr1\tten\t20\n");
    let mut registry = store.open()?;
    let before = store.home_files();

    let res = registry.add_dataset("bad", Some(&source), None);
    assert!(matches!(res, Err(StoreError::MalformedInput(_))));
    assert!(registry.dataset_names().is_empty());
    assert_eq!(store.home_files(), before);
    Ok(())
}

#[rstest]
fn failed_activation_drops_new_dataset(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("seed.bed", SEED_BED);
    let mut registry = store.open()?;
    registry.add_dataset("a", Some(&source), None)?;

    // A directory in place of the displayed layer file makes persisting it fail.
    let layer_file = store.home.path().join("a_ver1_main.roi.bed");
    fs::remove_file(&layer_file)?;
    fs::create_dir(&layer_file)?;
    let before = store.home_files();

    let res = registry.add_dataset("b", Some(&source), None);
    assert!(matches!(res, Err(StoreError::Io(_))));
    assert_eq!(registry.dataset_names(), vec!["a"]);
    assert_eq!(registry.active_dataset_name(), Some("a"));
    assert_eq!(store.home_files(), before);

    fs::remove_dir(&layer_file)?;
    drop(registry);
    Ok(())
}

#[rstest]
fn version_tags_increment(store: TestStore) -> anyhow::Result<()> {
    let mut registry = store.open()?;
    registry.add_dataset("d", None, None)?;

    assert_eq!(registry.next_version_tag("d")?, "ver2");
    assert_eq!(registry.add_version("d", None, None)?, "ver2");
    assert_eq!(registry.add_version("d", None, Some("ver1"))?, "ver3");
    assert_eq!(registry.add_version("d", Some("final"), None)?, "final");
    assert_eq!(registry.next_version_tag("d")?, "final0");

    let dataset = registry.dataset("d").unwrap();
    assert_eq!(dataset.version_tags(), vec!["ver1", "ver2", "ver3", "final"]);
    assert_eq!(dataset.active_version_tag(), "final");
    Ok(())
}

#[rstest]
fn copied_version_is_independent(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("seed.bed", SEED_BED);
    let mut registry = store.open()?;
    registry.add_dataset("d", Some(&source), None)?;
    registry.add_version("d", None, Some("ver1"))?;

    registry.clip_region(Region::new("chr1", 0, 1000))?;
    assert_eq!(registry.active_regions()?.len(), 1);

    registry.select_version("d", "ver1")?;
    assert_eq!(registry.active_regions()?.len(), 3);
    Ok(())
}

#[rstest]
fn cascade_delete_removes_files(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("seed.bed", SEED_BED);
    let mut registry = store.open()?;
    registry.add_dataset("d", Some(&source), None)?;
    registry.add_layer("d", "ver1", "extra", vec!["gene".into()])?;
    registry.add_version("d", None, Some("ver1"))?;
    registry.add_dataset("other", None, None)?;

    assert!(store.home.path().join("d_ver2_extra.roi.bed").is_file());
    registry.delete_dataset("d")?;
    assert_eq!(registry.dataset_names(), vec!["other"]);
    let left = store.home_files();
    assert!(left.iter().all(|f| !f.starts_with("d_")), "{left:?}");

    assert!(registry.delete_version("other", "ver1")?);
    assert!(registry.dataset_names().is_empty());
    assert_eq!(store.home_files(), vec!["GIE.datasets.json", "GIE.lock"]);
    Ok(())
}

#[rstest]
fn default_layer_is_protected(store: TestStore) -> anyhow::Result<()> {
    let mut registry = store.open()?;
    registry.add_dataset("d", None, None)?;
    assert!(matches!(
        registry.del_layer("d", "ver1", "main"),
        Err(StoreError::Conflict(_))
    ));
    assert!(matches!(
        registry.rename_layer("d", "ver1", "main", "x"),
        Err(StoreError::Conflict(_))
    ));
    assert!(matches!(
        registry.select_layer("d", "ver9", "main"),
        Err(StoreError::NotFound(_))
    ));
    Ok(())
}

#[rstest]
fn layers_switch_the_display(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("seed.bed", SEED_BED);
    let mut registry = store.open()?;
    registry.add_dataset("d", Some(&source), None)?;

    registry.add_layer("d", "ver1", "todo", vec![])?;
    assert!(registry.active_regions()?.is_empty());
    registry.insert_region(Region::new("chr2", 0, 5).with_name("t"))?;

    registry.select_layer("d", "ver1", "main")?;
    assert_eq!(registry.active_regions()?.len(), 3);

    registry.rename_layer("d", "ver1", "todo", "done")?;
    registry.select_layer("d", "ver1", "done")?;
    assert_eq!(spans(&registry.active_regions()?), vec![span(
        "2",
        0,
        5,
        Some("t")
    )]);
    Ok(())
}

#[rstest]
fn region_editing(store: TestStore) -> anyhow::Result<()> {
    let mut registry = store.open()?;
    registry.add_dataset("d", None, None)?;

    registry.insert_region(Region::new("chr1", 0, 100).with_name("a"))?;
    registry.insert_region(Region::new("chr1", 50, 150).with_name("b"))?;
    assert_eq!(spans(&registry.active_regions()?), vec![
        span("1", 0, 50, Some("a")),
        span("1", 50, 150, Some("b")),
    ]);

    registry.clip_region(Region::new("chr1", 40, 60))?;
    assert_eq!(spans(&registry.active_regions()?), vec![
        span("1", 0, 40, Some("a")),
        span("1", 60, 150, Some("b")),
    ]);

    let merged = registry.merge_region(Region::new("1", 30, 70))?;
    assert_eq!(merged.map(|r| (r.range(), r.display_name())), Some((0..150, Some("a".into()))));
    assert_eq!(registry.merge_region(Region::new("chr1", 500, 600))?, None);

    registry.insert_region(Region::new("chrx", 0, 10))?;
    let regions = registry.active_regions()?;
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[1].chrom(), "X");
    Ok(())
}

#[rstest]
fn region_past_chromosome_end_is_refused(store: TestStore) -> anyhow::Result<()> {
    let mut registry = store.open()?;
    registry.add_dataset("d", None, None)?;
    let res = registry.insert_region(Region::new("chr2", 499_990, 500_010));
    assert!(matches!(res, Err(StoreError::MalformedInput(_))));
    assert!(registry.active_regions()?.is_empty());
    Ok(())
}

#[rstest]
fn editing_without_active_dataset(store: TestStore) -> anyhow::Result<()> {
    let mut registry = store.open()?;
    let res = registry.insert_region(Region::new("chr1", 0, 1));
    assert!(matches!(res, Err(StoreError::NotFound(_))));
    Ok(())
}

#[rstest]
fn catalog_survives_reopen(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("seed.bed", SEED_BED);
    let before = {
        let mut registry = store.open()?;
        registry.add_dataset("a", Some(&source), Some("peaks"))?;
        registry.add_dataset("b", None, None)?;
        registry.select_dataset("a")?;
        registry.insert_region(Region::new("chr1", 300, 400).with_name("new"))?;
        registry.set_version_info("a", "ver1", Some("me"), Some("first pass"))?;
        registry.active_regions()?
    };

    let mut registry = store.open()?;
    assert_eq!(registry.dataset_names(), vec!["a", "b"]);
    assert_eq!(registry.active_dataset_name(), Some("a"));
    let version = registry.dataset("a").unwrap().version("ver1").unwrap();
    assert_eq!(version.author(), Some("me"));
    assert_eq!(version.description(), Some("first pass"));
    assert_eq!(registry.active_regions()?, before);
    Ok(())
}

#[rstest]
fn viewer_edits_are_saved(store: TestStore) -> anyhow::Result<()> {
    {
        let mut registry = store.open()?;
        registry.add_dataset("d", None, None)?;
        store
            .viewer
            .edit(vec![Region::new("3", 5, 10).with_name("drawn")]);
        registry.close()?;
    }
    assert!(!store.viewer.state().flushed.is_empty());

    let mut registry = store.open()?;
    assert_eq!(spans(&registry.active_regions()?), vec![span(
        "3",
        5,
        10,
        Some("drawn")
    )]);
    Ok(())
}

#[rstest]
fn corrupt_catalog_starts_empty(store: TestStore) -> anyhow::Result<()> {
    fs::write(store.home.path().join("GIE.datasets.json"), "{ not json")?;
    let registry = store.open()?;
    assert!(registry.dataset_names().is_empty());
    assert_eq!(registry.active_dataset_name(), None);
    Ok(())
}

#[rstest]
fn second_instance_is_locked_out(store: TestStore) -> anyhow::Result<()> {
    let _first = store.open()?;
    let res = Registry::open(
        store.config(),
        Collaborators::new(
            common::hg38(),
            MemoryViewer::new(),
            AutoPrompt::new().with_confirm(false),
        ),
    );
    assert!(matches!(res, Err(StoreError::Conflict(_))));
    Ok(())
}

#[rstest]
fn rename_dataset_keeps_display(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("seed.bed", SEED_BED);
    let mut registry = store.open()?;
    registry.add_dataset("old", Some(&source), None)?;
    registry.add_dataset("taken", None, None)?;
    registry.select_dataset("old")?;

    assert!(matches!(
        registry.rename_dataset("old", "taken"),
        Err(StoreError::Conflict(_))
    ));
    registry.rename_dataset("old", "new")?;
    assert_eq!(registry.active_dataset_name(), Some("new"));
    assert_eq!(registry.active_regions()?.len(), 3);
    assert!(store.home.path().join("new_ver1_main.roi.bed").is_file());
    assert!(!store.home.path().join("old_ver1_main.roi.bed").exists());

    let session = fs::read_to_string(store.home.path().join("new_ver1.session.xml"))?;
    assert!(session.contains("new_ver1_main.roi.bed"));
    assert!(!session.contains("old_ver1"));
    Ok(())
}

#[rstest]
fn export_layer_bed(store: TestStore) -> anyhow::Result<()> {
    let source = store.source("seed.bed", SEED_BED);
    let mut registry = store.open()?;
    registry.add_dataset("d", Some(&source), None)?;
    let dest = store.scratch.path().join("out.bed");

    assert_eq!(registry.export_layer_bed("d", "ver1", "main", &dest)?, 3);
    assert_eq!(
        fs::read_to_string(&dest)?,
        "1\t100\t150\ta\t0\t+\n1\t150\t250\tb\t0\t+\n2\t10\t20\tc\t0\t+\n"
    );
    Ok(())
}
