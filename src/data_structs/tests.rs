use std::cmp::Ordering;

use itertools::Itertools;
use rstest::rstest;

use super::chrom::*;
use super::*;

fn named(
    chrom: &str,
    start: u64,
    end: u64,
    name: &str,
) -> Region {
    Region::new(chrom, start, end).with_name(name)
}

fn spans(
    set: &IntervalSet,
    chrom: &str,
) -> Vec<(u64, u64, Option<String>)> {
    set.get(chrom)
        .iter()
        .map(|r| (r.start(), r.end(), r.display_name()))
        .collect()
}

// --- Chromosome order ---

#[rstest]
#[case("chr1", "1")]
#[case("CHR22", "22")]
#[case("chrx", "X")]
#[case("Y", "Y")]
#[case("chrM", "M")]
#[case("MT", "M")]
#[case("chrmt", "M")]
#[case("m", "M")]
#[case("chrUn_gl000220", "chrUn_gl000220")]
#[case("scaffold_7", "scaffold_7")]
#[case("23", "23")]
fn test_canonical_chrom(
    #[case] raw: &str,
    #[case] expected: &str,
) {
    assert_eq!(canonical_chrom(raw), expected);
}

#[test]
fn test_canonical_order_list() {
    let shuffled = ["Y", "chr10", "X", "2", "chrM", "1", "contig_b", "contig_a"];
    let sorted = shuffled
        .iter()
        .sorted_by(|a, b| compare_chrom(a, b))
        .map(|c| canonical_chrom(c).into_owned())
        .collect_vec();
    assert_eq!(sorted, vec![
        "1", "2", "10", "M", "X", "Y", "contig_a", "contig_b"
    ]);
}

#[test]
fn test_compare_chrom_is_strict_weak_order() {
    let tokens = [
        "1", "chr1", "2", "chr10", "22", "M", "chrMT", "X", "chrX", "Y",
        "alpha", "beta", "chrUn", "",
    ];
    for a in tokens {
        assert_eq!(compare_chrom(a, a), Ordering::Equal);
        for b in tokens {
            assert_eq!(compare_chrom(a, b), compare_chrom(b, a).reverse());
            for c in tokens {
                if compare_chrom(a, b).is_le() && compare_chrom(b, c).is_le() {
                    assert!(compare_chrom(a, c).is_le(), "{a} <= {b} <= {c}");
                }
            }
        }
    }
}

#[test]
fn test_compare_opt_chrom_absent_first() {
    assert_eq!(compare_opt_chrom(None, Some("1")), Ordering::Less);
    assert_eq!(compare_opt_chrom(Some("contig"), None), Ordering::Greater);
    assert_eq!(compare_opt_chrom(None, None), Ordering::Equal);
}

// --- Region ---

#[test]
fn test_region_swaps_reversed_bounds() {
    let r = Region::new("chr1", 200, 100);
    assert_eq!((r.start(), r.end()), (100, 200));
}

#[rstest]
#[case("-")]
#[case("NA")]
#[case("na")]
#[case("NULL")]
#[case("")]
fn test_region_absent_markers(#[case] marker: &str) {
    let mut r = Region::new("chr1", 0, 10);
    r.set_name(Some(marker));
    r.set_score(Some(marker));
    r.set_color(Some(marker));
    assert_eq!(r.name(), None);
    assert_eq!(r.score(), None);
    assert_eq!(r.color(), None);
}

#[test]
fn test_region_name_is_escaped() {
    let r = Region::new("chr1", 0, 10).with_name("my gene\tX");
    assert_eq!(r.name(), Some("my_gene%09X"));
    assert_eq!(r.display_name().as_deref(), Some("my_gene\tX"));
}

#[test]
fn test_region_clone_is_deep() {
    let original = Region::new("chr1", 0, 10).with_annotation("source", "manual");
    let mut copy = original.clone();
    copy.set_annotation("source", "edited");
    assert_eq!(original.annotation("source"), Some("manual"));
    assert_eq!(copy.annotation("source"), Some("edited"));
}

#[test]
fn test_region_position_order_ignores_metadata() {
    let a = named("chr2", 100, 200, "a");
    let b = named("2", 100, 900, "b");
    let c = named("chr10", 5, 6, "c");
    assert_eq!(a.cmp_position(&b), Ordering::Equal);
    assert_ne!(a, b);
    assert_eq!(a.cmp_position(&c), Ordering::Less);
}

// --- IntervalSet ---

#[test]
fn test_insert_same_range_twice_keeps_latest() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 10, 20, "first"), false);
    set.insert(named("chr1", 10, 20, "second"), false);
    assert_eq!(spans(&set, "chr1"), vec![(10, 20, Some("second".into()))]);

    let snapshot = set.clone();
    set.insert(named("chr1", 10, 20, "second"), false);
    assert_eq!(set, snapshot);
}

#[test]
fn test_insert_splits_containing_region() {
    let mut set = IntervalSet::new();
    let outer = named("chr1", 50, 300, "outer")
        .with_score("7")
        .with_annotation("k", "v");
    set.insert(outer, false);
    set.insert(named("chr1", 100, 200, "inner"), false);

    let regions = set.get("chr1");
    assert_eq!(regions.len(), 3);
    assert_eq!(spans(&set, "chr1"), vec![
        (50, 100, Some("outer".into())),
        (100, 200, Some("inner".into())),
        (200, 300, Some("outer".into())),
    ]);
    for frag in [&regions[0], &regions[2]] {
        assert_eq!(frag.score(), Some("7"));
        assert_eq!(frag.annotation("k"), Some("v"));
    }
}

#[test]
fn test_insert_drops_fully_covered_regions() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 10, 20, "a"), false);
    set.insert(named("chr1", 30, 40, "b"), false);
    set.insert(named("chr1", 0, 1000, "R"), false);
    assert_eq!(spans(&set, "chr1"), vec![(0, 1000, Some("R".into()))]);
}

#[test]
fn test_insert_partial_overlap_trims_old_region() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 100, 200, "a"), false);
    set.insert(named("chr1", 150, 250, "b"), false);
    set.insert(named("chr2", 10, 20, "c"), false);
    assert_eq!(spans(&set, "chr1"), vec![
        (100, 150, Some("a".into())),
        (150, 250, Some("b".into())),
    ]);
    assert_eq!(spans(&set, "chr2"), vec![(10, 20, Some("c".into()))]);

    // new region on the left side of an existing one
    set.insert(named("chr1", 50, 120, "d"), false);
    assert_eq!(spans(&set, "chr1"), vec![
        (50, 120, Some("d".into())),
        (120, 150, Some("a".into())),
        (150, 250, Some("b".into())),
    ]);
}

#[test]
fn test_insert_equal_start_shorter_new_region() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 100, 200, "old"), false);
    set.insert(named("chr1", 100, 150, "new"), false);
    assert_eq!(spans(&set, "chr1"), vec![
        (100, 150, Some("new".into())),
        (150, 200, Some("old".into())),
    ]);
}

#[test]
fn test_insert_equal_start_longer_new_region() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 100, 150, "old"), false);
    set.insert(named("chr1", 100, 200, "new"), false);
    assert_eq!(spans(&set, "chr1"), vec![(100, 200, Some("new".into()))]);
}

#[test]
fn test_insert_equal_end_different_start() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 100, 200, "old"), false);
    set.insert(named("chr1", 150, 200, "new"), false);
    assert_eq!(spans(&set, "chr1"), vec![
        (100, 150, Some("old".into())),
        (150, 200, Some("new".into())),
    ]);
}

#[test]
fn test_clip_carves_hole_without_inserting() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 0, 100, "a"), false);
    set.insert(named("chr1", 120, 140, "b"), false);
    set.clip(Region::new("chr1", 50, 130));
    assert_eq!(spans(&set, "chr1"), vec![
        (0, 50, Some("a".into())),
        (130, 140, Some("b".into())),
    ]);

    set.clip(Region::new("chr1", 0, 1000));
    assert!(set.is_empty());
    assert!(set.chromosomes().is_empty());
}

#[test]
fn test_zero_length_region_is_kept() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 40, 40, "point"), false);
    assert_eq!(spans(&set, "chr1"), vec![(40, 40, Some("point".into()))]);

    set.insert(named("chr1", 10, 40, "left"), false);
    assert_eq!(set.len(), 2);
}

#[test]
fn test_trim_to_zero_length_drops_fragment() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 10, 20, "old"), false);
    set.insert(named("chr1", 10, 20, "new"), true);
    assert!(set.get("chr1").is_empty());
}

#[test]
fn test_insert_never_leaves_overlaps() {
    let mut set = IntervalSet::new();
    let edits = [(0, 50), (40, 60), (10, 15), (55, 100), (5, 95), (94, 96), (0, 3)];
    for (idx, (s, e)) in edits.into_iter().enumerate() {
        set.insert(named("chr3", s, e, &format!("r{idx}")), false);
        let list = set.get("chr3");
        for pair in list.windows(2) {
            assert!(pair[0].end() <= pair[1].start(), "{:?}", spans(&set, "chr3"));
        }
    }
}

#[test]
fn test_chromosome_aliases_share_a_list() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 0, 100, "a"), false);
    set.insert(named("1", 50, 150, "b"), false);
    assert_eq!(set.get("chr1").len(), 2);
    assert_eq!(set.get("1")[0].end(), 50);
}

#[test]
fn test_merge_joins_overlapping_on_target_chromosome() {
    let mut set = IntervalSet::new();
    set.bulk_replace(vec![
        named("chr1", 10, 20, "x"),
        named("chr1", 15, 30, "y"),
        named("chr2", 10, 20, "z"),
    ]);
    let merged = set.merge(&Region::new("chr1", 12, 18));
    assert_eq!(merged.map(|r| (r.start(), r.end())), Some((10, 30)));
    assert_eq!(spans(&set, "chr1"), vec![(10, 30, Some("x".into()))]);
    assert_eq!(spans(&set, "chr2"), vec![(10, 20, Some("z".into()))]);
}

#[test]
fn test_merge_without_overlap_is_noop() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 10, 20, "x"), false);
    let before = set.clone();
    assert!(set.merge(&Region::new("chr1", 100, 200)).is_none());
    assert_eq!(set, before);
}

#[test]
fn test_merge_prefers_named_template() {
    let mut set = IntervalSet::new();
    set.bulk_replace(vec![
        Region::new("chr1", 0, 10),
        named("chr1", 5, 12, "named"),
    ]);
    let merged = set.merge(&Region::new("chr1", 0, 12)).unwrap();
    assert_eq!(merged.display_name().as_deref(), Some("named"));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_collapse_joins_runs_and_names() {
    let collapsed = IntervalSet::collapse(vec![
        named("chr2", 5, 10, "q"),
        named("chr1", 30, 40, "c"),
        named("chr1", 0, 10, "a"),
        named("chr1", 5, 20, "b"),
        named("chr1", 8, 12, "a"),
        named("chr1", 20, 25, "touching"),
    ]);
    let flat = collapsed
        .iter()
        .map(|r| (r.chrom().to_owned(), r.start(), r.end(), r.name().map(String::from)))
        .collect_vec();
    assert_eq!(flat, vec![
        ("chr1".into(), 0, 20, Some("a+b".into())),
        ("chr1".into(), 20, 25, Some("touching".into())),
        ("chr1".into(), 30, 40, Some("c".into())),
        ("chr2".into(), 5, 10, Some("q".into())),
    ]);
}

#[test]
fn test_bulk_replace_keeps_raw_overlaps_and_sorts() {
    let mut set = IntervalSet::new();
    set.insert(named("chr9", 0, 5, "gone"), false);
    set.bulk_replace(vec![
        named("chr1", 50, 60, "b"),
        named("chr1", 0, 100, "a"),
        named("chrX", 1, 2, "x"),
    ]);
    assert!(set.get("chr9").is_empty());
    assert_eq!(spans(&set, "chr1"), vec![
        (0, 100, Some("a".into())),
        (50, 60, Some("b".into())),
    ]);
    assert_eq!(set.chromosomes(), vec!["1", "X"]);
}

#[test]
fn test_sorted_uses_canonical_chromosome_order() {
    let set: IntervalSet = vec![
        named("chrY", 0, 1, "y"),
        named("contig9", 0, 1, "c"),
        named("chr2", 5, 6, "two-b"),
        named("chr10", 0, 1, "ten"),
        named("chr2", 0, 1, "two-a"),
        named("chrM", 0, 1, "m"),
    ]
    .into_iter()
    .collect();
    let order = set
        .sorted()
        .iter()
        .map(|r| r.display_name().unwrap_or_default())
        .collect_vec();
    assert_eq!(order, vec!["two-a", "two-b", "ten", "m", "y", "c"]);
}

#[test]
fn test_overlapping_query() {
    let mut set = IntervalSet::new();
    set.insert(named("chr1", 0, 10, "a"), false);
    set.insert(named("chr1", 20, 30, "b"), false);
    let hits = set.overlapping("chr1", 5, 25);
    assert_eq!(hits.len(), 2);
    assert!(set.overlapping("chr1", 10, 20).is_empty());
    assert!(set.overlapping("chr5", 0, 100).is_empty());
}
