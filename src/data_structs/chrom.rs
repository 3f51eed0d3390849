//! Canonical chromosome naming and ordering.
//!
//! Canonical labels are `"1".."22"`, `"M"`, `"X"` and `"Y"`, ordered by their
//! index in that list. Any other token is "non-canonical": it is passed
//! through unchanged and sorts after every canonical label, lexicographically
//! among other non-canonical tokens.

use std::borrow::Cow;
use std::cmp::Ordering;

use hashbrown::HashMap;
use once_cell::sync::Lazy;

/// Canonical chromosome labels in sort order.
pub const CANONICAL_CHROMOSOMES: [&str; 25] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14",
    "15", "16", "17", "18", "19", "20", "21", "22", "M", "X", "Y",
];

static CANONICAL_INDEX: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    CANONICAL_CHROMOSOMES
        .iter()
        .enumerate()
        .map(|(idx, name)| (*name, idx))
        .collect()
});

fn strip_chr_prefix(raw: &str) -> &str {
    match raw.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &raw[3..],
        _ => raw,
    }
}

/// Returns the canonical label for `raw`, or `raw` itself when it has no
/// canonical mapping.
pub fn canonical_chrom(raw: &str) -> Cow<'_, str> {
    let stripped = strip_chr_prefix(raw);
    if stripped.eq_ignore_ascii_case("mt") || stripped.eq_ignore_ascii_case("m") {
        return Cow::Borrowed("M");
    }
    let upper = stripped.to_ascii_uppercase();
    if CANONICAL_INDEX.contains_key(upper.as_str()) {
        if upper == raw {
            Cow::Borrowed(raw)
        }
        else {
            Cow::Owned(upper)
        }
    }
    else {
        Cow::Borrowed(raw)
    }
}

/// Position of `raw` in [`CANONICAL_CHROMOSOMES`], if it is canonical.
pub fn canonical_index(raw: &str) -> Option<usize> {
    CANONICAL_INDEX
        .get(canonical_chrom(raw).as_ref())
        .copied()
}

/// Total order over chromosome tokens.
///
/// Canonical tokens come first in list order, then non-canonical tokens in
/// lexicographic order. Different spellings of the same canonical chromosome
/// (`chr1`, `1`) compare equal.
pub fn compare_chrom(
    a: &str,
    b: &str,
) -> Ordering {
    match (canonical_index(a), canonical_index(b)) {
        (Some(ia), Some(ib)) => ia.cmp(&ib),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// [`compare_chrom`] extended to absent tokens, which sort first.
pub fn compare_opt_chrom(
    a: Option<&str>,
    b: Option<&str>,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_chrom(a, b),
    }
}
