//! Per-layer region collection with overlap resolution.
//!
//! [`IntervalSet`] keeps, for every chromosome, a list of [`Region`]s sorted by
//! start. Edits go through [`IntervalSet::insert`], [`IntervalSet::clip`] and
//! [`IntervalSet::merge`], after which no two regions of a chromosome overlap.
//! [`IntervalSet::bulk_replace`] rebuilds the set from an external collection
//! without resolving overlaps; the next edit of an affected range normalizes
//! it.
//!
//! Chromosomes are keyed by their canonical label, so `chr1` and `1` share a
//! list.

use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;

use super::chrom::{
    canonical_chrom,
    compare_chrom,
};
use super::region::Region;
use super::typedef::PosType;

fn chrom_key(chrom: &str) -> String {
    canonical_chrom(chrom).into_owned()
}

fn sort_by_start(list: &mut [Region]) {
    list.sort_by(|a, b| {
        a.start()
            .cmp(&b.start())
            .then(a.end().cmp(&b.end()))
    });
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    inner: HashMap<String, Vec<Region>>,
}

impl FromIterator<Region> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = Region>>(iter: T) -> Self {
        let mut set = Self::new();
        set.bulk_replace(iter);
        set
    }
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `region`, resolving every overlap with existing regions of its
    /// chromosome.
    ///
    /// Existing regions fully covered by `region` are dropped. A region that
    /// fully covers `region` is split into the left and right remainders
    /// (zero-length remainders are discarded). A partially overlapping region
    /// keeps its non-overlapping side. Remainders carry the metadata of the
    /// region they came from.
    ///
    /// With `clip` set, `region` itself is not added: the call only carves a
    /// hole of its range.
    pub fn insert(
        &mut self,
        region: Region,
        clip: bool,
    ) {
        let key = chrom_key(region.chrom());
        let (new_start, new_end) = (region.start(), region.end());
        let list = self.inner.entry(key.clone()).or_default();

        let mut resolved = Vec::with_capacity(list.len() + 2);
        for old in list.drain(..) {
            if !old.overlaps_range(new_start, new_end) {
                resolved.push(old);
                continue;
            }
            if region.contains_range(old.start(), old.end()) {
                debug!("Dropping {} covered by {}", old, region);
            }
            else if old.contains_range(new_start, new_end) {
                debug!("Splitting {} around {}", old, region);
                if old.end() > new_end {
                    resolved.push(old.fragment(new_end, old.end()));
                }
                if new_start > old.start() {
                    resolved.push(old.fragment(old.start(), new_start));
                }
            }
            else if old.start() < new_start {
                debug!("Trimming right side of {} at {}", old, new_start);
                resolved.push(old.fragment(old.start(), new_start));
            }
            else {
                debug!("Trimming left side of {} at {}", old, new_end);
                resolved.push(old.fragment(new_end, old.end()));
            }
        }

        if !clip {
            resolved.push(region);
        }
        sort_by_start(&mut resolved);

        if resolved.is_empty() {
            self.inner.remove(&key);
        }
        else {
            *list = resolved;
        }
    }

    /// Removes the range of `region` from every existing region.
    pub fn clip(
        &mut self,
        region: Region,
    ) {
        self.insert(region, true)
    }

    /// Joins every region overlapping `region` into one spanning region.
    ///
    /// The joined region takes the metadata of the first overlapping region
    /// (in current order) that has a name, or of the first overlapping region
    /// otherwise. Returns `None` and leaves the set untouched when nothing
    /// overlaps.
    pub fn merge(
        &mut self,
        region: &Region,
    ) -> Option<Region> {
        let overlapping = self.overlapping(region.chrom(), region.start(), region.end());
        let first = overlapping.first()?;
        let start = overlapping
            .iter()
            .map(|r| r.start())
            .min()
            .unwrap_or(first.start());
        let end = overlapping
            .iter()
            .map(|r| r.end())
            .max()
            .unwrap_or(first.end());
        let template = overlapping
            .iter()
            .find(|r| r.name().is_some())
            .unwrap_or(first);

        let merged = template.fragment(start, end);
        debug!("Merging {} regions into {}", overlapping.len(), merged);
        self.insert(merged.clone(), false);
        Some(merged)
    }

    /// Normalizes an arbitrary region list: sorts by chromosome and start,
    /// then joins every run of overlapping neighbours. Differing names of a
    /// run are concatenated with `+`.
    pub fn collapse<I: IntoIterator<Item = Region>>(regions: I) -> Vec<Region> {
        let sorted = regions
            .into_iter()
            .sorted_by(|a, b| a.cmp_position(b).then(a.end().cmp(&b.end())));

        let mut result: Vec<Region> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let flush = |result: &mut Vec<Region>, names: &mut Vec<String>| {
            if let Some(last) = result.last_mut() {
                if !names.is_empty() {
                    last.set_encoded_name(Some(&names.join("+")));
                }
            }
            names.clear();
        };

        for region in sorted {
            let joins = result.last().is_some_and(|last| {
                compare_chrom(last.chrom(), region.chrom()).is_eq()
                    && region.start() < last.end()
            });
            if joins {
                if let Some(last) = result.last_mut() {
                    let end = last.end().max(region.end());
                    let start = last.start();
                    last.set_range(start, end);
                }
                if let Some(name) = region.name() {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_owned());
                    }
                }
            }
            else {
                flush(&mut result, &mut names);
                if let Some(name) = region.name() {
                    names.push(name.to_owned());
                }
                result.push(region);
            }
        }
        flush(&mut result, &mut names);
        result
    }

    /// Discards current contents and groups `regions` by chromosome, sorted by
    /// start. Overlaps are kept as given.
    pub fn bulk_replace<I: IntoIterator<Item = Region>>(
        &mut self,
        regions: I,
    ) {
        self.inner = regions
            .into_iter()
            .map(|r| (chrom_key(r.chrom()), r))
            .into_group_map()
            .into_iter()
            .map(|(chr, mut list)| {
                sort_by_start(&mut list);
                (chr, list)
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Regions of one chromosome, sorted by start.
    pub fn get(
        &self,
        chrom: &str,
    ) -> &[Region] {
        self.inner
            .get(canonical_chrom(chrom).as_ref())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Regions of `chrom` whose range intersects `[start, end)`.
    pub fn overlapping(
        &self,
        chrom: &str,
        start: PosType,
        end: PosType,
    ) -> Vec<&Region> {
        self.get(chrom)
            .iter()
            .filter(|r| r.overlaps_range(start, end))
            .collect()
    }

    /// Chromosome keys in canonical order.
    pub fn chromosomes(&self) -> Vec<&str> {
        self.inner
            .keys()
            .map(String::as_str)
            .sorted_by(|a, b| compare_chrom(a, b))
            .collect()
    }

    /// All regions ordered by canonical chromosome, then start.
    pub fn sorted(&self) -> Vec<&Region> {
        self.chromosomes()
            .into_iter()
            .flat_map(|chr| self.get(chr).iter())
            .collect()
    }

    /// Owned copy of [`IntervalSet::sorted`].
    pub fn to_sorted_vec(&self) -> Vec<Region> {
        self.sorted().into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
