use std::cmp::Ordering;
use std::fmt::Display;
use std::ops::Range;

use super::chrom::compare_chrom;
use super::enums::Strand;
use super::typedef::{
    AnnotMap,
    PosType,
};
use crate::utils::{
    decode_name,
    encode_name,
};

/// Markers that denote an absent name, score or color.
const ABSENT_MARKERS: [&str; 3] = ["-", "NA", "null"];

/// Whether a raw field value stands for "absent".
pub fn is_absent_marker(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || ABSENT_MARKERS
            .iter()
            .any(|m| trimmed.eq_ignore_ascii_case(m))
}

fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_absent_marker(v))
}

/// One genomic region of interest with its descriptive metadata.
///
/// Coordinates are 0-based and half-open. The descriptive name is stored in
/// its escaped form (see [`encode_name`]), so it can be written to a layer
/// file verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    chrom:       String,
    start:       PosType,
    end:         PosType,
    name:        Option<String>,
    score:       Option<String>,
    strand:      Option<Strand>,
    color:       Option<String>,
    annotations: AnnotMap,
}

impl Region {
    /// Creates a region without metadata. Reversed bounds are swapped.
    pub fn new(
        chrom: impl Into<String>,
        start: PosType,
        end: PosType,
    ) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            chrom: chrom.into(),
            start,
            end,
            name: None,
            score: None,
            strand: None,
            color: None,
            annotations: AnnotMap::new(),
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> PosType {
        self.start
    }

    pub fn end(&self) -> PosType {
        self.end
    }

    pub fn range(&self) -> Range<PosType> {
        self.start..self.end
    }

    pub fn length(&self) -> PosType {
        self.end - self.start
    }

    /// Escaped descriptive name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Descriptive name with escapes reversed.
    pub fn display_name(&self) -> Option<String> {
        self.name.as_deref().map(decode_name)
    }

    pub fn score(&self) -> Option<&str> {
        self.score.as_deref()
    }

    pub fn strand(&self) -> Option<Strand> {
        self.strand
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn annotations(&self) -> &AnnotMap {
        &self.annotations
    }

    pub fn annotation(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Moves both bounds. Reversed bounds are swapped.
    pub fn set_range(
        &mut self,
        start: PosType,
        end: PosType,
    ) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.start = start;
        self.end = end;
    }

    pub fn set_chrom(
        &mut self,
        chrom: impl Into<String>,
    ) {
        self.chrom = chrom.into();
    }

    /// Sets the descriptive name from free text, escaping it.
    pub fn set_name(
        &mut self,
        name: Option<&str>,
    ) {
        self.name = normalize(name.map(encode_name));
    }

    /// Sets an already escaped name, as read from a layer file.
    pub fn set_encoded_name(
        &mut self,
        name: Option<&str>,
    ) {
        self.name = normalize(name.map(str::to_owned));
    }

    pub fn set_score(
        &mut self,
        score: Option<&str>,
    ) {
        self.score = normalize(score.map(|s| s.trim().to_owned()));
    }

    pub fn set_strand(
        &mut self,
        strand: Option<Strand>,
    ) {
        self.strand = strand;
    }

    pub fn set_color(
        &mut self,
        color: Option<&str>,
    ) {
        self.color = normalize(color.map(|s| s.trim().to_owned()));
    }

    /// Sets one annotation value; an empty value removes the key.
    pub fn set_annotation(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            self.annotations.shift_remove(&key);
        }
        else {
            self.annotations.insert(key, value);
        }
    }

    pub fn with_name(
        mut self,
        name: &str,
    ) -> Self {
        self.set_name(Some(name));
        self
    }

    pub fn with_score(
        mut self,
        score: &str,
    ) -> Self {
        self.set_score(Some(score));
        self
    }

    pub fn with_strand(
        mut self,
        strand: Strand,
    ) -> Self {
        self.strand = Some(strand);
        self
    }

    pub fn with_color(
        mut self,
        color: &str,
    ) -> Self {
        self.set_color(Some(color));
        self
    }

    pub fn with_annotation(
        mut self,
        key: &str,
        value: &str,
    ) -> Self {
        self.set_annotation(key, value);
        self
    }

    /// Copy of this region's metadata over a different range.
    pub fn fragment(
        &self,
        start: PosType,
        end: PosType,
    ) -> Self {
        let mut fragment = self.clone();
        fragment.set_range(start, end);
        fragment
    }

    /// Whether the half-open ranges intersect. Chromosomes are not compared.
    pub fn overlaps_range(
        &self,
        start: PosType,
        end: PosType,
    ) -> bool {
        self.start < end && start < self.end
    }

    /// Whether `other` lies within this region's range. Chromosomes are not
    /// compared.
    pub fn contains_range(
        &self,
        start: PosType,
        end: PosType,
    ) -> bool {
        self.start <= start && end <= self.end
    }

    /// Positional order: canonical chromosome, then start.
    ///
    /// Not consistent with `==`: regions at the same position compare
    /// `Equal` whatever their other fields.
    pub fn cmp_position(
        &self,
        other: &Self,
    ) -> Ordering {
        compare_chrom(&self.chrom, &other.chrom).then(self.start.cmp(&other.start))
    }
}

impl Display for Region {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)?;
        if let Some(name) = self.display_name() {
            write!(f, " {}", name)?;
        }
        Ok(())
    }
}
