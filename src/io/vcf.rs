//! VCF import.
//!
//! Each data line becomes one region starting at `POS` and spanning the
//! variant width (see [`variant_width`]). The name is `REF>ALT ID`; passing
//! calls (`FILTER` of `PASS` or `.`) get score 1000 and black, everything
//! else score 0 and gray.

use std::io::BufRead;

use itertools::Itertools;
use log::debug;

use crate::data_structs::typedef::PosType;
use crate::data_structs::Region;
use crate::error::{
    Result,
    StoreError,
};

const PASS_SCORE: &str = "1000";
const FAIL_SCORE: &str = "0";
const PASS_COLOR: &str = "0,0,0";
const FAIL_COLOR: &str = "128,128,128";

fn is_symbolic(alt: &str) -> bool {
    alt.is_empty()
        || alt == "."
        || alt == "*"
        || alt.starts_with('<')
        || alt.contains(['[', ']'])
}

/// Reference span of a variant.
///
/// A pure deletion (some ALT is a strict prefix of REF) spans 1. Otherwise
/// the width is the maximum over ALT alleles of the inserted length plus the
/// anchor base for insertions, or `len(REF)` for same-length and other calls.
/// Never less than 1.
pub fn variant_width(
    reference: &str,
    alts: &[&str],
) -> PosType {
    let is_deletion = alts.iter().any(|alt| {
        !is_symbolic(alt) && alt.len() < reference.len() && reference.starts_with(alt)
    });
    if is_deletion {
        return 1;
    }
    alts.iter()
        .map(|alt| {
            if !is_symbolic(alt) && alt.len() > reference.len() {
                alt.len() - reference.len() + 1
            }
            else {
                reference.len()
            }
        })
        .max()
        .unwrap_or(reference.len())
        .max(1) as PosType
}

fn is_passing(filter: &str) -> bool {
    filter == "PASS" || filter == "."
}

/// Parses one VCF data line.
pub fn parse_vcf_line<C: Fn(&str) -> String>(
    line: &str,
    line_no: usize,
    canonical: &C,
) -> Result<Region> {
    let fields = line.split('\t').collect_vec();
    if fields.len() < 7 {
        return Err(StoreError::malformed(format!(
            "VCF line {line_no}: expected at least 7 fields, found {}",
            fields.len()
        )));
    }
    let pos = fields[1].trim().parse::<PosType>().map_err(|e| {
        StoreError::malformed(format!(
            "VCF line {line_no}: invalid position '{}': {e}",
            fields[1]
        ))
    })?;
    let (id, reference, alt, filter) = (fields[2], fields[3], fields[4], fields[6]);
    let alts = alt.split(',').collect_vec();

    let width = variant_width(reference, &alts);
    let end = pos.checked_add(width).ok_or_else(|| {
        StoreError::malformed(format!("VCF line {line_no}: position {pos} out of range"))
    })?;
    let mut region = Region::new(canonical(fields[0]), pos, end);
    region.set_name(Some(&format!("{reference}>{alt} {id}")));
    if is_passing(filter) {
        region.set_score(Some(PASS_SCORE));
        region.set_color(Some(PASS_COLOR));
    }
    else {
        region.set_score(Some(FAIL_SCORE));
        region.set_color(Some(FAIL_COLOR));
    }
    Ok(region)
}

/// Streams VCF data lines into `sink`, skipping meta and header lines.
/// `sink` returns `Ok(false)` to stop early. Returns the number of rows
/// handed to `sink`.
pub fn read_vcf<R, C, F>(
    reader: R,
    canonical: C,
    mut sink: F,
) -> Result<usize>
where
    R: BufRead,
    C: Fn(&str) -> String,
    F: FnMut(Region) -> Result<bool>, {
    let mut rows = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let region = parse_vcf_line(line, idx + 1, &canonical)?;
        rows += 1;
        if !sink(region)? {
            debug!("VCF import stopped by caller after {rows} rows");
            break;
        }
    }
    Ok(rows)
}
