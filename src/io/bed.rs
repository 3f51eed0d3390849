//! BED import.
//!
//! Rows are parsed with `bio`'s BED reader after `track`/`browser`/comment
//! lines are stripped. Missing optional columns get defaults: a synthetic
//! `<row>F` name, score `0` and strand `+`.

use std::io::BufRead;

use bio::io::bed;
use log::debug;

use super::layer_file::is_header_line;
use crate::data_structs::{
    Region,
    Strand,
};
use crate::error::{
    Result,
    StoreError,
};

const DEFAULT_SCORE: &str = "0";

/// Synthetic name for the `row`-th (1-based) unnamed BED row.
pub fn synthetic_name(row: usize) -> String {
    format!("{row}F")
}

fn parse_record(
    line: &str,
    row: usize,
) -> Result<bed::Record> {
    // One reader per line: rows may carry different numbers of columns.
    match bed::Reader::new(line.as_bytes()).records().next() {
        Some(Ok(record)) => Ok(record),
        Some(Err(e)) => Err(StoreError::malformed(format!("BED row {row}: {e}"))),
        None => Err(StoreError::malformed(format!("BED row {row}: empty row"))),
    }
}

/// Streams BED rows from `reader` into `sink` as regions.
///
/// `canonical` maps raw chromosome names onto the names the caller stores.
/// `sink` returns `Ok(false)` to stop early. Returns the number of rows
/// handed to `sink`.
pub fn read_bed<R, C, F>(
    reader: R,
    canonical: C,
    mut sink: F,
) -> Result<usize>
where
    R: BufRead,
    C: Fn(&str) -> String,
    F: FnMut(Region) -> Result<bool>, {
    let mut rows = 0;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || is_header_line(line) {
            continue;
        }
        let row = rows + 1;
        let record = parse_record(line, row)?;

        let mut region = Region::new(canonical(record.chrom()), record.start(), record.end());
        match record.name() {
            Some(name) if !name.trim().is_empty() => region.set_name(Some(name)),
            _ => region.set_name(Some(&synthetic_name(row))),
        }
        region.set_score(Some(record.score().unwrap_or(DEFAULT_SCORE)));
        region.set_strand(Some(
            record
                .strand()
                .map(Strand::from)
                .unwrap_or(Strand::Forward),
        ));

        rows = row;
        if !sink(region)? {
            debug!("BED import stopped by caller after {rows} rows");
            break;
        }
    }
    Ok(rows)
}
