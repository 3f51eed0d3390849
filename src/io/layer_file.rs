//! Canonical tab-delimited layer format.
//!
//! Line 1 is an informational `track` header. Every other line is
//! `chr start end name score strand thickStart thickEnd color [annotation...]`
//! where annotation fields follow the layer's schema positionally and are
//! URL-encoded. Absent name, score and color are written as `-`, an absent
//! strand as `.`.

use std::io::{
    BufRead,
    Write,
};

use itertools::Itertools;

use crate::data_structs::typedef::PosType;
use crate::data_structs::{
    Region,
    Strand,
};
use crate::error::{
    Result,
    StoreError,
};
use crate::utils::{
    decode_value,
    encode_value,
};

/// Number of fixed leading fields per line.
pub const FIXED_FIELDS: usize = 9;

const ABSENT_FIELD: &str = "-";

/// Whether `line` is a header or comment rather than a region.
pub fn is_header_line(line: &str) -> bool {
    line.starts_with("track") || line.starts_with("browser ") || line.starts_with('#')
}

fn parse_pos(
    field: &str,
    what: &str,
    line_no: usize,
) -> Result<PosType> {
    field.trim().parse::<PosType>().map_err(|e| {
        StoreError::malformed(format!("line {line_no}: invalid {what} '{field}': {e}"))
    })
}

/// Parses one region line. `line_no` is only used for error messages.
pub fn parse_line(
    line: &str,
    line_no: usize,
    schema: &[String],
) -> Result<Region> {
    let fields = line.split('\t').collect_vec();
    if fields.len() < FIXED_FIELDS {
        return Err(StoreError::malformed(format!(
            "line {line_no}: expected at least {FIXED_FIELDS} fields, found {}",
            fields.len()
        )));
    }
    if fields[0].trim().is_empty() {
        return Err(StoreError::malformed(format!(
            "line {line_no}: empty chromosome"
        )));
    }

    let start = parse_pos(fields[1], "start", line_no)?;
    let end = parse_pos(fields[2], "end", line_no)?;
    let mut region = Region::new(fields[0].trim(), start, end);
    region.set_encoded_name(Some(fields[3]));
    region.set_score(Some(fields[4]));
    region.set_strand(
        Strand::parse_field(fields[5])
            .map_err(|e| StoreError::malformed(format!("line {line_no}: {e}")))?,
    );
    region.set_color(Some(fields[8]));

    for (key, raw) in schema.iter().zip(fields.iter().skip(FIXED_FIELDS)) {
        region.set_annotation(key.as_str(), decode_value(raw));
    }
    Ok(region)
}

/// Renders one region line (without the trailing newline).
pub fn format_line(
    region: &Region,
    schema: &[String],
) -> String {
    let mut line = format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        region.chrom(),
        region.start(),
        region.end(),
        region.name().unwrap_or(ABSENT_FIELD),
        region.score().unwrap_or(ABSENT_FIELD),
        Strand::to_field(region.strand()),
        region.start(),
        region.end(),
        region.color().unwrap_or(ABSENT_FIELD),
    );
    for key in schema {
        line.push('\t');
        line.push_str(&encode_value(region.annotation(key).unwrap_or_default()));
    }
    line
}

/// Reads every region of a layer file. Fails on the first malformed line.
pub fn read_regions<R: BufRead>(
    reader: R,
    schema: &[String],
) -> Result<Vec<Region>> {
    let mut regions = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || is_header_line(line) {
            continue;
        }
        regions.push(parse_line(line, idx + 1, schema)?);
    }
    Ok(regions)
}

/// Writes the `track` header line.
pub fn write_header<W: Write>(
    writer: &mut W,
    track_name: &str,
) -> Result<()> {
    writeln!(
        writer,
        "track name=\"{}\" description=\"regions of interest\"",
        track_name.replace('"', "'")
    )?;
    Ok(())
}

/// Writes a complete layer file: header, then `regions` in the given order.
pub fn write_regions<'a, W, I>(
    writer: &mut W,
    track_name: &str,
    regions: I,
    schema: &[String],
) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Region>, {
    write_header(writer, track_name)?;
    let mut count = 0;
    for region in regions {
        writeln!(writer, "{}", format_line(region, schema))?;
        count += 1;
    }
    Ok(count)
}
