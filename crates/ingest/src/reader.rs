use std::fs::File;
use std::io::Read;
use std::path::Path;

use cfmv_core::{CfmvError, Dataset, FeatureSchema};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use crate::error::Result;

/// Load a data set from the file at `path`.
pub fn read_dataset(path: impl AsRef<Path>, delimiter: u8) -> Result<Dataset> {
    let path = path.as_ref();
    info!(path = %path.display(), "reading data set");
    let file = File::open(path)?;
    parse_dataset(file, delimiter)
}

/// Parse a data set from any reader.
///
/// Rows may differ in length at the CSV level; the row-length check against
/// the header happens in [`Dataset::load`] so it reports a format error with
/// the record number.
///
/// The `csv` reader drops empty lines, so they are found again from the
/// byte offsets between records. In a one-feature file an empty line is a
/// record whose only cell is missing; with more features it is a short row.
/// Empty lines after the last record are ignored.
pub fn parse_dataset<R: Read>(mut reader: R, delimiter: u8) -> Result<Dataset> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(input.as_slice());
    let mut row = StringRecord::new();

    let names = header_row(&mut rdr, &mut row, "feature name")?;
    let names_end = rdr.position().byte() as usize;
    let tags = header_row(&mut rdr, &mut row, "type")?;
    if blank_lines_at(&input, names_end) > 0 {
        return Err(CfmvError::Format(
            "empty line between feature name and type rows".to_string(),
        )
        .into());
    }
    let schema = FeatureSchema::from_header(&names, &tags)?;
    debug!(features = ?schema.names(), types = ?schema.tags(), "header parsed");

    let mut records: Vec<Vec<String>> = Vec::new();
    let mut prev_end = rdr.position().byte() as usize;
    while rdr.read_record(&mut row)? {
        let blanks = blank_lines_at(&input, prev_end);
        if blanks > 0 {
            if schema.len() != 1 {
                return Err(CfmvError::Format(format!(
                    "record {} is an empty line, header has {} fields",
                    records.len(),
                    schema.len()
                ))
                .into());
            }
            records.extend(std::iter::repeat_with(|| vec![String::new()]).take(blanks));
        }
        records.push(row.iter().map(str::to_owned).collect());
        prev_end = rdr.position().byte() as usize;
    }

    Ok(Dataset::load(schema, records)?)
}

fn header_row<R: Read>(
    rdr: &mut csv::Reader<R>,
    row: &mut StringRecord,
    what: &str,
) -> Result<Vec<String>> {
    if rdr.read_record(row)? {
        Ok(row.iter().map(str::to_owned).collect())
    } else {
        Err(CfmvError::Format(format!("missing {} row", what)).into())
    }
}

/// Number of empty lines starting at byte `pos`, where the previous record
/// ended. A terminator of that record not yet consumed is skipped first.
fn blank_lines_at(input: &[u8], mut pos: usize) -> usize {
    let is_term = |b: u8| b == b'\n' || b == b'\r';
    match (pos.checked_sub(1).map(|p| input[p]), input.get(pos).copied()) {
        (Some(b'\r'), Some(b'\n')) => pos += 1,
        (Some(prev), Some(_)) if is_term(prev) => {}
        (_, Some(b)) if is_term(b) => pos += terminator_len(&input[pos..]),
        _ => {}
    }

    let mut count = 0;
    while pos < input.len() && is_term(input[pos]) {
        pos += terminator_len(&input[pos..]);
        count += 1;
    }
    count
}

fn terminator_len(rest: &[u8]) -> usize {
    if rest.starts_with(b"\r\n") {
        2
    } else {
        1
    }
}
