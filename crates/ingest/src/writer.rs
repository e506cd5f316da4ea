use std::fs::File;
use std::io::Write;
use std::path::Path;

use cfmv_core::Dataset;
use csv::WriterBuilder;
use tracing::info;

use crate::error::Result;

/// Write `dataset` to `path` in the same layout [`read_dataset`] accepts.
///
/// [`read_dataset`]: crate::reader::read_dataset
pub fn write_dataset(path: impl AsRef<Path>, dataset: &Dataset, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_to(file, dataset, delimiter)?;
    info!(path = %path.display(), records = dataset.len(), "data set written");
    Ok(())
}

/// Write the name row, the type row, then every record.
///
/// Integer and categorical cells are written as whole numbers, decimal cells
/// always with a decimal point. NaN cells are left blank.
pub fn write_to<W: Write>(writer: W, dataset: &Dataset, delimiter: u8) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(false)
        .from_writer(writer);

    let schema = dataset.schema();
    wtr.write_record(schema.names())?;
    wtr.write_record(schema.tags())?;

    for record in dataset.records() {
        let row = record
            .values()
            .iter()
            .enumerate()
            .map(|(f, &v)| schema.kind(f).format(v));
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{parse_dataset, read_dataset};

    const INPUT: &str = "age,weight,group\ni,d,c\n30,70.5,1\n41,,2\n,80.0,1\n";

    fn render(dataset: &Dataset, delimiter: u8) -> String {
        let mut buf = Vec::new();
        write_to(&mut buf, dataset, delimiter).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn writes_header_and_formatted_values() {
        let mut ds = parse_dataset(INPUT.as_bytes(), b',').unwrap();
        ds.fill_missing(1, 1, 75.0).unwrap();
        ds.fill_missing(2, 0, 35.6).unwrap();

        let out = render(&ds, b',');
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "age,weight,group",
                "i,d,c",
                "30,70.5,1",
                "41,75.0,2",
                "36,80.0,1",
            ]
        );
    }

    #[test]
    fn nan_cells_are_written_blank() {
        let mut ds = parse_dataset("a,b\nd,d\n1.0,2.0\n3.0,\n".as_bytes(), b',').unwrap();
        ds.fill_missing(1, 1, f64::NAN).unwrap();

        let out = render(&ds, b',');
        assert_eq!(out.lines().last(), Some("3.0,"));

        let back = parse_dataset(out.as_bytes(), b',').unwrap();
        assert!(back.record(1).is_missing(1));
    }

    #[test]
    fn one_column_nan_row_reads_back_in_place() {
        let mut ds = parse_dataset("a\nd\n1.0\n\n3.0\n".as_bytes(), b',').unwrap();
        ds.fill_missing(1, 0, f64::NAN).unwrap();

        let back = parse_dataset(render(&ds, b',').as_bytes(), b',').unwrap();
        assert_eq!(back.len(), 3);
        assert!(back.record(1).is_missing(0));
        assert_eq!(back.record(2).value(0), 3.0);
    }

    #[test]
    fn uses_configured_delimiter() {
        let ds = parse_dataset("a,b\ni,d\n1,2.5\n".as_bytes(), b',').unwrap();
        let out = render(&ds, b'\t');
        assert_eq!(out, "a\tb\ni\td\n1\t2.5\n");
    }

    #[test]
    fn file_round_trip_keeps_values() {
        let ds = parse_dataset("x,y\nd,i\n1.25,2\n3.0,4\n".as_bytes(), b',').unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_dataset(&path, &ds, b',').unwrap();

        let back = read_dataset(&path, b',').unwrap();
        assert_eq!(back.schema(), ds.schema());
        assert_eq!(back.records(), ds.records());
    }
}
