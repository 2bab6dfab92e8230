use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::{Cell, Grid};
use crate::error::{Error, Result};

/// Pick `;`, tab or `,` from the first line, whichever occurs most
fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");
    [b';', b'\t']
        .iter()
        .copied()
        .filter(|&d| first_line.matches(d as char).count() > first_line.matches(',').count())
        .max_by_key(|&d| first_line.matches(d as char).count())
        .unwrap_or(b',')
}

/// Parse CSV text into a grid; every record is kept, including blank ones
pub fn parse_csv_grid(content: &str) -> Result<Grid> {
    let content = content.trim_start_matches('\u{feff}');

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(sniff_delimiter(content))
        .from_reader(content.as_bytes());

    let mut grid = Grid::new();
    for result in rdr.records() {
        let record = result?;
        grid.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(grid)
}

/// Read a CSV file into a grid
pub fn read_csv_grid<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("could not read {}: {}", path.display(), e)))?;
    parse_csv_grid(&content)
}

/// Write rows of cells as CSV
///
/// The file is written to a temporary sibling first and moved into place,
/// so an interrupted run never leaves a truncated export behind.
pub fn write_csv_rows<P: AsRef<Path>>(path: P, rows: &[Vec<Cell>]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut wtr = WriterBuilder::new().flexible(true).from_writer(&mut tmp);
        for row in rows {
            wtr.write_record(row.iter().map(|c| c.to_string()))?;
        }
        wtr.flush()?;
    }
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|e| Error::IoError(format!("could not write {}: {}", path.display(), e)))?;

    log::debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
