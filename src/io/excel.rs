use calamine::{open_workbook_auto, Reader};
use simple_excel_writer::{Row, Workbook};
use std::path::Path;

use super::{Cell, Grid};
use crate::error::{Error, Result};

/// Read the first worksheet of a workbook into a grid
///
/// Date cells come back as their serial numbers; the normalizer decodes them.
pub fn read_excel_grid<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::ExcelError(format!("could not open {}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::ExcelError(format!("{} has no worksheets", path.display())))?
        .map_err(|e| Error::ExcelError(format!("could not read {}: {}", path.display(), e)))?;

    let grid: Grid = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .collect();

    log::debug!("Read {} rows from {}", grid.len(), path.display());
    Ok(grid)
}

/// Write rows of cells to a single-sheet workbook
pub fn write_excel_rows<P: AsRef<Path>>(path: P, rows: &[Vec<Cell>], sheet_name: &str) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new().suffix(".xlsx").tempfile_in(dir)?;
    let tmp_path = tmp
        .path()
        .to_str()
        .ok_or_else(|| Error::IoError(format!("non UTF-8 path: {}", tmp.path().display())))?
        .to_string();

    let mut workbook = Workbook::create(&tmp_path);
    let mut sheet = workbook.create_sheet(sheet_name);

    workbook
        .write_sheet(&mut sheet, |sheet_writer| {
            for cells in rows {
                let mut row = Row::new();
                for cell in cells {
                    match cell {
                        Cell::Number(v) => row.add_cell(*v),
                        Cell::Text(s) => row.add_cell(s.as_str()),
                        Cell::Empty => row.add_cell(""),
                    }
                }
                sheet_writer.append_row(row)?;
            }
            Ok(())
        })
        .map_err(|e| Error::ExcelError(format!("could not write sheet '{}': {}", sheet_name, e)))?;

    workbook
        .close()
        .map_err(|e| Error::ExcelError(format!("could not save {}: {}", path.display(), e)))?;

    tmp.persist(path)
        .map_err(|e| Error::IoError(format!("could not write {}: {}", path.display(), e)))?;

    log::debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
