/// Activity table file codec (XLSX)
///
/// The table is a single worksheet with a header row and one string cell
/// per column. Tables written by the older Spanish-language tool use
/// different header names; those are accepted on read.
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::path::Path;

use super::data::{ActivityRecord, Table};
use crate::error::Result;

/// Column headers, in on-disk order
pub const HEADERS: [&str; 4] = ["Date", "Activity", "Description", "Images"];

/// Header aliases written by the original tool, same order as `HEADERS`
const LEGACY_HEADERS: [&str; 4] = ["Fecha", "Actividad", "Descripción", "Imagenes"];

/// Column positions resolved from a header row
#[derive(Debug, Clone, Copy, PartialEq)]
struct Columns {
    date: usize,
    activity: usize,
    description: usize,
    images: usize,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        date: 0,
        activity: 1,
        description: 2,
        images: 3,
    };

    /// Find each column by name, falling back to its default position
    fn from_header(header: &[Data]) -> Self {
        let names: Vec<String> = header.iter().map(|c| text_cell(c).trim().to_string()).collect();
        let find = |idx: usize| {
            names
                .iter()
                .position(|n| n == HEADERS[idx] || n == LEGACY_HEADERS[idx])
                .unwrap_or(idx)
        };
        Columns {
            date: find(0),
            activity: find(1),
            description: find(2),
            images: find(3),
        }
    }
}

/// Render a cell as text. Whole floats lose their ".0".
fn text_cell(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn cell_at(row: &[Data], idx: usize) -> String {
    row.get(idx).map(text_cell).unwrap_or_default()
}

/// The Images column only accepts strings; anything else means no images
fn images_at(row: &[Data], idx: usize) -> Vec<String> {
    match row.get(idx) {
        Some(Data::String(s)) => ActivityRecord::parse_images(s),
        _ => Vec::new(),
    }
}

/// Read a table file. The caller decides what a missing file means.
pub fn read_table(path: &Path) -> Result<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Table::new()),
    };

    let mut rows = range.rows();
    let columns = match rows.next() {
        Some(header) => Columns::from_header(header),
        None => Columns::POSITIONAL,
    };

    let mut table = Table::new();
    for row in rows {
        if row.iter().all(|c| text_cell(c).trim().is_empty()) {
            continue;
        }
        table.records.push(ActivityRecord {
            timestamp: cell_at(row, columns.date),
            activity: cell_at(row, columns.activity),
            description: cell_at(row, columns.description),
            images: images_at(row, columns.images),
        });
    }

    Ok(table)
}

/// Build the workbook for a table (header plus one row per record)
fn build_workbook(table: &Table) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, record) in table.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet.write_string(row, 0, record.timestamp.as_str())?;
        worksheet.write_string(row, 1, record.activity.as_str())?;
        worksheet.write_string(row, 2, record.description.as_str())?;
        worksheet.write_string(row, 3, record.images_cell())?;
    }

    Ok(workbook)
}

/// Write the whole table, replacing whatever was on disk
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut workbook = build_workbook(table)?;
    workbook.save(path)?;
    Ok(())
}

/// Encode the table as XLSX bytes without touching the disk
pub fn table_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(table)?;
    Ok(workbook.save_to_buffer()?)
}
