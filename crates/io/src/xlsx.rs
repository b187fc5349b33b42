// Excel import (first sheet as a data table) and multi-sheet export

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};

use rekon_recon::{ReconError, Table, Value};

use crate::io_err;

/// Import the first sheet of an Excel file (xlsx, xls, xlsb, ods).
/// Row 1 is the header row.
pub fn import_first_sheet(path: &Path) -> Result<Table, ReconError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| io_err(format!("cannot open {}", path.display()), e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReconError::NotTabular(format!("{} contains no sheets", path.display())))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| io_err(format!("cannot read sheet '{sheet_name}'"), e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| cell_value(c).display().trim().to_string()).collect(),
        None => return Err(ReconError::NotTabular(format!("sheet '{sheet_name}' is empty"))),
    };

    let data: Vec<Vec<Value>> = rows.map(|r| r.iter().map(cell_value).collect()).collect();
    log::debug!("imported {} rows from sheet '{sheet_name}'", data.len());
    Table::from_rows(headers, data)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::parse(s),
        Data::Float(n) => Value::Number(*n),
        // Beyond 2^53 an f64 cannot hold the id exactly
        Data::Int(n) if (*n as f64) as i64 != *n => Value::Text(n.to_string()),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(format!("#{e:?}")),
    }
}

/// A named sheet to write.
pub struct SheetSpec<'a> {
    pub name: &'a str,
    pub table: &'a Table,
    /// Column whose non-zero numbers are highlighted.
    pub highlight_col: Option<usize>,
}

/// Write each table to its own worksheet, header row in bold.
pub fn export_sheets(sheets: &[SheetSpec<'_>], path: &Path) -> Result<(), ReconError> {
    let mut workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();
    let highlight_format = Format::new().set_font_color(Color::Red);

    for spec in sheets {
        let worksheet = workbook
            .add_worksheet()
            .set_name(spec.name)
            .map_err(|e| io_err(format!("cannot create sheet '{}'", spec.name), e))?;
        write_sheet(worksheet, spec, &header_format, &highlight_format)
            .map_err(|e| io_err(format!("cannot write sheet '{}'", spec.name), e))?;
    }

    workbook
        .save(path)
        .map_err(|e| io_err(format!("cannot save {}", path.display()), e))
}

fn write_sheet(
    worksheet: &mut Worksheet,
    spec: &SheetSpec<'_>,
    header_format: &Format,
    highlight_format: &Format,
) -> Result<(), XlsxError> {
    for (col, column) in spec.table.columns().iter().enumerate() {
        let col16 = col as u16;
        worksheet.write_string_with_format(0, col16, &column.name, header_format)?;

        let highlight = spec.highlight_col == Some(col);
        for (row, value) in column.values.iter().enumerate() {
            // rust_xlsxwriter uses 0-based row/col as u32/u16; row 0 is the header
            let row32 = row as u32 + 1;
            match value {
                Value::Null => {}
                Value::Number(n) if highlight && *n != 0.0 => {
                    worksheet.write_number_with_format(row32, col16, *n, highlight_format)?;
                }
                Value::Number(n) => {
                    worksheet.write_number(row32, col16, *n)?;
                }
                Value::Text(s) => {
                    worksheet.write_string(row32, col16, s)?;
                }
            }
        }
    }
    Ok(())
}
