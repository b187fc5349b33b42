// File I/O around the reconciliation engine

pub mod csv;
pub mod report;
pub mod sample;
pub mod store;
pub mod xlsx;

use std::path::Path;

use rekon_recon::{ReconError, Table};

pub use report::{export_report, ReportFormat};

/// Load a data table, choosing the reader by file extension.
/// Spreadsheet files read their first sheet; everything else is delimited text.
pub fn load_table(path: &Path) -> Result<Table, ReconError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => xlsx::import_first_sheet(path),
        _ => crate::csv::load_table(path),
    }
}

pub(crate) fn io_err(context: impl std::fmt::Display, e: impl std::fmt::Display) -> ReconError {
    ReconError::Io(format!("{context}: {e}"))
}
