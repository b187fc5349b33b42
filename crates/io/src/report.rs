//! Report export: the reconciliation result plus its inputs, as a workbook,
//! a zip of CSVs, a single CSV, or JSON.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use rekon_recon::{ReconError, ReconStats, Reconciliation, ReconciliationResult, Table};

use crate::csv::{table_to_csv_string, write_table};
use crate::io_err;
use crate::xlsx::{export_sheets, SheetSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Xlsx,
    Zip,
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Zip => "zip",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "zip" => Ok(Self::Zip),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(ReconError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// `rekon-reconciliation-output-YYYYMMDDHHMM`
pub fn default_file_name(now: DateTime<Local>) -> String {
    format!("rekon-reconciliation-output-{}", now.format("%Y%m%d%H%M"))
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

// Sheet / archive member names
const REC_SHEET: &str = "rec_report";
const SYSTEM1_SHEET: &str = "system1_data";
const SYSTEM2_SHEET: &str = "system2_data";
const COL_MAP_SHEET: &str = "col_map";
const ROW_MAP_SHEET: &str = "row_map";
const REC_CSV: &str = "rec_result.csv";

/// Everything a report contains, borrowed from or rendered out of a session.
struct ReportTables<'a> {
    result: &'a ReconciliationResult,
    rec: Table,
    system1: &'a Table,
    system2: &'a Table,
    col_map: Table,
    row_map: Table,
}

impl<'a> ReportTables<'a> {
    fn from_session(session: &'a Reconciliation) -> Result<Self, ReconError> {
        let result = session.result()?;
        let labels = session.labels();
        let col_map = session
            .column_mapping()
            .ok_or(ReconError::MissingMapping("column"))?
            .to_table(labels);
        let row_map = session
            .row_mapping()
            .ok_or(ReconError::MissingMapping("row"))?
            .to_table(labels);
        Ok(Self {
            result,
            rec: result.to_table(),
            system1: session.system1(),
            system2: session.system2(),
            col_map,
            row_map,
        })
    }

    fn named(&self) -> [(&'static str, &Table); 5] {
        [
            (REC_SHEET, &self.rec),
            (SYSTEM1_SHEET, self.system1),
            (SYSTEM2_SHEET, self.system2),
            (COL_MAP_SHEET, &self.col_map),
            (ROW_MAP_SHEET, &self.row_map),
        ]
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    stats: ReconStats,
    result: &'a ReconciliationResult,
}

/// Write the report for the session's current result to
/// `<dir>/<file_name>.<ext>` and return the path written.
///
/// Fails with `NotReconciled` before touching the filesystem if the session
/// has no result. A failed write removes the partial file.
pub fn export_report(
    session: &Reconciliation,
    dir: &Path,
    file_name: Option<&str>,
    format: ReportFormat,
) -> Result<PathBuf, ReconError> {
    let tables = ReportTables::from_session(session)?;

    let dir = expand_home(dir);
    std::fs::create_dir_all(&dir).map_err(|e| io_err(format!("cannot create {}", dir.display()), e))?;

    let stem = file_name.map_or_else(|| default_file_name(Local::now()), str::to_string);
    let path = dir.join(format!("{stem}.{}", format.extension()));

    let written = match format {
        ReportFormat::Xlsx => write_xlsx(&tables, &path),
        ReportFormat::Zip => write_zip(&tables, &path),
        ReportFormat::Csv => write_csv(&tables.rec, &path),
        ReportFormat::Json => write_json(&tables, &path),
    };

    if let Err(e) = written {
        let _ = std::fs::remove_file(&path);
        return Err(e);
    }

    log::info!("wrote {} report {}", format, path.display());
    Ok(path)
}

/// Same as [`export_report`] with the format given as text. Unknown formats
/// fail with `UnsupportedFormat` before anything is written.
pub fn export_report_named(
    session: &Reconciliation,
    dir: &Path,
    file_name: Option<&str>,
    format: &str,
) -> Result<PathBuf, ReconError> {
    let format: ReportFormat = format.parse()?;
    export_report(session, dir, file_name, format)
}

fn write_xlsx(tables: &ReportTables<'_>, path: &Path) -> Result<(), ReconError> {
    let sheets: Vec<SheetSpec<'_>> = tables
        .named()
        .into_iter()
        .map(|(name, table)| SheetSpec {
            name,
            table,
            highlight_col: (name == REC_SHEET).then_some(4),
        })
        .collect();
    export_sheets(&sheets, path)
}

fn write_zip(tables: &ReportTables<'_>, path: &Path) -> Result<(), ReconError> {
    let file = File::create(path).map_err(|e| io_err(format!("cannot create {}", path.display()), e))?;
    let mut archive = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, table) in tables.named() {
        let member = if name == REC_SHEET { REC_CSV.to_string() } else { format!("{name}.csv") };
        let body = table_to_csv_string(table)?;
        archive.start_file(member.as_str(), options).map_err(|e| io_err("zip", e))?;
        archive.write_all(body.as_bytes()).map_err(|e| io_err("zip", e))?;
    }

    archive.finish().map_err(|e| io_err("zip", e))?;
    Ok(())
}

fn write_csv(table: &Table, path: &Path) -> Result<(), ReconError> {
    let file = File::create(path).map_err(|e| io_err(format!("cannot create {}", path.display()), e))?;
    write_table(table, BufWriter::new(file))
}

fn write_json(tables: &ReportTables<'_>, path: &Path) -> Result<(), ReconError> {
    let report = JsonReport { stats: ReconStats::from_result(tables.result), result: tables.result };
    let json = serde_json::to_string_pretty(&report).map_err(|e| io_err("json", e))?;
    std::fs::write(path, json).map_err(|e| io_err(format!("cannot write {}", path.display()), e))
}
