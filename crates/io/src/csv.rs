// CSV/TSV loading and writing for data and mapping tables

use std::io::{Read, Write};
use std::path::Path;

use rekon_recon::{Column, ReconError, Table, Value};

use crate::io_err;

/// Column headers given to header-less mapping tables.
pub const MAPPING_HEADERS: [&str; 2] = ["system1", "system2"];

/// Load a delimited data table. The first record is the header row.
pub fn load_table(path: &Path) -> Result<Table, ReconError> {
    let content = read_file_as_utf8(path)?;
    parse_table(&content, sniff_delimiter(&content))
        .map_err(|e| with_path_context(e, path))
}

/// Load a data table keeping only the named columns (in file order).
/// Names that are not in the file are ignored here; normalization reports them.
pub fn load_table_projected(path: &Path, keep: &[&str]) -> Result<Table, ReconError> {
    project(&load_table(path)?, keep)
}

/// Copy of `table` with only the named columns, in their original order.
pub fn project(table: &Table, keep: &[&str]) -> Result<Table, ReconError> {
    let columns = table
        .columns()
        .iter()
        .filter(|c| keep.contains(&c.name.as_str()))
        .cloned()
        .collect();
    Table::new(columns)
}

/// Load a header-less two-column mapping table (system1, system2 per row).
pub fn load_mapping(path: &Path, mapping: &'static str) -> Result<Table, ReconError> {
    let content = read_file_as_utf8(path)?;
    parse_mapping(&content, sniff_delimiter(&content), mapping)
        .map_err(|e| with_path_context(e, path))
}

pub fn parse_table(content: &str, delimiter: u8) -> Result<Table, ReconError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(format!("cannot read header row: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(ReconError::NotTabular("no header row".into()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ReconError::Io(e.to_string()))?;
        rows.push(record.iter().map(Value::parse).collect());
    }

    Table::from_rows(headers, rows)
}

pub fn parse_mapping(content: &str, delimiter: u8, mapping: &'static str) -> Result<Table, ReconError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut left = Vec::new();
    let mut right = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| ReconError::Io(e.to_string()))?;
        if record.len() != 2 {
            return Err(ReconError::MalformedMapping {
                mapping,
                detail: format!("line {}: expected 2 fields, found {}", idx + 1, record.len()),
            });
        }
        left.push(mapping_cell(&record[0]));
        right.push(mapping_cell(&record[1]));
    }

    Table::new(vec![
        Column::new(MAPPING_HEADERS[0], left),
        Column::new(MAPPING_HEADERS[1], right),
    ])
}

/// Mapping cells are column names or row keys, never quantities.
fn mapping_cell(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::Text(trimmed.to_string())
    }
}

/// Write a table with a header row. Nulls are written as empty fields.
pub fn write_table<W: Write>(table: &Table, writer: W) -> Result<(), ReconError> {
    let mut writer = ::csv::WriterBuilder::new().from_writer(writer);

    writer
        .write_record(table.column_names())
        .map_err(|e| io_err("csv write", e))?;
    for row in 0..table.row_count() {
        let record: Vec<String> = table.columns().iter().map(|c| c.values[row].display()).collect();
        writer.write_record(&record).map_err(|e| io_err("csv write", e))?;
    }

    writer.flush().map_err(|e| io_err("csv write", e))?;
    Ok(())
}

pub fn table_to_csv_string(table: &Table) -> Result<String, ReconError> {
    let mut buf = Vec::new();
    write_table(table, &mut buf)?;
    String::from_utf8(buf).map_err(|e| io_err("csv write", e))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                ::csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as line 1) * field_count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, ReconError> {
    let mut file = std::fs::File::open(path).map_err(|e| io_err(path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| io_err(path.display(), e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            log::debug!("{} is not UTF-8; decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn with_path_context(err: ReconError, path: &Path) -> ReconError {
    match err {
        ReconError::Io(msg) => ReconError::Io(format!("{}: {msg}", path.display())),
        ReconError::MalformedMapping { mapping, detail } => ReconError::MalformedMapping {
            mapping,
            detail: format!("{} ({detail})", path.display()),
        },
        ReconError::NotTabular(detail) => ReconError::NotTabular(format!("{}: {detail}", path.display())),
        other => other,
    }
}
