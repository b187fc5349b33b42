use serde::Serialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single cell. Absent cells are `Null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Null,
}

impl Value {
    /// Classify a raw delimited-text field: blank → `Null`, a number that
    /// renders back to the same text → `Number`, anything else → `Text` (kept
    /// verbatim).
    ///
    /// `12345678901234567`, `007` and `1.50` stay text so keys built from them
    /// keep their exact spelling. The engine still reads such text as a number
    /// when the cell sits in the compared column.
    pub fn parse(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && format_number(n) == trimmed => Self::Number(n),
            _ => Self::Text(field.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text used to join row keys. Integral numbers drop the fractional part
    /// so a numeric `1` and a textual `"1"` address the same row.
    pub fn key_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Number(n) => Some(format_number(*n)),
            Self::Text(s) => Some(s.trim().to_string()),
        }
    }

    /// Rendering for delimited/plain-text output. `Null` renders empty.
    pub fn display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self { name: name.into(), values }
    }
}

/// Ordered named columns of equal length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, ReconError> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        for column in &columns {
            if column.values.len() != row_count {
                return Err(ReconError::RaggedTable {
                    column: column.name.clone(),
                    expected: row_count,
                    found: column.values.len(),
                });
            }
        }
        Ok(Self { columns, row_count })
    }

    /// Build from row-major data. Short rows are padded with `Null`; a row
    /// longer than the header is rejected.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, ReconError> {
        let width = headers.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(ReconError::RaggedTable {
                    column: format!("row {}", row_idx + 1),
                    expected: width,
                    found: row.len(),
                });
            }
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.values.push(cells.next().unwrap_or(Value::Null));
            }
        }

        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// First column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Cells of row `idx` in column order.
    pub fn row(&self, idx: usize) -> Option<Vec<&Value>> {
        if idx >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[idx]).collect())
    }
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

/// One system1 row joined to its system2 counterpart (if any).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub system1_key: Value,
    pub system2_key: Value,
    pub system1_value: Option<f64>,
    pub system2_value: Option<f64>,
    pub diff: Option<f64>,
}

impl ResultRow {
    /// Matched on both sides with a non-zero difference.
    pub fn is_break(&self) -> bool {
        matches!(self.diff, Some(d) if d != 0.0)
    }
}

/// Five-column left-join result for one compared column, in system1 row order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    /// Canonical ordinal of the compared column.
    pub column: usize,
    /// Display headers: system1 label, system2 label, system1 column name,
    /// system2 column name, `diff`.
    pub headers: [String; 5],
    pub rows: Vec<ResultRow>,
}

impl ReconciliationResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a plain [`Table`] using the display headers.
    pub fn to_table(&self) -> Table {
        let mut columns: Vec<Column> = self
            .headers
            .iter()
            .map(|h| Column::new(h.clone(), Vec::with_capacity(self.rows.len())))
            .collect();

        for row in &self.rows {
            columns[0].values.push(row.system1_key.clone());
            columns[1].values.push(row.system2_key.clone());
            columns[2].values.push(row.system1_value.into());
            columns[3].values.push(row.system2_value.into());
            columns[4].values.push(row.diff.into());
        }

        Table { columns, row_count: self.rows.len() }
    }
}
