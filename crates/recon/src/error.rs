use std::fmt;

/// Which side of the reconciliation an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    System1,
    System2,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System1 => write!(f, "system1"),
            Self::System2 => write!(f, "system2"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// A column or row mapping was never supplied.
    MissingMapping(&'static str),
    /// The same name/key appears twice on one side of a mapping.
    DuplicateMapping { mapping: &'static str, side: Side, value: String },
    /// A column mapping entry has an empty name.
    EmptyName { side: Side, entry: usize },
    /// A mapping table does not have exactly two columns.
    MalformedMapping { mapping: &'static str, detail: String },
    /// A column referenced by the column mapping is absent from a source table.
    MissingColumn { side: Side, column: String },
    /// Target ordinal is past the end of the column mapping.
    ColumnOutOfRange { index: usize, len: usize },
    /// Ordinal 0 is the row key and cannot be compared.
    KeyColumnSelected,
    /// Target name is not in the column mapping on either side.
    UnknownColumn(String),
    /// A row key occurs more than once in a table that is joined against.
    DuplicateRowKey { side: Side, key: String },
    /// A compared cell holds text that is not a number.
    NonNumericValue { side: Side, key: String, value: String },
    /// Input could not be read as a table (no header row, no sheets, ...).
    NotTabular(String),
    /// Columns of a table have differing lengths.
    RaggedTable { column: String, expected: usize, found: usize },
    /// Stats or export requested before `reconcile` ran.
    NotReconciled,
    /// Export requested in an unknown output format.
    UnsupportedFormat(String),
    /// IO error (file read, write, database, etc.).
    Io(String),
}

impl ReconError {
    /// True for every variant that is a configuration problem: bad or missing
    /// mappings, missing columns and non-tabular input.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::NotReconciled | Self::UnsupportedFormat(_) | Self::Io(_))
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMapping(which) => write!(f, "configuration error: no {which} mapping supplied"),
            Self::DuplicateMapping { mapping, side, value } => {
                write!(f, "configuration error: {mapping} mapping has duplicate {side} entry '{value}'")
            }
            Self::EmptyName { side, entry } => {
                write!(f, "configuration error: column mapping entry {entry} has an empty {side} name")
            }
            Self::MalformedMapping { mapping, detail } => {
                write!(f, "configuration error: {mapping} mapping is malformed: {detail}")
            }
            Self::MissingColumn { side, column } => {
                write!(f, "configuration error: {side} table has no column '{column}'")
            }
            Self::ColumnOutOfRange { index, len } => {
                write!(f, "configuration error: column {index} out of range (mapping has {len} columns)")
            }
            Self::KeyColumnSelected => {
                write!(f, "configuration error: column 0 is the row key and cannot be compared")
            }
            Self::UnknownColumn(name) => {
                write!(f, "configuration error: column '{name}' is not in the column mapping")
            }
            Self::DuplicateRowKey { side, key } => {
                write!(f, "configuration error: {side} has more than one row with key '{key}'")
            }
            Self::NonNumericValue { side, key, value } => {
                write!(f, "configuration error: {side} row '{key}': cannot compare non-numeric value '{value}'")
            }
            Self::NotTabular(detail) => write!(f, "configuration error: input is not tabular: {detail}"),
            Self::RaggedTable { column, expected, found } => {
                write!(f, "configuration error: column '{column}' has {found} rows, expected {expected}")
            }
            Self::NotReconciled => write!(f, "no reconciliation has been run in this session"),
            Self::UnsupportedFormat(format) => {
                write!(f, "unsupported output format '{format}' (expected xlsx, zip, csv or json)")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ReconError::MissingMapping("column").is_configuration());
        assert!(ReconError::KeyColumnSelected.is_configuration());
        assert!(!ReconError::NotReconciled.is_configuration());
        assert!(!ReconError::UnsupportedFormat("pdf".into()).is_configuration());
        assert!(!ReconError::Io("disk full".into()).is_configuration());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = ReconError::MissingColumn { side: Side::System2, column: "amt".into() };
        assert_eq!(err.to_string(), "configuration error: system2 table has no column 'amt'");
    }
}
