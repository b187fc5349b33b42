// Join store: persist a reconciled session into SQLite

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rusqlite::{params, Connection, Transaction};

use rekon_recon::{NormalizedTable, ReconError, Reconciliation, Value};

use crate::io_err;
use crate::report::expand_home;

const SCHEMA: &str = r#"
DROP TABLE IF EXISTS meta;
DROP TABLE IF EXISTS normalized;
DROP TABLE IF EXISTS col_map;
DROP TABLE IF EXISTS row_map;
DROP TABLE IF EXISTS rec_result;

CREATE TABLE meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE normalized (
    side TEXT NOT NULL,            -- 'system1' or 'system2'
    row INTEGER NOT NULL,
    ordinal INTEGER NOT NULL,      -- canonical column, 0 = row key
    value_type INTEGER NOT NULL,   -- 0=null, 1=number, 2=text
    value_num REAL,
    value_text TEXT,
    PRIMARY KEY (side, row, ordinal)
);

CREATE TABLE col_map (
    ordinal INTEGER PRIMARY KEY,
    system1 TEXT NOT NULL,
    system2 TEXT NOT NULL
);

CREATE TABLE row_map (
    system1 TEXT PRIMARY KEY,
    system2 TEXT NOT NULL
);

CREATE TABLE rec_result (
    row INTEGER PRIMARY KEY,
    system1_key TEXT,
    system2_key TEXT,
    system1_value REAL,
    system2_value REAL,
    diff REAL
);
"#;

// Value type constants
const TYPE_NULL: i32 = 0;
const TYPE_NUMBER: i32 = 1;
const TYPE_TEXT: i32 = 2;

/// Where intermediate joins are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreLocation {
    /// Ephemeral; gone when the connection drops.
    #[default]
    Memory,
    File(PathBuf),
}

impl From<&str> for StoreLocation {
    fn from(s: &str) -> Self {
        match s.trim() {
            "" | ":memory:" => Self::Memory,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

impl FromStr for StoreLocation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, ":memory:"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl StoreLocation {
    /// Database file on disk, with a leading `~` expanded. `None` in memory.
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            Self::Memory => None,
            Self::File(path) => Some(expand_home(path)),
        }
    }

    pub fn open(&self) -> Result<Connection, ReconError> {
        match self.path() {
            None => Connection::open_in_memory(),
            Some(path) => Connection::open(path),
        }
        .map_err(|e| io_err(format!("cannot open store {self}"), e))
    }
}

/// Write the session's normalized tables, mappings and current result into a
/// fresh set of tables at `location`, replacing any previous run.
pub fn persist_session(session: &Reconciliation, location: &StoreLocation) -> Result<Connection, ReconError> {
    // Validate before opening (and possibly creating) the database file
    session.result()?;
    let mut conn = location.open()?;
    persist_into(&mut conn, session)?;
    log::debug!("persisted reconciliation to {location}");
    Ok(conn)
}

pub fn persist_into(conn: &mut Connection, session: &Reconciliation) -> Result<(), ReconError> {
    let result = session.result()?;
    let (norm1, norm2) = session.normalized().ok_or(ReconError::NotReconciled)?;
    let columns = session.column_mapping().ok_or(ReconError::MissingMapping("column"))?;
    let rows = session.row_mapping().ok_or(ReconError::MissingMapping("row"))?;
    let (label1, label2) = session.labels();

    let tx = conn.transaction().map_err(|e| io_err("store", e))?;
    tx.execute_batch(SCHEMA).map_err(|e| io_err("store schema", e))?;

    {
        let mut stmt = tx
            .prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")
            .map_err(|e| io_err("store", e))?;
        for (key, value) in [
            ("system1_label", label1.to_string()),
            ("system2_label", label2.to_string()),
            ("column", result.column.to_string()),
            ("created_at", chrono::Utc::now().to_rfc3339()),
        ] {
            stmt.execute(params![key, value]).map_err(|e| io_err("store meta", e))?;
        }
    }

    insert_normalized(&tx, "system1", norm1)?;
    insert_normalized(&tx, "system2", norm2)?;

    {
        let mut stmt = tx
            .prepare("INSERT INTO col_map (ordinal, system1, system2) VALUES (?1, ?2, ?3)")
            .map_err(|e| io_err("store", e))?;
        for (ordinal, (s1, s2)) in columns.iter().enumerate() {
            stmt.execute(params![ordinal as i64, s1, s2]).map_err(|e| io_err("store col_map", e))?;
        }

        let mut stmt = tx
            .prepare("INSERT INTO row_map (system1, system2) VALUES (?1, ?2)")
            .map_err(|e| io_err("store", e))?;
        for (s1, s2) in rows.iter() {
            stmt.execute(params![s1, s2]).map_err(|e| io_err("store row_map", e))?;
        }
    }

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO rec_result (row, system1_key, system2_key, system1_value, system2_value, diff)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(|e| io_err("store", e))?;
        for (idx, row) in result.rows.iter().enumerate() {
            stmt.execute(params![
                idx as i64,
                row.system1_key.key_text(),
                row.system2_key.key_text(),
                row.system1_value,
                row.system2_value,
                row.diff,
            ])
            .map_err(|e| io_err("store rec_result", e))?;
        }
    }

    tx.commit().map_err(|e| io_err("store commit", e))
}

fn insert_normalized(tx: &Transaction<'_>, side: &str, table: &NormalizedTable) -> Result<(), ReconError> {
    let mut stmt = tx
        .prepare(
            "INSERT INTO normalized (side, row, ordinal, value_type, value_num, value_text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(|e| io_err("store", e))?;

    for ordinal in 0..table.width() {
        let Some(values) = table.column(ordinal) else { continue };
        for (row, value) in values.iter().enumerate() {
            let (value_type, num, text) = match value {
                Value::Null => (TYPE_NULL, None, None),
                Value::Number(n) => (TYPE_NUMBER, Some(*n), None),
                Value::Text(s) => (TYPE_TEXT, None, Some(s.as_str())),
            };
            stmt.execute(params![side, row as i64, ordinal as i64, value_type, num, text])
                .map_err(|e| io_err("store normalized", e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rekon_recon::{Column, ColumnMapping, ColumnSelector, DuplicatePolicy, RowMapping, Table};
    use tempfile::tempdir;

    fn reconciled() -> Reconciliation {
        let s1 = Table::new(vec![
            Column::new("id", vec!["A".into(), "B".into()]),
            Column::new("val", vec![10.0.into(), Value::Null]),
        ])
        .unwrap();
        let s2 = Table::new(vec![
            Column::new("ref", vec!["X".into(), "Y".into()]),
            Column::new("amount", vec![7.0.into(), 1.0.into()]),
        ])
        .unwrap();
        let mut rec = Reconciliation::new(s1, s2)
            .with_column_mapping(ColumnMapping::from_pairs([("id", "ref"), ("val", "amount")]).unwrap())
            .with_row_mapping(RowMapping::from_pairs([("A", "X"), ("B", "Y")], DuplicatePolicy::Reject).unwrap());
        rec.reconcile(&ColumnSelector::default()).unwrap();
        rec
    }

    #[test]
    fn test_location_parsing() {
        assert_eq!(":memory:".parse::<StoreLocation>().unwrap(), StoreLocation::Memory);
        assert_eq!(
            "runs/rec.db".parse::<StoreLocation>().unwrap(),
            StoreLocation::File(PathBuf::from("runs/rec.db"))
        );
    }

    #[test]
    fn test_file_location_expands_home() {
        assert_eq!(StoreLocation::Memory.path(), None);
        assert_eq!(StoreLocation::from("/tmp/rec.db").path(), Some(PathBuf::from("/tmp/rec.db")));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(StoreLocation::from("~/rec.db").path(), Some(home.join("rec.db")));
        }
    }

    #[test]
    fn test_persist_in_memory() {
        let conn = persist_session(&reconciled(), &StoreLocation::Memory).unwrap();

        let rows: Vec<(String, Option<String>, Option<f64>)> = conn
            .prepare("SELECT system1_key, system2_key, diff FROM rec_result ORDER BY row")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![("A".to_string(), Some("X".to_string()), Some(3.0)), ("B".to_string(), Some("Y".to_string()), None)]
        );

        let cells: i64 = conn
            .query_row("SELECT COUNT(*) FROM normalized WHERE side = 'system2'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(cells, 4);

        let label: String = conn
            .query_row("SELECT value FROM meta WHERE key = 'system1_label'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(label, "system1");
    }

    #[test]
    fn test_persist_to_file_replaces_previous_run() {
        let dir = tempdir().unwrap();
        let location = StoreLocation::File(dir.path().join("rec.db"));

        persist_session(&reconciled(), &location).unwrap();
        let conn = persist_session(&reconciled(), &location).unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM rec_result", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
        let mapped: i64 = conn.query_row("SELECT COUNT(*) FROM col_map", [], |r| r.get(0)).unwrap();
        assert_eq!(mapped, 2);
    }

    #[test]
    fn test_unreconciled_session_creates_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.db");
        let mut rec = reconciled();
        rec.update_tables(rec.system1().clone(), rec.system2().clone());

        let err = persist_session(&rec, &StoreLocation::File(path.clone())).unwrap_err();
        assert_eq!(err, ReconError::NotReconciled);
        assert!(!path.exists());
    }
}
