use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Side};
use crate::mapping::{ColumnMapping, RowMapping};
use crate::model::{ReconciliationResult, ResultRow, Value};
use crate::normalize::NormalizedTable;

// ---------------------------------------------------------------------------
// Column selection
// ---------------------------------------------------------------------------

/// Which canonical column to compare: an ordinal into the column mapping, or
/// a column name from either system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    Ordinal(usize),
    Name(String),
}

impl Default for ColumnSelector {
    /// The first non-key column.
    fn default() -> Self {
        Self::Ordinal(1)
    }
}

impl FromStr for ColumnSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<usize>() {
            Ok(n) => Self::Ordinal(n),
            Err(_) => Self::Name(s.to_string()),
        })
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordinal(n) => write!(f, "{n}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Integers are ordinals; strings go through [`FromStr`] so `"2"` in a run
/// file selects the same column as `--column 2`.
impl<'de> Deserialize<'de> for ColumnSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SelectorVisitor;

        impl Visitor<'_> for SelectorVisitor {
            type Value = ColumnSelector;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a column ordinal or name")
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> Result<Self::Value, E> {
                usize::try_from(n)
                    .map(ColumnSelector::Ordinal)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(n), &self))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> Result<Self::Value, E> {
                usize::try_from(n)
                    .map(ColumnSelector::Ordinal)
                    .map_err(|_| E::invalid_value(Unexpected::Signed(n), &self))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
                match s.parse::<ColumnSelector>() {
                    Ok(selector) => Ok(selector),
                    Err(never) => match never {},
                }
            }
        }

        deserializer.deserialize_any(SelectorVisitor)
    }
}

impl ColumnSelector {
    /// Resolve to a canonical ordinal. Names are looked up as system1 names
    /// first, then as system2 names through the inverse mapping. The row-key
    /// column (ordinal 0) is never a valid target.
    pub fn resolve(&self, mapping: &ColumnMapping) -> Result<usize, ReconError> {
        let ordinal = match self {
            Self::Ordinal(n) => *n,
            Self::Name(name) => mapping
                .ordinal(name)
                .or_else(|| mapping.ordinal_of_system2(name))
                .ok_or_else(|| ReconError::UnknownColumn(name.clone()))?,
        };
        if ordinal >= mapping.len() {
            return Err(ReconError::ColumnOutOfRange { index: ordinal, len: mapping.len() });
        }
        if ordinal == 0 {
            return Err(ReconError::KeyColumnSelected);
        }
        Ok(ordinal)
    }
}

// ---------------------------------------------------------------------------
// Join + diff
// ---------------------------------------------------------------------------

/// Everything the join needs, borrowed from the owning session.
pub struct ReconInput<'a> {
    pub system1: &'a NormalizedTable,
    pub system2: &'a NormalizedTable,
    pub columns: &'a ColumnMapping,
    pub rows: &'a RowMapping,
    pub labels: (&'a str, &'a str),
}

/// Left outer join system1 → row mapping → system2, then diff one column.
///
/// Every system1 row appears exactly once, in system1 order. Rows with no
/// counterpart get null system2 fields. system2 rows that no system1 row maps
/// to are not part of the result.
///
/// `diff = system1 - system2`, null when either side is null.
pub fn reconcile(input: &ReconInput<'_>, selector: &ColumnSelector) -> Result<ReconciliationResult, ReconError> {
    let ordinal = selector.resolve(input.columns)?;
    let (name1, name2) = input
        .columns
        .names(ordinal)
        .ok_or(ReconError::ColumnOutOfRange { index: ordinal, len: input.columns.len() })?;

    let values1 = input
        .system1
        .column(ordinal)
        .ok_or(ReconError::ColumnOutOfRange { index: ordinal, len: input.system1.width() })?;
    let values2 = input
        .system2
        .column(ordinal)
        .ok_or(ReconError::ColumnOutOfRange { index: ordinal, len: input.system2.width() })?;

    let (index2, duplicates2) = index_keys(input.system2.keys());

    let mut rows = Vec::with_capacity(input.system1.row_count());
    for (key1, cell1) in input.system1.keys().iter().zip(values1) {
        let key1_text = key1.key_text().unwrap_or_default();

        let target = key1.key_text().and_then(|k| input.rows.lookup(&k));
        let matched = match target {
            Some(key2) if duplicates2.contains(key2) => {
                return Err(ReconError::DuplicateRowKey { side: Side::System2, key: key2.to_string() });
            }
            Some(key2) => index2.get(key2).copied(),
            None => None,
        };

        let system1_value = numeric(cell1, Side::System1, &key1_text)?;
        let (system2_key, system2_value) = match matched {
            Some(j) => {
                let key2 = &input.system2.keys()[j];
                let value = numeric(&values2[j], Side::System2, &key2.display())?;
                (key2.clone(), value)
            }
            None => (Value::Null, None),
        };

        let diff = match (system1_value, system2_value) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        };

        rows.push(ResultRow {
            system1_key: key1.clone(),
            system2_key,
            system1_value,
            system2_value,
            diff,
        });
    }

    log::debug!(
        "reconciled column {ordinal} ({name1} / {name2}): {} rows, {} matched",
        rows.len(),
        rows.iter().filter(|r| !r.system2_key.is_null()).count(),
    );

    Ok(ReconciliationResult {
        column: ordinal,
        headers: [
            input.labels.0.to_string(),
            input.labels.1.to_string(),
            name1.to_string(),
            name2.to_string(),
            "diff".to_string(),
        ],
        rows,
    })
}

/// Map key text → row index. Keys seen more than once are returned separately;
/// they are only an error if a join actually lands on them.
fn index_keys(keys: &[Value]) -> (HashMap<String, usize>, HashSet<String>) {
    let mut index = HashMap::with_capacity(keys.len());
    let mut duplicates = HashSet::new();
    for (i, key) in keys.iter().enumerate() {
        if let Some(text) = key.key_text() {
            if index.insert(text.clone(), i).is_some() {
                duplicates.insert(text);
            }
        }
    }
    (index, duplicates)
}

fn numeric(value: &Value, side: Side, key: &str) -> Result<Option<f64>, ReconError> {
    match value {
        Value::Number(n) => Ok(Some(*n)),
        Value::Null => Ok(None),
        Value::Text(s) if s.trim().is_empty() => Ok(None),
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(ReconError::NonNumericValue { side, key: key.to_string(), value: s.clone() }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DuplicatePolicy;
    use crate::model::{Column, Table};
    use crate::normalize::normalize;

    fn table(ids: &[&str], vals: Vec<Value>) -> Table {
        Table::new(vec![
            Column::new("id", ids.iter().map(|&s| Value::from(s)).collect()),
            Column::new("val", vals),
        ])
        .unwrap()
    }

    fn run(s1: Table, s2: Table, rows: &[(&str, &str)], selector: ColumnSelector) -> Result<ReconciliationResult, ReconError> {
        let columns = ColumnMapping::from_pairs([("id", "id"), ("val", "val")])?;
        let rows = RowMapping::from_pairs(rows.iter().copied(), DuplicatePolicy::Reject)?;
        let (n1, n2) = normalize(&s1, &s2, &columns)?;
        let input = ReconInput { system1: &n1, system2: &n2, columns: &columns, rows: &rows, labels: ("system1", "system2") };
        reconcile(&input, &selector)
    }

    #[test]
    fn matched_row_diffs() {
        let result = run(
            table(&["A"], vec![10.0.into()]),
            table(&["X"], vec![7.0.into()]),
            &[("A", "X")],
            ColumnSelector::Ordinal(1),
        )
        .unwrap();
        assert_eq!(
            result.rows,
            vec![ResultRow {
                system1_key: "A".into(),
                system2_key: "X".into(),
                system1_value: Some(10.0),
                system2_value: Some(7.0),
                diff: Some(3.0),
            }]
        );
        assert_eq!(result.headers, ["system1", "system2", "val", "val", "diff"].map(String::from));
    }

    #[test]
    fn unmatched_row_is_null_on_system2_side() {
        let result = run(table(&["A"], vec![10.0.into()]), table(&[], vec![]), &[], ColumnSelector::Ordinal(1)).unwrap();
        let row = &result.rows[0];
        assert_eq!(row.system1_key, Value::from("A"));
        assert!(row.system2_key.is_null());
        assert_eq!(row.system1_value, Some(10.0));
        assert_eq!(row.system2_value, None);
        assert_eq!(row.diff, None);
    }

    #[test]
    fn mapping_to_absent_system2_key_is_unmatched() {
        let result = run(
            table(&["A"], vec![10.0.into()]),
            table(&["X"], vec![7.0.into()]),
            &[("A", "NOPE")],
            ColumnSelector::Ordinal(1),
        )
        .unwrap();
        assert!(result.rows[0].system2_key.is_null());
        assert_eq!(result.rows[0].diff, None);
    }

    #[test]
    fn system2_only_rows_dropped_and_order_kept() {
        let result = run(
            table(&["C", "A", "B"], vec![1.0.into(), 2.0.into(), 3.0.into()]),
            table(&["X", "Y", "Z", "W"], vec![1.0.into(), 2.0.into(), 3.0.into(), 4.0.into()]),
            &[("A", "Y"), ("B", "Z"), ("C", "X")],
            ColumnSelector::Ordinal(1),
        )
        .unwrap();
        let keys: Vec<String> = result.rows.iter().map(|r| r.system1_key.display()).collect();
        assert_eq!(keys, vec!["C", "A", "B"]);
        assert!(result.rows.iter().all(|r| r.diff == Some(0.0)));
    }

    #[test]
    fn null_value_propagates() {
        let result = run(
            table(&["A"], vec![Value::Null]),
            table(&["X"], vec![7.0.into()]),
            &[("A", "X")],
            ColumnSelector::Ordinal(1),
        )
        .unwrap();
        assert_eq!(result.rows[0].system2_value, Some(7.0));
        assert_eq!(result.rows[0].diff, None);
    }

    #[test]
    fn numeric_text_is_coerced() {
        let result = run(
            table(&["A"], vec![Value::Text(" 10.5 ".into())]),
            table(&["X"], vec![0.5.into()]),
            &[("A", "X")],
            ColumnSelector::Ordinal(1),
        )
        .unwrap();
        assert_eq!(result.rows[0].diff, Some(10.0));
    }

    #[test]
    fn non_numeric_text_rejected() {
        let err = run(
            table(&["A"], vec!["ten".into()]),
            table(&["X"], vec![7.0.into()]),
            &[("A", "X")],
            ColumnSelector::Ordinal(1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconError::NonNumericValue { side: Side::System1, key: "A".into(), value: "ten".into() }
        );
    }

    #[test]
    fn joined_duplicate_system2_key_rejected() {
        let err = run(
            table(&["A"], vec![1.0.into()]),
            table(&["X", "X"], vec![1.0.into(), 2.0.into()]),
            &[("A", "X")],
            ColumnSelector::Ordinal(1),
        )
        .unwrap_err();
        assert_eq!(err, ReconError::DuplicateRowKey { side: Side::System2, key: "X".into() });
    }

    #[test]
    fn unjoined_duplicate_system2_key_ignored() {
        let result = run(
            table(&["A"], vec![1.0.into()]),
            table(&["X", "Y", "Y"], vec![1.0.into(), 2.0.into(), 3.0.into()]),
            &[("A", "X")],
            ColumnSelector::Ordinal(1),
        )
        .unwrap();
        assert_eq!(result.rows[0].diff, Some(0.0));
    }

    #[test]
    fn selector_resolution() {
        let map = ColumnMapping::from_pairs([("id", "ref"), ("val", "amount"), ("qty", "units")]).unwrap();
        assert_eq!(ColumnSelector::Ordinal(2).resolve(&map), Ok(2));
        assert_eq!(ColumnSelector::Name("val".into()).resolve(&map), Ok(1));
        assert_eq!(ColumnSelector::Name("units".into()).resolve(&map), Ok(2));
        assert_eq!(ColumnSelector::Ordinal(0).resolve(&map), Err(ReconError::KeyColumnSelected));
        assert_eq!(
            ColumnSelector::Ordinal(3).resolve(&map),
            Err(ReconError::ColumnOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            ColumnSelector::Name("price".into()).resolve(&map),
            Err(ReconError::UnknownColumn("price".into()))
        );
    }

    #[test]
    fn selector_parses_ordinals_and_names() {
        assert_eq!("2".parse::<ColumnSelector>().unwrap(), ColumnSelector::Ordinal(2));
        assert_eq!("amount".parse::<ColumnSelector>().unwrap(), ColumnSelector::Name("amount".into()));
    }

    #[test]
    fn selector_deserializes_like_it_parses() {
        let parse = |json: &str| serde_json::from_str::<ColumnSelector>(json);
        assert_eq!(parse("2").unwrap(), ColumnSelector::Ordinal(2));
        assert_eq!(parse("\"2\"").unwrap(), ColumnSelector::Ordinal(2));
        assert_eq!(parse("\"amount\"").unwrap(), ColumnSelector::Name("amount".into()));
        assert!(parse("-1").is_err());
        assert!(parse("true").is_err());
    }
}
