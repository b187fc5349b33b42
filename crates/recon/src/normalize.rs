//! Rename both systems' columns into the shared canonical (ordinal) schema.

use crate::error::{ReconError, Side};
use crate::mapping::ColumnMapping;
use crate::model::{Table, Value};

/// A copy of a source table whose columns are addressed by canonical ordinal.
/// Column 0 holds the untranslated row keys.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    side: Side,
    columns: Vec<Vec<Value>>,
    row_count: usize,
}

impl NormalizedTable {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn column(&self, ordinal: usize) -> Option<&[Value]> {
        self.columns.get(ordinal).map(Vec::as_slice)
    }

    pub fn keys(&self) -> &[Value] {
        &self.columns[0]
    }

    /// Number of canonical columns (equals the column mapping length).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }
}

/// Normalize system1 and system2 into the canonical vocabulary of `mapping`.
///
/// system1 columns map straight to their ordinal; system2 columns are first
/// translated to their system1 counterpart. Unmapped columns are left out of
/// the copy. Inputs are not modified.
pub fn normalize(
    system1: &Table,
    system2: &Table,
    mapping: &ColumnMapping,
) -> Result<(NormalizedTable, NormalizedTable), ReconError> {
    let norm1 = normalize_side(system1, Side::System1, mapping, |name| mapping.ordinal(name))?;
    let norm2 = normalize_side(system2, Side::System2, mapping, |name| mapping.ordinal_of_system2(name))?;
    log::debug!(
        "normalized {} x {} (system1) and {} x {} (system2)",
        norm1.row_count,
        norm1.width(),
        norm2.row_count,
        norm2.width(),
    );
    Ok((norm1, norm2))
}

fn normalize_side(
    table: &Table,
    side: Side,
    mapping: &ColumnMapping,
    ordinal_of: impl Fn(&str) -> Option<usize>,
) -> Result<NormalizedTable, ReconError> {
    let mut slots: Vec<Option<Vec<Value>>> = vec![None; mapping.len()];

    for column in table.columns() {
        match ordinal_of(&column.name) {
            Some(ordinal) if slots[ordinal].is_none() => {
                slots[ordinal] = Some(column.values.clone());
            }
            Some(_) => log::warn!("{side} has more than one column named '{}'; using the first", column.name),
            None => log::debug!("{side} column '{}' is not mapped; dropped", column.name),
        }
    }

    let columns = slots
        .into_iter()
        .enumerate()
        .map(|(ordinal, slot)| {
            slot.ok_or_else(|| {
                let (s1, s2) = mapping.names(ordinal).unwrap_or_default();
                let column = match side {
                    Side::System1 => s1,
                    Side::System2 => s2,
                };
                ReconError::MissingColumn { side, column: column.to_string() }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NormalizedTable { side, columns, row_count: table.row_count() })
}
