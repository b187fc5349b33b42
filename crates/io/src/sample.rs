// Bundled sample data: a small trade book seen by an internal system and a custodian

use rekon_recon::{ColumnMapping, DuplicatePolicy, ReconError, Reconciliation, RowMapping};

use crate::csv::{parse_mapping, parse_table, project};

pub const SYSTEM1_CSV: &str = include_str!("../sample_data/system_1.csv");
pub const SYSTEM2_CSV: &str = include_str!("../sample_data/system_2.csv");
pub const COL_MAPPING_CSV: &str = include_str!("../sample_data/col_mapping.csv");
pub const ROW_MAPPING_CSV: &str = include_str!("../sample_data/row_mapping.csv");

/// A session loaded with the sample tables and mappings, ready to reconcile.
/// Only mapped columns are kept from each table.
pub fn sample_session() -> Result<Reconciliation, ReconError> {
    let columns = ColumnMapping::from_table(&parse_mapping(COL_MAPPING_CSV, b',', "column")?)?;
    let rows = RowMapping::from_table(&parse_mapping(ROW_MAPPING_CSV, b',', "row")?, DuplicatePolicy::Reject)?;

    let keep1: Vec<&str> = columns.iter().map(|(s1, _)| s1).collect();
    let keep2: Vec<&str> = columns.iter().map(|(_, s2)| s2).collect();
    let system1 = project(&parse_table(SYSTEM1_CSV, b',')?, &keep1)?;
    let system2 = project(&parse_table(SYSTEM2_CSV, b',')?, &keep2)?;

    log::debug!("sample data loaded: {} and {} rows", system1.row_count(), system2.row_count());

    Ok(Reconciliation::new(system1, system2)
        .with_column_mapping(columns)
        .with_row_mapping(rows))
}
