//! A reconciliation session: two tables, their mappings, and the current result.

use crate::engine::{reconcile, ColumnSelector, ReconInput};
use crate::error::ReconError;
use crate::mapping::{ColumnMapping, RowMapping};
use crate::model::{ReconciliationResult, Table};
use crate::normalize::{normalize, NormalizedTable};
use crate::stats::ReconStats;

pub const DEFAULT_LABELS: (&str, &str) = ("system1", "system2");

/// Owns the inputs of one reconciliation and at most one current result.
///
/// Changing any input discards the current result. A run that fails also
/// leaves the session without a result.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    system1: Table,
    system2: Table,
    labels: (String, String),
    columns: Option<ColumnMapping>,
    rows: Option<RowMapping>,
    normalized: Option<(NormalizedTable, NormalizedTable)>,
    result: Option<ReconciliationResult>,
}

impl Reconciliation {
    pub fn new(system1: Table, system2: Table) -> Self {
        Self {
            system1,
            system2,
            labels: (DEFAULT_LABELS.0.to_string(), DEFAULT_LABELS.1.to_string()),
            columns: None,
            rows: None,
            normalized: None,
            result: None,
        }
    }

    pub fn with_labels(mut self, system1: impl Into<String>, system2: impl Into<String>) -> Self {
        self.labels = (system1.into(), system2.into());
        self.invalidate();
        self
    }

    pub fn with_column_mapping(mut self, mapping: ColumnMapping) -> Self {
        self.update_column_mapping(mapping);
        self
    }

    pub fn with_row_mapping(mut self, mapping: RowMapping) -> Self {
        self.update_row_mapping(mapping);
        self
    }

    pub fn update_column_mapping(&mut self, mapping: ColumnMapping) {
        self.columns = Some(mapping);
        self.invalidate();
    }

    pub fn update_row_mapping(&mut self, mapping: RowMapping) {
        self.rows = Some(mapping);
        self.invalidate();
    }

    pub fn update_tables(&mut self, system1: Table, system2: Table) {
        self.system1 = system1;
        self.system2 = system2;
        self.invalidate();
    }

    /// Normalize, join and diff the selected column. On success the new
    /// result replaces the previous one.
    pub fn reconcile(&mut self, selector: &ColumnSelector) -> Result<&ReconciliationResult, ReconError> {
        self.invalidate();

        let columns = self.columns.as_ref().ok_or(ReconError::MissingMapping("column"))?;
        let rows = self.rows.as_ref().ok_or(ReconError::MissingMapping("row"))?;

        let (norm1, norm2) = normalize(&self.system1, &self.system2, columns)?;
        let input = ReconInput {
            system1: &norm1,
            system2: &norm2,
            columns,
            rows,
            labels: (&self.labels.0, &self.labels.1),
        };
        let result = reconcile(&input, selector)?;

        log::info!(
            "reconciled {} vs {} on column '{}': {} rows",
            self.labels.0,
            self.labels.1,
            selector,
            result.len(),
        );

        self.normalized = Some((norm1, norm2));
        Ok(&*self.result.insert(result))
    }

    pub fn result(&self) -> Result<&ReconciliationResult, ReconError> {
        self.result.as_ref().ok_or(ReconError::NotReconciled)
    }

    /// Recomputed from the current result on every call.
    pub fn stats(&self) -> Result<ReconStats, ReconError> {
        self.result().map(ReconStats::from_result)
    }

    pub fn system1(&self) -> &Table {
        &self.system1
    }

    pub fn system2(&self) -> &Table {
        &self.system2
    }

    pub fn labels(&self) -> (&str, &str) {
        (&self.labels.0, &self.labels.1)
    }

    pub fn column_mapping(&self) -> Option<&ColumnMapping> {
        self.columns.as_ref()
    }

    pub fn row_mapping(&self) -> Option<&RowMapping> {
        self.rows.as_ref()
    }

    /// Normalized copies from the last successful run.
    pub fn normalized(&self) -> Option<(&NormalizedTable, &NormalizedTable)> {
        self.normalized.as_ref().map(|(a, b)| (a, b))
    }

    fn invalidate(&mut self) {
        self.normalized = None;
        self.result = None;
    }
}
