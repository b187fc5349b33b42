use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::ReconciliationResult;

/// Summary counts for one reconciliation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReconStats {
    pub row_count: usize,
    /// Matched rows whose values differ. Unmatched rows are misses, not breaks.
    pub break_count: usize,
    pub system1_miss_count: usize,
    pub system2_miss_count: usize,
}

impl ReconStats {
    pub fn from_result(result: &ReconciliationResult) -> Self {
        result.rows.iter().fold(
            Self { row_count: result.rows.len(), ..Self::default() },
            |mut stats, row| {
                stats.break_count += usize::from(row.is_break());
                stats.system1_miss_count += usize::from(row.system1_value.is_none());
                stats.system2_miss_count += usize::from(row.system2_value.is_none());
                stats
            },
        )
    }

    /// Nothing to report: no breaks and no misses on either side.
    pub fn is_clean(&self) -> bool {
        self.break_count == 0 && self.system1_miss_count == 0 && self.system2_miss_count == 0
    }

    /// Key-sorted map form, independent of field declaration order.
    pub fn to_map(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("break_count", self.break_count),
            ("row_count", self.row_count),
            ("system1_miss_count", self.system1_miss_count),
            ("system2_miss_count", self.system2_miss_count),
        ])
    }

    /// Pretty JSON with keys in sorted order.
    pub fn to_json(&self) -> String {
        // A map of &str → usize cannot fail to serialize.
        serde_json::to_string_pretty(&self.to_map()).unwrap_or_default()
    }
}
