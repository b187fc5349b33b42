//! Column and row correspondences between system1 and system2.
//!
//! Both mapping types validate at construction: a mapping that would make the
//! join ambiguous is rejected instead of silently overwriting earlier entries.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Side};
use crate::model::{Column, Table, Value};

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Ordered bijection system1 column name → system2 column name.
///
/// Declaration order defines the canonical ordinal of each pair. Entry 0 is
/// the row-identity column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    entries: Vec<(String, String)>,
    forward: HashMap<String, usize>,
    inverse: HashMap<String, usize>,
}

impl ColumnMapping {
    pub fn from_pairs<I, A, B>(pairs: I) -> Result<Self, ReconError>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut entries = Vec::new();
        let mut forward = HashMap::new();
        let mut inverse = HashMap::new();

        for (idx, (s1, s2)) in pairs.into_iter().enumerate() {
            let (s1, s2): (String, String) = (s1.into(), s2.into());
            if s1.trim().is_empty() {
                return Err(ReconError::EmptyName { side: Side::System1, entry: idx });
            }
            if s2.trim().is_empty() {
                return Err(ReconError::EmptyName { side: Side::System2, entry: idx });
            }
            if forward.insert(s1.clone(), idx).is_some() {
                return Err(ReconError::DuplicateMapping { mapping: "column", side: Side::System1, value: s1 });
            }
            if inverse.insert(s2.clone(), idx).is_some() {
                return Err(ReconError::DuplicateMapping { mapping: "column", side: Side::System2, value: s2 });
            }
            entries.push((s1, s2));
        }

        if entries.is_empty() {
            return Err(ReconError::MalformedMapping {
                mapping: "column",
                detail: "no entries (the first entry must map the row-key column)".into(),
            });
        }

        Ok(Self { entries, forward, inverse })
    }

    /// Build from a two-column table of (system1 name, system2 name) rows.
    pub fn from_table(table: &Table) -> Result<Self, ReconError> {
        let pairs = two_columns("column", table)?
            .into_iter()
            .enumerate()
            .map(|(idx, (s1, s2))| match (s1, s2) {
                (Some(s1), Some(s2)) => Ok((s1, s2)),
                (None, _) => Err(ReconError::EmptyName { side: Side::System1, entry: idx }),
                (_, None) => Err(ReconError::EmptyName { side: Side::System2, entry: idx }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_pairs(pairs)
    }

    /// system1 name → system2 name.
    pub fn forward(&self, system1: &str) -> Option<&str> {
        self.forward.get(system1).map(|&i| self.entries[i].1.as_str())
    }

    /// system2 name → system1 name.
    pub fn inverse(&self, system2: &str) -> Option<&str> {
        self.inverse.get(system2).map(|&i| self.entries[i].0.as_str())
    }

    /// Canonical ordinal of a system1 column name.
    pub fn ordinal(&self, system1: &str) -> Option<usize> {
        self.forward.get(system1).copied()
    }

    /// Canonical ordinal of a system2 column name (via the inverse lookup).
    pub fn ordinal_of_system2(&self, system2: &str) -> Option<usize> {
        self.inverse(system2).and_then(|s1| self.ordinal(s1))
    }

    /// (system1 name, system2 name) at a canonical ordinal.
    pub fn names(&self, ordinal: usize) -> Option<(&str, &str)> {
        self.entries.get(ordinal).map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    /// Two-column table with the given side labels as headers.
    pub fn to_table(&self, labels: (&str, &str)) -> Table {
        pairs_table(&self.entries, labels)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// What to do when one system1 key is paired with different system2 keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with a configuration error.
    #[default]
    Reject,
    /// Keep the pairing declared first.
    #[serde(alias = "first")]
    FirstWins,
    /// Keep the pairing declared last.
    #[serde(alias = "last")]
    LastWins,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" | "error" => Ok(Self::Reject),
            "first" | "first_wins" => Ok(Self::FirstWins),
            "last" | "last_wins" => Ok(Self::LastWins),
            other => Err(format!("unknown duplicate policy '{other}' (expected reject, first or last)")),
        }
    }
}

/// Partial mapping system1 row key → system2 row key, used as the join table.
///
/// Keys are compared by [`Value::key_text`]. Several system1 keys may share a
/// system2 key; one system1 key resolves to at most one system2 key.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMapping {
    pairs: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl RowMapping {
    pub fn from_pairs<I, A, B>(pairs: I, policy: DuplicatePolicy) -> Result<Self, ReconError>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut resolved: Vec<(String, String)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (s1, s2) in pairs {
            let (s1, s2): (String, String) = (s1.into(), s2.into());
            match index.entry(s1) {
                Entry::Vacant(slot) => {
                    resolved.push((slot.key().clone(), s2));
                    slot.insert(resolved.len() - 1);
                }
                Entry::Occupied(slot) => {
                    let existing = &mut resolved[*slot.get()];
                    if existing.1 == s2 {
                        log::warn!("row mapping repeats pair ({}, {}); collapsed", existing.0, s2);
                        continue;
                    }
                    match policy {
                        DuplicatePolicy::Reject => {
                            return Err(ReconError::DuplicateMapping {
                                mapping: "row",
                                side: Side::System1,
                                value: slot.key().clone(),
                            });
                        }
                        DuplicatePolicy::FirstWins => {
                            log::debug!("row key {}: keeping {}, ignoring {}", existing.0, existing.1, s2);
                        }
                        DuplicatePolicy::LastWins => {
                            log::debug!("row key {}: replacing {} with {}", existing.0, existing.1, s2);
                            existing.1 = s2;
                        }
                    }
                }
            }
        }

        Ok(Self { pairs: resolved, index })
    }

    /// Build from a two-column table of (system1 key, system2 key) rows.
    /// Rows with a blank on either side cannot join and are skipped.
    pub fn from_table(table: &Table, policy: DuplicatePolicy) -> Result<Self, ReconError> {
        let mut pairs = Vec::new();
        for (idx, (s1, s2)) in two_columns("row", table)?.into_iter().enumerate() {
            match (s1, s2) {
                (Some(s1), Some(s2)) => pairs.push((s1, s2)),
                _ => log::warn!("row mapping entry {idx} has a blank key; skipped"),
            }
        }
        Self::from_pairs(pairs, policy)
    }

    /// system2 key paired with a system1 key.
    pub fn lookup(&self, system1_key: &str) -> Option<&str> {
        self.index.get(system1_key).map(|&i| self.pairs[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Resolved pairs in declaration order of their system1 key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub fn to_table(&self, labels: (&str, &str)) -> Table {
        pairs_table(&self.pairs, labels)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn two_columns(mapping: &'static str, table: &Table) -> Result<Vec<(Option<String>, Option<String>)>, ReconError> {
    let [left, right] = table.columns() else {
        return Err(ReconError::MalformedMapping {
            mapping,
            detail: format!("expected 2 columns, found {}", table.columns().len()),
        });
    };
    Ok(left
        .values
        .iter()
        .zip(&right.values)
        .map(|(a, b)| (a.key_text().filter(|s| !s.is_empty()), b.key_text().filter(|s| !s.is_empty())))
        .collect())
}

fn pairs_table(pairs: &[(String, String)], labels: (&str, &str)) -> Table {
    let (left, right): (Vec<Value>, Vec<Value>) = pairs
        .iter()
        .map(|(a, b)| (Value::Text(a.clone()), Value::Text(b.clone())))
        .unzip();
    Table::new(vec![Column::new(labels.0, left), Column::new(labels.1, right)])
        .unwrap_or_else(|_| unreachable!("both columns built from the same pairs"))
}
