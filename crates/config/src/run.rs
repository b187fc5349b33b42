// Run files: one TOML document describing a complete reconciliation
//
// name = "trades vs custodian"
//
// [system1]
// file = "system_1.csv"
// label = "internal"
//
// [system2]
// file = "system_2.csv"
// label = "custodian"
//
// [mapping]
// columns = "col_mapping.csv"
// rows = "row_mapping.csv"
// on_duplicate = "reject"
//
// [compare]
// column = "notional"
//
// [report]
// dir = "out"
// format = "xlsx"

use std::path::{Path, PathBuf};

use serde::Deserialize;

use rekon_recon::{ColumnSelector, DuplicatePolicy};

use crate::ConfigError;

pub const DEFAULT_LABELS: (&str, &str) = ("system1", "system2");

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub system1: SourceConfig,
    pub system2: SourceConfig,
    pub mapping: MappingConfig,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub file: PathBuf,
    #[serde(default)]
    pub label: Option<String>,
    /// Keep only the columns named in the column mapping when loading.
    #[serde(default)]
    pub project: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    pub columns: PathBuf,
    pub rows: PathBuf,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareConfig {
    #[serde(default)]
    pub column: ColumnSelector,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// `:memory:` or a database file path.
    pub location: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Kept as text so an unknown format is reported by the exporter.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a run file, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        let mut config = Self::from_toml(&input)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        log::debug!("loaded run file {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (side, source) in [("system1", &self.system1), ("system2", &self.system2)] {
            if source.file.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("{side}.file is empty")));
            }
        }
        if self.mapping.columns.as_os_str().is_empty() || self.mapping.rows.as_os_str().is_empty() {
            return Err(ConfigError::Validation("mapping.columns and mapping.rows are required".into()));
        }

        let (label1, label2) = self.labels();
        if label1.trim().is_empty() || label2.trim().is_empty() {
            return Err(ConfigError::Validation("system labels must not be empty".into()));
        }
        if label1 == label2 {
            return Err(ConfigError::Validation(format!("system labels must differ, both are '{label1}'")));
        }

        if let Some(store) = &self.store {
            if store.location.trim().is_empty() {
                return Err(ConfigError::Validation("store.location is empty".into()));
            }
        }
        Ok(())
    }

    /// Make every relative path absolute against `base`. `~` paths and the
    /// in-memory store are left alone.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() && !p.starts_with("~") {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.system1.file);
        resolve(&mut self.system2.file);
        resolve(&mut self.mapping.columns);
        resolve(&mut self.mapping.rows);

        if let Some(store) = &mut self.store {
            if store.location != ":memory:" {
                let mut path = PathBuf::from(&store.location);
                resolve(&mut path);
                store.location = path.display().to_string();
            }
        }
        if let Some(dir) = self.report.as_mut().and_then(|r| r.dir.as_mut()) {
            resolve(dir);
        }
    }

    pub fn labels(&self) -> (&str, &str) {
        (
            self.system1.label.as_deref().unwrap_or(DEFAULT_LABELS.0),
            self.system2.label.as_deref().unwrap_or(DEFAULT_LABELS.1),
        )
    }
}
