// Configuration loading

pub mod run;
pub mod settings;

pub use run::RunConfig;
pub use settings::Settings;

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The file could not be read.
    Read { path: String, detail: String },
    Write { path: String, detail: String },
    /// TOML syntax or shape error.
    Parse(String),
    /// Well-formed but semantically invalid.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, detail } => write!(f, "cannot read {path}: {detail}"),
            Self::Write { path, detail } => write!(f, "cannot write {path}: {detail}"),
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
