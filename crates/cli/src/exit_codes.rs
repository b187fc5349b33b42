//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Reconciled, no breaks and no misses                      |
//! | 1    | Reconciled, breaks or misses found                       |
//! | 2    | Usage error (bad args, unreadable or malformed run file) |
//! | 3    | Configuration error (mappings, columns, keys, values)    |
//! | 4    | I/O error reading inputs or writing outputs              |
//! | 5    | Unsupported report format                                |

use rekon_config::ConfigError;
use rekon_recon::ReconError;

/// Success - reconciled with nothing to report.
pub const EXIT_SUCCESS: u8 = 0;

/// Like `diff(1)`, exit 1 means "the systems differ."
pub const EXIT_BREAKS: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Inputs loaded but cannot be reconciled as configured.
pub const EXIT_CONFIG: u8 = 3;

/// Reading an input or writing a report/store failed.
pub const EXIT_IO: u8 = 4;

/// Report format not one of xlsx, zip, csv, json.
pub const EXIT_FORMAT: u8 = 5;

/// Map an engine or I/O error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::UnsupportedFormat(_) => EXIT_FORMAT,
        ReconError::Io(_) => EXIT_IO,
        // Configuration errors, and NotReconciled which only a mis-sequenced
        // command can produce
        _ => EXIT_CONFIG,
    }
}

pub fn config_exit_code(_err: &ConfigError) -> u8 {
    EXIT_USAGE
}
