//! `rekon-recon`: two-system reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables and mappings, returns a
//! per-row diff for one compared column plus summary statistics.
//! No CLI or IO dependencies.

pub mod engine;
pub mod error;
pub mod mapping;
pub mod model;
pub mod normalize;
pub mod session;
pub mod stats;

pub use engine::{reconcile, ColumnSelector};
pub use error::ReconError;
pub use mapping::{ColumnMapping, DuplicatePolicy, RowMapping};
pub use model::{Column, ReconciliationResult, ResultRow, Table, Value};
pub use normalize::{normalize, NormalizedTable};
pub use session::Reconciliation;
pub use stats::ReconStats;
