//! `rekon reconcile`, `rekon run`, `rekon validate` and `rekon sample`.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use rekon_config::{RunConfig, Settings};
use rekon_io::csv::{load_mapping, project, write_table};
use rekon_io::store::{persist_session, StoreLocation};
use rekon_io::{export_report, ReportFormat};
use rekon_recon::{
    normalize, ColumnMapping, ColumnSelector, DuplicatePolicy, ReconError, ReconStats, Reconciliation,
    ReconciliationResult, RowMapping, Table,
};

use crate::exit_codes::EXIT_BREAKS;
use crate::CliError;

#[derive(Args)]
pub struct ReconcileArgs {
    /// system1 data table (csv/tsv, or the first sheet of xlsx/xls/ods)
    pub system1: PathBuf,

    /// system2 data table
    pub system2: PathBuf,

    /// Column mapping: header-less `system1,system2` name pairs, row keys first
    #[arg(long, value_name = "FILE")]
    pub col_map: PathBuf,

    /// Row mapping: header-less `system1,system2` row key pairs
    #[arg(long, value_name = "FILE")]
    pub row_map: PathBuf,

    /// Column to compare: canonical ordinal (1 = first non-key column) or a
    /// column name from either system
    #[arg(long, value_name = "N|NAME", default_value = "1")]
    pub column: ColumnSelector,

    /// System labels used in result headers, comma-separated
    #[arg(long, value_name = "A,B", value_parser = parse_labels)]
    pub labels: Option<(String, String)>,

    /// A system1 key mapped to different system2 keys: reject, first or last
    #[arg(long, value_name = "POLICY", value_parser = parse_policy)]
    pub on_duplicate: Option<DuplicatePolicy>,

    /// Load only the columns named in the column mapping
    #[arg(long)]
    pub project: bool,

    /// Persist the join into SQLite (`:memory:` or a file); bare flag uses the settings default
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    pub store: Option<String>,

    #[command(flatten)]
    pub report: ReportArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Default)]
pub struct ReportArgs {
    /// Write a report into DIR (`~` expanded, created if missing)
    #[arg(long = "report", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Report format: xlsx, zip, csv or json
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Report file name without extension
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(Args, Clone, Copy, Default)]
pub struct OutputArgs {
    /// Print result, stats and run metadata as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Print only the stats as JSON on stdout
    #[arg(long, conflicts_with = "json")]
    pub stats_json: bool,
}

fn parse_labels(s: &str) -> Result<(String, String), String> {
    match s.split_once(',') {
        Some((a, b)) if !a.trim().is_empty() && !b.trim().is_empty() && a.trim() != b.trim() => {
            Ok((a.trim().to_string(), b.trim().to_string()))
        }
        _ => Err(format!("expected two different labels as A,B, got '{s}'")),
    }
}

fn parse_policy(s: &str) -> Result<DuplicatePolicy, String> {
    s.parse()
}

// ============================================================================
// Plans
// ============================================================================

/// Where the inputs are and how to read them.
struct Sources {
    system1: PathBuf,
    system2: PathBuf,
    col_map: PathBuf,
    row_map: PathBuf,
    labels: (String, String),
    on_duplicate: DuplicatePolicy,
    project: (bool, bool),
}

/// What to do once the inputs are loaded.
struct RunSpec {
    name: Option<String>,
    column: ColumnSelector,
    store: Option<StoreLocation>,
    report: Option<ReportPlan>,
}

struct ReportPlan {
    dir: PathBuf,
    format: ReportFormat,
    name: Option<String>,
}

impl ReportArgs {
    /// A report is written when any report option is given; settings fill the rest.
    fn plan(&self, settings: &Settings) -> Result<Option<ReportPlan>, CliError> {
        if self.dir.is_none() && self.format.is_none() && self.name.is_none() {
            return Ok(None);
        }
        report_plan(self.dir.as_deref(), self.format.as_deref(), self.name.as_deref(), settings).map(Some)
    }
}

fn report_plan(
    dir: Option<&Path>,
    format: Option<&str>,
    name: Option<&str>,
    settings: &Settings,
) -> Result<ReportPlan, CliError> {
    // Parsed up front so an unknown format fails before anything is loaded or written
    let format: ReportFormat = format.unwrap_or(settings.report.format.as_str()).parse()?;
    Ok(ReportPlan {
        dir: dir.map_or_else(|| settings.report.dir.clone(), Path::to_path_buf),
        format,
        name: name.map(str::to_string),
    })
}

fn store_location(flag: Option<&str>, settings: &Settings) -> Option<StoreLocation> {
    flag.map(|s| {
        if s.is_empty() {
            StoreLocation::from(settings.store.location.as_str())
        } else {
            StoreLocation::from(s)
        }
    })
}

fn plan_from_args(args: ReconcileArgs, settings: &Settings) -> Result<(Sources, RunSpec), CliError> {
    let report = args.report.plan(settings)?;
    let (label1, label2) = args.labels.unwrap_or_else(|| ("system1".to_string(), "system2".to_string()));

    let sources = Sources {
        system1: args.system1,
        system2: args.system2,
        col_map: args.col_map,
        row_map: args.row_map,
        labels: (label1, label2),
        on_duplicate: args.on_duplicate.unwrap_or(settings.mapping.on_duplicate),
        project: (args.project, args.project),
    };
    let spec = RunSpec {
        name: None,
        column: args.column,
        store: store_location(args.store.as_deref(), settings),
        report,
    };
    Ok((sources, spec))
}

fn plan_from_config(config: RunConfig, settings: &Settings) -> Result<(Sources, RunSpec), CliError> {
    let report = match &config.report {
        Some(r) => Some(report_plan(r.dir.as_deref(), r.format.as_deref(), r.name.as_deref(), settings)?),
        None => None,
    };
    let (label1, label2) = config.labels();

    let sources = Sources {
        labels: (label1.to_string(), label2.to_string()),
        system1: config.system1.file,
        system2: config.system2.file,
        col_map: config.mapping.columns,
        row_map: config.mapping.rows,
        on_duplicate: config.mapping.on_duplicate,
        project: (config.system1.project, config.system2.project),
    };
    let spec = RunSpec {
        name: config.name,
        column: config.compare.column,
        store: config.store.map(|s| StoreLocation::from(s.location.as_str())),
        report,
    };
    Ok((sources, spec))
}

// ============================================================================
// Loading
// ============================================================================

fn load_session(sources: &Sources) -> Result<Reconciliation, ReconError> {
    let columns = ColumnMapping::from_table(&load_mapping(&sources.col_map, "column")?)?;
    let rows = RowMapping::from_table(&load_mapping(&sources.row_map, "row")?, sources.on_duplicate)?;

    let keep1: Vec<&str> = columns.iter().map(|(s1, _)| s1).collect();
    let keep2: Vec<&str> = columns.iter().map(|(_, s2)| s2).collect();
    let system1 = load_side(&sources.system1, sources.project.0.then_some(keep1.as_slice()))?;
    let system2 = load_side(&sources.system2, sources.project.1.then_some(keep2.as_slice()))?;

    log::debug!(
        "loaded {} ({} rows) and {} ({} rows), {} mapped columns, {} row pairs",
        sources.system1.display(),
        system1.row_count(),
        sources.system2.display(),
        system2.row_count(),
        columns.len(),
        rows.len()
    );

    let (label1, label2) = &sources.labels;
    Ok(Reconciliation::new(system1, system2)
        .with_labels(label1.as_str(), label2.as_str())
        .with_column_mapping(columns)
        .with_row_mapping(rows))
}

fn load_side(path: &Path, keep: Option<&[&str]>) -> Result<Table, ReconError> {
    let table = rekon_io::load_table(path)?;
    match keep {
        Some(keep) => project(&table, keep),
        None => Ok(table),
    }
}

// ============================================================================
// Execution
// ============================================================================

#[derive(Serialize)]
struct RunOutput<'a> {
    meta: RunMeta<'a>,
    stats: ReconStats,
    result: &'a ReconciliationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<String>,
}

#[derive(Serialize)]
struct RunMeta<'a> {
    engine_version: &'static str,
    run_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    labels: [&'a str; 2],
    column: usize,
}

fn execute(mut session: Reconciliation, spec: &RunSpec, output: OutputArgs) -> Result<(), CliError> {
    let run_at = chrono::Utc::now();
    session.reconcile(&spec.column)?;
    let result = session.result()?;
    let stats = session.stats()?;

    if let Some(location) = &spec.store {
        persist_session(&session, location)?;
        eprintln!("stored join in {location}");
    }

    let report_path = match &spec.report {
        Some(plan) => Some(export_report(&session, &plan.dir, plan.name.as_deref(), plan.format)?),
        None => None,
    };
    if let Some(path) = &report_path {
        eprintln!("wrote {}", path.display());
    }

    if output.json {
        let (label1, label2) = session.labels();
        let envelope = RunOutput {
            meta: RunMeta {
                engine_version: env!("CARGO_PKG_VERSION"),
                run_at: run_at.to_rfc3339(),
                name: spec.name.as_deref(),
                labels: [label1, label2],
                column: result.column,
            },
            stats,
            result,
            report: report_path.as_ref().map(|p| p.display().to_string()),
            store: spec.store.as_ref().map(ToString::to_string),
        };
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else if output.stats_json {
        println!("{}", stats.to_json());
    } else {
        write_table(&result.to_table(), std::io::stdout().lock())?;
    }

    print_summary(&session, result, &stats);

    if stats.is_clean() {
        Ok(())
    } else {
        // Summary already printed; exit code carries the outcome
        Err(CliError { code: EXIT_BREAKS, message: String::new(), hint: None })
    }
}

fn print_summary(session: &Reconciliation, result: &ReconciliationResult, stats: &ReconStats) {
    let (label1, label2) = session.labels();
    eprintln!(
        "{label1} vs {label2} on {} / {}: {} rows, {} breaks, {} missing in {label1}, {} missing in {label2}",
        result.headers[2],
        result.headers[3],
        stats.row_count,
        stats.break_count,
        stats.system1_miss_count,
        stats.system2_miss_count,
    );
}

// ============================================================================
// Commands
// ============================================================================

pub fn cmd_reconcile(args: ReconcileArgs, settings: &Settings) -> Result<(), CliError> {
    let output = args.output;
    let (sources, spec) = plan_from_args(args, settings)?;
    let session = load_session(&sources)?;
    execute(session, &spec, output)
}

pub fn cmd_run(config_path: PathBuf, output: OutputArgs, settings: &Settings) -> Result<(), CliError> {
    let config = RunConfig::load(&config_path)?;
    let (sources, spec) = plan_from_config(config, settings)?;
    let session = load_session(&sources)?;
    execute(session, &spec, output)
}

pub fn cmd_validate(config_path: PathBuf, settings: &Settings) -> Result<(), CliError> {
    let config = RunConfig::load(&config_path)?;
    let (sources, spec) = plan_from_config(config, settings)?;
    let session = load_session(&sources)?;

    let columns = session.column_mapping().ok_or(ReconError::MissingMapping("column"))?;
    normalize(session.system1(), session.system2(), columns)?;
    let ordinal = spec.column.resolve(columns)?;
    let (name1, name2) = columns.names(ordinal).ok_or(ReconError::ColumnOutOfRange {
        index: ordinal,
        len: columns.len(),
    })?;

    let (label1, label2) = session.labels();
    eprintln!(
        "valid: {label1} ({} rows) vs {label2} ({} rows), {} mapped columns, {} row pairs, comparing {name1} / {name2}",
        session.system1().row_count(),
        session.system2().row_count(),
        columns.len(),
        session.row_mapping().map_or(0, RowMapping::len),
    );
    Ok(())
}

pub fn cmd_sample(
    column: ColumnSelector,
    report: ReportArgs,
    output: OutputArgs,
    settings: &Settings,
) -> Result<(), CliError> {
    let spec = RunSpec {
        name: Some("sample".to_string()),
        column,
        store: None,
        report: report.plan(settings)?,
    };
    let session = rekon_io::sample::sample_session()?;
    execute(session, &spec, output)
}
