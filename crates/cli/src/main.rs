// rekon CLI - reconcile a numeric column between two systems' tables

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rekon_config::{ConfigError, Settings};
use rekon_recon::{ColumnSelector, ReconError};

use exit_codes::{config_exit_code, recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use recon::{OutputArgs, ReconcileArgs, ReportArgs};

#[derive(Parser)]
#[command(name = "rekon")]
#[command(about = "Reconcile a numeric column between two systems' tables")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile two tables given mapping files
    #[command(after_help = "\
Examples:
  rekon reconcile ledger.csv bank.csv --col-map cols.csv --row-map rows.csv
  rekon reconcile ledger.csv bank.csv --col-map cols.csv --row-map rows.csv --column amount
  rekon reconcile ledger.xlsx bank.csv --col-map cols.csv --row-map rows.csv --labels ledger,bank --report ~/recs
  rekon reconcile a.csv b.csv --col-map cols.csv --row-map rows.csv --on-duplicate last --stats-json")]
    Reconcile(ReconcileArgs),

    /// Reconcile as described by a TOML run file
    #[command(after_help = "\
Examples:
  rekon run daily.toml
  rekon run daily.toml --json")]
    Run {
        /// Path to the run file; relative paths inside it resolve against its directory
        config: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Load and check a run file's inputs and mappings without reconciling
    Validate {
        config: PathBuf,
    },

    /// Reconcile the bundled sample data
    #[command(after_help = "\
Examples:
  rekon sample
  rekon sample --column notional --json
  rekon sample --report /tmp/recs --format zip")]
    Sample {
        /// Column to compare: ordinal or name
        #[arg(long, value_name = "N|NAME", default_value = "1")]
        column: ColumnSelector,

        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the user settings file and the effective settings
    #[command(after_help = "\
Examples:
  rekon settings
  rekon settings --path
  rekon settings --init")]
    Settings {
        /// Print only the settings file path
        #[arg(long, conflicts_with = "init")]
        path: bool,

        /// Write a settings file holding the defaults; refuses to overwrite
        #[arg(long)]
        init: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("REKON_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("REKON_TARGET"),
        "\nreports: xlsx, zip, csv, json",
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = Settings::load();

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: rekon <command> [options]");
            eprintln!("       rekon --help for more information");
            Ok(())
        }
        Some(Commands::Reconcile(args)) => recon::cmd_reconcile(args, &settings),
        Some(Commands::Run { config, output }) => recon::cmd_run(config, output, &settings),
        Some(Commands::Validate { config }) => recon::cmd_validate(config, &settings),
        Some(Commands::Sample { column, report, output }) => recon::cmd_sample(column, report, output, &settings),
        Some(Commands::Settings { path, init }) => cmd_settings(path, init, &settings),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("column mapping names must match the file headers exactly")
            }
            ReconError::KeyColumnSelected => Some("ordinal 0 is the row key; compare 1 or higher"),
            ReconError::DuplicateMapping { mapping: "row", .. } => {
                Some("use --on-duplicate first or --on-duplicate last to pick one pairing")
            }
            ReconError::NonNumericValue { .. } => Some("the compared column must hold numbers or blanks"),
            ReconError::UnsupportedFormat(_) => Some("use xlsx, zip, csv or json"),
            _ => None,
        };
        let cli = Self { code: recon_exit_code(&err), message: err.to_string(), hint: None };
        match hint {
            Some(hint) => cli.with_hint(hint),
            None => cli,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self { code: config_exit_code(&err), message: err.to_string(), hint: None }
    }
}

// ============================================================================
// settings
// ============================================================================

fn cmd_settings(path_only: bool, init: bool, settings: &Settings) -> Result<(), CliError> {
    let path = Settings::config_path();
    if path_only {
        println!("{}", path.display());
        return Ok(());
    }

    if init {
        if path.exists() {
            return Err(CliError::args(format!("{} already exists", path.display()))
                .with_hint("edit it in place, or remove it and run --init again"));
        }
        settings.save_to(&path)?;
        eprintln!("wrote {}", path.display());
        return Ok(());
    }

    if path.exists() {
        eprintln!("# {}", path.display());
    } else {
        eprintln!("# {} (not found, showing defaults)", path.display());
    }
    let text = settings
        .to_toml_string()
        .map_err(|e| CliError::args(e.to_string()))?;
    print!("{text}");
    Ok(())
}
