//! `spacenotes` command-line entry point.
//!
//! # Responsibility
//! - Parse `<database-file> <output-file>` plus optional logging flags.
//! - Map export failures to stderr messages and process exit codes.
//!
//! # Invariants
//! - Help and usage errors exit with code 0.
//! - Any export failure exits with code 1; the summary goes to stdout only on
//!   success.

use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info};
use spacenotes_core::{export_database, init_logging, ExportError, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE_HINT: &str = "error: use -h or --help for usage information";

/// Exports a notes database into a plain-text report.
#[derive(Debug, Parser)]
#[command(
    name = "spacenotes",
    version,
    override_usage = "spacenotes <database-file> <output-file>",
    help_template = "usage: {usage}\n\n{about}\n\n{all-args}"
)]
struct Cli {
    /// SQLite notes database to read
    #[arg(value_name = "database-file")]
    database: PathBuf,

    /// Text report to create or overwrite
    #[arg(value_name = "output-file")]
    output: PathBuf,

    /// Absolute directory for rolling log files (logging is off when unset)
    #[arg(long, env = "SPACENOTES_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, env = "SPACENOTES_LOG_LEVEL")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return usage_exit(&err),
    };

    if let Some(log_dir) = cli.log_dir.as_ref() {
        let configured = LogConfig::new(cli.log_level.as_deref(), log_dir)
            .and_then(|config| init_logging(&config));
        if let Err(err) = configured {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    let code = match export_database(&cli.database, &cli.output) {
        Ok(summary) => {
            info!("event=cli_exit module=cli status=ok exit_code=0");
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                "event=cli_exit module=cli status=error exit_code=1 error_code={}",
                error_code(&err)
            );
            eprintln!("{}", failure_message(&err));
            ExitCode::from(1)
        }
    };
    log::Log::flush(log::logger());
    code
}

fn usage_exit(err: &clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp => eprint!("{}", err.render()),
        ErrorKind::DisplayVersion => print!("{}", err.render()),
        _ => eprintln!("{USAGE_HINT}"),
    }
    ExitCode::SUCCESS
}

fn failure_message(err: &ExportError) -> String {
    match err {
        ExportError::Query(_) => format!("query error: {err}"),
        ExportError::DataIntegrity(_) | ExportError::InvalidTimestamp { .. } => {
            format!("data error: {err}")
        }
        ExportError::Connection { .. }
        | ExportError::OutputOpen { .. }
        | ExportError::OutputWrite { .. }
        | ExportError::Render(_) => format!("error: {err}"),
    }
}

fn error_code(err: &ExportError) -> &'static str {
    match err {
        ExportError::Connection { .. } => "connection_failed",
        ExportError::Query(_) => "query_failed",
        ExportError::DataIntegrity(_) => "broken_reference",
        ExportError::InvalidTimestamp { .. } => "invalid_timestamp",
        ExportError::OutputOpen { .. } => "output_open_failed",
        ExportError::OutputWrite { .. } | ExportError::Render(_) => "output_write_failed",
    }
}
