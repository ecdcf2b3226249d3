//! # Cohort Query CLI
//!
//! Command-line interface translating a structured query file into the FHIR
//! `Parameters` resource holding the `count()` aggregation and its FHIRPath
//! filters.
//!
//! ## Command Line Options
//!
//! ```text
//! -q, --query <QUERY>          Path to the structured query JSON file ('-' for stdin)
//! -m, --mappings <MAPPINGS>    Path to the mapping table JSON file
//! -t, --tree <TREE>            Path to the concept tree JSON file
//!     --today <DATE>           Date age criteria are computed against [env: COHORT_TODAY]
//! -o, --output <OUTPUT>        Output file path (defaults to stdout)
//!     --log-level <LEVEL>      Log level [env: COHORT_LOG_LEVEL] [default: warn]
//! -h, --help                   Print help
//! ```
//!
//! ## Usage Examples
//!
//! ```bash
//! atrius-cohort-cli -q query.json -m mapping.json -t tree.json
//! ```
//!
//! ```bash
//! cat query.json | atrius-cohort-cli -q - -m mapping.json --today 2024-06-15 -o parameters.json
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use thiserror::Error;
use tracing::info;

use crate::error::TranslationError;
use crate::load::{LoadError, read_mapping_context, read_structured_query};
use crate::translator::Translator;

#[derive(Parser, Debug)]
#[command(name = "atrius-cohort-cli")]
#[command(about = "Translate structured cohort queries into FHIRPath filters")]
#[command(
    long_about = "Translate a structured query into a FHIR Parameters resource holding the count() aggregation and the FHIRPath filters selecting the cohort"
)]
pub struct Args {
    /// Path to the structured query JSON file (use '-' for stdin)
    #[arg(short, long)]
    pub query: PathBuf,

    /// Path to the mapping table JSON file
    #[arg(short, long)]
    pub mappings: PathBuf,

    /// Path to the concept tree JSON file
    #[arg(short, long)]
    pub tree: Option<PathBuf>,

    /// Date age criteria are computed against (defaults to the local date)
    #[arg(long, env = "COHORT_TODAY")]
    pub today: Option<NaiveDate>,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "COHORT_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

/// Errors surfaced by the command-line tool.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Main CLI execution function
pub fn run_cli(args: Args) -> Result<(), CliError> {
    init_logging(&args.log_level);

    let context = read_mapping_context(&args.mappings, args.tree.as_deref())?;
    let query = read_structured_query(&args.query)?;

    let mut translator = Translator::new(Arc::new(context));
    if let Some(today) = args.today {
        translator = translator.with_today(today);
    }
    let parameters = translator.translate(&query)?;
    info!(filters = parameters.filters().count(), "translation finished");

    let output = serde_json::to_string_pretty(&parameters)?;
    write_output(&args.output, &output)?;
    Ok(())
}

/// Logs go to stderr so stdout carries only the result.
fn init_logging(level: &str) {
    let filter = format!(
        "atrius_cohort_query={},atrius_fhirpath_builder={}",
        level, level
    );
    // A subscriber may already be installed when run in-process.
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .try_init();
}

/// Write output to file or stdout
fn write_output(path: &Option<PathBuf>, content: &str) -> io::Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(content.as_bytes())?;
            handle.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from([
            "atrius-cohort-cli",
            "-q",
            "query.json",
            "-m",
            "mapping.json",
            "--today",
            "2024-06-15",
        ])
        .unwrap();
        assert_eq!(args.query, PathBuf::from("query.json"));
        assert_eq!(args.tree, None);
        assert_eq!(args.today, NaiveDate::from_ymd_opt(2024, 6, 15));
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn test_invalid_today_is_rejected() {
        let result = Args::try_parse_from([
            "atrius-cohort-cli",
            "-q",
            "query.json",
            "-m",
            "mapping.json",
            "--today",
            "15.06.2024",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mappings_are_required() {
        assert!(Args::try_parse_from(["atrius-cohort-cli", "-q", "query.json"]).is_err());
    }
}
