//! unicontract CLI.
//!
//! Normalizes OpenAPI and AsyncAPI documents into unified contracts, checks
//! documents, and lists the operations of a specs directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use unicontract_loader::{load_all_specs, load_spec, LoadError, LoaderOptions};
use unicontract_model::{query, UnifiedContract, UnifiedOperation};
use unicontract_normalizer::NormalizeError;
use unicontract_telemetry::{LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(
    name = "unicontract",
    about = "Normalize OpenAPI and AsyncAPI documents into unified contracts",
    version
)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, env = "UNICONTRACT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log format (pretty or json).
    #[arg(long, global = true, env = "UNICONTRACT_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize document(s) and print the contracts as JSON.
    ///
    /// A single document prints one contract; several print an array.
    Normalize {
        /// Input document(s) (YAML or JSON).
        #[arg(short, long, required = true, num_args = 1..)]
        spec: Vec<PathBuf>,

        /// Write the JSON to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Single-line JSON.
        #[arg(long)]
        compact: bool,

        /// Leave the source document out of each contract.
        #[arg(long)]
        no_original: bool,
    },

    /// Check that document(s) load and normalize.
    Validate {
        /// Input document(s) (YAML or JSON).
        #[arg(short, long, required = true, num_args = 1..)]
        spec: Vec<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the operations of every contract under a specs directory.
    List {
        /// Base directory holding openapi/ and asyncapi/ subdirectories.
        #[arg(short, long)]
        dir: PathBuf,

        /// Case-insensitive search term.
        #[arg(long)]
        search: Option<String>,

        /// Only operations carrying this tag.
        #[arg(long)]
        tag: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct ValidationResult {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    contract: Option<String>,
    operations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ValidationIssue>,
}

#[derive(Debug, Serialize)]
struct ValidationIssue {
    kind: &'static str,
    message: String,
}

impl ValidationIssue {
    fn from_error(err: &LoadError) -> Self {
        let kind = match err {
            LoadError::Io { .. } => "io",
            LoadError::Parse { .. } => "parse",
            LoadError::Normalize {
                source: NormalizeError::UnrecognizedSpecFormat,
                ..
            } => "unrecognized-format",
            LoadError::Normalize {
                source: NormalizeError::MissingVersionField { .. },
                ..
            } => "missing-version",
            LoadError::Normalize { .. } => "invalid-document",
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

fn run_normalize(
    specs: &[PathBuf],
    output: Option<&Path>,
    compact: bool,
    include_original: bool,
) -> anyhow::Result<()> {
    let mut options = LoaderOptions::default();
    options.normalize = options.normalize.with_original_document(include_original);

    let contracts = specs
        .iter()
        .map(|path| load_spec(path, &options))
        .collect::<Result<Vec<_>, _>>()?;

    let value = match contracts.as_slice() {
        [single] => serde_json::to_value(single)?,
        _ => serde_json::to_value(&contracts)?,
    };
    let json = if compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };

    match output {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "normalized {} document(s) to {}",
                contracts.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_validate(specs: &[PathBuf], format: OutputFormat) -> anyhow::Result<bool> {
    let options = LoaderOptions::default();
    let results: Vec<ValidationResult> = specs
        .iter()
        .map(|path| {
            let file = path.display().to_string();
            match load_spec(path, &options) {
                Ok(contract) => ValidationResult {
                    file,
                    valid: true,
                    contract: Some(contract.id),
                    operations: contract.operations.len(),
                    error: None,
                },
                Err(err) => ValidationResult {
                    file,
                    valid: false,
                    contract: None,
                    operations: 0,
                    error: Some(ValidationIssue::from_error(&err)),
                },
            }
        })
        .collect();

    let valid_count = results.iter().filter(|r| r.valid).count();
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "results": results,
                "summary": {
                    "total": results.len(),
                    "valid": valid_count,
                    "invalid": results.len() - valid_count,
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            for result in &results {
                match (&result.contract, &result.error) {
                    (Some(id), _) => eprintln!(
                        "✓ {} is valid ({}, {} operation(s))",
                        result.file, id, result.operations
                    ),
                    (None, Some(issue)) => {
                        eprintln!("✗ {} is invalid", result.file);
                        eprintln!("  {}: {}", issue.kind, issue.message);
                    }
                    (None, None) => eprintln!("✗ {} is invalid", result.file),
                }
            }
            eprintln!();
            eprintln!(
                "validated {} document(s): {} valid, {} invalid",
                results.len(),
                valid_count,
                results.len() - valid_count
            );
        }
    }

    Ok(valid_count == results.len())
}

fn matching_operations<'a>(
    contract: &'a UnifiedContract,
    search: Option<&str>,
    tag: Option<&str>,
) -> Vec<&'a UnifiedOperation> {
    let mut operations = query::search_operations(&contract.operations, search.unwrap_or(""));
    if let Some(tag) = tag {
        operations.retain(|op| op.tags.iter().any(|t| t == tag));
    }
    operations
}

fn run_list(dir: &Path, search: Option<&str>, tag: Option<&str>) -> anyhow::Result<bool> {
    if !dir.is_dir() {
        anyhow::bail!("specs directory not found: {}", dir.display());
    }

    let report = load_all_specs(dir, &LoaderOptions::default());
    for contract in &report.contracts {
        let operations = matching_operations(contract, search, tag);
        if operations.is_empty() {
            continue;
        }
        println!("{} ({} {})", contract.name, contract.protocol, contract.version);
        for op in operations {
            println!(
                "  {:<8} {:<32} {}",
                op.action_type.as_str(),
                op.location,
                op.id
            );
        }
    }

    for failure in &report.failures {
        eprintln!("error: {}", failure);
    }
    Ok(report.is_success())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let format = LogFormat::parse(&cli.log_format)
        .with_context(|| format!("unknown log format: {}", cli.log_format))?;
    let config = TelemetryConfig::new()
        .with_log_level(cli.log_level.as_str())
        .with_log_format(format);
    unicontract_telemetry::init(&config)?;
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    init_logging(&cli)?;
    tracing::debug!(command = ?cli.command, "running command");

    match cli.command {
        Commands::Normalize {
            spec,
            output,
            compact,
            no_original,
        } => run_normalize(&spec, output.as_deref(), compact, !no_original).map(|()| true),
        Commands::Validate { spec, format } => run_validate(&spec, format),
        Commands::List { dir, search, tag } => {
            run_list(&dir, search.as_deref(), tag.as_deref())
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
