//! procflow command-line tool
//!
//! - `check <files...>`: imports documents in parallel and reports their
//!   diagnostics; exits with status 1 if any document cannot be loaded
//! - `migrate <input> -o <output>`: imports one document and writes it back
//!   in the current layout
//!
//! Both load operator catalogs (`--catalog`), rule documents (`--rules`) and
//! an import configuration (`--config`) before importing.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use procflow_import::{Diagnostic, ImportConfig, Importer};
use procflow_registry::OperatorRegistry;
use procflow_rules::RuleRegistry;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command definition
#[must_use]
pub fn command() -> Command {
    Command::new("procflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Check and migrate process documents")
        .subcommand_required(true)
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .global(true)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Operator catalog YAML (repeatable)"),
        )
        .arg(
            Arg::new("rules")
                .long("rules")
                .global(true)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Migration rule YAML (repeatable)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Import configuration YAML"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write log lines as JSON"),
        )
        .subcommand(
            Command::new("check")
                .about("Import documents and report diagnostics")
                .arg(
                    Arg::new("files")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Process documents"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output reports as JSON"),
                ),
        )
        .subcommand(
            Command::new("migrate")
                .about("Write a document in the current layout")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Document to migrate"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Migrated document"),
                ),
        )
}

/// Files an importer is assembled from
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub catalogs: Vec<PathBuf>,
    pub rules: Vec<PathBuf>,
    pub config: Option<PathBuf>,
}

impl Sources {
    #[must_use]
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let paths = |id: &str| {
            matches
                .get_many::<PathBuf>(id)
                .map(|values| values.cloned().collect())
                .unwrap_or_default()
        };
        Self {
            catalogs: paths("catalog"),
            rules: paths("rules"),
            config: matches.get_one::<PathBuf>("config").cloned(),
        }
    }

    /// Load configuration, catalogs and rules
    ///
    /// # Errors
    /// Returns error if any file cannot be read or is invalid.
    pub fn importer(&self) -> Result<Importer> {
        let config = match &self.config {
            Some(path) => ImportConfig::from_path(path)?,
            None => ImportConfig::default(),
        };

        let mut operators = OperatorRegistry::with_root(config.software_version.clone());
        for path in &self.catalogs {
            let loaded = operators
                .load_catalog_file(path)
                .with_context(|| format!("loading catalog {}", path.display()))?;
            info!(path = %path.display(), loaded, "catalog loaded");
        }

        let mut rules = RuleRegistry::new();
        for path in &self.rules {
            let loaded = rules
                .load_file(path)
                .with_context(|| format!("loading rules {}", path.display()))?;
            info!(path = %path.display(), loaded, "rules loaded");
        }

        Ok(Importer::new(config)
            .with_operators(Arc::new(operators))
            .with_rules(Arc::new(rules)))
    }
}

/// One diagnostic in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticLine {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    pub message: String,
}

impl From<&Diagnostic> for DiagnosticLine {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            kind: format!("{:?}", diagnostic.kind),
            operator: diagnostic.operator.clone(),
            message: diagnostic.message.clone(),
        }
    }
}

/// Result of importing one file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub operators: usize,
    pub modified: bool,
    pub diagnostics: Vec<DiagnosticLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    /// Whether the document could not be loaded at all
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.error.is_some()
    }

    /// Human-readable report
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = format!("{}: ", self.path.display());
        match &self.error {
            Some(error) => {
                let _ = write!(text, "error: {error}");
            }
            None => {
                let _ = write!(
                    text,
                    "{} operators, {} diagnostics{}",
                    self.operators,
                    self.diagnostics.len(),
                    if self.modified { ", modified by migration" } else { "" }
                );
            }
        }
        for line in &self.diagnostics {
            let _ = write!(text, "\n  [{}] {}", line.kind, line.message);
        }
        text
    }
}

fn report(importer: &Importer, path: &Path) -> FileReport {
    match importer.import_path(path) {
        Ok(outcome) => FileReport {
            path: path.to_path_buf(),
            operators: outcome.document.root.subtree_size(),
            modified: outcome.diagnostics.is_modified(),
            diagnostics: outcome.diagnostics.iter().map(DiagnosticLine::from).collect(),
            error: None,
        },
        Err(error) => FileReport {
            path: path.to_path_buf(),
            operators: 0,
            modified: false,
            diagnostics: Vec::new(),
            error: Some(error.to_string()),
        },
    }
}

/// Import every file in parallel, reports in input order
#[must_use]
pub fn check(importer: &Importer, paths: &[PathBuf]) -> Vec<FileReport> {
    paths.par_iter().map(|path| report(importer, path)).collect()
}

/// Import `input` and write it to `output` in the current layout
///
/// # Errors
/// Returns error if the input cannot be imported or the output cannot be
/// written.
pub fn migrate(importer: &Importer, input: &Path, output: &Path) -> Result<FileReport> {
    let outcome = importer
        .import_path(input)
        .with_context(|| format!("importing {}", input.display()))?;
    importer
        .exporter()
        .write_path(&outcome.document, output)
        .with_context(|| format!("writing {}", output.display()))?;

    Ok(FileReport {
        path: input.to_path_buf(),
        operators: outcome.document.root.subtree_size(),
        modified: outcome.diagnostics.is_modified(),
        diagnostics: outcome.diagnostics.iter().map(DiagnosticLine::from).collect(),
        error: None,
    })
}

/// Run parsed command line, returning the process exit status
///
/// # Errors
/// Returns error if configuration, catalogs or rules cannot be loaded, or a
/// migration fails.
pub fn run(matches: &ArgMatches) -> Result<i32> {
    let importer = Sources::from_matches(matches).importer()?;

    match matches.subcommand() {
        Some(("check", args)) => {
            let files: Vec<PathBuf> = args
                .get_many::<PathBuf>("files")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            let reports = check(&importer, &files);

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    println!("{}", report.render());
                }
            }
            Ok(i32::from(reports.iter().any(FileReport::is_fatal)))
        }
        Some(("migrate", args)) => {
            let input = args.get_one::<PathBuf>("input").context("missing input")?;
            let output = args.get_one::<PathBuf>("output").context("missing output")?;
            let report = migrate(&importer, input, output)?;
            eprintln!("{}", report.render());
            println!("{}", output.display());
            Ok(0)
        }
        _ => anyhow::bail!("unknown command"),
    }
}
