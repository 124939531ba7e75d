//! Extract and validate transactions from text dumps of bank documents.
//!
//! Usage: extract_text [--ledger ledger.json] [--config import.json] <file.txt>...
//! A dump may start with an `Author: <producer>` line carrying the PDF author.
//! Output: the extraction result with statuses as JSON on stdout
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments
//!   2 - Read error (documents, ledger or config)
//!   3 - At least one item failed validation

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use portfolio_import::config::ImportConfig;
use portfolio_import::pdf_import::{self, extract_documents, Document};
use portfolio_import::pp::Client;
use portfolio_import::validation::{ImportContext, ImportPipeline, Severity};

const USAGE: &str = "Usage: extract_text [--ledger ledger.json] [--config import.json] <file.txt>...";

struct Args {
    ledger: Option<PathBuf>,
    config: Option<PathBuf>,
    files: Vec<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Args> {
    let mut parsed = Args {
        ledger: None,
        config: None,
        files: Vec::new(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ledger" => parsed.ledger = Some(PathBuf::from(args.next()?)),
            "--config" => parsed.config = Some(PathBuf::from(args.next()?)),
            flag if flag.starts_with("--") => return None,
            _ => parsed.files.push(PathBuf::from(arg)),
        }
    }
    (!parsed.files.is_empty()).then_some(parsed)
}

fn read_document(path: &Path) -> Result<Document> {
    let dump = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Document::from_dump(name, &dump))
}

fn load_ledger(path: Option<&Path>, config: &ImportConfig) -> Result<Client> {
    let Some(path) = path else {
        return Ok(Client::new(config.base_currency.clone()));
    };
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read ledger {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid ledger {}", path.display()))
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let Some(args) = parse_args(env::args().skip(1)) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(1);
    };

    let config = match args.config.as_deref().map(ImportConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("READ_ERROR:{:#}", e);
            return ExitCode::from(2);
        }
    };

    let documents = match args.files.iter().map(|p| read_document(p)).collect::<Result<Vec<_>>>() {
        Ok(documents) => documents,
        Err(e) => {
            eprintln!("READ_ERROR:{:#}", e);
            return ExitCode::from(2);
        }
    };

    let client = match load_ledger(args.ledger.as_deref(), &config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("READ_ERROR:{:#}", e);
            return ExitCode::from(2);
        }
    };

    let registry = pdf_import::shared();
    for e in registry.errors() {
        log::error!("Grammar not available: {}", e);
    }

    let mut result = extract_documents(&documents, registry, &config);
    let today = chrono::Local::now().date_naive();
    let ctx = ImportContext::new(&client, config, today);
    ImportPipeline::standard().run(&mut result.items, &ctx);

    let json = match serde_json::to_string_pretty(&result) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("WRITE_ERROR:{}", e);
            return ExitCode::from(2);
        }
    };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", json) {
        eprintln!("WRITE_ERROR:{}", e);
        return ExitCode::from(2);
    }

    if result.items.iter().any(|i| i.max_severity() == Severity::Error) {
        return ExitCode::from(3);
    }
    ExitCode::SUCCESS
}
