// Draft sheet importer entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not the terminal -- the terminal is
//    the operator's prompt channel)
// 2. Parse the command line
// 3. Load config
// 4. Open database, load the correction table if configured
// 5. Dispatch: batch directory / single file / stdin
// 6. Report the summary; exit non-zero if any sheet failed

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use tracing::info;

use draft_import::batch::{self, BatchSummary};
use draft_import::config;
use draft_import::db::Database;
use draft_import::importer::ImportOutcome;
use draft_import::resolve::ConsoleResolver;
use draft_import::roster::corrections::CorrectionTable;
use draft_import::sheet::SheetFormat;

const USAGE: &str = "\
Usage:
  draft-import batch <dir>   [--dry-run]   import every sheet file in <dir>
  draft-import sheet <file>  [--dry-run]   import one free-form sheet file
  draft-import stdin         [--dry-run]   read one free-form sheet from stdin
";

/// What the command line asked for.
enum Mode {
    Batch(PathBuf),
    Sheet(PathBuf),
    Stdin,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    // 1. Initialize tracing (log to file, not the terminal)
    init_tracing()?;
    info!("draft importer starting up");

    // 2. Parse the command line
    let args: Vec<String> = std::env::args().skip(1).collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let mode = match positional.as_slice() {
        [cmd, dir] if *cmd == "batch" => Mode::Batch(PathBuf::from(dir)),
        [cmd, file] if *cmd == "sheet" => Mode::Sheet(PathBuf::from(file)),
        [cmd] if *cmd == "stdin" => Mode::Stdin,
        _ => {
            eprint!("{USAGE}");
            return Ok(ExitCode::FAILURE);
        }
    };

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        db = %config.db_path,
        player_rows = config.player_rows,
        division_band = config.division_band,
        "config loaded"
    );

    // 4. Open database and the correction table
    let db = Database::open(&config.db_path).context("failed to open database")?;
    let corrections = match &config.corrections_path {
        Some(path) => {
            let table = CorrectionTable::load(Path::new(path))
                .with_context(|| format!("failed to load correction table {path}"))?;
            info!(path = %path, entries = table.len(), "correction table loaded");
            table
        }
        None => CorrectionTable::default(),
    };

    let mut resolver = ConsoleResolver::stdio(config.max_attempts);

    // 5. Dispatch
    let summary = match mode {
        Mode::Batch(dir) => batch::run_batch(
            &db,
            &config,
            &corrections,
            &mut resolver,
            &dir,
            dry_run,
        )?,
        Mode::Sheet(file) => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let source = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            single_summary(batch::run_single(
                &db,
                &config,
                &corrections,
                &mut resolver,
                &raw,
                SheetFormat::FreeForm,
                &source,
                dry_run,
            ))
        }
        Mode::Stdin => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read stdin")?;
            single_summary(batch::run_single(
                &db,
                &config,
                &corrections,
                &mut resolver,
                &raw,
                SheetFormat::FreeForm,
                "<stdin>",
                dry_run,
            ))
        }
    };

    // 6. Report
    println!(
        "{} sheet(s): {} committed, {} skipped, {} failed",
        summary.total(),
        summary.committed,
        summary.skipped,
        summary.failed
    );
    if summary.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Fold a single-sheet outcome into the same summary shape batch mode uses.
fn single_summary(
    outcome: Result<ImportOutcome, draft_import::importer::ImportError>,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    match outcome {
        Ok(ImportOutcome::Committed(_)) => summary.committed = 1,
        Ok(ImportOutcome::DryRun { teams }) => {
            summary.skipped = 1;
            match serde_json::to_string_pretty(&teams) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("failed to render dry-run output: {e}"),
            }
        }
        Ok(ImportOutcome::Declined) => summary.skipped = 1,
        Err(e) => {
            summary.failed = 1;
            eprintln!("{e}");
        }
    }
    summary
}

/// Initialize tracing to log to a file (not the terminal, which carries the
/// operator prompts).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draft-import.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draft_import=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
