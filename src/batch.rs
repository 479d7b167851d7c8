// Batch mode: run a directory of sheet files through the importer, one at
// a time. Each file commits (or fails) independently; after a failure the
// operator decides whether the rest of the batch still runs.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::importer::{import_sheet, ImportError, ImportOutcome};
use crate::resolve::Resolver;
use crate::roster::corrections::CorrectionTable;
use crate::sheet::parser::parse_sheet;
use crate::sheet::SheetFormat;

/// Per-file tallies for the end-of-batch report.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub committed: usize,
    /// Dry-run or operator-declined sheets: parsed and resolved fine,
    /// nothing written.
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.committed + self.skipped + self.failed
    }
}

/// Parse and import a single sheet given as raw text.
pub fn run_single(
    db: &Database,
    config: &Config,
    corrections: &CorrectionTable,
    resolver: &mut dyn Resolver,
    raw: &str,
    format: SheetFormat,
    source_name: &str,
    dry_run: bool,
) -> Result<ImportOutcome, ImportError> {
    let sheet = parse_sheet(raw, format, source_name, config.player_rows)?;
    import_sheet(db, &sheet, corrections, resolver, config, dry_run)
}

/// Process every regular file in `dir` as a batch sheet, in filename order.
///
/// A failed sheet never corrupts an already-committed one -- each commit is
/// its own transaction -- so the only batch-level decision is whether to
/// keep going after an error.
pub fn run_batch(
    db: &Database,
    config: &Config,
    corrections: &CorrectionTable,
    resolver: &mut dyn Resolver,
    dir: &Path,
    dry_run: bool,
) -> Result<BatchSummary> {
    let run_id = chrono::Utc::now().format("batch_%Y%m%d_%H%M%S").to_string();
    info!(run = %run_id, dir = %dir.display(), dry_run, "starting batch import");

    let mut names: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read sheet directory {}", dir.display()))?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if !entry.path().is_file() {
                return None;
            }
            entry.file_name().to_str().map(str::to_string)
        })
        .collect();
    names.sort();

    let mut summary = BatchSummary::default();

    for name in names {
        let path = dir.join(&name);
        let outcome = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))
            .map_err(ImportError::Db)
            .and_then(|raw| {
                run_single(
                    db,
                    config,
                    corrections,
                    resolver,
                    &raw,
                    SheetFormat::FixedCsv,
                    &name,
                    dry_run,
                )
            });

        match outcome {
            Ok(ImportOutcome::Committed(commit)) => {
                summary.committed += 1;
                info!(
                    run = %run_id,
                    sheet = %name,
                    teams = commit.team_ids.len(),
                    picks = commit.pick_count,
                    "committed"
                );
            }
            Ok(ImportOutcome::DryRun { teams }) => {
                summary.skipped += 1;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&teams)
                        .context("failed to render dry-run output")?
                );
            }
            Ok(ImportOutcome::Declined) => {
                summary.skipped += 1;
                warn!(run = %run_id, sheet = %name, "skipped (operator declined)");
            }
            Err(e) => {
                summary.failed += 1;
                error!(run = %run_id, sheet = %name, error = %e, "sheet failed");
                eprintln!("{name}: {e}");
                let keep_going = resolver
                    .confirm("Continue with the remaining files?")
                    .unwrap_or(false);
                if !keep_going {
                    warn!(run = %run_id, "batch aborted by operator");
                    break;
                }
            }
        }
    }

    info!(
        run = %run_id,
        committed = summary.committed,
        skipped = summary.skipped,
        failed = summary.failed,
        "batch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ScriptedResolver;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            db_path: ":memory:".into(),
            player_rows: 8,
            division_band: 50,
            corrections_path: None,
            max_attempts: 3,
        }
    }

    /// Seed a database whose roster covers the fixture sheets below.
    fn seeded_db() -> Database {
        let db = Database::open(":memory:").unwrap();
        db.add_season("fall", 2012).unwrap();
        db.add_division("Rec", 1).unwrap();
        for (first, last) in [
            ("Alice", "Adams"),
            ("Ben", "Baker"),
            ("Cara", "Clark"),
            ("Dana", "Davis"),
            ("Eve", "Evans"),
            ("Finn", "Frost"),
            ("Gina", "Gold"),
            ("Hank", "Hill"),
        ] {
            db.add_user(first, last, None).unwrap();
        }
        db
    }

    const GOOD_SHEET: &str = "\
1,2,3,4
Adams,Baker,Clark,Davis
Eve Evans,Finn Frost,Gina Gold,Hank Hill
";

    fn temp_sheet_dir(tag: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("batch_test_{}_{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn batch_commits_good_sheets() {
        let db = seeded_db();
        let config = test_config();
        let dir = temp_sheet_dir("good", &[("F12Rec.csv", GOOD_SHEET)]);
        let mut resolver = ScriptedResolver::default();

        let summary = run_batch(
            &db,
            &config,
            &CorrectionTable::default(),
            &mut resolver,
            &dir,
            false,
        )
        .unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                committed: 1,
                skipped: 0,
                failed: 0
            }
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_filename_fails_but_batch_continues() {
        let db = seeded_db();
        let config = test_config();
        // "A00Bogus" has an unknown season code; sorts before the good file.
        let dir = temp_sheet_dir(
            "mixed",
            &[("A00Bogus.csv", GOOD_SHEET), ("F12Rec.csv", GOOD_SHEET)],
        );
        // Confirmations: continue after failure, then commit the good sheet.
        let mut resolver = ScriptedResolver::default();
        resolver.confirmations.extend([true, true]);

        let summary = run_batch(
            &db,
            &config,
            &CorrectionTable::default(),
            &mut resolver,
            &dir,
            false,
        )
        .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.committed, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn operator_can_abort_after_failure() {
        let db = seeded_db();
        let config = test_config();
        let dir = temp_sheet_dir(
            "abort",
            &[("A00Bogus.csv", GOOD_SHEET), ("F12Rec.csv", GOOD_SHEET)],
        );
        // Decline the continue prompt: the good sheet is never reached.
        let mut resolver = ScriptedResolver::default();
        resolver.confirmations.push_back(false);

        let summary = run_batch(
            &db,
            &config,
            &CorrectionTable::default(),
            &mut resolver,
            &dir,
            false,
        )
        .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.committed, 0);
        assert_eq!(summary.total(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn dry_run_commits_nothing() {
        let db = seeded_db();
        let config = test_config();
        let dir = temp_sheet_dir("dry", &[("F12Rec.csv", GOOD_SHEET)]);
        let mut resolver = ScriptedResolver::default();

        let summary = run_batch(
            &db,
            &config,
            &CorrectionTable::default(),
            &mut resolver,
            &dir,
            true,
        )
        .unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.committed, 0);

        // Nothing was written: a real run of the same sheet still succeeds
        // (a dry-run insert would have tripped the team_number uniqueness).
        let mut resolver = ScriptedResolver::default();
        let summary = run_batch(
            &db,
            &config,
            &CorrectionTable::default(),
            &mut resolver,
            &dir,
            false,
        )
        .unwrap();
        assert_eq!(summary.committed, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_division_is_a_per_sheet_failure() {
        let db = seeded_db();
        let config = test_config();
        let dir = temp_sheet_dir("refdata", &[("F12Comp.csv", GOOD_SHEET)]);
        let mut resolver = ScriptedResolver::default();
        resolver.confirmations.push_back(true);

        let summary = run_batch(
            &db,
            &config,
            &CorrectionTable::default(),
            &mut resolver,
            &dir,
            false,
        )
        .unwrap();
        assert_eq!(summary.failed, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
