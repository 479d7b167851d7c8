// Known-misspelling correction table.
//
// Legacy sheets repeat the same hand-typed misspellings across many seasons'
// files. Rather than prompting an operator for each one every import, a
// two-column tab-delimited file maps the bad "Last, First" to the good one.
// The table is loaded once at startup and passed into the matcher
// explicitly; there is no module-level state.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::sheet::name::{parse_name, ParsedName};

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("failed to read corrections file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in corrections file {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// Case-insensitive map from a misspelled name to its correction. Keys are
/// normalized "last, first" strings.
#[derive(Debug, Clone, Default)]
pub struct CorrectionTable {
    entries: HashMap<String, ParsedName>,
}

impl CorrectionTable {
    fn key(first_name: &str, last_name: &str) -> String {
        format!(
            "{}, {}",
            last_name.trim().to_lowercase(),
            first_name.trim().to_lowercase()
        )
    }

    /// Register a correction. Later inserts for the same misspelling win.
    pub fn insert(&mut self, wrong: ParsedName, good: ParsedName) {
        self.entries
            .insert(Self::key(&wrong.first_name, &wrong.last_name), good);
    }

    /// Look up a correction for a parsed name. `None` means the name is not
    /// a known misspelling.
    pub fn lookup(&self, first_name: &str, last_name: &str) -> Option<&ParsedName> {
        self.entries.get(&Self::key(first_name, last_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a correction table from a two-column tab-delimited file. Each
    /// row is `wrong<TAB>good`, both sides in "Last, First" form. Rows with
    /// fewer than two columns are skipped with a warning rather than failing
    /// the load, matching how the rest of the pipeline treats hand-typed
    /// input.
    pub fn load(path: &Path) -> Result<Self, CorrectionError> {
        let display = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|e| CorrectionError::Io {
            path: display.clone(),
            source: e,
        })?;
        Self::load_from_reader(file, &display).map_err(|e| CorrectionError::Csv {
            path: display,
            source: e,
        })
    }

    fn load_from_reader<R: std::io::Read>(rdr: R, origin: &str) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(rdr);

        let mut table = CorrectionTable::default();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let wrong = record.get(0).unwrap_or("").trim();
            let good = record.get(1).unwrap_or("").trim();
            if wrong.is_empty() || good.is_empty() {
                warn!(file = %origin, line = line + 1, "skipping incomplete correction row");
                continue;
            }
            table.insert(parse_name(wrong), parse_name(good));
        }
        Ok(table)
    }
}
