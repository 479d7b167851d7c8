// Configuration loading and parsing (config/import.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path. Falls back to the platform data directory when
    /// `database.path` is omitted.
    pub db_path: String,
    /// Number of player rows beneath the captain row in batch sheets.
    pub player_rows: usize,
    /// Overall-pick band width reserved per division level.
    pub division_band: u32,
    /// Optional known-misspelling table, loaded at startup when present.
    pub corrections_path: Option<String>,
    /// Bound on operator re-prompt loops.
    pub max_attempts: u32,
}

// ---------------------------------------------------------------------------
// import.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire import.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ImportFile {
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    sheets: SheetsSection,
    #[serde(default)]
    draft: DraftSection,
    #[serde(default)]
    corrections: CorrectionsSection,
    #[serde(default)]
    prompts: PromptsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SheetsSection {
    player_rows: usize,
}

impl Default for SheetsSection {
    fn default() -> Self {
        SheetsSection {
            player_rows: crate::sheet::parser::DEFAULT_PLAYER_ROWS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DraftSection {
    division_band: u32,
}

impl Default for DraftSection {
    fn default() -> Self {
        DraftSection {
            division_band: crate::draft::pick::DEFAULT_DIVISION_BAND,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CorrectionsSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PromptsSection {
    max_attempts: u32,
}

impl Default for PromptsSection {
    fn default() -> Self {
        PromptsSection {
            max_attempts: crate::resolve::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/import.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization
/// automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let import_path = base_dir.join("config").join("import.toml");
    let text = read_file(&import_path)?;
    let file: ImportFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: import_path.clone(),
        source: e,
    })?;

    let db_path = match file.database.path {
        Some(path) => path,
        None => default_db_path()?,
    };

    let config = Config {
        db_path,
        player_rows: file.sheets.player_rows,
        division_band: file.draft.division_band,
        corrections_path: file.corrections.path,
        max_attempts: file.prompts.max_attempts,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory. Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Platform data directory fallback for the database, used when
/// `database.path` is not set.
fn default_db_path() -> Result<String, ConfigError> {
    let dirs = directories::ProjectDirs::from("", "", "draft-import").ok_or_else(|| {
        ConfigError::ValidationError {
            field: "database.path".into(),
            message: "not set and no platform data directory available".into(),
        }
    })?;
    let dir = dirs.data_dir();
    std::fs::create_dir_all(dir).map_err(|e| ConfigError::ValidationError {
        field: "database.path".into(),
        message: format!("failed to create data directory {}: {e}", dir.display()),
    })?;
    Ok(dir.join("league.db").to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.player_rows == 0 {
        return Err(ConfigError::ValidationError {
            field: "sheets.player_rows".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.division_band == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.division_band".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.max_attempts == 0 {
        return Err(ConfigError::ValidationError {
            field: "prompts.max_attempts".into(),
            message: "must be greater than 0".into(),
        });
    }

    if let Some(path) = &config.corrections_path {
        if path.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: "corrections.path".into(),
                message: "must not be blank; omit the key to disable corrections".into(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Result<Config, ConfigError> {
        let file: ImportFile = toml::from_str(toml_text).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<test>"),
            source: e,
        })?;
        let config = Config {
            db_path: file.database.path.unwrap_or_else(|| ":memory:".into()),
            player_rows: file.sheets.player_rows,
            division_band: file.draft.division_band,
            corrections_path: file.corrections.path,
            max_attempts: file.prompts.max_attempts,
        };
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn full_config_parses() {
        let config = parse(
            r#"
            [database]
            path = "data/league.db"

            [sheets]
            player_rows = 8

            [draft]
            division_band = 50

            [corrections]
            path = "config/corrections.tsv"

            [prompts]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, "data/league.db");
        assert_eq!(config.player_rows, 8);
        assert_eq!(config.division_band, 50);
        assert_eq!(config.corrections_path.as_deref(), Some("config/corrections.tsv"));
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.player_rows, crate::sheet::parser::DEFAULT_PLAYER_ROWS);
        assert_eq!(config.division_band, crate::draft::pick::DEFAULT_DIVISION_BAND);
        assert_eq!(config.max_attempts, crate::resolve::DEFAULT_MAX_ATTEMPTS);
        assert!(config.corrections_path.is_none());
    }

    #[test]
    fn zero_player_rows_rejected() {
        let err = parse("[sheets]\nplayer_rows = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { field, .. } if field == "sheets.player_rows"));
    }

    #[test]
    fn zero_band_rejected() {
        let err = parse("[draft]\ndivision_band = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { field, .. } if field == "draft.division_band"));
    }

    #[test]
    fn blank_corrections_path_rejected() {
        let err = parse("[corrections]\npath = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { field, .. } if field == "corrections.path"));
    }

    #[test]
    fn load_config_from_reads_file() {
        let dir = std::env::temp_dir().join(format!("import_config_test_{}", std::process::id()));
        std::fs::create_dir_all(dir.join("config")).unwrap();
        std::fs::write(
            dir.join("config").join("import.toml"),
            "[database]\npath = \":memory:\"\n[prompts]\nmax_attempts = 3\n",
        )
        .unwrap();

        let config = load_config_from(&dir).unwrap();
        assert_eq!(config.db_path, ":memory:");
        assert_eq!(config.max_attempts, 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("import_config_missing_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(matches!(
            load_config_from(&dir),
            Err(ConfigError::FileNotFound { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn ensure_config_copies_defaults_once() {
        let dir = std::env::temp_dir().join(format!("import_defaults_test_{}", std::process::id()));
        std::fs::create_dir_all(dir.join("defaults")).unwrap();
        std::fs::write(dir.join("defaults").join("import.toml"), "[database]\n").unwrap();
        std::fs::write(dir.join("defaults").join("sample.example"), "skip me").unwrap();

        let copied = ensure_config_files(&dir).unwrap();
        assert_eq!(copied.len(), 1);
        assert!(dir.join("config").join("import.toml").exists());
        assert!(!dir.join("config").join("sample.example").exists());

        // Second run: nothing to copy.
        let copied = ensure_config_files(&dir).unwrap();
        assert!(copied.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
