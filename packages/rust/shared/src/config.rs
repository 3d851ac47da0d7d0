//! Application configuration for quizbank.
//!
//! User config lives at `~/.quizbank/quizbank.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QuizBankError, Result};
use crate::types::ImportDiscipline;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "quizbank.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".quizbank";

// ---------------------------------------------------------------------------
// Config structs (matching quizbank.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Question-bank import settings.
    #[serde(default)]
    pub import: ImportSection,

    /// Database settings.
    #[serde(default)]
    pub storage: StorageSection,
}

/// `[import]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSection {
    /// Directory holding one subdirectory per chapter.
    #[serde(default = "default_root_dir")]
    pub root_dir: String,

    /// Public prefix prepended to asset paths handed to clients.
    #[serde(default = "default_public_asset_root")]
    pub public_asset_root: String,

    /// Name of the per-chapter image directory (matched case-insensitively).
    #[serde(default = "default_asset_dir_name")]
    pub asset_dir_name: String,

    /// `.txt` files that are never treated as questions.
    #[serde(default = "default_excluded_files")]
    pub excluded_files: Vec<String>,

    /// Re-import discipline applied to every chapter.
    #[serde(default)]
    pub discipline: ImportDiscipline,

    /// Time limit bounds.
    #[serde(default)]
    pub time_limit: TimeLimitConfig,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            public_asset_root: default_public_asset_root(),
            asset_dir_name: default_asset_dir_name(),
            excluded_files: default_excluded_files(),
            discipline: ImportDiscipline::default(),
            time_limit: TimeLimitConfig::default(),
        }
    }
}

fn default_root_dir() -> String {
    "content/questions".into()
}
fn default_public_asset_root() -> String {
    "questions".into()
}
fn default_asset_dir_name() -> String {
    "Images".into()
}
fn default_excluded_files() -> Vec<String> {
    vec!["wrong.txt".into()]
}

/// `[import.time_limit]` section, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLimitConfig {
    /// Used when a file has no (or an unparsable) `time=` directive.
    #[serde(default = "default_time_limit")]
    pub default: u32,

    #[serde(default = "default_min_time_limit")]
    pub min: u32,

    #[serde(default = "default_max_time_limit")]
    pub max: u32,
}

impl Default for TimeLimitConfig {
    fn default() -> Self {
        Self {
            default: default_time_limit(),
            min: default_min_time_limit(),
            max: default_max_time_limit(),
        }
    }
}

fn default_time_limit() -> u32 {
    30
}
fn default_min_time_limit() -> u32 {
    5
}
fn default_max_time_limit() -> u32 {
    300
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    /// Path to the libSQL database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "var/quizbank.db".into()
}

impl AppConfig {
    /// Reject settings the importer cannot work with.
    pub fn validate(&self) -> Result<()> {
        let limits = &self.import.time_limit;
        if limits.min == 0 {
            return Err(QuizBankError::config("import.time_limit.min must be positive"));
        }
        if limits.min > limits.max {
            return Err(QuizBankError::config(format!(
                "import.time_limit.min ({}) exceeds max ({})",
                limits.min, limits.max
            )));
        }
        if !(limits.min..=limits.max).contains(&limits.default) {
            return Err(QuizBankError::config(format!(
                "import.time_limit.default ({}) is outside [{}, {}]",
                limits.default, limits.min, limits.max
            )));
        }
        let dir = self.import.asset_dir_name.trim();
        if dir.is_empty() || dir.contains(['/', '\\']) || dir == ".." {
            return Err(QuizBankError::config(format!(
                "import.asset_dir_name '{dir}' must be a single directory name"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Import config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime import configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Directory holding chapter subdirectories.
    pub root_dir: PathBuf,
    /// Public prefix for asset paths.
    pub public_asset_root: String,
    /// Per-chapter image directory name.
    pub asset_dir_name: String,
    /// Lower-cased file names to ignore.
    pub excluded_files: Vec<String>,
    /// Re-import discipline for the whole run.
    pub discipline: ImportDiscipline,
    /// Time limit bounds handed to the parser.
    pub time_limit: TimeLimitConfig,
}

impl ImportConfig {
    /// Whether `file_name` is on the exclusion list.
    pub fn is_excluded(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.excluded_files.iter().any(|e| *e == lower)
    }
}

impl From<&AppConfig> for ImportConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            root_dir: PathBuf::from(&config.import.root_dir),
            public_asset_root: config.import.public_asset_root.clone(),
            asset_dir_name: config.import.asset_dir_name.clone(),
            excluded_files: config
                .import
                .excluded_files
                .iter()
                .map(|f| f.to_lowercase())
                .collect(),
            discipline: config.import.discipline,
            time_limit: config.import.time_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.quizbank/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| QuizBankError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.quizbank/quizbank.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| QuizBankError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        QuizBankError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| QuizBankError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| QuizBankError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| QuizBankError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
