use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for shelfmark.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (SHELF_* prefix)
/// 3. Config file (~/.config/shelfmark/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite catalog database.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/catalog.db
    /// - ENV: SHELF_DATABASE_PATH
    /// - Config: database_path = "/path/to/catalog.db"
    /// - Default: ~/.local/share/shelfmark/catalog.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// How long a write waits on a locked database before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default)]
    pub logging: twyg::Opts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `config_path` (if it exists) and environment
    /// variables with the SHELF_ prefix.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .with_context(|| format!("Failed to load config file {}", config_path.display()))?;
        }

        let env_opts = env::Options::with_top_level("shelf");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;
        log::debug!("Loaded configuration: {config:?}");
        Ok(config)
    }

    /// Load configuration, overriding the database path when `--db` was given.
    pub fn load_with_db_path(db_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load()?;
        if let Some(db_path) = db_path {
            config.database_path = db_path;
        }
        Ok(config)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Returns: ~/.local/share/shelfmark/catalog.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelfmark")
        .join("catalog.db")
}

const fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/shelfmark/config.toml
/// - macOS: ~/Library/Application Support/shelfmark/config.toml
/// - Windows: %APPDATA%\shelfmark\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelfmark")
        .join("config.toml")
}

pub fn example_config() -> &'static str {
    r#"# Shelfmark Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (SHELF_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite catalog database
#
# Can also be set via:
# - CLI: shelfmark --db /custom/catalog.db migrate status
# - Environment: SHELF_DATABASE_PATH=/custom/catalog.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/catalog.db"

# Milliseconds a write waits for a locked database before it is retried
busy_timeout_ms = 5000

# Logging (see the twyg crate for all options)
#[logging]
#coloured = true
#level = "info"
"#
}

/// Create the config file from the example if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
