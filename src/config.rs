use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const CONFIG_PATH_ENV: &str = "CHARACTER_BOT_CONFIG";
pub const DISCORD_TOKEN_ENV: &str = "DISCORD_TOKEN";

// Discord component limits
pub const MAX_SELECT_OPTIONS: usize = 25;
pub const MAX_CHARACTER_BUTTONS: usize = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("error parsing config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("no discord token, set `discord_token` or DISCORD_TOKEN")]
    MissingToken,
    #[error("storage backend `{0}` selected but its section is missing")]
    MissingBackendSection(&'static str),
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub discord_token: Option<String>,
    /// Register commands in this guild only, otherwise globally.
    #[serde(default)]
    pub guild_id: Option<u64>,
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    File,
    Sqlite,
    Sheets,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StorageConfig {
    pub backend: Backend,
    #[serde(default = "default_max_characters")]
    pub max_characters: usize,
    pub file: Option<FileStoreConfig>,
    pub sqlite: Option<SqliteStoreConfig>,
    pub sheets: Option<SheetsStoreConfig>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct FileStoreConfig {
    pub path: PathBuf,
    /// Copied to `path` on first start when `path` does not exist yet.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SqliteStoreConfig {
    pub path: PathBuf,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SheetsStoreConfig {
    pub spreadsheet_id: String,
    pub access_token: String,
    #[serde(default = "default_sheets_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub initial_characters: Vec<String>,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UiMode {
    /// One character select menu with prev/next buttons.
    #[default]
    Menu,
    /// Character select menu plus a page-jump select menu.
    PageSelect,
    /// Character buttons with prev, windowed page numbers and next.
    Buttons,
}

#[derive(Deserialize, Clone, Debug)]
pub struct UiConfig {
    #[serde(default)]
    pub mode: UiMode,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            mode: UiMode::default(),
            page_size: default_page_size(),
            window_size: default_window_size(),
        }
    }
}

impl UiConfig {
    /// Page size bounded by what a single message can hold in the configured mode.
    pub fn effective_page_size(&self) -> usize {
        let limit = match self.mode {
            UiMode::Menu | UiMode::PageSelect => MAX_SELECT_OPTIONS,
            UiMode::Buttons => MAX_CHARACTER_BUTTONS,
        };
        self.page_size.clamp(1, limit)
    }

    /// Prev + window + next must fit in one row of five buttons.
    pub fn effective_window_size(&self) -> usize {
        self.window_size.clamp(1, 3)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            level: default_log_level(),
        }
    }
}

fn default_max_characters() -> usize {
    25
}

fn default_sheets_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_page_size() -> usize {
    MAX_SELECT_OPTIONS
}

fn default_window_size() -> usize {
    3
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let mut file = File::open(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_yaml(&contents)
    }

    /// Reads the file named by `CHARACTER_BOT_CONFIG`, falling back to `config/config.yaml`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::read(&path)
    }

    /// The environment wins over the file.
    pub fn discord_token(&self) -> Result<String, ConfigError> {
        std::env::var(DISCORD_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .or_else(|| self.discord_token.clone().filter(|token| !token.is_empty()))
            .ok_or(ConfigError::MissingToken)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let storage = &self.storage;
        match storage.backend {
            Backend::File if storage.file.is_none() => Err(ConfigError::MissingBackendSection("file")),
            Backend::Sqlite if storage.sqlite.is_none() => Err(ConfigError::MissingBackendSection("sqlite")),
            Backend::Sheets if storage.sheets.is_none() => Err(ConfigError::MissingBackendSection("sheets")),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_config_uses_defaults() {
        let config = Config::from_yaml(
            "
storage:
  backend: file
  file:
    path: data/characters.json
",
        )
        .unwrap();

        assert_eq!(config.storage.backend, Backend::File);
        assert_eq!(config.storage.max_characters, 25);
        assert_eq!(config.ui.mode, UiMode::Menu);
        assert_eq!(config.ui.effective_page_size(), 25);
        assert_eq!(config.ui.effective_window_size(), 3);
        assert_eq!(config.logging.level, "info");
        assert!(config.guild_id.is_none());
    }

    #[test]
    fn full_sheets_config() {
        let config = Config::from_yaml(
            "
discord_token: abc
guild_id: 1090413253592612917
storage:
  backend: sheets
  max_characters: 40
  sheets:
    spreadsheet_id: sheet-1
    access_token: token
    initial_characters: [Ryu, Ken]
ui:
  mode: buttons
  page_size: 50
  window_size: 9
logging:
  directory: /var/log/bot
  level: debug
",
        )
        .unwrap();

        assert_eq!(config.guild_id, Some(1090413253592612917));
        assert_eq!(config.storage.max_characters, 40);
        let sheets = config.storage.sheets.as_ref().unwrap();
        assert_eq!(sheets.api_base, "https://sheets.googleapis.com");
        assert_eq!(sheets.initial_characters, vec!["Ryu", "Ken"]);
        assert_eq!(config.ui.mode, UiMode::Buttons);
        assert_eq!(config.ui.effective_page_size(), MAX_CHARACTER_BUTTONS);
        assert_eq!(config.ui.effective_window_size(), 3);
        assert_eq!(config.logging.directory, PathBuf::from("/var/log/bot"));
    }

    #[test]
    fn selected_backend_needs_its_section() {
        let result = Config::from_yaml(
            "
storage:
  backend: sqlite
  file:
    path: data/characters.json
",
        );
        assert!(matches!(result, Err(ConfigError::MissingBackendSection("sqlite"))));
    }

    #[test]
    fn unknown_ui_mode_fails_to_parse() {
        let result = Config::from_yaml(
            "
storage:
  backend: file
  file:
    path: x.json
ui:
  mode: carousel
",
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
