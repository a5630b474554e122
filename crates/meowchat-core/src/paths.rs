//! Filesystem locations

use std::path::PathBuf;

use crate::constants;

/// Root config directory (`~/.meowchat`), falling back to the working directory
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(constants::ui::CONFIG_DIR_NAME)
}

/// Optional TOML config file
pub fn config_file() -> PathBuf {
    config_dir().join(constants::ui::CONFIG_FILE_NAME)
}

/// Cross-session preference database
pub fn database_file() -> PathBuf {
    config_dir().join(constants::ui::DATABASE_FILE_NAME)
}

/// Log directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Directory for tab-lifetime scratch files
pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(constants::ui::SCRATCH_DIR_NAME)
}
