// src/core/paths.rs

use crate::{
    constants::{ALIAS_DIR_NAME, ALIAS_PATH_ENV_VAR, SETTINGS_FILENAME},
    models::SettingsConfig,
};
use lazy_static::lazy_static;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref SITERUN_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read settings file '{path}': {source}")]
    SettingsRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings file '{path}': {source}")]
    SettingsParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Returns the path to the siterun configuration directory (`~/.config/siterun`).
/// Creates it if it doesn't exist.
///
/// This function is memoized: the first call computes and caches the path,
/// subsequent calls return the cached value instantly.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = SITERUN_CONFIG_DIR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join("siterun");

    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|e| PathError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source: e,
        })?;
    }

    *cached_path_guard = Some(config_path.clone());

    Ok(config_path)
}

/// Loads `settings.toml` from the config directory. A missing file is not an
/// error; it simply yields the defaults.
pub fn load_settings() -> Result<SettingsConfig, PathError> {
    let settings_path = get_config_dir()?.join(SETTINGS_FILENAME);
    if !settings_path.exists() {
        return Ok(SettingsConfig::default());
    }

    let content = fs::read_to_string(&settings_path).map_err(|e| PathError::SettingsRead {
        path: settings_path.display().to_string(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| PathError::SettingsParse {
        path: settings_path.display().to_string(),
        source: e,
    })
}

/// Assembles the ordered list of directories scanned for alias files:
/// the config dir's `aliases/` subdirectory first, then directories from
/// `settings.toml`, then entries from the alias-path environment variable.
/// `~` and environment variables in configured entries are expanded.
/// Directories that do not exist are kept out of the list.
pub fn alias_directories(settings: &SettingsConfig) -> Result<Vec<PathBuf>, PathError> {
    let mut dirs_out = Vec::new();

    let builtin = get_config_dir()?.join(ALIAS_DIR_NAME);
    if builtin.is_dir() {
        dirs_out.push(builtin);
    }

    for raw in &settings.alias_dirs {
        match shellexpand::full(raw) {
            Ok(expanded) => {
                let path = PathBuf::from(expanded.into_owned());
                if path.is_dir() {
                    dirs_out.push(path);
                } else {
                    log::debug!("Configured alias directory '{}' does not exist.", raw);
                }
            }
            Err(e) => {
                log::warn!("Could not expand alias directory '{}': {}", raw, e);
            }
        }
    }

    if let Ok(env_paths) = env::var(ALIAS_PATH_ENV_VAR) {
        for path in env::split_paths(&env_paths) {
            if path.is_dir() {
                dirs_out.push(path);
            }
        }
    }

    Ok(dirs_out)
}
