//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.tollgate/config.toml` (user)
//! 3. Merge the explicit file, if one was given
//! 4. Apply env var fallbacks for fields no file set
//! 5. Deserialize merged tree → `Config`
//! 6. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{self, ConfigLayer, FieldSources};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration plus where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Which layer set each field, keyed by dotted path.
    pub field_sources: FieldSources,
    /// Files that were found and merged, in load order.
    pub loaded_files: Vec<String>,
}

/// Load configuration with layered precedence, reading the process
/// environment for fallbacks.
///
/// `home_override` names the Tollgate home directory itself (the directory
/// holding `config.toml`), bypassing `~/.tollgate`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with_env(explicit, home_override, &collect_env_vars())
}

/// [`load`] with an explicit environment map.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    explicit: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::parse("<embedded defaults>", e))?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    merge::mark(&merged, ConfigLayer::Defaults, &mut field_sources);

    // 2. User config.
    let user_path = match home_override {
        Some(dir) => dir.join("config.toml"),
        None => home_directory()?.join(".tollgate").join("config.toml"),
    };
    if let Some(overlay) = try_load_file(&user_path)? {
        merge::overlay(&mut merged, &overlay, ConfigLayer::User, &mut field_sources);
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    // 3. Explicit file. Unlike the user file, it must exist.
    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| {
            ConfigError::read(path, std::io::Error::from(std::io::ErrorKind::NotFound))
        })?;
        merge::overlay(&mut merged, &overlay, ConfigLayer::Explicit, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded explicit config");
    }

    // 4. Env fallbacks.
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 5. Deserialize.
    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::parse("<merged config>", e))?;

    // 6. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let size = std::fs::metadata(path)
        .map_err(|e| ConfigError::read(path, e))?
        .len();
    check_size(path, size)?;

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| ConfigError::parse(path.display().to_string(), e))?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Single read, no separate exists/metadata check.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => return Err(ConfigError::read(path, e)),
    };
    check_size(path, u64::try_from(content.len()).unwrap_or(u64::MAX))?;

    let value: toml::Value = toml::from_str(&content)
        .map_err(|e| ConfigError::parse(path.display().to_string(), e))?;

    Ok(Some(value))
}

fn check_size(path: &Path, size: u64) -> ConfigResult<()> {
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.display().to_string(),
            size,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }
    Ok(())
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
