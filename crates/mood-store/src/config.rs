//! Data directory resolution and `config.toml` loading.

use std::path::{Path, PathBuf};
use std::{env, fs};

use mood_core::{ConfigError, EngineConfig};

use crate::error::Result;

pub const CONFIG_FILE: &str = "config.toml";
pub const DATABASE_FILE: &str = "mood.db";

/// `~/.mood-engine`, falling back to the working directory without a home.
pub fn default_base_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".mood-engine")
}

/// `MOOD_DATA_DIR` if set, else [`default_base_dir`].
pub fn resolve_base_dir() -> PathBuf {
    env::var("MOOD_DATA_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_base_dir)
}

/// Create `dir` if needed and return the database path inside it.
pub fn prepare_data_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    Ok(dir.join(DATABASE_FILE))
}

/// Read `<dir>/config.toml`. A missing file yields the defaults; a present
/// file must parse and validate.
pub fn load_config(dir: &Path) -> Result<EngineConfig> {
    let path = dir.join(CONFIG_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(EngineConfig::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config = parse_config(&content)?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}

pub fn parse_config(content: &str) -> std::result::Result<EngineConfig, ConfigError> {
    let config: EngineConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
