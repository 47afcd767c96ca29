//! Configuration loading and data directory resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// TOML configuration file contents (`~/.config/namebase/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding `names-index.json` and the shard files
    pub data_dir: Option<String>,
    /// API key for the enrichment oracle
    pub openai_api_key: Option<String>,
    /// Enrichment tunables
    #[serde(default)]
    pub enrichment: EnrichmentSection,
}

/// `[enrichment]` section of the TOML config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentSection {
    /// Names per oracle call
    pub batch_size: Option<usize>,
    /// Concurrent in-flight oracle calls
    pub concurrency: Option<usize>,
    /// Minimum delay between batch dispatches, milliseconds
    pub dispatch_delay_ms: Option<u64>,
    /// Attempts per batch before giving up
    pub max_attempts: Option<u32>,
}

/// Load the TOML config file if one exists at a platform config path.
///
/// Returns `Ok(None)` when no config file is present; a present but
/// unparseable file is a configuration error, not a silent default.
pub fn load_toml_config() -> Result<Option<TomlConfig>> {
    let Some(path) = config_file_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "Loaded TOML config");
    Ok(Some(config))
}

/// Platform config file location (`<config dir>/namebase/config.toml`)
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("namebase").join("config.toml"))
}

/// Data directory resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. `NAMEBASE_DATA_DIR` environment variable
/// 3. TOML config file `data_dir` key
/// 4. OS-dependent default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&Path>, toml_config: Option<&TomlConfig>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("NAMEBASE_DATA_DIR") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(dir) = toml_config.and_then(|c| c.data_dir.as_deref()) {
        return PathBuf::from(dir);
    }

    // Priority 4: OS-dependent default
    default_data_dir()
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("namebase"))
        .unwrap_or_else(|| PathBuf::from("./namebase_data"))
}
