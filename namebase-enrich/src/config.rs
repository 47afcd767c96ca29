//! Configuration resolution for namebase-enrich
//!
//! Oracle API key resolution with ENV → TOML priority, and enrichment
//! tunables resolved CLI → TOML → default.

use crate::enrich::EnrichOptions;
use namebase_common::config::TomlConfig;
use namebase_common::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the oracle API key
pub const API_KEY_ENV: &str = "NAMEBASE_OPENAI_API_KEY";

/// Resolve the oracle API key.
///
/// **Priority:** environment variable → TOML config. A key present in both
/// places gets a warning, since that usually means a stale config file.
pub fn resolve_oracle_api_key(toml_config: Option<&TomlConfig>) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .and_then(|c| c.openai_api_key.clone())
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "Oracle API key found in both environment and TOML config. \
             Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("Oracle API key loaded from environment variable");
        return Ok(key);
    }
    if let Some(key) = toml_key {
        info!("Oracle API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "Oracle API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: ~/.config/namebase/config.toml (openai_api_key = \"your-key\")",
        API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Build orchestrator options with CLI → TOML → default priority.
pub fn resolve_enrich_options(
    toml_config: Option<&TomlConfig>,
    batch_size: Option<usize>,
    concurrency: Option<usize>,
    max_hours: Option<f64>,
    quality_gate: bool,
) -> EnrichOptions {
    let defaults = EnrichOptions::default();
    let section = toml_config.map(|c| &c.enrichment);

    EnrichOptions {
        batch_size: batch_size
            .or(section.and_then(|s| s.batch_size))
            .unwrap_or(defaults.batch_size)
            .max(1),
        concurrency: concurrency
            .or(section.and_then(|s| s.concurrency))
            .unwrap_or(defaults.concurrency)
            .max(1),
        dispatch_delay: section
            .and_then(|s| s.dispatch_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(defaults.dispatch_delay),
        max_attempts: section
            .and_then(|s| s.max_attempts)
            .unwrap_or(defaults.max_attempts)
            .max(1),
        max_duration: max_hours.map(|h| Duration::from_secs_f64(h * 3600.0)),
        quality_gate,
        ..defaults
    }
}
