//! Configuration resolution for inspo-curator
//!
//! Resolves the generative model credential and the media source from the
//! bootstrap TOML plus environment.
//!
//! **Credential priority:** ENV → TOML. A key entered at runtime through the
//! settings endpoint replaces whichever was resolved at startup (memory only).

use inspo_common::config::TomlConfig;
use inspo_common::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::media_source::{FsMediaSource, HttpMediaSource, MediaSource};

/// Environment variable holding the generative model API key
pub const API_KEY_ENV_VAR: &str = "INSPO_GEMINI_API_KEY";

/// Directory clips are read from when nothing else is configured
pub const DEFAULT_MEDIA_DIR: &str = "audio";

/// Where the active credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Environment,
    Toml,
    /// Entered through the settings endpoint
    Runtime,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeySource::Environment => "environment",
            KeySource::Toml => "TOML",
            KeySource::Runtime => "runtime",
        };
        f.write_str(name)
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the API key from ENV then TOML
///
/// Returns `None` when no valid key is configured; callers surface that as a
/// configuration error instead of attempting any request.
pub fn resolve_gemini_api_key(toml_config: &TomlConfig) -> Option<(String, KeySource)> {
    let env_key = std::env::var(API_KEY_ENV_VAR)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .gemini_api_key
        .as_ref()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "Gemini API key found in both environment and TOML. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("Gemini API key loaded from environment variable");
        return Some((key.trim().to_string(), KeySource::Environment));
    }

    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Some((key.trim().to_string(), KeySource::Toml));
    }

    warn!(
        "Gemini API key not configured. Set {} or gemini_api_key in the TOML config, \
         or POST it to /settings/api_key",
        API_KEY_ENV_VAR
    );
    None
}

/// Build the clip source
///
/// **Priority:** CLI media dir → TOML `media_dir` → TOML `media_base_url` →
/// `./audio`
pub fn build_media_source(
    toml_config: &TomlConfig,
    cli_media_dir: Option<&Path>,
) -> Result<Arc<dyn MediaSource>> {
    if let Some(dir) = cli_media_dir.map(Path::to_path_buf).or_else(|| toml_config.media_dir.clone()) {
        return Ok(Arc::new(fs_source(dir)));
    }

    if let Some(base_url) = &toml_config.media_base_url {
        info!("Fetching clips from {}", base_url);
        let source = HttpMediaSource::new(base_url.clone())
            .map_err(|e| Error::Config(format!("media_base_url {}: {}", base_url, e)))?;
        return Ok(Arc::new(source));
    }

    Ok(Arc::new(fs_source(PathBuf::from(DEFAULT_MEDIA_DIR))))
}

fn fs_source(dir: PathBuf) -> FsMediaSource {
    if !dir.is_dir() {
        warn!("Media directory {} does not exist; every clip will fail to load", dir.display());
    } else {
        info!("Reading clips from {}", dir.display());
    }
    FsMediaSource::new(dir)
}
