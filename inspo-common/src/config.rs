//! Bootstrap configuration loading
//!
//! The TOML file is read once at startup. Config file resolution follows this
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. OS-dependent config directory (`<config_dir>/inspo/<file_name>`)
//! 4. Built-in defaults (no file)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "INSPO_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the candidate audio clips
    #[serde(default)]
    pub media_dir: Option<PathBuf>,

    /// Base URL the clips are fetched from when no `media_dir` is set
    #[serde(default)]
    pub media_base_url: Option<String>,

    /// Clip identifiers making up the candidate pool
    #[serde(default = "default_clips")]
    pub clips: Vec<String>,

    /// Credential for the generative model API
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Pre-vetted prompts always mixed into the results
    #[serde(default)]
    pub popular: Vec<PopularEntry>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            media_dir: None,
            media_base_url: None,
            clips: default_clips(),
            gemini_api_key: None,
            logging: LoggingConfig::default(),
            pipeline: PipelineConfig::default(),
            popular: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// What the curation pipeline does when the moderation call itself fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerateErrorPolicy {
    /// Treat the description as clean and accept it (fail-open)
    #[default]
    Accept,
    /// Discard the description
    Reject,
    /// Abort the run with the moderation error
    Propagate,
}

/// Curation pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of trending results to collect
    #[serde(default = "default_target_count")]
    pub target_count: usize,

    /// Generative model name
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP timeout for a single API request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound for one describe or moderate call, 0 disables it
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Describe calls allowed in flight at once (1 = strictly sequential)
    #[serde(default = "default_describe_concurrency")]
    pub describe_concurrency: usize,

    #[serde(default)]
    pub on_moderate_error: ModerateErrorPolicy,

    /// Minimum spacing between API requests
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            describe_concurrency: default_describe_concurrency(),
            on_moderate_error: ModerateErrorPolicy::default(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

/// One pre-vetted popular prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularEntry {
    pub prompt_text: String,
    /// Avatar ids of friends who used the prompt
    #[serde(default)]
    pub friend_ids: Vec<String>,
    /// Count of other users who used the prompt
    #[serde(default)]
    pub others: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5740
}

fn default_clips() -> Vec<String> {
    (1..=5).map(|n| format!("song{}.mp3", n)).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_target_count() -> usize {
    3
}

fn default_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_describe_concurrency() -> usize {
    1
}

fn default_min_request_interval_ms() -> u64 {
    250
}

/// Resolve which config file to read, if any
///
/// Returns `None` when neither an explicit path nor the per-user file exists.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: OS config directory
    default_config_path(file_name).filter(|path| path.exists())
}

/// Per-user config file location for the platform
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("inspo").join(file_name))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    validate(&config)?;
    Ok(config)
}

/// Resolve and load the config, falling back to built-in defaults
pub fn load_config(cli_arg: Option<&Path>, file_name: &str) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg, CONFIG_ENV_VAR, file_name) {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_toml_config(&path)
        }
        None => {
            debug!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

fn validate(config: &TomlConfig) -> Result<()> {
    if config.pipeline.describe_concurrency == 0 {
        return Err(Error::Config(
            "pipeline.describe_concurrency must be at least 1".to_string(),
        ));
    }
    if config.popular.iter().any(|p| p.prompt_text.trim().is_empty()) {
        return Err(Error::Config(
            "popular entries need a non-empty prompt_text".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 5740);
        assert_eq!(config.clips.len(), 5);
        assert_eq!(config.clips[0], "song1.mp3");
        assert_eq!(config.pipeline.target_count, 3);
        assert_eq!(config.pipeline.on_moderate_error, ModerateErrorPolicy::Accept);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 8080

[pipeline]
target_count = 2
on_moderate_error = "reject"

[[popular]]
prompt_text = "Lo-fi beat with vinyl crackle"
others = 12
"#
        )
        .unwrap();

        let config = load_toml_config(file.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.pipeline.target_count, 2);
        assert_eq!(config.pipeline.on_moderate_error, ModerateErrorPolicy::Reject);
        assert_eq!(config.pipeline.model, "gemini-1.5-flash-latest");
        assert_eq!(config.popular.len(), 1);
        assert!(config.popular[0].friend_ids.is_empty());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\ndescribe_concurrency = 0").unwrap();

        let err = load_toml_config(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = load_toml_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Parse"));
    }

    #[test]
    fn test_unreadable_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        let err = load_toml_config(&missing).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("missing.toml")));
    }

    #[test]
    fn test_cli_arg_wins() {
        let path = Path::new("/tmp/explicit.toml");
        let resolved = resolve_config_path(Some(path), "INSPO_TEST_UNSET_VAR", "x.toml");
        assert_eq!(resolved, Some(path.to_path_buf()));
    }
}
