//! Configuration management for Skiff
//!
//! Loaded from `skiff.toml` in the working directory. Every field has a
//! default so a missing file yields a runnable local configuration; the
//! API key itself always comes from the environment, never the file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::ImageEncoding;
use crate::Result;

pub const CONFIG_FILE: &str = "skiff.toml";

/// Top-level Skiff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkiffConfig {
    /// Text model endpoint
    #[serde(default)]
    pub model: ModelEndpointConfig,

    /// Vision model endpoint; falls back to `[model]` when absent
    #[serde(default)]
    pub vision: Option<ModelEndpointConfig>,

    /// Browser launch and capture settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Web server bind settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,
}

/// One inference endpoint (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEndpointConfig {
    /// Base URL, without the `/chat/completions` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout so a hung endpoint cannot stall a turn
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Browser launch and capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Bound on page-load waiting; exceeding it is tolerated as a
    /// partial load, not an error
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    #[serde(default = "default_image_format")]
    pub image_format: ImageEncoding,
}

/// Web server bind settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// How many transcript entries are replayed into each prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Stream replies chunk-by-chunk when the endpoint supports it
    #[serde(default = "default_streaming")]
    pub streaming: bool,

    /// Watchdog on the whole turn (model calls + browser work)
    #[serde(default = "default_turn_timeout")]
    pub turn_timeout_secs: u64,

    /// Tool output folded back into the prompt is truncated to this
    #[serde(default = "default_max_observation_chars")]
    pub max_observation_chars: usize,
}

// Default value providers
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> usize {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout() -> u64 {
    120
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    800
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_image_format() -> ImageEncoding {
    ImageEncoding::Jpeg
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_history_window() -> usize {
    20
}

fn default_streaming() -> bool {
    true
}

fn default_turn_timeout() -> u64 {
    120
}

fn default_max_observation_chars() -> usize {
    6000
}

impl SkiffConfig {
    /// Load configuration from `<dir>/skiff.toml` or use defaults
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| crate::SkiffError::Config(format!("Failed to parse {}: {}", CONFIG_FILE, e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default configuration to `<dir>/skiff.toml`
    pub fn write_default(dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let config_path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| crate::SkiffError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Vision endpoint, falling back to the text endpoint
    pub fn vision_or_model(&self) -> &ModelEndpointConfig {
        self.vision.as_ref().unwrap_or(&self.model)
    }
}

impl Default for SkiffConfig {
    fn default() -> Self {
        Self {
            model: ModelEndpointConfig::default(),
            vision: None,
            browser: BrowserSettings::default(),
            server: ServerSettings::default(),
            agent: AgentSettings::default(),
        }
    }
}

impl Default for ModelEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            navigation_timeout_secs: default_navigation_timeout(),
            image_format: default_image_format(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            streaming: default_streaming(),
            turn_timeout_secs: default_turn_timeout(),
            max_observation_chars: default_max_observation_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SkiffConfig::default();
        assert_eq!(config.model.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY");
        assert!(config.vision.is_none());
        assert!(config.browser.headless);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.agent.history_window, 20);
        assert!(config.agent.streaming);
    }

    #[test]
    fn test_vision_falls_back_to_model() {
        let config = SkiffConfig::default();
        assert_eq!(config.vision_or_model().model, config.model.model);

        let mut config = SkiffConfig::default();
        config.vision = Some(ModelEndpointConfig {
            model: "gpt-4o-mini".to_string(),
            ..ModelEndpointConfig::default()
        });
        assert_eq!(config.vision_or_model().model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SkiffConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_write_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        SkiffConfig::write_default(dir.path()).unwrap();
        let config = SkiffConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.model.model, "gpt-4o");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[model]\nmodel = \"local-llama\"\n\n[server]\nport = 9001\n",
        )
        .unwrap();

        let config = SkiffConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.model.model, "local-llama");
        assert_eq!(config.model.base_url, "https://api.openai.com/v1");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "not toml [").unwrap();
        assert!(SkiffConfig::load_or_default(dir.path()).is_err());
    }
}
