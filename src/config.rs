use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

pub const MUSIC_MODULE: &str = "musicplayer";
pub const CHATBOT_MODULE: &str = "chatbot";
pub const RANDFUN_MODULE: &str = "randfun";
pub const SURPRISE_MODULE: &str = "ai_suprise";

/// Modules this build knows how to load, with their one-line descriptions.
pub const KNOWN_MODULES: &[(&str, &str)] = &[
    (
        MUSIC_MODULE,
        "Music player with YouTube, playlists, direct links, local files and search.",
    ),
    (
        CHATBOT_MODULE,
        "AI chatbot that continues conversations when you reply to it.",
    ),
    (RANDFUN_MODULE, "Random replies and gifs."),
    (SURPRISE_MODULE, "Asks the AI for a surprise."),
];

pub struct Config {
    pub discord_token: String,
    pub google_api_key: Option<String>,
    pub config_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            discord_token: std::env::var("DISCORD_TOKEN")
                .expect("DISCORD_TOKEN environment variable is required"),
            google_api_key: std::env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            config_path: std::env::var("TURTLEBOTT_CONFIG")
                .unwrap_or_else(|_| "config.yml".to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Contents of `config.yml`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(rename = "experiments_config", default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            modules: BTreeMap::new(),
        }
    }
}

/// Per-module options. Chatbot-only fields are ignored by other modules.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub user_whitelist_enabled: bool,
    #[serde(default)]
    pub user_whitelist: Vec<u64>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub system_instructions: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_whitelist_enabled: false,
            user_whitelist: Vec::new(),
            model: default_model(),
            system_instructions: String::new(),
            temperature: default_temperature(),
            max_turns: default_max_turns(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ModuleConfig {
    pub fn is_user_allowed(&self, user_id: u64) -> bool {
        !self.user_whitelist_enabled || self.user_whitelist.contains(&user_id)
    }
}

fn default_prefix() -> String {
    "t.".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_turns() -> usize {
    20
}

fn default_timeout_seconds() -> u64 {
    900
}

impl BotConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Loads the YAML config. A missing file means every module is disabled.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found, all modules are disabled", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let config = Self::from_yaml(&text)?;
        for name in config.modules.keys() {
            if !KNOWN_MODULES.iter().any(|(known, _)| known == name) {
                warn!("Module '{name}' in config is not a known module, ignoring it");
            }
        }
        Ok(config)
    }

    pub fn module(&self, name: &str) -> ModuleConfig {
        self.modules.get(name).cloned().unwrap_or_default()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.modules.get(name).is_some_and(|m| m.enabled)
    }
}
