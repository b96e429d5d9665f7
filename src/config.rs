use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_referer() -> String {
    "https://tape.local".to_string()
}

fn default_title() -> String {
    "TAPE - Technology Assisted Plant Emulator".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OpenRouterConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_referer")]
    pub referer: String,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_simulation_model() -> String {
    "openai/gpt-3.5-turbo".to_string()
}

fn default_chat_model() -> String {
    "anthropic/claude-3-sonnet".to_string()
}

fn default_vision_model() -> String {
    "qwen/qwen-vl-plus".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsConfig {
    #[serde(default = "default_simulation_model")]
    pub simulation: String,
    #[serde(default = "default_chat_model")]
    pub chat: String,
    /// Variety and weather lookups share a small fast model.
    #[serde(default = "default_chat_model")]
    pub lookup: String,
    #[serde(default = "default_vision_model")]
    pub vision: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            openrouter: OpenRouterConfig::default(),
            models: ModelsConfig::default(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        OpenRouterConfig {
            base_url: default_base_url(),
            referer: default_referer(),
            title: default_title(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        ModelsConfig {
            simulation: default_simulation_model(),
            chat: default_chat_model(),
            lookup: default_chat_model(),
            vision: default_vision_model(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => eprintln!("Error parsing config.toml: {}. Using defaults.", e),
                },
                Err(e) => eprintln!("Error reading config.toml: {}. Using defaults.", e),
            }
        } else if let Some(parent) = config_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        Config::default()
    }

    /// The bearer credential is never written to the config file; it
    /// comes from the environment at startup only.
    pub fn api_key() -> Option<String> {
        std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/tape")
        } else {
            PathBuf::from(".")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployment() {
        let config = Config::default();
        assert_eq!(
            config.openrouter.base_url,
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(config.models.simulation, "openai/gpt-3.5-turbo");
        assert_eq!(config.models.vision, "qwen/qwen-vl-plus");
        assert_eq!(config.debounce_ms, 500);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            "[openrouter]\ntitle = \"TAPE - Test\"\n\n[models]\nsimulation = \"openai/gpt-4o-mini\"\n",
        )
        .unwrap();
        assert_eq!(config.openrouter.title, "TAPE - Test");
        assert_eq!(config.openrouter.base_url, default_base_url());
        assert_eq!(config.models.simulation, "openai/gpt-4o-mini");
        assert_eq!(config.models.chat, "anthropic/claude-3-sonnet");
    }
}
