//! Configuration settings for Rapport.

use crate::error::{RapportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub index: IndexSettings,
    pub passages: PassageSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory holding the index artifacts unless their paths are set explicitly.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.rapport".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Vector index artifact location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Path to the SQLite index artifact (default: `<data_dir>/index.db`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Passage metadata artifact location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PassageSettings {
    /// Path to the JSON passage metadata (default: `<data_dir>/passages.json`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local feature-hashing encoder, no network.
    #[default]
    Hash,
    /// Any OpenAI-compatible embeddings endpoint.
    #[serde(alias = "mistral")]
    OpenAI,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hash" | "local" => Ok(EmbeddingProvider::Hash),
            "openai" | "mistral" => Ok(EmbeddingProvider::OpenAI),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::Hash => write!(f, "hash"),
            EmbeddingProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Query embedding settings. Must match how the index was built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (hash, openai).
    pub provider: EmbeddingProvider,
    /// Embedding model (openai provider only).
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// API base URL (openai provider only).
    pub api_base: String,
    /// Environment variable holding the API key (openai provider only).
    pub api_key_env: String,
    /// Send `dimensions` in the request (only some models accept it).
    pub send_dimensions: bool,
    /// Memoize query embeddings for the process lifetime.
    pub cache: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hash,
            model: "mistral-embed".to_string(),
            dimensions: 1024,
            api_base: "https://api.mistral.ai/v1".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
            send_dimensions: false,
            cache: true,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of nearest neighbours to fetch per question.
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Chat completions endpoint.
    pub api_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.mistral.ai/v1/chat/completions".to_string(),
            model: "mistral-medium".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
            temperature: 0.7,
            timeout_secs: 300,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Send the system directive as the first message.
    pub system_directive: bool,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            custom_dir: None,
            system_directive: true,
            variables: super::prompts::default_variables(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(RapportError::Config(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(RapportError::Config(format!(
                "generation.temperature must be between 0 and 2, got {}",
                self.generation.temperature
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(RapportError::Config(
                "embedding.dimensions must be positive".to_string(),
            ));
        }

        url::Url::parse(&self.generation.api_url).map_err(|e| {
            RapportError::Config(format!(
                "generation.api_url '{}' is not a valid URL: {}",
                self.generation.api_url, e
            ))
        })?;

        if self.embedding.provider == EmbeddingProvider::OpenAI {
            url::Url::parse(&self.embedding.api_base).map_err(|e| {
                RapportError::Config(format!(
                    "embedding.api_base '{}' is not a valid URL: {}",
                    self.embedding.api_base, e
                ))
            })?;
        }

        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RapportError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rapport")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded index artifact path.
    pub fn index_path(&self) -> PathBuf {
        match &self.index.path {
            Some(path) => Self::expand_path(path),
            None => self.data_dir().join("index.db"),
        }
    }

    /// Get the expanded passage metadata path.
    pub fn passages_path(&self) -> PathBuf {
        match &self.passages.path {
            Some(path) => Self::expand_path(path),
            None => self.data_dir().join("passages.json"),
        }
    }

    /// The config file in effect: `explicit` if given, else the default location.
    pub fn config_path(explicit: Option<&str>) -> PathBuf {
        match explicit {
            Some(path) => Self::expand_path(path),
            None => Self::default_config_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.generation.model, "mistral-medium");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [retrieval]
            top_k = 3

            [embedding]
            provider = "mistral"
            "#,
        )
        .unwrap();

        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::OpenAI);
        assert_eq!(settings.generation.temperature, 0.7);
        assert_eq!(settings.prompts.variables["language"], "French");
    }

    #[test]
    fn test_artifact_paths_follow_data_dir() {
        let mut settings = Settings::default();
        settings.general.data_dir = "/srv/rapport".to_string();
        assert_eq!(settings.index_path(), PathBuf::from("/srv/rapport/index.db"));
        assert_eq!(
            settings.passages_path(),
            PathBuf::from("/srv/rapport/passages.json")
        );

        settings.index.path = Some("/data/other.db".to_string());
        assert_eq!(settings.index_path(), PathBuf::from("/data/other.db"));
        assert_eq!(
            settings.passages_path(),
            PathBuf::from("/srv/rapport/passages.json")
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        assert_eq!(
            Settings::config_path(Some("/etc/rapport.toml")),
            PathBuf::from("/etc/rapport.toml")
        );
        assert_eq!(Settings::config_path(None), Settings::default_config_path());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut settings = Settings::default();
        settings.retrieval.top_k = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut settings = Settings::default();
        settings.generation.api_url = "not a url".to_string();
        assert!(matches!(settings.validate(), Err(RapportError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_temperature_out_of_range() {
        let mut settings = Settings::default();
        settings.generation.temperature = 3.5;
        assert!(settings.validate().is_err());
    }
}
