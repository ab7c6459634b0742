use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AdvisorError, Result};

/// Main configuration structure for Stack Advisor
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Preference persistence configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Text generation backend configuration
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Conversation session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Preference extraction vocabularies
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Host speech programs
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl Config {
    /// Load configuration from an explicit path or the default locations
    ///
    /// Without an explicit path, the first existing file among
    /// `~/.stack-advisor/config.toml`, `<config_dir>/stack-advisor/config.toml`
    /// and `./config.toml` is used. When none exists the defaults apply.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".stack-advisor").join("config.toml")),
            dirs::config_dir().map(|c| c.join("stack-advisor").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Read and parse a single TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AdvisorError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| AdvisorError::Config(format!("Failed to parse config: {e}")))
    }
}

/// Preference persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted preference record
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Key under which the preference record is stored
    #[serde(default = "default_preferences_key")]
    pub preferences_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            preferences_key: default_preferences_key(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".stack-advisor"))
        .unwrap_or_else(|| PathBuf::from(".stack-advisor"))
}

fn default_preferences_key() -> String {
    "techStackPreferences".to_string()
}

/// Remote text generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the generation API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable name for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    30
}

/// Conversation session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Locale handed to the speech collaborators
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Assistant message shown when a generation call fails
    #[serde(default = "default_apology_message")]
    pub apology_message: String,
    /// Upper bound on a single turn's wait for a reply, in seconds
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            apology_message: default_apology_message(),
            reply_timeout_secs: default_reply_timeout_secs(),
        }
    }
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_apology_message() -> String {
    "Sorry, something went wrong. Please try again.".to_string()
}

fn default_reply_timeout_secs() -> u64 {
    45
}

/// How vocabulary entries are located inside a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchingMode {
    /// Plain case-insensitive substring containment
    #[default]
    Substring,
    /// Substring containment that must start and end on a word boundary
    Word,
}

/// Preference extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractionConfig {
    /// Matching strategy used for every vocabulary
    #[serde(default)]
    pub matching: MatchingMode,
    /// Languages appended to the built-in language vocabulary
    #[serde(default)]
    pub extra_languages: Vec<String>,
    /// Tools appended to the built-in tool/framework vocabulary
    #[serde(default)]
    pub extra_tools: Vec<String>,
    /// Phrases appended to the built-in project type vocabulary
    #[serde(default)]
    pub extra_project_types: Vec<String>,
}

/// Host programs acting as speech collaborators
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpeechConfig {
    /// Program that reads text aloud (text is passed as the last argument)
    #[serde(default)]
    pub output_command: Option<Vec<String>>,
    /// Program that records one utterance and prints the transcript
    #[serde(default)]
    pub input_command: Option<Vec<String>>,
}
