//! Application configuration
//!
//! Values come from the environment (a `.env` file is loaded first by the
//! binary) with an optional JSON sampling preset for the generation backend.
//! Connection settings in the preset are used when the matching environment
//! variable is unset.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::services::{NormalizerSettings, PromptSettings};
use crate::domain::value_objects::DEFAULT_MAX_HISTORY_LENGTH;

pub const DEFAULT_API_URL: &str = "http://localhost:11434/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_WORLD_FILE: &str = "demos/world.json";
pub const DEFAULT_PREAMBLE: &str =
    "Only write for the character you are controlling. Do not write for other characters.";

/// Sampling parameters sent with every generation request
///
/// Field aliases accept presets exported from text-generation front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    #[serde(alias = "apiUrl")]
    pub api_url: Option<String>,
    #[serde(alias = "apiToken")]
    pub api_token: Option<String>,
    pub model: Option<String>,
    #[serde(alias = "temp")]
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    #[serde(alias = "rep_pen")]
    pub repetition_penalty: f32,
    #[serde(alias = "genamt")]
    pub max_tokens: u32,
    #[serde(alias = "freq_pen")]
    pub frequency_penalty: f32,
    #[serde(alias = "presence_pen")]
    pub presence_penalty: f32,
    #[serde(alias = "dry_sequence_breakers")]
    pub stop: Vec<String>,
    /// Instruction placed above every prompt
    pub preamble: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            model: None,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repetition_penalty: 1.1,
            max_tokens: 200,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: Vec::new(),
            preamble: DEFAULT_PREAMBLE.to_string(),
        }
    }
}

impl GenerationSettings {
    /// Load a preset from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preset {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse preset {}", path.display()))
    }
}

/// Connection to the chat-completions endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_token: String,
    pub model: String,
    pub timeout_secs: u64,
    pub generation: GenerationSettings,
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub max_history_length: usize,
    pub normalizer: NormalizerSettings,
    pub prompt: PromptSettings,
    /// World content loaded at startup
    pub world_file: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let generation = match env::var("TALEWEAVER_LLM_PRESET") {
            Ok(path) => GenerationSettings::load(Path::new(&path))?,
            Err(_) => GenerationSettings::default(),
        };

        let api_url = env::var("LLM_API_URL")
            .ok()
            .or_else(|| generation.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_token = env::var("LLM_API_TOKEN")
            .ok()
            .or_else(|| generation.api_token.clone())
            .unwrap_or_default();
        let model = env::var("LLM_MODEL")
            .ok()
            .or_else(|| generation.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout_secs = env_or("LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        let normalizer_defaults = NormalizerSettings::default();
        let prompt_defaults = PromptSettings::default();

        Ok(Self {
            llm: LlmConfig {
                api_url,
                api_token,
                model,
                timeout_secs,
                generation,
            },
            max_history_length: env_or("TALEWEAVER_MAX_HISTORY", DEFAULT_MAX_HISTORY_LENGTH)?,
            normalizer: NormalizerSettings {
                early_break_threshold: env_or(
                    "TALEWEAVER_EARLY_BREAK",
                    normalizer_defaults.early_break_threshold,
                )?,
                ..normalizer_defaults
            },
            prompt: PromptSettings {
                system_instructions: env::var("TALEWEAVER_SYSTEM_INSTRUCTIONS")
                    .unwrap_or(prompt_defaults.system_instructions),
                include_timestamp: env_or(
                    "TALEWEAVER_INCLUDE_TIMESTAMP",
                    prompt_defaults.include_timestamp,
                )?,
            },
            world_file: env::var("TALEWEAVER_WORLD_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_WORLD_FILE)),
        })
    }
}

/// Parse `key` from the environment, or use `default` when it is unset.
/// A value that is set but does not parse is an error.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, value)),
        None => Ok(default),
    }
}
