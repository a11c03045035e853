//! Detection prompt definition
//!
//! The oracle's instructions live in a TOML file so they can be tuned
//! without a rebuild. The default is embedded from `prompts/detector.toml`.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use tripwire_core::HistoryMessage;

const EMBEDDED_PROMPT: &str = include_str!("../prompts/detector.toml");

/// Prompt loading errors
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read prompt {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse prompt: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A detection prompt loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionPrompt {
    pub prompt: PromptMetadata,
    #[serde(default)]
    pub context: HistoryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub system: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Most recent history entries included in the request
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

fn default_history_window() -> usize {
    5
}

fn default_format() -> String {
    "json".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

impl Default for DetectionPrompt {
    fn default() -> Self {
        Self::embedded()
    }
}

impl DetectionPrompt {
    /// The prompt shipped with the crate
    pub fn embedded() -> Self {
        // Checked by test_embedded_prompt_parses
        toml::from_str(EMBEDDED_PROMPT).unwrap_or_else(|_| Self {
            prompt: PromptMetadata {
                id: "detector".to_string(),
                name: String::new(),
                version: None,
                system: String::new(),
            },
            context: HistoryConfig::default(),
            output: OutputConfig::default(),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, PromptError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a prompt override from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PromptError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PromptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn system_prompt(&self) -> &str {
        self.prompt.system.trim()
    }

    /// Render the user turn: recent history followed by the message to judge
    pub fn render_user(&self, message: &str, history: &[HistoryMessage]) -> String {
        let start = history.len().saturating_sub(self.context.history_window);
        let history_text: String = history[start..]
            .iter()
            .map(|m| format!("{}: {}\n", m.role, m.text))
            .collect();

        format!(
            "Conversation History:\n{}\nLatest Message to Analyze:\n{}\n\nAnalyze this message and respond with JSON.",
            history_text, message
        )
    }
}
