//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::Res;

/// Prefix of the environment variables that override the config file.
const ENV_PREFIX: &str = "SUPPORT_TRIAGE";

/// Environment source, e.g. `SUPPORT_TRIAGE_OPENAI_API_KEY` for `openai_api_key`.
fn environment() -> config::Environment {
    config::Environment::default().prefix(ENV_PREFIX)
}

/// Default OpenAI classifier model to use
fn default_openai_classifier_model() -> String {
    "gpt-4.1-mini".to_string()
}

/// Default OpenAI assistant model to use
fn default_openai_assistant_model() -> String {
    "gpt-4.1".to_string()
}

/// Default sampling temperature for the classifier model
fn default_openai_classifier_temperature() -> f32 {
    0.0
}

/// Default sampling temperature for the assistant model
fn default_openai_assistant_temperature() -> f32 {
    0.7
}

/// Default max output tokens for OpenAI model
fn default_openai_max_tokens() -> u32 {
    4096
}

/// Default reasoning effort for `o` models
fn default_openai_reasoning_effort() -> String {
    "low".to_string()
}

/// Default OpenAI transcription model to use
fn default_openai_transcription_model() -> String {
    "whisper-1".to_string()
}

/// Default system directive for the classifier.
fn default_classifier_system_directive() -> String {
    prompts::CLASSIFIER_SYSTEM_DIRECTIVE.to_string()
}

/// Default system directive for the assistant.
fn default_assistant_system_directive() -> String {
    prompts::ASSISTANT_SYSTEM_DIRECTIVE.to_string()
}

/// Default recipient of emergency contact requests.
fn default_emergency_contact_recipient() -> String {
    "care-team@example.org".to_string()
}

/// Configuration for the support-triage application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// OpenAI API key (`SUPPORT_TRIAGE_OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// OpenAI model used to classify messages (`SUPPORT_TRIAGE_OPENAI_CLASSIFIER_MODEL`).
    #[serde(default = "default_openai_classifier_model")]
    pub openai_classifier_model: String,
    /// OpenAI model used for supportive replies (`SUPPORT_TRIAGE_OPENAI_ASSISTANT_MODEL`).
    #[serde(default = "default_openai_assistant_model")]
    pub openai_assistant_model: String,
    /// Sampling temperature for the classifier model (`SUPPORT_TRIAGE_OPENAI_CLASSIFIER_TEMPERATURE`).
    /// Value between 0 and 2; classification should stay close to deterministic.
    #[serde(default = "default_openai_classifier_temperature")]
    pub openai_classifier_temperature: f32,
    /// Sampling temperature for the assistant model (`SUPPORT_TRIAGE_OPENAI_ASSISTANT_TEMPERATURE`).
    /// Value between 0 and 2. Higher values like 0.8 make output more random,
    /// while lower values like 0.2 make it more focused and deterministic.
    #[serde(default = "default_openai_assistant_temperature")]
    pub openai_assistant_temperature: f32,
    /// Max output tokens for OpenAI model (`SUPPORT_TRIAGE_OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Reasoning effort for `o` models (`SUPPORT_TRIAGE_OPENAI_REASONING_EFFORT`): low, medium, or high.
    #[serde(default = "default_openai_reasoning_effort")]
    pub openai_reasoning_effort: String,
    /// OpenAI speech-to-text model (`SUPPORT_TRIAGE_OPENAI_TRANSCRIPTION_MODEL`).
    #[serde(default = "default_openai_transcription_model")]
    pub openai_transcription_model: String,
    /// Optional custom classifier directive to override the default (`SUPPORT_TRIAGE_CLASSIFIER_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_classifier_system_directive")]
    pub classifier_system_directive: String,
    /// Optional custom assistant directive to override the default (`SUPPORT_TRIAGE_ASSISTANT_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_assistant_system_directive")]
    pub assistant_system_directive: String,
    /// Address that emergency contact requests are sent to (`SUPPORT_TRIAGE_EMERGENCY_CONTACT_RECIPIENT`).
    #[serde(default = "default_emergency_contact_recipient")]
    pub emergency_contact_recipient: String,
    /// Webhook that receives emergency contact requests (`SUPPORT_TRIAGE_EMERGENCY_WEBHOOK_URL`).
    /// When unset, requests are composed and written to the log only.
    #[serde(default)]
    pub emergency_webhook_url: Option<String>,
}

impl ConfigInner {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Res<()> {
        if self.openai_classifier_temperature < 0.0 || self.openai_classifier_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI classifier temperature must be between 0 and 2."));
        }

        if self.openai_assistant_temperature < 0.0 || self.openai_assistant_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI assistant temperature must be between 0 and 2."));
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if !matches!(self.openai_reasoning_effort.to_lowercase().as_str(), "low" | "medium" | "high") {
            return Err(anyhow::anyhow!("OpenAI reasoning effort must be one of: low, medium, high."));
        }

        if self.emergency_contact_recipient.trim().is_empty() {
            return Err(anyhow::anyhow!("Emergency contact recipient must not be empty."));
        }

        Ok(())
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(environment());

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }
}

// Tests.
