//! OpenAI Whisper implementation of the transcription client.

use std::sync::Arc;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{AudioInput, CreateTranscriptionRequestArgs},
};
use async_trait::async_trait;
use tracing::{info, instrument};

use crate::base::{config::Config, types::Res};

use super::{AudioClip, GenericTranscriptionClient, TranscriptionClient};

// Extra methods on `TranscriptionClient` applied by the openai implementation.

impl TranscriptionClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiTranscriptionClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

/// OpenAI transcription client implementation.
#[derive(Clone)]
pub struct OpenAiTranscriptionClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiTranscriptionClient {
    #[instrument(name = "OpenAiTranscriptionClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            model: config.openai_transcription_model.clone(),
        }
    }
}

#[async_trait]
impl GenericTranscriptionClient for OpenAiTranscriptionClient {
    #[instrument(name = "OpenAiTranscriptionClient::transcribe", skip_all, fields(file_name = %clip.file_name, bytes = clip.bytes.len()))]
    async fn transcribe(&self, clip: &AudioClip) -> Res<String> {
        if clip.bytes.is_empty() {
            return Err(anyhow::anyhow!("Voice message `{}` is empty.", clip.file_name));
        }

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(clip.file_name.clone(), clip.bytes.clone()))
            .model(&self.model)
            .build()?;

        let response = self.client.audio().transcribe(request).await?;
        let text = response.text.trim().to_string();

        if text.is_empty() {
            return Err(anyhow::anyhow!("Transcription of `{}` was empty.", clip.file_name));
        }

        info!("Transcribed {} characters.", text.len());

        Ok(text)
    }
}

// Tests.
