//! OpenAI implementation of the classifier and the supportive assistant.
//!
//! Both calls go through the Responses API.  The classifier is constrained with a strict
//! JSON schema, and its text output is parsed into a validated [`ClassificationResult`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::base::{
    config::Config,
    types::{ClassificationResult, ClassifierContext, ConversationTurn, ReplyContext, Res, Speaker},
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ReasoningEffort,
        responses::{
            Content, CreateResponseArgs, Input, InputItem, InputMessageArgs, OutputContent, ReasoningConfigArgs, Response, ResponseFormatJsonSchema, Role, TextConfig, TextResponseFormat,
        },
    },
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Build the classifier input.
    #[instrument(name = "OpenAiLlmClient::build_classifier_input", skip_all)]
    fn build_classifier_input(&self, context: &ClassifierContext) -> Res<Input> {
        Ok(Input::Items(vec![
            InputItem::Message(
                InputMessageArgs::default()
                    .role(Role::Developer)
                    .content(format!("## Conversation So Far\n\n{}\n\n", render_history(&context.history)))
                    .build()?,
            ),
            InputItem::Message(
                InputMessageArgs::default()
                    .role(Role::User)
                    .content(format!("# Latest User Message\n\n{}\n\n", context.user_message))
                    .build()?,
            ),
        ]))
    }

    /// Build the reply input, replaying the conversation as real turns.
    #[instrument(name = "OpenAiLlmClient::build_reply_input", skip_all)]
    fn build_reply_input(&self, context: &ReplyContext) -> Res<Input> {
        let mut items = context
            .history
            .iter()
            .map(|turn| {
                let role = match turn.speaker {
                    Speaker::User => Role::User,
                    Speaker::Assistant => Role::Assistant,
                };

                Ok(InputItem::Message(InputMessageArgs::default().role(role).content(turn.text.clone()).build()?))
            })
            .collect::<Res<Vec<_>>>()?;

        items.push(InputItem::Message(
            InputMessageArgs::default()
                .role(Role::Developer)
                .content(format!("## Triage Decision\n\n{:?}\n\n", context.action))
                .build()?,
        ));

        items.push(InputItem::Message(InputMessageArgs::default().role(Role::User).content(context.user_message.clone()).build()?));

        Ok(Input::Items(items))
    }

    /// Apply the model-family specific sampling options to a request.
    fn apply_sampling(&self, request: &mut CreateResponseArgs, model: &str, temperature: f32) -> Res<()> {
        // Add the temperature for the non-reasoning models.
        if model.starts_with("gpt") {
            request.temperature(temperature);
        }

        // Add the reasoning effort for `o` models.
        if model.starts_with('o') {
            let reasoning_effort = parse_openai_reasoning_effort(&self.config.openai_reasoning_effort)?;
            request.reasoning(ReasoningConfigArgs::default().effort(reasoning_effort).build()?);
        }

        Ok(())
    }

    /// Send a request, retrying transport errors and timeouts with exponential backoff.
    async fn call_openai_api(&self, request_builder: CreateResponseArgs) -> Res<Response> {
        const MAX_ATTEMPTS: u32 = 3;
        const TIMEOUT: Duration = Duration::from_secs(30);
        const BACKOFF: Duration = Duration::from_millis(500);

        let mut attempt = 1;

        loop {
            let request = request_builder.build()?;

            let failure = match timeout(TIMEOUT, self.client.responses().create(request)).await {
                Ok(Ok(response)) => {
                    info!(attempt, "OpenAI API call succeeded.");
                    return Ok(response);
                }
                Ok(Err(err)) => err.to_string(),
                Err(_) => format!("timed out after {}s", TIMEOUT.as_secs()),
            };

            if attempt >= MAX_ATTEMPTS {
                return Err(anyhow::anyhow!("OpenAI API call failed after {attempt} attempts: {failure}"));
            }

            warn!(attempt, "OpenAI API call failed, retrying: {failure}");

            tokio::time::sleep(BACKOFF * 2_u32.pow(attempt - 1)).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::classify", skip_all)]
    async fn classify(&self, context: &ClassifierContext) -> Res<ClassificationResult> {
        let input = self.build_classifier_input(context)?;

        let mut request = CreateResponseArgs::default();
        request
            .instructions(self.config.classifier_system_directive.clone())
            .max_output_tokens(self.config.openai_max_tokens)
            .model(&self.config.openai_classifier_model)
            .text(get_openai_classification_text_config().clone())
            .input(input);

        self.apply_sampling(&mut request, &self.config.openai_classifier_model, self.config.openai_classifier_temperature)?;

        let response = self.call_openai_api(request).await?;
        let text = parse_openai_response(&response)?;

        let classification = ClassificationResult::parse(&text)?;

        info!(
            support_level = ?classification.support_level,
            triage_level = ?classification.triage_level,
            needs_follow_up = classification.needs_follow_up,
            "Message classified."
        );

        Ok(classification)
    }

    #[instrument(name = "OpenAiLlmClient::get_support_reply", skip_all)]
    async fn get_support_reply(&self, context: &ReplyContext) -> Res<String> {
        let input = self.build_reply_input(context)?;

        let mut request = CreateResponseArgs::default();
        request
            .instructions(self.config.assistant_system_directive.clone())
            .max_output_tokens(self.config.openai_max_tokens)
            .model(&self.config.openai_assistant_model)
            .text(TextConfig { format: TextResponseFormat::Text })
            .input(input);

        self.apply_sampling(&mut request, &self.config.openai_assistant_model, self.config.openai_assistant_temperature)?;

        let response = self.call_openai_api(request).await?;
        let reply = parse_openai_response(&response)?;

        if reply.trim().is_empty() {
            return Err(anyhow::anyhow!("Assistant returned an empty reply."));
        }

        Ok(reply.trim().to_string())
    }
}

/// Collect the text output of an OpenAI response.
#[instrument(skip_all)]
pub fn parse_openai_response(response: &Response) -> Res<String> {
    let mut result = Vec::new();

    for output in &response.output {
        match output {
            OutputContent::Message(message) => {
                for message_content in &message.content {
                    match message_content {
                        Content::OutputText(text) => result.push(text.text.clone()),
                        Content::Refusal(reason) => {
                            return Err(anyhow::anyhow!("Request refused: {reason:#?}"));
                        }
                    }
                }
            }
            _ => {
                warn!("Unexpected output: {output:#?}");
            }
        }
    }

    Ok(result.join("\n\n"))
}

/// Render conversation history as a plain transcript.
fn render_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return "(no earlier messages)".to_string();
    }

    history
        .iter()
        .map(|turn| {
            let speaker = match turn.speaker {
                Speaker::User => "User",
                Speaker::Assistant => "Assistant",
            };

            format!("[{}] {}: {}", turn.at.format("%H:%M"), speaker, turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// Statics.

static OPENAI_CLASSIFICATION_TEXT_CONFIG: OnceLock<TextConfig> = OnceLock::new();

fn get_openai_classification_text_config() -> &'static TextConfig {
    OPENAI_CLASSIFICATION_TEXT_CONFIG.get_or_init(|| TextConfig {
        format: TextResponseFormat::JsonSchema(ResponseFormatJsonSchema {
            name: "SupportClassification".to_string(),
            description: Some("Support level and triage classification of the latest user message.".to_string()),
            schema: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "supportLevel": {
                        "type": "string",
                        "enum": ["low", "mid", "high"]
                    },
                    "triageLevel": {
                        "type": "string",
                        "enum": ["ATS1", "ATS2", "ATS3", "ATS4", "ATS5"]
                    },
                    "reasoning": { "type": "string" },
                    "needsFollowUp": { "type": "boolean" },
                    "confidence": { "type": "number" },
                    "followUpQuestions": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                },
                "required": ["supportLevel", "triageLevel", "reasoning", "needsFollowUp", "confidence", "followUpQuestions"],
                "additionalProperties": false
            })),
            strict: Some(true),
        }),
    })
}

/// Convert a string reasoning effort to ReasoningEffort enum.
fn parse_openai_reasoning_effort(effort: &str) -> Res<ReasoningEffort> {
    match effort.to_lowercase().as_str() {
        "low" => Ok(ReasoningEffort::Low),
        "medium" => Ok(ReasoningEffort::Medium),
        "high" => Ok(ReasoningEffort::High),
        _ => Err(crate::base::types::Err::msg(format!("Invalid reasoning effort: {effort}. Must be one of: low, medium, high"))),
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::config::ConfigInner;
    use crate::triage::engine::TriageAction;

    fn create_test_config() -> Config {
        Config {
            inner: Arc::new(ConfigInner {
                openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| "test_key".to_string()),
                openai_classifier_model: "gpt-4.1-mini".to_string(),
                openai_assistant_model: "gpt-4.1-mini".to_string(),
                openai_assistant_temperature: 0.1,
                openai_max_tokens: 200u32,
                openai_reasoning_effort: "low".to_string(),
                ..Default::default()
            }),
        }
    }

    fn fail_if_no_api_key() {
        if std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| "test_key".to_string()) == "test_key" {
            panic!("OPENAI_API_KEY not set! Tests require a valid API key to run.");
        }
    }

    #[test]
    fn test_parse_reasoning_effort() {
        assert!(matches!(parse_openai_reasoning_effort("HIGH"), Ok(ReasoningEffort::High)));
        assert!(parse_openai_reasoning_effort("extreme").is_err());
    }

    #[test]
    fn test_render_empty_history() {
        assert_eq!(render_history(&[]), "(no earlier messages)");
    }

    #[test]
    fn test_render_history_labels_speakers() {
        let history = vec![ConversationTurn::user("I can't focus."), ConversationTurn::assistant("That sounds exhausting.")];

        let rendered = render_history(&history);

        assert!(rendered.contains("User: I can't focus."));
        assert!(rendered.contains("Assistant: That sounds exhausting."));
        assert_eq!(rendered.lines().count(), 2);
    }

    #[test]
    fn test_build_reply_input_replays_turns() {
        let client = OpenAiLlmClient::new(&create_test_config());
        let context = ReplyContext {
            history: vec![ConversationTurn::user("hi"), ConversationTurn::assistant("hello")],
            user_message: "rough week".to_string(),
            action: TriageAction::AdvisoryBanner,
        };

        let Input::Items(items) = client.build_reply_input(&context).unwrap() else {
            panic!("Expected input items.");
        };

        // Two history turns, the triage decision, and the latest message.
        assert_eq!(items.len(), 4);
    }

    #[tokio::test]
    #[ignore = "requires OPENAI_API_KEY"]
    async fn test_llm_client_classify() {
        fail_if_no_api_key();

        let client = LlmClient::openai(&create_test_config());
        let context = ClassifierContext {
            history: vec![],
            user_message: "Any tips for staying focused while writing my thesis?".to_string(),
        };

        let classification = client.classify(&context).await.unwrap();

        assert!(classification.triage_level.is_some());
        assert!(classification.support_level.is_some());
    }

    #[tokio::test]
    #[ignore = "requires OPENAI_API_KEY"]
    async fn test_llm_client_get_support_reply() {
        fail_if_no_api_key();

        let client = LlmClient::openai(&create_test_config());
        let context = ReplyContext {
            history: vec![],
            user_message: "I've been stressed about my exams.".to_string(),
            action: TriageAction::None,
        };

        let reply = client.get_support_reply(&context).await.unwrap();

        assert!(!reply.is_empty(), "Reply should not be empty");
    }

    #[tokio::test]
    async fn test_llm_client_error_handling_invalid_api_key() {
        let mut config = create_test_config();
        let config_inner = Arc::make_mut(&mut config.inner);
        config_inner.openai_api_key = "sk-invalid-key-for-testing".to_string();

        let client = LlmClient::openai(&config);
        let context = ClassifierContext {
            history: vec![],
            user_message: "test".to_string(),
        };

        let result = client.classify(&context).await;
        assert!(result.is_err(), "Should fail with invalid API key");
    }
}
