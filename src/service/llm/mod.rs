pub mod openai;

use crate::base::types::{ClassificationResult, ClassifierContext, ReplyContext, Res};
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the two model calls the chat makes for every message: a
/// classification that feeds the triage engine, and the conversational reply.
/// Implementing this trait allows different LLM providers to be used.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Classify the latest user message in the context of the conversation.
    ///
    /// An error here means "classifier unavailable"; callers fall back to keyword-only
    /// screening rather than propagating it.
    async fn classify(&self, context: &ClassifierContext) -> Res<ClassificationResult>;

    /// Generate the supportive reply to the latest user message.
    async fn get_support_reply(&self, context: &ReplyContext) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
