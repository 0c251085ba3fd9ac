//! Runtime services and shared state for support-triage.

use tracing::instrument;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::session::Session,
    service::{chat::ChatClient, dispatch::DispatchClient, llm::LlmClient, transcription::TranscriptionClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the session, the service clients, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The conversation and display state.
    pub session: Session,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The speech-to-text client instance.
    pub transcription: TranscriptionClient,
    /// The emergency contact dispatcher.
    pub dispatch: DispatchClient,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Res<Self> {
        let session = Session::new();

        // Initialize the model clients.
        let llm = LlmClient::openai(&config);
        let transcription = TranscriptionClient::openai(&config);

        // Initialize the emergency contact dispatcher.
        let dispatch = DispatchClient::from_config(&config);

        // Initialize the chat client.
        let chat = ChatClient::console(session.clone(), llm.clone(), transcription.clone(), dispatch.clone());

        Ok(Self {
            config,
            session,
            llm,
            transcription,
            dispatch,
            chat,
        })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}
