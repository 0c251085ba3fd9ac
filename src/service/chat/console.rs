//! Console chat surface.
//!
//! Reads one line at a time from stdin.  Plain text is a chat message; a few slash
//! commands stand in for the buttons and forms of a graphical chat widget.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout},
    sync::Mutex,
    task::JoinSet,
};
use tracing::{info, instrument, warn};

use crate::{
    base::types::Void,
    interaction::{self, session::Session},
    service::{dispatch::ContactDetails, dispatch::DispatchClient, llm::LlmClient, transcription::TranscriptionClient},
    triage::{
        display::{DisplayPrompt, DisplayState},
        engine::TriageDecision,
    },
};

use super::{ChatClient, GenericChatClient};

const GREETING: &str = "Hi, I'm here to listen. Tell me what's on your mind.\n\
                        Commands: /voice <file>, /contact name; email; phone; notes, /dismiss, /quit";

const FINISHING: &str = "Finishing up, one moment ... (press Ctrl-C again to leave now)";

const HELP: &str = "Commands: /voice <file>, /contact name; email; phone; notes, /dismiss, /quit";

// Extra methods on `ChatClient` applied by the console implementation.

impl ChatClient {
    /// Creates a new console chat client.
    pub fn console(session: Session, llm: LlmClient, transcription: TranscriptionClient, dispatch: DispatchClient) -> Self {
        let client = ConsoleChatClient::new(session, llm, transcription, dispatch);
        Self { inner: Arc::new(client) }
    }
}

impl From<ConsoleChatClient> for ChatClient {
    fn from(client: ConsoleChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Commands.

/// A parsed line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Empty,
    Message(String),
    Voice(PathBuf),
    Contact(ContactDetails),
    Dismiss,
    Quit,
    Unknown(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if line.is_empty() {
            return ConsoleCommand::Empty;
        }

        let Some(command) = line.strip_prefix('/') else {
            return ConsoleCommand::Message(line.to_string());
        };

        let (name, rest) = command.split_once(char::is_whitespace).map(|(n, r)| (n, r.trim())).unwrap_or((command, ""));

        match name.to_lowercase().as_str() {
            "voice" if !rest.is_empty() => ConsoleCommand::Voice(PathBuf::from(rest)),
            "contact" => ConsoleCommand::Contact(ContactDetails::parse(rest)),
            "dismiss" | "close" => ConsoleCommand::Dismiss,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => ConsoleCommand::Unknown(line.to_string()),
        }
    }
}

// Rendering.

/// The text shown for a prompt.
pub fn render_prompt_text(prompt: &DisplayPrompt) -> String {
    match (prompt.state, &prompt.decision) {
        (DisplayState::EmergencyShown, decision) => {
            let mut text = String::from(
                "==================== PLEASE READ ====================\n\
                 It sounds like you may be going through something really serious.\n\
                 You deserve support right now.\n\n\
                 - If you are in immediate danger, call your local emergency number.\n\
                 - To have our care team contact you, type:\n  /contact your name; email; phone; anything we should know\n\
                 - Type /dismiss once you have read this.",
            );

            if let Some(TriageDecision { source_classification: Some(c), .. }) = decision
                && !c.reasoning.is_empty()
            {
                text.push_str(&format!("\n\n(Why you are seeing this: {})", c.reasoning));
            }

            text.push_str("\n=====================================================");
            text
        }
        (DisplayState::AdvisoryShown, decision) => {
            let mut text = String::from(
                "---------------------------------------------------\n\
                 It might help to talk this through with someone from the wellbeing team.\n\
                 Consider booking a follow-up session.",
            );

            let questions = decision.as_ref().and_then(|d| d.source_classification.as_ref()).map(|c| c.follow_up_questions.as_slice()).unwrap_or_default();

            if !questions.is_empty() {
                text.push_str("\n\nSome things you could think about:");
                for question in questions {
                    text.push_str(&format!("\n  * {question}"));
                }
            }

            text.push_str("\n(Type /dismiss to hide this.)\n---------------------------------------------------");
            text
        }
        (DisplayState::Idle, _) => "[notice closed]".to_string(),
    }
}

// Structs.

/// Console chat client implementation.
#[derive(Clone)]
pub struct ConsoleChatClient {
    session: Session,
    llm: LlmClient,
    transcription: TranscriptionClient,
    dispatch: DispatchClient,
    stdout: Arc<Mutex<Stdout>>,
}

impl ConsoleChatClient {
    /// Create a new console chat client.
    #[instrument(name = "ConsoleChatClient::new", skip_all)]
    pub fn new(session: Session, llm: LlmClient, transcription: TranscriptionClient, dispatch: DispatchClient) -> Self {
        Self {
            session,
            llm,
            transcription,
            dispatch,
            stdout: Arc::new(Mutex::new(tokio::io::stdout())),
        }
    }

    async fn write(&self, text: &str) -> Void {
        let mut stdout = self.stdout.lock().await;

        stdout.write_all(text.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl GenericChatClient for ConsoleChatClient {
    async fn start(&self) -> Void {
        let chat = ChatClient::from(self.clone());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut tasks = JoinSet::new();

        self.write(GREETING).await?;

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C, shutting down ...");
                    break;
                }
            };

            interaction::reap_tasks(&mut tasks);

            // End of input.
            let Some(line) = line else {
                break;
            };

            match ConsoleCommand::parse(&line) {
                ConsoleCommand::Empty => {}
                ConsoleCommand::Message(text) => {
                    // Submitting here, in input order, fixes the message's sequence number.
                    let message = self.session.submit(&text).await?;
                    interaction::chat_event::handle_chat_event(&mut tasks, message, self.session.clone(), self.llm.clone(), chat.clone());
                }
                ConsoleCommand::Voice(path) => {
                    interaction::voice_note::handle_voice_note(&mut tasks, path, self.session.clone(), self.llm.clone(), self.transcription.clone(), chat.clone());
                }
                ConsoleCommand::Contact(details) => {
                    interaction::emergency_contact::handle_emergency_contact(&mut tasks, details, self.session.clone(), self.dispatch.clone(), chat.clone());
                }
                ConsoleCommand::Dismiss => {
                    interaction::dismiss::handle_dismiss(&mut tasks, self.session.clone(), chat.clone());
                }
                ConsoleCommand::Quit => break,
                ConsoleCommand::Unknown(command) => {
                    warn!("Unknown command: {command}");
                    self.write(HELP).await?;
                }
            }
        }

        // Let in-flight messages and contact requests finish; a second Ctrl-C abandons them.

        if !tasks.is_empty() {
            info!(pending = tasks.len(), "Waiting for in-flight work ...");
            self.write(FINISHING).await?;

            let interrupted = tokio::select! {
                _ = interaction::drain_tasks(&mut tasks) => false,
                _ = tokio::signal::ctrl_c() => true,
            };

            if interrupted {
                warn!(pending = tasks.len(), "Interrupted, abandoning in-flight work.");
                tasks.abort_all();
            }
        }

        if self.session.prompt().await.state == DisplayState::EmergencyShown {
            warn!("Session ended with an unacknowledged emergency prompt.");
        }

        Ok(())
    }

    #[instrument(skip_all)]
    async fn send_message(&self, text: &str) -> Void {
        self.write(&format!("\n> {text}\n")).await
    }

    #[instrument(skip_all, fields(state = ?prompt.state))]
    async fn render_prompt(&self, prompt: &DisplayPrompt) -> Void {
        self.write(&render_prompt_text(prompt)).await
    }
}

// Tests.
