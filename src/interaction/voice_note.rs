//! Handling of a recorded voice message.

use std::path::PathBuf;

use tokio::task::JoinSet;
use tracing::{Instrument, error, instrument};

use crate::{
    base::types::Void,
    interaction::{chat_event::process_chat_event, session::Session},
    service::{
        chat::ChatClient,
        llm::LlmClient,
        transcription::{AudioClip, TranscriptionClient},
    },
};

/// Handles a voice note.
///
/// It spawns a new task to transcribe the note and then process it as a chat message.
#[instrument(skip_all)]
pub fn handle_voice_note(tasks: &mut JoinSet<()>, path: PathBuf, session: Session, llm: LlmClient, transcription: TranscriptionClient, chat: ChatClient) {
    tasks.spawn(
        async move {
            // Process the event.
            let result = process_voice_note(path, &session, &llm, &transcription, &chat).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling: {}", err);
            }
        }
        .in_current_span(),
    );
}

/// Transcribe a voice note, echo the transcript, and process it as a message.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn process_voice_note(path: PathBuf, session: &Session, llm: &LlmClient, transcription: &TranscriptionClient, chat: &ChatClient) -> Void {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            chat.send_message(&format!("I couldn't open the voice note at `{}`.", path.display())).await?;
            return Err(err.into());
        }
    };

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("voice-note.webm").to_string();
    let clip = AudioClip { file_name, bytes };

    let text = match transcription.transcribe(&clip).await {
        Ok(text) => text,
        Err(err) => {
            chat.send_message("Sorry, I couldn't make out that voice note. Could you try again, or type your message?").await?;
            return Err(err);
        }
    };

    chat.send_message(&format!("(You said: \"{text}\")")).await?;

    // The note takes its place in the conversation once its words are known.
    let message = session.submit(&text).await?;

    process_chat_event(message, session, llm, chat).await
}
