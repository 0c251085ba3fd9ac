//! Handling of a single typed (or transcribed) user message.

use tokio::task::JoinSet;
use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    base::types::{ClassifierContext, ReplyContext, Void},
    interaction::session::{Session, SubmittedMessage},
    service::{chat::ChatClient, llm::LlmClient},
    triage::{display::DisplayState, engine::decide, lexicon::find_critical_phrase},
};

/// Sent when the assistant cannot produce a reply.
pub const FALLBACK_REPLY: &str = "I'm sorry, I'm having trouble responding right now. I'm still here, and if things feel urgent please reach out to someone you trust or your local emergency number.";

/// Handles a chat message.
///
/// The message must already be submitted to the session, which fixes its sequence number.
/// Processing runs as a new task so that messages are handled concurrently; ordering of
/// the resulting prompts is arbitrated by the session.
#[instrument(skip_all, fields(sequence = message.sequence))]
pub fn handle_chat_event(tasks: &mut JoinSet<()>, message: SubmittedMessage, session: Session, llm: LlmClient, chat: ChatClient) {
    tasks.spawn(
        async move {
            // Process the event.
            let result = process_chat_event(message, &session, &llm, &chat).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling: {}", err);
            }
        }
        .in_current_span(),
    );
}

/// Classify, triage, and reply to one submitted user message.
#[instrument(skip_all, fields(sequence = message.sequence))]
pub async fn process_chat_event(message: SubmittedMessage, session: &Session, llm: &LlmClient, chat: &ChatClient) -> Void {
    let SubmittedMessage { sequence, text, history } = message;
    let mut rendered = false;

    // A critical phrase escalates on its own, so show it before waiting on the classifier.

    if let Some(phrase) = find_critical_phrase(&text) {
        info!(sequence, phrase, "Critical phrase matched.");

        let (transition, prompt) = session.apply_decision(sequence, decide(&text, None)).await;

        if transition.needs_render() {
            chat.render_prompt(&prompt).await?;
            rendered = true;
        }
    }

    // Classify the message; a failed classifier degrades to keyword-only screening.

    let context = ClassifierContext {
        history: history.clone(),
        user_message: text.clone(),
    };

    let classification = match llm.classify(&context).await {
        Ok(classification) => Some(classification),
        Err(err) => {
            warn!("Classifier unavailable, falling back to keyword screening: {}", err);
            None
        }
    };

    // Decide, and update what the user sees.

    let decision = decide(&text, classification.as_ref());
    let action = decision.action;

    info!(sequence, action = ?decision.action, rule = ?decision.rule, "Message triaged.");

    if decision.matched_phrase.is_some() {
        // Already applied above; only the classifier's details are new.
        session.refine_decision(sequence, decision).await;
    } else {
        let (transition, prompt) = session.apply_decision(sequence, decision).await;

        if transition.needs_render() {
            chat.render_prompt(&prompt).await?;
            rendered = true;
        }
    }

    // Reply.

    let reply_context = ReplyContext { history, user_message: text, action };

    match llm.get_support_reply(&reply_context).await {
        Ok(reply) => {
            session.record_reply(&reply).await;
            chat.send_message(&reply).await?;
        }
        Err(err) => {
            error!("Failed to generate a reply: {}", err);
            chat.send_message(FALLBACK_REPLY).await?;
        }
    }

    // Keep an unacknowledged emergency prompt in view.

    let prompt = session.prompt().await;

    if prompt.state == DisplayState::EmergencyShown && !rendered {
        chat.render_prompt(&prompt).await?;
    }

    Ok(())
}
