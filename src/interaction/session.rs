//! Conversation state for a single chat session.
//!
//! Nothing here is persisted; a session lives as long as the process.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    base::types::{ConversationTurn, Res},
    triage::{
        display::{DisplayController, DisplayPrompt, DisplayState, Transition},
        engine::TriageDecision,
    },
};

/// How many turns the session keeps, and so hands to the models.
const MAX_HISTORY_TURNS: usize = 40;

#[derive(Debug, Default)]
struct Conversation {
    next_sequence: u64,
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);

        let excess = self.turns.len().saturating_sub(MAX_HISTORY_TURNS);
        self.turns.drain(..excess);
    }
}

/// A user message that has been given its place in the conversation.
#[derive(Debug, Clone)]
pub struct SubmittedMessage {
    /// Position of the message in submission order.
    pub sequence: u64,
    pub text: String,
    /// The turns that preceded the message.
    pub history: Vec<ConversationTurn>,
}

/// Shared session state.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Debug, Clone, Default)]
pub struct Session {
    conversation: Arc<Mutex<Conversation>>,
    display: Arc<Mutex<DisplayController>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user message at the moment it is submitted.
    ///
    /// Sequence numbers follow submission order, so callers must submit before handing the
    /// message off to a concurrent task.
    pub async fn submit(&self, text: &str) -> Res<SubmittedMessage> {
        let text = text.trim();

        if text.is_empty() {
            return Err(anyhow::anyhow!("Cannot submit an empty message."));
        }

        let mut conversation = self.conversation.lock().await;

        conversation.next_sequence += 1;
        let sequence = conversation.next_sequence;
        let history = conversation.turns.clone();

        conversation.push(ConversationTurn::user(text));

        Ok(SubmittedMessage {
            sequence,
            text: text.to_string(),
            history,
        })
    }

    /// Record an assistant reply.
    pub async fn record_reply(&self, text: &str) {
        self.conversation.lock().await.push(ConversationTurn::assistant(text));
    }

    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.conversation.lock().await.turns.clone()
    }

    /// Apply the decision for message `sequence`, returning the transition and what to render.
    pub async fn apply_decision(&self, sequence: u64, decision: TriageDecision) -> (Transition, DisplayPrompt) {
        let mut display = self.display.lock().await;
        let transition = display.apply(sequence, decision);

        (transition, display.prompt())
    }

    /// Attach the full decision to the prompt already shown for message `sequence`.
    pub async fn refine_decision(&self, sequence: u64, decision: TriageDecision) -> bool {
        self.display.lock().await.refine(sequence, decision)
    }

    /// The user acknowledged the current prompt.
    pub async fn dismiss(&self) -> (Transition, DisplayPrompt) {
        let mut display = self.display.lock().await;
        let transition = display.dismiss();

        (transition, display.prompt())
    }

    pub async fn prompt(&self) -> DisplayPrompt {
        self.display.lock().await.prompt()
    }

    /// The decision behind the emergency prompt, if one is shown.
    pub async fn active_emergency(&self) -> Option<TriageDecision> {
        let prompt = self.prompt().await;

        match prompt.state {
            DisplayState::EmergencyShown => prompt.decision,
            _ => None,
        }
    }
}

// Tests.
