//! Caller-owned display state for triage prompts.
//!
//! The engine is stateless; whatever is currently on screen lives here, and changes only
//! through [`DisplayController::apply`], [`DisplayController::refine`] and
//! [`DisplayController::dismiss`].
//!
//! Decisions may arrive out of order (classification requests run concurrently), so each
//! one carries the sequence number of the message it was computed for:
//! - Emergency decisions are never discarded.
//! - Nothing but an explicit dismissal clears a shown emergency.
//! - A newer decision replaces the shown one, including replacing a banner with nothing.
//! - An older decision replaces the shown one only when it is strictly more severe.
//! - A dismissal acknowledges every non-emergency decision up to the newest sequence seen.

use serde::Serialize;

use crate::triage::engine::{TriageAction, TriageDecision};

/// What the user currently sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DisplayState {
    #[default]
    Idle,
    AdvisoryShown,
    EmergencyShown,
}

/// The decision currently on screen, with the sequence number of its message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShownDecision {
    pub sequence: u64,
    pub decision: TriageDecision,
}

/// A snapshot of what the chat surface should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPrompt {
    pub state: DisplayState,
    pub decision: Option<TriageDecision>,
}

/// The result of applying a decision or a dismissal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: DisplayState,
    pub to: DisplayState,
    /// Whether the input was applied (as opposed to discarded as stale).
    pub accepted: bool,
}

impl Transition {
    /// Whether the chat surface has something new to render.
    pub fn needs_render(&self) -> bool {
        self.accepted && (self.from != self.to || self.to != DisplayState::Idle)
    }
}

/// Tracks the prompt on screen and arbitrates between incoming decisions.
#[derive(Debug, Clone, Default)]
pub struct DisplayController {
    shown: Option<ShownDecision>,
    latest_sequence: Option<u64>,
    acknowledged_through: Option<u64>,
}

impl DisplayController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DisplayState {
        match self.shown.as_ref().map(|s| s.decision.action) {
            Some(TriageAction::EmergencyModal) => DisplayState::EmergencyShown,
            Some(TriageAction::AdvisoryBanner) => DisplayState::AdvisoryShown,
            Some(TriageAction::None) | None => DisplayState::Idle,
        }
    }

    pub fn shown(&self) -> Option<&ShownDecision> {
        self.shown.as_ref()
    }

    pub fn prompt(&self) -> DisplayPrompt {
        DisplayPrompt {
            state: self.state(),
            decision: self.shown.as_ref().map(|s| s.decision.clone()),
        }
    }

    /// Apply the decision computed for message number `sequence`.
    pub fn apply(&mut self, sequence: u64, decision: TriageDecision) -> Transition {
        let from = self.state();
        self.latest_sequence = self.latest_sequence.max(Some(sequence));

        let shown_sequence = self.shown.as_ref().map(|s| s.sequence);
        let shown_action = self.shown.as_ref().map(|s| s.decision.action);

        let accepted = if decision.is_emergency() {
            // A newer emergency stays on screen; an older one is still accepted.
            let keep_current = shown_action == Some(TriageAction::EmergencyModal) && shown_sequence.is_some_and(|s| s > sequence);

            if !keep_current {
                self.show(sequence, decision);
            }

            true
        } else if self.acknowledged_through.is_some_and(|a| sequence <= a) {
            false
        } else {
            match (shown_sequence, shown_action) {
                (_, Some(TriageAction::EmergencyModal)) => false,
                (Some(current), Some(action)) if sequence > current || decision.action > action => {
                    self.show(sequence, decision);
                    true
                }
                (Some(_), Some(_)) => false,
                _ => {
                    self.show(sequence, decision);
                    true
                }
            }
        };

        Transition { from, to: self.state(), accepted }
    }

    /// Swap in a more detailed decision for the message already on screen.
    ///
    /// Only applies while `sequence` is the shown message and the action is unchanged, so a
    /// prompt the user has since dismissed or that was superseded stays as it is.
    pub fn refine(&mut self, sequence: u64, decision: TriageDecision) -> bool {
        match self.shown.as_mut() {
            Some(shown) if shown.sequence == sequence && shown.decision.action == decision.action => {
                shown.decision = decision;
                true
            }
            _ => false,
        }
    }

    /// The user explicitly dismissed whatever is shown.
    pub fn dismiss(&mut self) -> Transition {
        let from = self.state();

        self.shown = None;
        self.acknowledged_through = self.acknowledged_through.max(self.latest_sequence);

        Transition {
            from,
            to: DisplayState::Idle,
            accepted: from != DisplayState::Idle,
        }
    }

    fn show(&mut self, sequence: u64, decision: TriageDecision) {
        self.shown = match decision.action {
            TriageAction::None => None,
            _ => Some(ShownDecision { sequence, decision }),
        };
    }
}

// Tests.
