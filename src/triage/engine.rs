//! The triage decision engine.
//!
//! Turns a user message and its (possibly absent) classification into exactly one
//! [`TriageDecision`]. Rules are evaluated in order and the first match wins:
//!
//! 1. A critical lexicon phrase in the message: emergency prompt, critical.
//! 2. Triage level ATS1 or ATS2: emergency prompt, critical.
//! 3. Triage level ATS3: advisory banner.
//! 4. Follow-up needed with support level mid or high: advisory banner.
//! 5. Otherwise: nothing.
//!
//! Only rule 1 can fire without a classification.

use serde::Serialize;

use crate::{base::types::ClassificationResult, triage::lexicon};

/// What the chat surface should do with a message, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TriageAction {
    None,
    AdvisoryBanner,
    EmergencyModal,
}

/// How urgent an emergency prompt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Urgency {
    Urgent,
    Critical,
}

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TriageRule {
    CriticalKeyword,
    CriticalTriage,
    UrgentTriage,
    SupportLevelFollowUp,
    NoMatch,
}

/// The outcome of triaging a single message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageDecision {
    pub action: TriageAction,
    /// `Some` exactly when `action` is [`TriageAction::EmergencyModal`].
    pub urgency: Option<Urgency>,
    pub rule: TriageRule,
    /// The lexicon phrase that fired rule 1, if any.
    pub matched_phrase: Option<&'static str>,
    pub source_classification: Option<ClassificationResult>,
}

impl TriageDecision {
    fn new(action: TriageAction, rule: TriageRule, classification: Option<&ClassificationResult>) -> Self {
        let urgency = (action == TriageAction::EmergencyModal).then_some(Urgency::Critical);

        Self {
            action,
            urgency,
            rule,
            matched_phrase: None,
            source_classification: classification.cloned(),
        }
    }

    pub fn is_emergency(&self) -> bool {
        self.action == TriageAction::EmergencyModal
    }
}

/// Decide what to show for `message_text`.
///
/// Pure and total: no I/O, no logging, and any classification (including none) yields a decision.
pub fn decide(message_text: &str, classification: Option<&ClassificationResult>) -> TriageDecision {
    if let Some(phrase) = lexicon::find_critical_phrase(message_text) {
        let mut decision = TriageDecision::new(TriageAction::EmergencyModal, TriageRule::CriticalKeyword, classification);
        decision.matched_phrase = Some(phrase);

        return decision;
    }

    let Some(classification) = classification else {
        return TriageDecision::new(TriageAction::None, TriageRule::NoMatch, None);
    };

    let (action, rule) = match classification.triage_level {
        Some(level) if level.is_critical() => (TriageAction::EmergencyModal, TriageRule::CriticalTriage),
        Some(level) if level.is_urgent() => (TriageAction::AdvisoryBanner, TriageRule::UrgentTriage),
        _ if classification.needs_follow_up && classification.support_level.is_some_and(|l| l.warrants_follow_up()) => {
            (TriageAction::AdvisoryBanner, TriageRule::SupportLevelFollowUp)
        }
        _ => (TriageAction::None, TriageRule::NoMatch),
    };

    TriageDecision::new(action, rule, Some(classification))
}

// Tests.
