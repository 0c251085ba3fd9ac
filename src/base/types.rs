use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};

use crate::triage::engine::TriageAction;

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

// Classification.

/// Coarse severity from free-text sentiment / risk analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SupportLevel {
    Low,
    Mid,
    High,
}

impl SupportLevel {
    /// Whether this level warrants a follow-up on its own.
    pub fn warrants_follow_up(self) -> bool {
        matches!(self, SupportLevel::Mid | SupportLevel::High)
    }
}

impl FromStr for SupportLevel {
    type Err = Err;

    fn from_str(s: &str) -> Res<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(SupportLevel::Low),
            "mid" => Ok(SupportLevel::Mid),
            "high" => Ok(SupportLevel::High),
            _ => Err(anyhow::anyhow!("Invalid support level: `{s}`. Must be one of: low, mid, high")),
        }
    }
}

impl TryFrom<String> for SupportLevel {
    type Error = Err;

    fn try_from(value: String) -> Res<Self> {
        value.parse()
    }
}

impl fmt::Display for SupportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportLevel::Low => write!(f, "low"),
            SupportLevel::Mid => write!(f, "mid"),
            SupportLevel::High => write!(f, "high"),
        }
    }
}

/// Clinical-style acuity scale; `Ats1` is the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum TriageLevel {
    #[serde(rename = "ATS1")]
    Ats1,
    #[serde(rename = "ATS2")]
    Ats2,
    #[serde(rename = "ATS3")]
    Ats3,
    #[serde(rename = "ATS4")]
    Ats4,
    #[serde(rename = "ATS5")]
    Ats5,
}

impl TriageLevel {
    /// ATS1 and ATS2 require an immediate response.
    pub fn is_critical(self) -> bool {
        matches!(self, TriageLevel::Ats1 | TriageLevel::Ats2)
    }

    /// ATS3 is urgent, but not critical.
    pub fn is_urgent(self) -> bool {
        self == TriageLevel::Ats3
    }
}

impl FromStr for TriageLevel {
    type Err = Err;

    fn from_str(s: &str) -> Res<Self> {
        let normalized = s.trim().to_uppercase().replace([' ', '-', '_'], "");

        match normalized.as_str() {
            "ATS1" => Ok(TriageLevel::Ats1),
            "ATS2" => Ok(TriageLevel::Ats2),
            "ATS3" => Ok(TriageLevel::Ats3),
            "ATS4" => Ok(TriageLevel::Ats4),
            "ATS5" => Ok(TriageLevel::Ats5),
            _ => Err(anyhow::anyhow!("Invalid triage level: `{s}`. Must be one of: ATS1, ATS2, ATS3, ATS4, ATS5")),
        }
    }
}

impl TryFrom<String> for TriageLevel {
    type Error = Err;

    fn try_from(value: String) -> Res<Self> {
        value.parse()
    }
}

impl fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriageLevel::Ats1 => write!(f, "ATS1"),
            TriageLevel::Ats2 => write!(f, "ATS2"),
            TriageLevel::Ats3 => write!(f, "ATS3"),
            TriageLevel::Ats4 => write!(f, "ATS4"),
            TriageLevel::Ats5 => write!(f, "ATS5"),
        }
    }
}

/// The classifier's output, as it arrives over the wire.
///
/// Every field is lenient: a malformed value becomes its default rather than failing the
/// whole parse, so a partially valid response still carries whatever it got right.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierOutput {
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub support_level: Option<SupportLevel>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub triage_level: Option<TriageLevel>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub reasoning: String,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub needs_follow_up: Option<bool>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

/// A validated classification of a single user message.
///
/// `None` levels mean the classifier did not produce a usable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub support_level: Option<SupportLevel>,
    pub triage_level: Option<TriageLevel>,
    pub reasoning: String,
    pub needs_follow_up: bool,
    /// Display only.
    pub confidence: Option<f32>,
    /// Display only.
    pub follow_up_questions: Vec<String>,
}

impl From<ClassifierOutput> for ClassificationResult {
    fn from(output: ClassifierOutput) -> Self {
        let needs_follow_up = output.needs_follow_up.unwrap_or_else(|| output.support_level.is_some_and(SupportLevel::warrants_follow_up));
        let confidence = output.confidence.filter(|c| (0.0..=1.0).contains(c));
        let follow_up_questions = output.follow_up_questions.into_iter().map(|q| q.trim().to_string()).filter(|q| !q.is_empty()).collect();

        Self {
            support_level: output.support_level,
            triage_level: output.triage_level,
            reasoning: output.reasoning.trim().to_string(),
            needs_follow_up,
            confidence,
            follow_up_questions,
        }
    }
}

impl ClassificationResult {
    /// Parse the raw classifier text into a validated classification.
    ///
    /// Fails only when the text is not a JSON object at all.
    pub fn parse(text: &str) -> Res<Self> {
        let output: ClassifierOutput = serde_json::from_str(strip_code_fence(text))?;

        Ok(output.into())
    }
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = rest.strip_prefix("json").unwrap_or(rest);

    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// Conversation.

/// Who said a given conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// A single turn in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Context handed to the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierContext {
    /// Prior turns, oldest first.
    pub history: Vec<ConversationTurn>,
    /// The message being classified.
    pub user_message: String,
}

/// Context handed to the supportive-reply agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyContext {
    /// Prior turns, oldest first.
    pub history: Vec<ConversationTurn>,
    /// The message being replied to.
    pub user_message: String,
    /// What the triage engine decided for this message.
    pub action: TriageAction,
}

// Tests.
