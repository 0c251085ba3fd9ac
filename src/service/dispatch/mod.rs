//! Emergency contact dispatch.
//!
//! Once the emergency prompt is shown, the user can ask the care team to contact them.
//! This module turns that request into an email and hands it to a dispatcher:
//! - `log`: composes the email and records it in the log.
//! - `webhook`: posts the composed email to an HTTP endpoint.

pub mod log;
pub mod webhook;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    base::{
        config::Config,
        types::{TriageLevel, Void},
    },
    triage::engine::{TriageDecision, Urgency},
};

// Types.

/// Contact fields collected by the emergency form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

impl ContactDetails {
    /// Parse `name; email; phone; notes`, where trailing fields may be omitted.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.splitn(4, ';').map(|p| p.trim().to_string());

        Self {
            name: parts.next().unwrap_or_default(),
            email: parts.next().unwrap_or_default(),
            phone: parts.next().unwrap_or_default(),
            notes: parts.next().unwrap_or_default(),
        }
    }

    /// The care team needs a name and at least one way to reach the person.
    pub fn is_reachable(&self) -> bool {
        !self.name.is_empty() && (!self.email.is_empty() || !self.phone.is_empty())
    }
}

/// A request for the care team to reach out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyContactRequest {
    pub urgency: Urgency,
    pub triage_level: Option<TriageLevel>,
    pub reasoning: String,
    pub contact: ContactDetails,
    pub requested_at: DateTime<Utc>,
}

impl EmergencyContactRequest {
    /// Build a request from the decision behind the emergency prompt.
    ///
    /// Returns `None` for decisions that did not produce an emergency prompt.
    pub fn from_decision(decision: &TriageDecision, contact: ContactDetails) -> Option<Self> {
        let urgency = decision.urgency.filter(|_| decision.is_emergency())?;
        let classification = decision.source_classification.as_ref();

        let reasoning = match (decision.matched_phrase, classification.map(|c| c.reasoning.as_str()).filter(|r| !r.is_empty())) {
            (Some(phrase), Some(reasoning)) => format!("Message contained the phrase \"{phrase}\". {reasoning}"),
            (Some(phrase), None) => format!("Message contained the phrase \"{phrase}\"."),
            (None, Some(reasoning)) => reasoning.to_string(),
            (None, None) => "No reasoning was provided by the classifier.".to_string(),
        };

        Some(Self {
            urgency,
            triage_level: classification.and_then(|c| c.triage_level),
            reasoning,
            contact,
            requested_at: Utc::now(),
        })
    }
}

/// The email sent to the care team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergencyEmail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

impl EmergencyEmail {
    pub fn compose(request: &EmergencyContactRequest, recipient: &str) -> Self {
        let tag = match request.urgency {
            Urgency::Critical => "CRITICAL",
            Urgency::Urgent => "URGENT",
        };

        let name = if request.contact.name.is_empty() { "Unnamed user" } else { request.contact.name.as_str() };
        let triage_level = request.triage_level.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string());
        let or_none = |s: &str| if s.is_empty() { "(not provided)".to_string() } else { s.to_string() };

        let body = format!(
            "A user of the support chat has asked to be contacted.\n\n\
             Urgency: {tag}\n\
             Triage level: {triage_level}\n\
             Requested at: {}\n\n\
             Reasoning:\n{}\n\n\
             Name: {name}\n\
             Email: {}\n\
             Phone: {}\n\n\
             Notes:\n{}\n",
            request.requested_at.to_rfc3339(),
            request.reasoning,
            or_none(&request.contact.email),
            or_none(&request.contact.phone),
            or_none(&request.contact.notes),
        );

        Self {
            to: recipient.to_string(),
            reply_to: Some(request.contact.email.clone()).filter(|e| !e.is_empty()),
            subject: format!("[{tag}] Support contact request from {name}"),
            body,
        }
    }
}

// Traits.

/// Generic dispatch client trait that clients must implement.
#[async_trait]
pub trait GenericDispatchClient: Send + Sync + 'static {
    /// Send an emergency contact request to the care team.
    async fn dispatch(&self, request: &EmergencyContactRequest) -> Void;
}

// Structs.

/// Dispatch client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DispatchClient {
    inner: Arc<dyn GenericDispatchClient>,
}

impl Deref for DispatchClient {
    type Target = dyn GenericDispatchClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl DispatchClient {
    pub fn new(inner: Arc<dyn GenericDispatchClient>) -> Self {
        Self { inner }
    }

    /// Pick the dispatcher the configuration asks for.
    pub fn from_config(config: &Config) -> Self {
        match &config.emergency_webhook_url {
            Some(url) => Self::webhook(url, &config.emergency_contact_recipient),
            None => Self::log(&config.emergency_contact_recipient),
        }
    }
}

// Tests.
