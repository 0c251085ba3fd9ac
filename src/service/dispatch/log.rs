//! Dispatcher that composes the email and records it in the log.
//!
//! This is the default when no webhook is configured; an operator tails the log (or an
//! OTLP collector) and forwards requests by hand.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::base::types::Void;

use super::{DispatchClient, EmergencyContactRequest, EmergencyEmail, GenericDispatchClient};

impl DispatchClient {
    pub fn log(recipient: &str) -> Self {
        Self {
            inner: Arc::new(LogDispatchClient::new(recipient)),
        }
    }
}

/// Log-only dispatch client implementation.
#[derive(Clone)]
pub struct LogDispatchClient {
    recipient: String,
}

impl LogDispatchClient {
    pub fn new(recipient: &str) -> Self {
        Self { recipient: recipient.to_string() }
    }
}

#[async_trait]
impl GenericDispatchClient for LogDispatchClient {
    #[instrument(name = "LogDispatchClient::dispatch", skip_all, fields(urgency = ?request.urgency))]
    async fn dispatch(&self, request: &EmergencyContactRequest) -> Void {
        let email = EmergencyEmail::compose(request, &self.recipient);

        warn!(to = %email.to, reply_to = ?email.reply_to, subject = %email.subject, "Emergency contact request composed:\n{}", email.body);

        Ok(())
    }
}

// Tests.
