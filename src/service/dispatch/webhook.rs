//! Dispatcher that posts the composed email to an HTTP endpoint.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use crate::base::types::{Res, Void};

use super::{DispatchClient, EmergencyContactRequest, EmergencyEmail, GenericDispatchClient};

impl DispatchClient {
    pub fn webhook(url: &str, recipient: &str) -> Self {
        Self {
            inner: Arc::new(WebhookDispatchClient::new(url, recipient)),
        }
    }
}

/// The JSON body sent to the webhook.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    email: &'a EmergencyEmail,
    request: &'a EmergencyContactRequest,
}

/// Webhook dispatch client implementation.
#[derive(Clone)]
pub struct WebhookDispatchClient {
    client: reqwest::Client,
    url: String,
    recipient: String,
}

impl WebhookDispatchClient {
    pub fn new(url: &str, recipient: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            recipient: recipient.to_string(),
        }
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Res<reqwest::StatusCode> {
        const TIMEOUT: u64 = 15;

        let response = self.client.post(&self.url).timeout(Duration::from_secs(TIMEOUT)).json(payload).send().await?;

        Ok(response.status())
    }
}

#[async_trait]
impl GenericDispatchClient for WebhookDispatchClient {
    #[instrument(name = "WebhookDispatchClient::dispatch", skip_all, fields(url = %self.url, urgency = ?request.urgency))]
    async fn dispatch(&self, request: &EmergencyContactRequest) -> Void {
        let email = EmergencyEmail::compose(request, &self.recipient);
        let payload = WebhookPayload { email: &email, request };

        let status = self.post(&payload).await.map_err(|e| anyhow::anyhow!("Failed to send emergency contact request: {e}"))?;

        if !status.is_success() {
            return Err(anyhow::anyhow!("Emergency contact webhook responded with {status}."));
        }

        info!("Emergency contact request delivered ({status}).");

        Ok(())
    }
}

// Tests.
