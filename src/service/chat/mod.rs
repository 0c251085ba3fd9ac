//! Chat surface for support-triage.
//!
//! This module provides functionality for interacting with the person using the chat:
//! - Receiving typed messages, voice notes, and form submissions
//! - Sending replies
//! - Rendering the triage prompt (advisory banner or emergency prompt)
//!
//! It defines the `GenericChatClient` trait that can be implemented for different
//! surfaces, with a console implementation for local use.

pub mod console;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{base::types::Void, triage::display::DisplayPrompt};

// Traits.

/// Generic "chat" trait that clients must implement.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Start the chat client listener.
    ///
    /// This begins reading input from the user and dispatching it to the interaction
    /// handlers until the session ends.
    async fn start(&self) -> Void;

    /// Send a message to the user.
    async fn send_message(&self, text: &str) -> Void;

    /// Render the current triage prompt.
    ///
    /// Called whenever the displayed prompt changes, including when it is cleared.
    async fn render_prompt(&self, prompt: &DisplayPrompt) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
