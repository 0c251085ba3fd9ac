//! Library root for `support-triage`.
//!
//! Support-triage is the chat back end of a mental-health support service for students
//! and researchers.  For every message it:
//! - Classifies the message with a language model (support level and ATS triage level)
//! - Screens the text against a fixed lexicon of critical phrases
//! - Decides whether to show nothing, an advisory banner, or a blocking emergency prompt
//! - Replies supportively, and lets the user ask the care team to contact them
//!
//! The triage engine in [`triage`] is pure and synchronous; everything that talks to the
//! outside world sits behind the traits in [`service`], so each can be swapped or mocked.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;
pub mod triage;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the support-triage runtime:
/// - Creates the runtime context with the model, dispatch, and chat clients
/// - Starts the chat loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting support-triage ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config)?;

    // Start the runtime.
    runtime.start().await?;

    info!("Session ended.");

    Ok(())
}
