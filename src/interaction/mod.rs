//! Event handling and user interactions for support-triage.
//!
//! This module provides functionality for handling chat events:
//! - Processing typed messages and voice notes through the triage engine
//! - Submitting the emergency contact form and dismissing prompts
//! - Holding the per-session conversation and display state
//!
//! The `handle_*` functions spawn onto a caller-owned [`JoinSet`], so a chat surface can
//! wait for in-flight work with [`drain_tasks`] before it shuts down.

pub mod chat_event;
pub mod dismiss;
pub mod emergency_contact;
pub mod session;
pub mod voice_note;

use tokio::task::{JoinError, JoinSet};
use tracing::error;

/// Collect the tasks that have already finished, logging any that panicked.
pub fn reap_tasks(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        log_join_result(result);
    }
}

/// Wait for every in-flight task to finish.
pub async fn drain_tasks(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        log_join_result(result);
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(err) = result
        && !err.is_cancelled()
    {
        error!("Interaction task failed: {}", err);
    }
}
