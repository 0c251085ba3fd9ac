//! Handling of an explicit dismissal of the current prompt.

use tokio::task::JoinSet;
use tracing::{Instrument, error, instrument};

use crate::{base::types::Void, interaction::session::Session, service::chat::ChatClient};

pub const NOTHING_TO_DISMISS: &str = "There's nothing to dismiss right now.";

/// Handles a dismissal.
#[instrument(skip_all)]
pub fn handle_dismiss(tasks: &mut JoinSet<()>, session: Session, chat: ChatClient) {
    tasks.spawn(
        async move {
            let result = process_dismiss(&session, &chat).await;

            if let Err(err) = &result {
                error!("Error while handling: {}", err);
            }
        }
        .in_current_span(),
    );
}

/// Acknowledge whatever prompt is shown.
#[instrument(skip_all)]
pub async fn process_dismiss(session: &Session, chat: &ChatClient) -> Void {
    let (transition, prompt) = session.dismiss().await;

    if transition.needs_render() {
        chat.render_prompt(&prompt).await
    } else {
        chat.send_message(NOTHING_TO_DISMISS).await
    }
}
