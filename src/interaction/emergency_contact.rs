//! Handling of the emergency contact form.

use tokio::task::JoinSet;
use tracing::{Instrument, error, info, instrument};

use crate::{
    base::types::Void,
    interaction::session::Session,
    service::{
        chat::ChatClient,
        dispatch::{ContactDetails, DispatchClient, EmergencyContactRequest},
    },
};

pub const NO_ACTIVE_EMERGENCY: &str = "There's no emergency prompt open right now. If you need urgent help, please call your local emergency number.";
pub const INCOMPLETE_CONTACT: &str = "So the care team can reach you, please include your name and an email address or phone number: /contact name; email; phone; notes";
pub const CONTACT_SENT: &str = "Thank you. Your request has been sent to the care team, and someone will be in touch. If you are in immediate danger, please call your local emergency number now.";
pub const CONTACT_FAILED: &str = "I'm sorry, your request could not be sent. Please call your local emergency number or a crisis line directly.";

/// Handles an emergency contact form submission.
#[instrument(skip_all)]
pub fn handle_emergency_contact(tasks: &mut JoinSet<()>, details: ContactDetails, session: Session, dispatch: DispatchClient, chat: ChatClient) {
    tasks.spawn(
        async move {
            // Process the event.
            let result = process_emergency_contact(details, &session, &dispatch, &chat).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling: {}", err);
            }
        }
        .in_current_span(),
    );
}

/// Dispatch an emergency contact request for the emergency prompt currently shown.
///
/// A successful dispatch acknowledges the prompt; a failed one leaves it shown.
#[instrument(skip_all)]
pub async fn process_emergency_contact(details: ContactDetails, session: &Session, dispatch: &DispatchClient, chat: &ChatClient) -> Void {
    let Some(decision) = session.active_emergency().await else {
        chat.send_message(NO_ACTIVE_EMERGENCY).await?;
        return Ok(());
    };

    if !details.is_reachable() {
        chat.send_message(INCOMPLETE_CONTACT).await?;
        return Ok(());
    }

    let request = EmergencyContactRequest::from_decision(&decision, details).ok_or_else(|| anyhow::anyhow!("Active emergency prompt has no urgency."))?;

    if let Err(err) = dispatch.dispatch(&request).await {
        chat.send_message(CONTACT_FAILED).await?;
        return Err(err);
    }

    info!(urgency = ?request.urgency, "Emergency contact request dispatched.");

    let (transition, prompt) = session.dismiss().await;

    chat.send_message(CONTACT_SENT).await?;

    if transition.needs_render() {
        chat.render_prompt(&prompt).await?;
    }

    Ok(())
}
