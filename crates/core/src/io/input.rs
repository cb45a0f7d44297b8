use tokio::sync::mpsc;

use crate::sensory::touch;
use crate::types::{InboxEvent, JoyTicket, PointerEvent, TriggerEvent};

/// Inbox sender. Producers and the presentation sink post here.
pub type InboxSender = mpsc::Sender<InboxEvent>;
/// Inbox receiver. The runtime consumes it one event at a time.
pub type InboxReceiver = mpsc::Receiver<InboxEvent>;

/// Create the arbiter inbox with the given buffer size.
pub fn channel(buffer: usize) -> (InboxSender, InboxReceiver) {
    mpsc::channel(buffer)
}

/// Post a trigger without waiting. Returns false if the inbox is full or
/// closed; a dropped trigger would have been debounced anyway.
pub fn post_trigger(tx: &InboxSender, trigger: TriggerEvent) -> bool {
    match tx.try_send(InboxEvent::Trigger(trigger)) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "trigger dropped, inbox unavailable");
            false
        }
    }
}

/// Feed one pointer event. Returns true if it was a stroke and a touch
/// trigger was posted.
pub fn submit_pointer(tx: &InboxSender, event: PointerEvent) -> bool {
    match touch::classify(event) {
        Some(trigger) => post_trigger(tx, trigger),
        None => false,
    }
}

/// Explicit pet selection by the user.
pub async fn select_pet(
    tx: &InboxSender,
    pet_id: impl Into<String>,
) -> Result<(), mpsc::error::SendError<InboxEvent>> {
    tx.send(InboxEvent::SelectPet(pet_id.into())).await
}

/// Report that the joy video for `ticket` finished playing.
pub async fn joy_media_ended(
    tx: &InboxSender,
    ticket: JoyTicket,
) -> Result<(), mpsc::error::SendError<InboxEvent>> {
    tx.send(InboxEvent::JoyMediaEnded(ticket)).await
}
