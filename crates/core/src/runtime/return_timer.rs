use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::io::input::InboxSender;
use crate::types::{InboxEvent, JoyTicket};

/// Revocable handle for the return-to-idle of one joy presentation.
/// Created when a trigger is accepted; armed when the joy media ends.
/// Its token is a child of the shutdown token, so shutdown revokes it too.
#[derive(Debug)]
pub struct PendingReturn {
    ticket: JoyTicket,
    token: CancellationToken,
    armed: bool,
}

impl PendingReturn {
    pub fn new(ticket: JoyTicket, shutdown: &CancellationToken) -> Self {
        Self {
            ticket,
            token: shutdown.child_token(),
            armed: false,
        }
    }

    pub fn ticket(&self) -> JoyTicket {
        self.ticket
    }

    /// Start the countdown. After `delay` a `ReturnDue` for this ticket is
    /// posted unless the handle is cancelled first. Arming twice is a no-op.
    pub fn arm(&mut self, delay: Duration, inbox: InboxSender) -> Option<JoinHandle<()>> {
        if self.armed {
            return None;
        }
        self.armed = true;
        let token = self.token.clone();
        let ticket = self.ticket;
        let deadline = tokio::time::Instant::now() + delay;
        Some(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(%ticket, "return-to-idle cancelled");
                }
                _ = tokio::time::sleep_until(deadline) => {
                    let _ = inbox.send(InboxEvent::ReturnDue(ticket)).await;
                }
            }
        }))
    }

    pub fn cancel(self) {
        self.token.cancel();
    }
}
