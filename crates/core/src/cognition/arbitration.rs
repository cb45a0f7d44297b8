use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cognition::session::Session;
use crate::config::PetCfg;
use crate::error::PetError;
use crate::io::input::InboxSender;
use crate::io::output::PresentationSink;
use crate::pets::{Captions, Pet, PetRegistry};
use crate::runtime::return_timer::PendingReturn;
use crate::types::{JoyTicket, PetState, TriggerEvent};

/// What the arbiter did with one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Accepted(JoyTicket),
    /// Dropped: a joy presentation is already running.
    AlreadyJoyful,
    /// Dropped: too soon after the last accepted trigger.
    CoolingDown { remaining: Duration },
}

impl TriggerOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Idle/Joyful state machine shared by every modality.
///
/// Invariant: `session.state == Joyful` exactly when a pending return exists.
/// All mutation happens through `&mut self`, so a single owner (the runtime
/// inbox loop) serializes every producer.
pub struct TriggerArbiter {
    registry: PetRegistry,
    captions: Captions,
    cooldown: Duration,
    return_delay: Duration,
    session: Session,
    pending: Option<PendingReturn>,
    next_ticket: u64,
    sink: Arc<dyn PresentationSink>,
    inbox: InboxSender,
    /// Parent of every pending return token.
    shutdown: CancellationToken,
}

impl TriggerArbiter {
    pub fn new(
        registry: PetRegistry,
        captions: Captions,
        cfg: &PetCfg,
        sink: Arc<dyn PresentationSink>,
        inbox: InboxSender,
        shutdown: CancellationToken,
    ) -> Result<Self, PetError> {
        let pet = registry.resolve(&cfg.default_pet)?;
        Ok(Self {
            registry,
            captions,
            cooldown: cfg.cooldown(),
            return_delay: cfg.return_delay(),
            session: Session::new(pet),
            pending: None,
            next_ticket: 0,
            sink,
            inbox,
            shutdown,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &PetRegistry {
        &self.registry
    }

    /// Ticket of the running joy presentation, if any.
    pub fn pending_ticket(&self) -> Option<JoyTicket> {
        self.pending.as_ref().map(PendingReturn::ticket)
    }

    /// Initial idle render with the greeting caption.
    pub fn greet(&self) {
        self.render_idle(Some(&self.captions.greeting));
    }

    /// Switch pets. Always renders idle and revokes any pending return, even
    /// when the pet does not change. Does not touch the cooldown.
    pub fn select_pet(&mut self, id: &str) -> Result<(), PetError> {
        let pet = self.registry.resolve(id)?;
        self.switch_to(pet);
        Ok(())
    }

    fn switch_to(&mut self, pet: Arc<Pet>) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(ticket = %pending.ticket(), "revoking pending return for previous pet");
            pending.cancel();
        }
        tracing::info!(from = %self.session.pet.id, to = %pet.id, "pet selected");
        self.session.pet = pet;
        self.session.state = PetState::Idle;
        self.render_idle(None);
    }

    /// Arbitrate one trigger. Fails only for an unknown pet override, in
    /// which case nothing is mutated.
    pub fn trigger(&mut self, event: &TriggerEvent) -> Result<TriggerOutcome, PetError> {
        if let Some(id) = &event.pet_override {
            let pet = self.registry.resolve(id)?;
            if pet.id != self.session.pet.id {
                self.switch_to(pet);
            }
        }

        if self.session.is_joyful() {
            tracing::debug!(source = %event.source, trigger_id = %event.id, "already joyful, trigger dropped");
            return Ok(TriggerOutcome::AlreadyJoyful);
        }

        if let Some(last) = self.session.last_trigger {
            let elapsed = event.at.saturating_duration_since(last);
            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                tracing::debug!(
                    source = %event.source,
                    trigger_id = %event.id,
                    remaining_ms = remaining.as_millis() as u64,
                    "cooling down, trigger dropped"
                );
                return Ok(TriggerOutcome::CoolingDown { remaining });
            }
        }

        self.next_ticket += 1;
        let ticket = JoyTicket(self.next_ticket);
        self.session.last_trigger = Some(event.at);
        self.session.state = PetState::Joyful;
        self.pending = Some(PendingReturn::new(ticket, &self.shutdown));
        tracing::info!(source = %event.source, pet = %self.session.pet.id, %ticket, "joy triggered");

        if let Err(e) = self
            .sink
            .render_joyful(&self.session.pet, ticket, Some(&self.captions.joyful))
        {
            // No media will play, so no end report will come. Start the
            // countdown now so the pet still returns to idle.
            tracing::warn!(error = %e, %ticket, "joy presentation degraded");
            self.on_joy_media_ended(ticket);
        }

        Ok(TriggerOutcome::Accepted(ticket))
    }

    /// The joy video for `ticket` finished. Arms the return-to-idle timer.
    /// Returns false for stale tickets.
    pub fn on_joy_media_ended(&mut self, ticket: JoyTicket) -> bool {
        match &mut self.pending {
            Some(pending) if pending.ticket() == ticket => {
                if pending.arm(self.return_delay, self.inbox.clone()).is_some() {
                    tracing::debug!(
                        %ticket,
                        delay_ms = self.return_delay.as_millis() as u64,
                        "joy media ended, return to idle scheduled"
                    );
                }
                true
            }
            _ => {
                tracing::debug!(%ticket, "media end for stale presentation ignored");
                false
            }
        }
    }

    /// The return-to-idle timer for `ticket` elapsed. Returns false for stale tickets.
    pub fn on_return_due(&mut self, ticket: JoyTicket) -> bool {
        if self.pending_ticket() != Some(ticket) {
            tracing::debug!(%ticket, "stale return-to-idle ignored");
            return false;
        }
        self.pending = None;
        self.session.state = PetState::Idle;
        tracing::info!(pet = %self.session.pet.id, %ticket, "returned to idle");
        self.render_idle(Some(&self.captions.farewell));
        true
    }

    fn render_idle(&self, caption: Option<&str>) {
        if let Err(e) = self.sink.render_idle(&self.session.pet, caption) {
            tracing::warn!(error = %e, pet = %self.session.pet.id, "idle presentation degraded");
        }
    }
}
