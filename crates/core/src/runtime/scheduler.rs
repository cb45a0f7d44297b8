use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::shutdown::ShutdownGuard;
use crate::cognition::arbitration::{TriggerArbiter, TriggerOutcome};
use crate::cognition::expression::ExpressionClassifier;
use crate::cognition::intent::IntentClassifier;
use crate::config::PetCfg;
use crate::error::PetError;
use crate::io::input::{self, InboxReceiver, InboxSender};
use crate::io::output::PresentationSink;
use crate::pets::{Catalog, PetRegistry};
use crate::sensory::{self, SpeechProvider, VisionProvider};
use crate::types::{InboxEvent, RuntimeStatus};

/// Owns the session and drains the inbox one event at a time.
pub struct Runtime {
    cfg: Arc<PetCfg>,
    shutdown: ShutdownGuard,
    /// Serialized inbox. Producers, the sink and return timers all post here.
    inbox_rx: InboxReceiver,
    /// Kept for handing out to producers spawned later.
    inbox_tx: InboxSender,
    arbiter: TriggerArbiter,
    /// Template cloned into each speech producer.
    intents: IntentClassifier,
    status: RuntimeStatus,
    status_tx: watch::Sender<RuntimeStatus>,
    producers: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Create a new Runtime. Returns (Runtime, inbox_sender, status_receiver).
    /// Post `InboxEvent`s (touch, selection, media-ended) into the sender.
    /// Watch `RuntimeStatus` from the receiver.
    pub fn new(
        cfg: Arc<PetCfg>,
        catalog: &Catalog,
        sink: Arc<dyn PresentationSink>,
    ) -> Result<(Self, InboxSender, watch::Receiver<RuntimeStatus>), PetError> {
        let (inbox_tx, inbox_rx) = input::channel(cfg.inbox_buffer.max(1));
        let shutdown = ShutdownGuard::new();
        let arbiter = TriggerArbiter::new(
            PetRegistry::from_catalog(catalog),
            catalog.captions.clone(),
            &cfg,
            sink,
            inbox_tx.clone(),
            shutdown.token(),
        )?;
        let status = RuntimeStatus::new(arbiter.session().pet_id());
        let (status_tx, status_rx) = watch::channel(status.clone());
        let runtime = Self {
            cfg,
            shutdown,
            inbox_rx,
            inbox_tx: inbox_tx.clone(),
            arbiter,
            intents: IntentClassifier::from_catalog(catalog),
            status,
            status_tx,
            producers: Vec::new(),
        };
        Ok((runtime, inbox_tx, status_rx))
    }

    /// Returns the cancellation token for spawning child tasks.
    pub fn token(&self) -> CancellationToken {
        self.shutdown.token()
    }

    pub fn arbiter(&self) -> &TriggerArbiter {
        &self.arbiter
    }

    pub fn status(&self) -> &RuntimeStatus {
        &self.status
    }

    /// Start the speech producer.
    pub fn spawn_speech(&mut self, provider: Box<dyn SpeechProvider>) {
        let handle = sensory::speech::spawn(
            provider,
            self.intents.clone(),
            self.inbox_tx.clone(),
            self.cfg.speech_restart(),
            self.shutdown.token(),
        );
        self.producers.push(handle);
    }

    /// Start the vision producer with the configured smile strategy.
    pub fn spawn_vision(&mut self, provider: Box<dyn VisionProvider>) {
        let handle = sensory::vision::spawn(
            provider,
            ExpressionClassifier::from_cfg(&self.cfg),
            self.inbox_tx.clone(),
            self.shutdown.token(),
        );
        self.producers.push(handle);
    }

    /// Render the greeting and consume the inbox until shutdown.
    pub async fn run(&mut self) {
        self.shutdown.spawn_signal_listener();
        let token = self.shutdown.token();

        tracing::info!(
            pet = %self.arbiter.session().pet_id(),
            cooldown_ms = self.cfg.cooldown_ms,
            return_delay_ms = self.cfg.return_delay_ms,
            strategy = self.cfg.smile_strategy.as_str(),
            smile_threshold = self.cfg.active_smile_threshold(),
            "petjoy runtime started"
        );
        self.arbiter.greet();
        self.publish();

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!(accepted = self.status.accepted, "shutdown signal received, exiting inbox loop");
                    break;
                }
                event = self.inbox_rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    self.handle(event);
                }
            }
        }

        token.cancel();
        self.join_producers().await;
        tracing::info!("petjoy runtime stopped");
    }

    /// Apply one inbox event to the session. The whole call is the critical
    /// section; nothing here awaits.
    pub fn handle(&mut self, event: InboxEvent) {
        let _span = tracing::debug_span!("inbox", kind = event.kind()).entered();

        match event {
            InboxEvent::Trigger(trigger) => match self.arbiter.trigger(&trigger) {
                Ok(TriggerOutcome::Accepted(_)) => {
                    self.status.accepted += 1;
                    self.status.last_accepted_at = Some(chrono::Utc::now());
                }
                Ok(_) => self.status.rejected += 1,
                Err(e) => {
                    tracing::warn!(error = %e, source = %trigger.source, "trigger rejected");
                    self.status.rejected += 1;
                }
            },
            InboxEvent::SelectPet(id) => {
                if let Err(e) = self.arbiter.select_pet(&id) {
                    tracing::warn!(error = %e, "pet selection rejected");
                }
            }
            InboxEvent::JoyMediaEnded(ticket) => {
                self.arbiter.on_joy_media_ended(ticket);
            }
            InboxEvent::ReturnDue(ticket) => {
                self.arbiter.on_return_due(ticket);
            }
            InboxEvent::SensorLost { modality, reason } => {
                tracing::warn!(%modality, %reason, "modality degraded for this session");
                if !self.status.is_degraded(modality) {
                    self.status.degraded.push(modality);
                }
            }
        }

        self.publish();
    }

    fn publish(&mut self) {
        let session = self.arbiter.session();
        self.status.pet = session.pet_id().to_string();
        self.status.state = session.state;
        // watch::Sender::send only fails if all receivers dropped
        let _ = self.status_tx.send(self.status.clone());
    }

    async fn join_producers(&mut self) {
        let producers = std::mem::take(&mut self.producers);
        if producers.is_empty() {
            return;
        }
        let timeout = Duration::from_secs(self.cfg.shutdown_timeout_secs);
        let drain = async {
            for handle in producers {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "producer task failed");
                }
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            tracing::warn!(timeout_secs = self.cfg.shutdown_timeout_secs, "producers did not stop in time");
        }
    }
}
