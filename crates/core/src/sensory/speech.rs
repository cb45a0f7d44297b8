use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cognition::intent::IntentClassifier;
use crate::error::PetError;
use crate::io::input::InboxSender;
use crate::types::{ClassifiedIntent, InboxEvent, Modality, SpeechResult};

/// Continuous speech recognizer.
#[async_trait::async_trait]
pub trait SpeechProvider: Send {
    /// Begin a recognition stream. Fails if the microphone is denied or
    /// recognition is unsupported on this host.
    async fn start(&mut self) -> Result<(), PetError>;

    /// Next interim or final result; `None` when the stream ends.
    async fn next_result(&mut self) -> Option<SpeechResult>;
}

/// Spawn the speech producer. The stream is restarted whenever it ends;
/// a failed start disables speech for the rest of the session.
pub fn spawn(
    provider: Box<dyn SpeechProvider>,
    classifier: IntentClassifier,
    inbox: InboxSender,
    restart_delay: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run(provider, classifier, inbox, restart_delay, token))
}

async fn run(
    mut provider: Box<dyn SpeechProvider>,
    classifier: IntentClassifier,
    inbox: InboxSender,
    restart_delay: Duration,
    token: CancellationToken,
) {
    let mut streams: u64 = 0;
    loop {
        if let Err(e) = provider.start().await {
            tracing::warn!(error = %e, "speech recognition unavailable, modality disabled");
            let _ = inbox
                .send(InboxEvent::SensorLost {
                    modality: Modality::Speech,
                    reason: e.to_string(),
                })
                .await;
            return;
        }
        streams += 1;
        tracing::debug!(stream = streams, "speech stream started");

        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                result = provider.next_result() => {
                    let Some(result) = result else {
                        break;
                    };
                    if !forward(&classifier, &inbox, result).await {
                        return;
                    }
                }
            }
        }

        // End of stream is routine; restart indefinitely.
        tracing::debug!(stream = streams, "speech stream ended, restarting");
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(restart_delay) => {}
        }
    }
}

/// Classify one result and post its trigger. Returns false once the inbox is gone.
async fn forward(classifier: &IntentClassifier, inbox: &InboxSender, result: SpeechResult) -> bool {
    let intent = classifier.classify(&result.text);
    if intent != ClassifiedIntent::None {
        tracing::debug!(text = %result.text, is_final = result.is_final, ?intent, "speech intent");
    }
    match intent.into_trigger() {
        Some(trigger) => inbox.send(InboxEvent::Trigger(trigger)).await.is_ok(),
        None => true,
    }
}

/// Provider fed from a channel. The stream "ends" when an explicit end
/// marker (`None`) is received; dropping the sender makes `start` fail.
#[derive(Debug)]
pub struct ChannelSpeechProvider {
    rx: mpsc::Receiver<Option<SpeechResult>>,
    closed: bool,
}

impl ChannelSpeechProvider {
    pub fn new(rx: mpsc::Receiver<Option<SpeechResult>>) -> Self {
        Self { rx, closed: false }
    }
}

#[async_trait::async_trait]
impl SpeechProvider for ChannelSpeechProvider {
    async fn start(&mut self) -> Result<(), PetError> {
        if self.closed {
            return Err(PetError::sensor(Modality::Speech, "recognizer feed closed"));
        }
        Ok(())
    }

    async fn next_result(&mut self) -> Option<SpeechResult> {
        match self.rx.recv().await {
            Some(item) => item,
            None => {
                self.closed = true;
                None
            }
        }
    }
}
