use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cognition::expression::{ExpressionClassifier, FrameVerdict};
use crate::error::PetError;
use crate::io::input::{self, InboxSender};
use crate::types::{InboxEvent, Modality, TriggerEvent, TriggerSource, VisionFrame};

/// Face landmark engine driven by the display's frame cadence.
#[async_trait::async_trait]
pub trait VisionProvider: Send {
    /// Acquire the camera and load the model. Fails if either is unavailable.
    async fn open(&mut self) -> Result<(), PetError>;

    /// Sample for the next presented frame; `None` once the camera stream closes.
    async fn next_frame(&mut self) -> Option<VisionFrame>;
}

/// Spawn the vision producer. Frames are deduplicated by timestamp and
/// scored; a smile posts a `smile` trigger.
pub fn spawn(
    provider: Box<dyn VisionProvider>,
    classifier: ExpressionClassifier,
    inbox: InboxSender,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run(provider, classifier, inbox, token))
}

async fn run(
    mut provider: Box<dyn VisionProvider>,
    mut classifier: ExpressionClassifier,
    inbox: InboxSender,
    token: CancellationToken,
) {
    if let Err(e) = provider.open().await {
        lose_sensor(&inbox, e.to_string()).await;
        return;
    }
    tracing::debug!("vision stream opened");

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            frame = provider.next_frame() => {
                let Some(frame) = frame else {
                    lose_sensor(&inbox, "camera stream closed".into()).await;
                    return;
                };
                match classifier.observe(&frame) {
                    FrameVerdict::Scored(reading) if reading.smiling => {
                        tracing::debug!(
                            timestamp = frame.timestamp,
                            intensity = reading.intensity,
                            alternate = reading.alternate,
                            "smile detected"
                        );
                        let trigger = TriggerEvent::new(TriggerSource::Smile);
                        input::post_trigger(&inbox, trigger);
                    }
                    FrameVerdict::Unscoreable => {
                        tracing::trace!(timestamp = frame.timestamp, "face sample not scoreable");
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn lose_sensor(inbox: &InboxSender, reason: String) {
    tracing::warn!(%reason, "vision unavailable, modality disabled");
    let _ = inbox
        .send(InboxEvent::SensorLost {
            modality: Modality::Vision,
            reason,
        })
        .await;
}

/// Provider fed from a channel; the camera "closes" with the sender.
#[derive(Debug)]
pub struct ChannelVisionProvider {
    rx: mpsc::Receiver<VisionFrame>,
}

impl ChannelVisionProvider {
    pub fn new(rx: mpsc::Receiver<VisionFrame>) -> Self {
        Self { rx }
    }
}

#[async_trait::async_trait]
impl VisionProvider for ChannelVisionProvider {
    async fn open(&mut self) -> Result<(), PetError> {
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<VisionFrame> {
        self.rx.recv().await
    }
}
