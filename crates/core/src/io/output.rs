use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::PetError;
use crate::pets::Pet;
use crate::types::JoyTicket;

/// Display boundary. Implementations must not block: media playback is
/// started and left running, and the end of the joy video is reported back
/// through the inbox with the same ticket.
pub trait PresentationSink: Send + Sync {
    fn render_idle(&self, pet: &Arc<Pet>, caption: Option<&str>) -> Result<(), PetError>;

    /// Play the pet's sound clip and joy video.
    fn render_joyful(
        &self,
        pet: &Arc<Pet>,
        ticket: JoyTicket,
        caption: Option<&str>,
    ) -> Result<(), PetError>;
}

/// An outbound render instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Idle {
        pet: Arc<Pet>,
        caption: Option<String>,
    },
    Joyful {
        pet: Arc<Pet>,
        ticket: JoyTicket,
        caption: Option<String>,
    },
}

impl RenderCommand {
    pub fn pet(&self) -> &Arc<Pet> {
        match self {
            Self::Idle { pet, .. } | Self::Joyful { pet, .. } => pet,
        }
    }

    pub fn is_joyful(&self) -> bool {
        matches!(self, Self::Joyful { .. })
    }
}

/// Render channel sender. The arbiter pushes commands here.
pub type RenderSender = mpsc::Sender<RenderCommand>;
/// Render channel receiver. The display host consumes from here.
pub type RenderReceiver = mpsc::Receiver<RenderCommand>;

/// Create a render channel with the given buffer size.
pub fn channel(buffer: usize) -> (RenderSender, RenderReceiver) {
    mpsc::channel(buffer)
}

/// Sink that forwards render commands to a display host over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: RenderSender,
}

impl ChannelSink {
    pub fn new(tx: RenderSender) -> Self {
        Self { tx }
    }

    fn push(&self, cmd: RenderCommand) -> Result<(), PetError> {
        let pet_id = cmd.pet().id.clone();
        self.tx
            .try_send(cmd)
            .map_err(|e| PetError::asset(pet_id, "display", e.to_string()))
    }
}

impl PresentationSink for ChannelSink {
    fn render_idle(&self, pet: &Arc<Pet>, caption: Option<&str>) -> Result<(), PetError> {
        self.push(RenderCommand::Idle {
            pet: Arc::clone(pet),
            caption: caption.map(str::to_owned),
        })
    }

    fn render_joyful(
        &self,
        pet: &Arc<Pet>,
        ticket: JoyTicket,
        caption: Option<&str>,
    ) -> Result<(), PetError> {
        self.push(RenderCommand::Joyful {
            pet: Arc::clone(pet),
            ticket,
            caption: caption.map(str::to_owned),
        })
    }
}
