use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// Sensory channel a stimulus arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    Touch,
    Speech,
    Vision,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Touch => "touch",
            Self::Speech => "speech",
            Self::Vision => "vision",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Trigger types ───────────────────────────────────────────────

/// Which classifier produced a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
    Touch,
    SpeechName,
    SpeechPraise,
    Smile,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Touch => "touch",
            Self::SpeechName => "speech-name",
            Self::SpeechPraise => "speech-praise",
            Self::Smile => "smile",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified stimulus on its way into the arbiter. Never persisted.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub id: Uuid,
    pub source: TriggerSource,
    /// Pet named in the utterance, for name triggers.
    pub pet_override: Option<String>,
    /// Monotonic arrival time; cooldown is measured against it.
    pub at: Instant,
}

impl TriggerEvent {
    pub fn new(source: TriggerSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            pet_override: None,
            at: Instant::now(),
        }
    }

    pub fn naming(pet_id: impl Into<String>) -> Self {
        Self {
            pet_override: Some(pet_id.into()),
            ..Self::new(TriggerSource::SpeechName)
        }
    }

    /// Override the arrival time (replayed or simulated input).
    pub fn at(mut self, at: Instant) -> Self {
        self.at = at;
        self
    }
}

/// Result of classifying one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedIntent {
    None,
    PetName(String),
    Praise,
}

impl ClassifiedIntent {
    /// The trigger this intent asks for, if any.
    pub fn into_trigger(self) -> Option<TriggerEvent> {
        match self {
            Self::None => None,
            Self::PetName(id) => Some(TriggerEvent::naming(id)),
            Self::Praise => Some(TriggerEvent::new(TriggerSource::SpeechPraise)),
        }
    }
}

/// Display state of the pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PetState {
    Idle,
    Joyful,
}

impl PetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Joyful => "joyful",
        }
    }
}

/// Identifies one joy presentation. The media-ended report and the
/// return-to-idle timer both carry it so stale callbacks can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JoyTicket(pub u64);

impl fmt::Display for JoyTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "joy#{}", self.0)
    }
}

/// Everything the arbiter consumes, in arrival order.
#[derive(Debug, Clone)]
pub enum InboxEvent {
    Trigger(TriggerEvent),
    SelectPet(String),
    /// Presentation sink finished playing the joy video.
    JoyMediaEnded(JoyTicket),
    /// Return-to-idle timer elapsed.
    ReturnDue(JoyTicket),
    /// A producer lost its sensor for the rest of the session.
    SensorLost { modality: Modality, reason: String },
}

impl InboxEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Trigger(_) => "trigger",
            Self::SelectPet(_) => "select_pet",
            Self::JoyMediaEnded(_) => "joy_media_ended",
            Self::ReturnDue(_) => "return_due",
            Self::SensorLost { .. } => "sensor_lost",
        }
    }
}

// ── Producer payloads ───────────────────────────────────────────

/// Pointer activity over the pet surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    TouchMove,
    MouseMove { primary_pressed: bool },
    Down,
    Up,
}

/// One recognizer result, interim or final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResult {
    pub text: String,
    pub is_final: bool,
}

impl SpeechResult {
    pub fn interim(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: false }
    }

    pub fn final_result(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: true }
    }
}

/// A named blend-shape intensity from the landmark engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub score: f32,
}

impl BlendShape {
    pub fn new(name: impl Into<String>, score: f32) -> Self {
        Self { name: name.into(), score }
    }
}

/// Normalized face landmark coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Scoreable structure for one detected face.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceSample {
    BlendShapes(Vec<BlendShape>),
    Landmarks(Vec<Landmark>),
}

/// One camera frame as seen by the vision provider.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionFrame {
    /// Media time of the frame in seconds.
    pub timestamp: f64,
    /// `None` when no face was found.
    pub face: Option<FaceSample>,
}

// ── Runtime status ──────────────────────────────────────────────

/// Snapshot of the session, broadcast after every inbox event.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeStatus {
    pub pet: String,
    pub state: PetState,
    pub accepted: u64,
    pub rejected: u64,
    pub last_accepted_at: Option<DateTime<Utc>>,
    pub degraded: Vec<Modality>,
}

impl RuntimeStatus {
    pub fn new(pet: impl Into<String>) -> Self {
        Self {
            pet: pet.into(),
            state: PetState::Idle,
            accepted: 0,
            rejected: 0,
            last_accepted_at: None,
            degraded: Vec::new(),
        }
    }

    pub fn is_degraded(&self, modality: Modality) -> bool {
        self.degraded.contains(&modality)
    }
}
