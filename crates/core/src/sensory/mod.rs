//! Producers. Each modality runs independently and posts classified
//! triggers into the arbiter inbox; a failed sensor only takes its own
//! modality down.

pub mod speech;
pub mod touch;
pub mod vision;

pub use speech::{ChannelSpeechProvider, SpeechProvider};
pub use vision::{ChannelVisionProvider, VisionProvider};
