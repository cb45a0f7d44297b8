use crate::types::Modality;

/// Errors surfaced by the pet core. None of them are fatal to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PetError {
    #[error("unknown pet: {0}")]
    UnknownPet(String),
    #[error("asset unavailable for {pet}: {asset} ({reason})")]
    AssetUnavailable {
        pet: String,
        asset: String,
        reason: String,
    },
    #[error("{modality} sensor unavailable: {reason}")]
    SensorUnavailable { modality: Modality, reason: String },
    #[error("invalid catalog: {0}")]
    Catalog(String),
}

impl PetError {
    pub fn sensor(modality: Modality, reason: impl Into<String>) -> Self {
        Self::SensorUnavailable {
            modality,
            reason: reason.into(),
        }
    }

    pub fn asset(pet: impl Into<String>, asset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AssetUnavailable {
            pet: pet.into(),
            asset: asset.into(),
            reason: reason.into(),
        }
    }
}
