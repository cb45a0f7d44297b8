use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cognition::normalize;
use crate::error::PetError;

const BUILTIN_CATALOG: &str = include_str!("../../catalog.json");

/// Static pet table plus the keyword tables used by the intent classifier.
/// Loaded once at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Pets in name-evaluation order: the first pet whose alias matches wins.
    pub pets: Vec<PetEntry>,
    pub praise: Vec<String>,
    #[serde(default)]
    pub captions: Captions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetEntry {
    pub id: String,
    pub idle_image: String,
    pub joy_video: String,
    pub sound: String,
    /// Name variants, including likely recognizer mistakes.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Text shown beside the pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captions {
    pub greeting: String,
    pub joyful: String,
    pub farewell: String,
}

impl Default for Captions {
    fn default() -> Self {
        Self {
            greeting: "こんにちは！".into(),
            joyful: "喜んでいるよ！".into(),
            farewell: "また遊んでね！".into(),
        }
    }
}

impl Catalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, PetError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, PetError> {
        let catalog: Self =
            serde_json::from_str(json).map_err(|e| PetError::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PetError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PetError::Catalog(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Reject tables that would make lookups or matching ambiguous.
    pub fn validate(&self) -> Result<(), PetError> {
        if self.pets.is_empty() {
            return Err(PetError::Catalog("no pets configured".into()));
        }
        let mut seen = HashSet::new();
        for pet in &self.pets {
            if pet.id.trim().is_empty() {
                return Err(PetError::Catalog("empty pet id".into()));
            }
            if !seen.insert(pet.id.as_str()) {
                return Err(PetError::Catalog(format!("duplicate pet id: {}", pet.id)));
            }
            // An empty keyword would be a substring of every utterance.
            if pet.aliases.iter().any(|a| normalize::normalize(a).is_empty()) {
                return Err(PetError::Catalog(format!("empty alias for pet: {}", pet.id)));
            }
        }
        if self.praise.iter().any(|w| normalize::normalize(w).is_empty()) {
            return Err(PetError::Catalog("empty praise keyword".into()));
        }
        Ok(())
    }
}
