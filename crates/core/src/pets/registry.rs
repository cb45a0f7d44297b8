use std::sync::Arc;

use crate::error::PetError;
use crate::pets::catalog::Catalog;

/// A pet and its asset bundle. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pet {
    pub id: String,
    pub idle_image: String,
    pub joy_video: String,
    pub sound: String,
}

/// Read-only lookup from pet id to asset bundle.
#[derive(Debug, Clone)]
pub struct PetRegistry {
    pets: Vec<Arc<Pet>>,
}

impl PetRegistry {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let pets = catalog
            .pets
            .iter()
            .map(|e| {
                Arc::new(Pet {
                    id: e.id.clone(),
                    idle_image: e.idle_image.clone(),
                    joy_video: e.joy_video.clone(),
                    sound: e.sound.clone(),
                })
            })
            .collect();
        Self { pets }
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<Pet>, PetError> {
        self.pets
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| PetError::UnknownPet(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.pets.iter().map(|p| p.id.as_str())
    }
}
