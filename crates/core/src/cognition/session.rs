use std::sync::Arc;

use tokio::time::Instant;

use crate::pets::Pet;
use crate::types::PetState;

/// The only mutable state of the pet. Owned by the arbiter; everything else
/// sees snapshots.
#[derive(Debug, Clone)]
pub struct Session {
    pub pet: Arc<Pet>,
    pub state: PetState,
    /// Arrival time of the last accepted trigger.
    pub last_trigger: Option<Instant>,
}

impl Session {
    pub fn new(pet: Arc<Pet>) -> Self {
        Self {
            pet,
            state: PetState::Idle,
            last_trigger: None,
        }
    }

    pub fn pet_id(&self) -> &str {
        &self.pet.id
    }

    pub fn is_joyful(&self) -> bool {
        self.state == PetState::Joyful
    }
}
