pub mod catalog;
pub mod registry;

pub use catalog::{Captions, Catalog, PetEntry};
pub use registry::{Pet, PetRegistry};
