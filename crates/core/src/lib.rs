pub mod cognition;
pub mod config;
pub mod error;
pub mod io;
pub mod pets;
pub mod runtime;
pub mod sensory;
pub mod types;
