//! Domain layer: entities and value objects

pub mod entities;
pub mod value_objects;

pub use entities::{Discovery, Document, Rule};
pub use value_objects::{CorrelationId, RunnerKind};
